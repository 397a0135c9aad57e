//! Telemetry and logging infrastructure
//!
//! - Console logging (human-readable, compact)
//! - JSON file logging, rotated daily
//! - OpenTelemetry export (Jaeger, Honeycomb, etc.) when an endpoint is set

use crate::config::TelemetryConfig;
use crate::events::AgentEvent;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

const SERVICE_NAME: &str = "crm-copilot";
const LOG_FILE_PREFIX: &str = "crm_copilot.log";

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug,hyper=info,reqwest=info,h2=info,rustls=info"
    } else {
        "info,hyper=warn,reqwest=warn,h2=warn,rustls=warn"
    }
}

/// Installed logging stack. Keep it alive for the life of the process:
/// dropping it flushes the file writer and the span exporter.
pub struct Telemetry {
    process_id: Uuid,
    log_dir: PathBuf,
    _file_guard: Option<WorkerGuard>,
    otel_provider: Option<SdkTracerProvider>,
}

impl Telemetry {
    /// Initialize the full stack
    ///
    /// A global subscriber that is already installed (tests, embedding
    /// applications) is left in place.
    pub fn init(config: &TelemetryConfig) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.log_dir)?;
        let process_id = Uuid::new_v4();
        let verbose = config.verbose;

        let file_appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

        let make_env_filter = || {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)))
        };

        let otel_provider = if let Some(endpoint) = config.otel_endpoint.as_deref() {
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_http()
                .with_endpoint(endpoint)
                .with_protocol(opentelemetry_otlp::Protocol::HttpBinary)
                .build()?;

            let provider = SdkTracerProvider::builder()
                .with_batch_exporter(exporter)
                .with_resource(Resource::builder().with_service_name(SERVICE_NAME).build())
                .build();

            let tracer = provider.tracer(SERVICE_NAME);
            let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

            tracing_subscriber::registry()
                .with(make_env_filter())
                .with(fmt::layer().with_target(false).compact())
                .with(fmt::layer().json().with_writer(non_blocking))
                .with(otel_layer)
                .try_init()
                .ok();
            Some(provider)
        } else {
            tracing_subscriber::registry()
                .with(make_env_filter())
                .with(fmt::layer().with_target(false).compact())
                .with(fmt::layer().json().with_writer(non_blocking))
                .try_init()
                .ok();
            None
        };

        tracing::info!(
            process_id = %process_id,
            log_dir = %config.log_dir.display(),
            otel_enabled = otel_provider.is_some(),
            "Telemetry initialized"
        );

        Ok(Self {
            process_id,
            log_dir: config.log_dir.clone(),
            _file_guard: Some(file_guard),
            otel_provider,
        })
    }

    /// Console-only logging, for one-shot commands and tests
    pub fn minimal(verbose: bool) -> Self {
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbose))))
            .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
            .try_init()
            .ok();
        Self {
            process_id: Uuid::new_v4(),
            log_dir: PathBuf::new(),
            _file_guard: None,
            otel_provider: None,
        }
    }

    pub fn process_id(&self) -> Uuid {
        self.process_id
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Flush and stop the span exporter
    pub fn shutdown(mut self) {
        if let Some(provider) = self.otel_provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Failed to shut down trace exporter: {}", e);
            }
        }
    }
}

/// Mirror an agent event into the log
pub fn record_event(event: &AgentEvent) {
    match event {
        AgentEvent::TurnStart { agent } => {
            tracing::debug!(agent = %agent, "turn started");
        }
        AgentEvent::ModelResponse {
            agent,
            round,
            tool_calls,
            ..
        } => {
            tracing::debug!(agent = %agent, round, tool_calls, "model response");
        }
        AgentEvent::ToolCallStart { agent, tool, .. } => {
            tracing::debug!(agent = %agent, tool = %tool, "tool call started");
        }
        AgentEvent::ToolCallEnd {
            agent,
            tool,
            is_error,
            duration_ms,
            ..
        } => {
            tracing::debug!(agent = %agent, tool = %tool, is_error, duration_ms, "tool call finished");
        }
        AgentEvent::TurnComplete { agent, reason } => {
            tracing::info!(agent = %agent, reason = ?reason, "turn complete");
        }
    }
}
