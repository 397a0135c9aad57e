//! Campaign pipeline
//!
//! Fetch → Analyze → branch decision → {Optimize → Engage | Engage | Done}.
//! Each stage is an independent turn on a fresh transcript; the only state
//! shared between stages is the `PipelineContext`, which flows forward and is
//! dropped when the run ends.

use super::builtins::BuiltinAgents;
use super::router::{BranchChoice, Router};
use super::{AgentSpec, BaseAgent};
use crate::crm::{fetch_campaign_records, CampaignRecord, CrmAdapter};
use crate::error::AgentError;
use crate::message::Transcript;
use crate::templates::Templates;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const NO_DATA_TO_ANALYZE: &str = "No campaign data found to analyze.";
pub const NO_DATA_FOR_ENGAGEMENT: &str = "No campaign data found to generate engagement strategies.";

/// Campaigns fetched per pipeline run
pub const CAMPAIGN_FETCH_LIMIT: u32 = 100;

/// Data threaded through the stages of one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineContext {
    pub campaigns: Vec<CampaignRecord>,
    pub analysis: String,
    pub optimization: Option<String>,
    pub engagement: Option<String>,
}

/// Outcome of a pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub response: String,
    /// Branch taken after the analysis; `None` when the analysis never ran
    pub branch: Option<BranchChoice>,
    /// Stages that ran, in order
    pub stages: Vec<String>,
    /// Everything the stages produced; `None` when there was no data
    pub context: Option<PipelineContext>,
}

impl PipelineReport {
    fn no_data(message: &str) -> Self {
        Self {
            response: message.to_string(),
            branch: None,
            stages: Vec::new(),
            context: None,
        }
    }
}

#[derive(Clone)]
pub struct CampaignPipeline {
    agent: BaseAgent,
    router: Router,
    agents: BuiltinAgents,
    crm: Arc<dyn CrmAdapter>,
    templates: Arc<Templates>,
}

impl CampaignPipeline {
    pub fn new(
        agent: BaseAgent,
        agents: BuiltinAgents,
        crm: Arc<dyn CrmAdapter>,
        templates: Arc<Templates>,
    ) -> Self {
        let router = Router::new(agent.clone(), agents.router.clone());
        Self {
            agent,
            router,
            agents,
            crm,
            templates,
        }
    }

    /// Full pipeline entry, starting with the analysis stage
    pub async fn run(
        &self,
        query: &str,
        cancellation: CancellationToken,
    ) -> Result<PipelineReport, AgentError> {
        let campaigns = fetch_campaign_records(self.crm.as_ref(), CAMPAIGN_FETCH_LIMIT).await;
        if campaigns.is_empty() {
            tracing::info!("no campaigns to analyze");
            return Ok(PipelineReport::no_data(NO_DATA_TO_ANALYZE));
        }

        let mut ctx = PipelineContext {
            campaigns,
            ..Default::default()
        };
        let mut stages = Vec::new();

        let input = self
            .templates
            .analyze_input(&pretty(&json!({ "campaigns": ctx.campaigns })))?;
        ctx.analysis = self
            .run_stage(&self.agents.analysis, input, &mut stages, cancellation.clone())
            .await?;

        let prompt = self.templates.branch_decision(query, &ctx.analysis)?;
        let branch = self.router.choose_branch(&prompt, cancellation.clone()).await?;

        let response = match branch {
            BranchChoice::Optimize => {
                let input = self.templates.optimize_input(&pretty(&json!({
                    "campaigns": ctx.campaigns,
                    "analysis": ctx.analysis,
                })))?;
                let optimization = self
                    .run_stage(&self.agents.optimization, input, &mut stages, cancellation.clone())
                    .await?;
                ctx.optimization = Some(optimization.clone());

                let input = self.templates.engage_input(
                    &pretty(&json!({
                        "campaigns": ctx.campaigns,
                        "analysis": ctx.analysis,
                        "optimizations": optimization,
                    })),
                    true,
                )?;
                self.run_stage(&self.agents.engagement, input, &mut stages, cancellation)
                    .await?
            }
            BranchChoice::Engage => {
                let input = self.templates.engage_input(
                    &pretty(&json!({
                        "campaigns": ctx.campaigns,
                        "analysis": ctx.analysis,
                    })),
                    true,
                )?;
                self.run_stage(&self.agents.engagement, input, &mut stages, cancellation)
                    .await?
            }
            BranchChoice::Done => ctx.analysis.clone(),
        };
        if branch != BranchChoice::Done {
            ctx.engagement = Some(response.clone());
        }

        tracing::info!(
            branch = ?branch,
            stages = ?stages,
            optimized = ctx.optimization.is_some(),
            "pipeline complete"
        );
        Ok(PipelineReport {
            response,
            branch: Some(branch),
            stages,
            context: Some(ctx),
        })
    }

    /// Engagement stage alone over the fetched campaigns
    pub async fn run_engagement_only(
        &self,
        cancellation: CancellationToken,
    ) -> Result<PipelineReport, AgentError> {
        let campaigns = fetch_campaign_records(self.crm.as_ref(), CAMPAIGN_FETCH_LIMIT).await;
        if campaigns.is_empty() {
            return Ok(PipelineReport::no_data(NO_DATA_FOR_ENGAGEMENT));
        }

        let input = self
            .templates
            .engage_input(&pretty(&json!({ "campaigns": campaigns })), false)?;
        let mut stages = Vec::new();
        let response = self
            .run_stage(&self.agents.engagement, input, &mut stages, cancellation)
            .await?;
        let context = PipelineContext {
            campaigns,
            engagement: Some(response.clone()),
            ..Default::default()
        };
        Ok(PipelineReport {
            response,
            branch: None,
            stages,
            context: Some(context),
        })
    }

    /// Stateless analysis of caller-supplied data
    pub async fn analyze(
        &self,
        query: &str,
        data: &Value,
        cancellation: CancellationToken,
    ) -> Result<String, AgentError> {
        let input = self.templates.direct_analysis_input(query, &pretty(data))?;
        let mut stages = Vec::new();
        self.run_stage(&self.agents.direct_analysis, input, &mut stages, cancellation)
            .await
    }

    async fn run_stage(
        &self,
        spec: &AgentSpec,
        input: String,
        stages: &mut Vec<String>,
        cancellation: CancellationToken,
    ) -> Result<String, AgentError> {
        tracing::info!(agent = %spec.name, "running pipeline stage");
        let mut transcript = Transcript::with_user(input);
        let result = self
            .agent
            .execute_turn(spec, &mut transcript, cancellation)
            .await?;
        stages.push(spec.name.clone());
        result.into_output()
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
