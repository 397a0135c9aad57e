//! Handlebars templates for the messages the pipeline sends to its stages
//!
//! Templates are compiled in with `include_str!` and rendered in strict mode,
//! so a missing field is an error rather than an empty string.

use crate::error::AgentError;
use handlebars::Handlebars;
use serde::Serialize;

const BRANCH_DECISION: &str = include_str!("templates/branch_decision.hbs");
const ANALYZE: &str = include_str!("templates/analyze.hbs");
const OPTIMIZE: &str = include_str!("templates/optimize.hbs");
const ENGAGE: &str = include_str!("templates/engage.hbs");
const DIRECT_ANALYSIS: &str = include_str!("templates/direct_analysis.hbs");

/// Holds the handlebars templates
pub struct Templates {
    handlebars: Handlebars<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, AgentError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        // payloads are JSON and model text, never HTML
        handlebars.register_escape_fn(handlebars::no_escape);

        for (name, source) in [
            ("branch_decision", BRANCH_DECISION),
            ("analyze", ANALYZE),
            ("optimize", OPTIMIZE),
            ("engage", ENGAGE),
            ("direct_analysis", DIRECT_ANALYSIS),
        ] {
            handlebars
                .register_template_string(name, source)
                .map_err(|e| AgentError::Template(format!("{}: {}", name, e)))?;
        }

        Ok(Self { handlebars })
    }

    /// Render a template by name with the given data
    pub fn render<T: Serialize>(&self, template_name: &str, data: &T) -> Result<String, AgentError> {
        Ok(self.handlebars.render(template_name, data)?)
    }

    /// Follow-up prompt asking the router which stage comes after the analysis
    pub fn branch_decision(&self, query: &str, analysis: &str) -> Result<String, AgentError> {
        self.render(
            "branch_decision",
            &BranchDecision { query, analysis },
        )
    }

    pub fn analyze_input(&self, payload: &str) -> Result<String, AgentError> {
        self.render("analyze", &StageInput::plain(payload))
    }

    pub fn optimize_input(&self, payload: &str) -> Result<String, AgentError> {
        self.render("optimize", &StageInput::plain(payload))
    }

    /// Engagement input; `with_insights` selects the wording for analysed data
    pub fn engage_input(&self, payload: &str, with_insights: bool) -> Result<String, AgentError> {
        self.render(
            "engage",
            &StageInput {
                payload,
                with_insights,
            },
        )
    }

    pub fn direct_analysis_input(&self, query: &str, payload: &str) -> Result<String, AgentError> {
        self.render("direct_analysis", &DirectAnalysis { query, payload })
    }
}

#[derive(Serialize)]
struct BranchDecision<'a> {
    query: &'a str,
    analysis: &'a str,
}

#[derive(Serialize)]
struct StageInput<'a> {
    payload: &'a str,
    with_insights: bool,
}

impl<'a> StageInput<'a> {
    fn plain(payload: &'a str) -> Self {
        Self {
            payload,
            with_insights: false,
        }
    }
}

#[derive(Serialize)]
struct DirectAnalysis<'a> {
    query: &'a str,
    payload: &'a str,
}
