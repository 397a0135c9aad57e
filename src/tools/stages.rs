//! Pipeline stage tools
//!
//! Each stage agent carries one tool that frames the data it received into an
//! instruction. The output goes back to the model, which writes the stage's
//! answer in the following round.

use crate::tool::{parse_args, Tool, ToolContext, ToolDefinition, ToolOutput};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};

pub const ANALYZE_TOOL: &str = "analyze-campaign-performance";
pub const OPTIMIZE_TOOL: &str = "optimize_lead_funnel";
pub const ENGAGE_TOOL: &str = "engagement_strategy";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct StageArgs {
    /// Structured campaign data or insights from the previous stage
    #[serde(default)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Analyze,
    Optimize,
    Engage,
}

pub struct StageTool {
    name: &'static str,
    description: &'static str,
    framing: Framing,
}

impl StageTool {
    pub fn analyze() -> Self {
        Self {
            name: ANALYZE_TOOL,
            description: "Analyzes given campaign performance data and returns insights and improvement suggestions. \
                Input: a dictionary containing campaigns with fields like name, goal, leads/purchases, budget, and spend.",
            framing: Framing::Analyze,
        }
    }

    pub fn optimize() -> Self {
        Self {
            name: OPTIMIZE_TOOL,
            description: "Suggests optimizations to improve lead generation funnel based on campaign insights.",
            framing: Framing::Optimize,
        }
    }

    pub fn engage() -> Self {
        Self {
            name: ENGAGE_TOOL,
            description: "Generates personalized engagement strategies for leads based on campaign insights and optimized funnel.",
            framing: Framing::Engage,
        }
    }
}

#[async_trait]
impl Tool for StageTool {
    fn name(&self) -> &str {
        self.name
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::from_schema::<StageArgs>(self.name, self.description)
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> ToolOutput {
        let args: StageArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };
        let data = Value::Object(args.data);
        let text = match self.framing {
            Framing::Analyze => {
                let pretty = serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string());
                format!("Analyze the following campaign data:\n{}", pretty)
            }
            Framing::Optimize => format!(
                "Provide lead-funnel optimization strategies based on the following\ncampaign insights:\n{}",
                data
            ),
            Framing::Engage => format!(
                "Generate engagement strategies based on the following optimized insights:\n{}",
                data
            ),
        };
        ToolOutput::success(Value::String(text))
    }
}
