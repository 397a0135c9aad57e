//! Built-in agent definitions
//!
//! Built-in agents:
//! - `router`: picks the destination agent for a query
//! - `hubspot_agent`: CRM assistant with the full CRM tool set
//! - `analyze_campaign_performance`: first pipeline stage
//! - `optimize_lead_funnel`: lead-funnel optimization stage
//! - `engagement_strategy`: engagement tactics stage
//! - `campaign_analytics`: stateless analysis of caller-supplied data

use super::config::{AgentSpec, Continuation};
use crate::crm::CrmAdapter;
use crate::tools::{crm_tools, routing_tools, StageTool};
use std::sync::Arc;

pub const ROUTER_AGENT: &str = "router";
pub const CRM_AGENT: &str = "hubspot_agent";
pub const ANALYSIS_AGENT: &str = "analyze_campaign_performance";
pub const OPTIMIZATION_AGENT: &str = "optimize_lead_funnel";
pub const ENGAGEMENT_AGENT: &str = "engagement_strategy";
pub const DIRECT_ANALYSIS_AGENT: &str = "campaign_analytics";

const ROUTER_PROMPT: &str = r#"You are the Routing Agent. Your only job is to pick which one of the available tools
should handle the user's request. Do NOT perform any other work. Return exactly one
tool name and pass the original user query into that tool.

Available tools:
  • hubspot_agent
      - CRM lookup: contacts, deals, campaigns, tasks, etc.
  • analyze_campaign_performance
      - Analyzes JSON campaign data and returns performance insights.
  • optimize_lead_funnel
      - Takes campaign/lead metrics and suggests conversion improvements.
  • engagement_strategy
      - Takes optimized insights and recommends audience engagement tactics.

When you reply, wrap your answer in a single call to "route-to-agent" and set its input
to the user's original query. Only return the tool name inside that call."#;

const CRM_PROMPT: &str = r#"You are a professional CRM Assistant with access to Hubspot CRM data. Your purpose is to provide users with precise, relevant information from their CRM system and help them create new tasks and campaigns when needed.

When answering queries:
- Present only the information requested in a clean, structured format
- Do not explain which tools you are using or how you are retrieving the data
- Do not mention function names or code snippets in your responses
- If data is not available, simply state so without explaining technical details
- Use tables, bullet points, or other formatting to present data clearly when appropriate
- Only include information that actually exists in the CRM system
- Be concise and business-oriented in your communications

The user only wants to see the actual CRM data that answers their question, formatted in a professional way. They do not need to know how you obtained it or what steps you took.

When dealing with:
- Companies: provide relevant business details
- Contacts: present name, position, and contact information
- Deals: show name, amount, stage, and relevant dates
- Tasks: display description, status, priority, and due dates
- Campaigns: show name, status (ACTIVE/INACTIVE/PAUSED), start/end dates, budget, spend, goal, and audience

When creating tasks:
- For task creation, collect all necessary information (subject, priority, due date, etc.)
- Valid task statuses are: NOT_STARTED, IN_PROGRESS, COMPLETED
- Valid task priorities are: HIGH, MEDIUM, LOW
- Due dates should be in YYYY-MM-DD format
- Confirm to the user when the task has been created successfully
- You can associate tasks with a specific company when creating them

When creating campaigns:
- For campaign creation, collect the campaign name and other relevant details
- Valid campaign statuses include: ACTIVE, INACTIVE, PAUSED
- Campaigns are created as INACTIVE by default and can be activated later
- Start and end dates should be in YYYY-MM-DD format
- You can set campaign goals, target audience, budget, and notes
- Confirm to the user when the campaign has been created successfully

When dealing with campaigns:
- Show campaign status (ACTIVE/INACTIVE/PAUSED)
- Display campaign dates, budget, spending, goals, and target audience
- You can activate or deactivate campaigns directly through the system
- Campaign analytics show budget vs spend percentage and other key metrics
- Offer to create new campaigns or modify existing ones when relevant"#;

const ANALYSIS_PROMPT: &str = r#"You are a Campaign Analytics Specialist.

You receive structured JSON campaign data and provide:
- Comparison of goals vs outcomes
- Budget efficiency analysis
- Segment performance highlights
- Improvement strategies

Use bullet points and business-focused language. Avoid technical terminology or code references."#;

const OPTIMIZATION_PROMPT: &str = r#"You are a Lead Optimization Specialist.
You receive structured JSON containing campaign data and analytical insights.
Your task is to recommend concrete, step-by-step strategies to improve the
lead conversion funnel. Focus on:
- Lead capture mechanisms
- Nurture workflows
- Conversion rate improvements
- CRM best-practices
Use bullet points and business-focused language, no code or technical jargon."#;

const ENGAGEMENT_PROMPT: &str = r#"You are an Engagement Strategy Specialist.
You receive structured JSON optimized insights for a campaign and its lead funnel.
Provide actionable audience engagement tactics:
- Messaging channels and content recommendations
- Timing and frequency strategies
- Personalization techniques
- Measurement and follow-up suggestions

Use bullet points, business-focused language, and avoid technical jargon."#;

const DIRECT_ANALYSIS_PROMPT: &str = r#"You are a Campaign Analytics Specialist.

You will receive:
- A natural language query asking for campaign analysis
- A list of campaign performance records (in JSON)

Your job:
- Summarize campaign goals vs. outcomes
- Highlight over- or under-performing metrics
- Analyze budget vs spend
- Suggest improvements for upcoming campaigns

Always format your output in clear bullet points or markdown tables.
Avoid mentioning tools or internal processing steps."#;

/// The fixed set of agent specs, shared read-only by every request
#[derive(Debug, Clone)]
pub struct BuiltinAgents {
    pub router: Arc<AgentSpec>,
    pub crm: Arc<AgentSpec>,
    pub analysis: Arc<AgentSpec>,
    pub optimization: Arc<AgentSpec>,
    pub engagement: Arc<AgentSpec>,
    pub direct_analysis: Arc<AgentSpec>,
}

impl BuiltinAgents {
    /// Look up a spec by agent name
    pub fn get(&self, name: &str) -> Option<&Arc<AgentSpec>> {
        self.all().into_iter().find(|spec| spec.name == name)
    }

    pub fn all(&self) -> [&Arc<AgentSpec>; 6] {
        [
            &self.router,
            &self.crm,
            &self.analysis,
            &self.optimization,
            &self.engagement,
            &self.direct_analysis,
        ]
    }
}

/// Get all built-in agents. `max_rounds` applies to every tool-looping agent.
pub fn get_builtin_agents(crm: Arc<dyn CrmAdapter>, max_rounds: usize) -> BuiltinAgents {
    let router = AgentSpec::new(ROUTER_AGENT, ROUTER_PROMPT)
        .with_description("Selects which downstream agent should handle the given user query")
        .with_tools(routing_tools())
        .with_continuation(Continuation::StopAfterToolRound)
        .with_max_rounds(1);

    let crm_agent = AgentSpec::new(CRM_AGENT, CRM_PROMPT)
        .with_description("CRM lookup: companies, contacts, deals, campaigns and tasks")
        .with_tools(crm_tools(crm))
        .with_max_rounds(max_rounds);

    let analysis = AgentSpec::new(ANALYSIS_AGENT, ANALYSIS_PROMPT)
        .with_description("Analyzes campaign data and returns performance insights")
        .with_tool(StageTool::analyze())
        .with_max_rounds(max_rounds);

    let optimization = AgentSpec::new(OPTIMIZATION_AGENT, OPTIMIZATION_PROMPT)
        .with_description("Suggests lead-funnel conversion improvements")
        .with_tool(StageTool::optimize())
        .with_max_rounds(max_rounds);

    let engagement = AgentSpec::new(ENGAGEMENT_AGENT, ENGAGEMENT_PROMPT)
        .with_description("Recommends audience engagement tactics")
        .with_tool(StageTool::engage())
        .with_max_rounds(max_rounds);

    // no tools: the caller supplies the data
    let direct_analysis = AgentSpec::new(DIRECT_ANALYSIS_AGENT, DIRECT_ANALYSIS_PROMPT)
        .with_description("Answers an analysis query over caller-supplied campaign data")
        .with_max_rounds(max_rounds);

    BuiltinAgents {
        router: Arc::new(router),
        crm: Arc::new(crm_agent),
        analysis: Arc::new(analysis),
        optimization: Arc::new(optimization),
        engagement: Arc::new(engagement),
        direct_analysis: Arc::new(direct_analysis),
    }
}
