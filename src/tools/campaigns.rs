//! Marketing campaign tools
//!
//! Raw HubSpot responses are flattened into `CampaignRecord`s with a short
//! summary message so the model can present them without extra lookups.

use crate::crm::{CampaignRecord, CrmAdapter, NewCampaign};
use crate::tool::{parse_args, Tool, ToolContext, ToolDefinition, ToolOutput};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

// ============================================================================
// Arguments
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CampaignIdArgs {
    /// ID of the campaign to retrieve or modify
    pub campaign_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CampaignStatusArgs {
    /// Status of campaigns to retrieve (ACTIVE, INACTIVE, PAUSED, etc.)
    pub status: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CampaignNameArgs {
    /// Name of the campaign to search for
    pub campaign_name: String,
}

macro_rules! parse_or_return {
    ($args:expr) => {
        match parse_args($args) {
            Ok(a) => a,
            Err(e) => return e,
        }
    };
}

fn records(response: &Value) -> Vec<CampaignRecord> {
    CampaignRecord::from_list(response)
}

// ============================================================================
// Listing
// ============================================================================

pub struct GetAllCampaignsTool {
    crm: Arc<dyn CrmAdapter>,
}

impl GetAllCampaignsTool {
    pub fn new(crm: Arc<dyn CrmAdapter>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for GetAllCampaignsTool {
    fn name(&self) -> &str {
        "get-all-campaigns-tool"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::without_arguments(self.name(), "Get all campaigns in the HubSpot CRM system")
    }

    async fn execute(&self, _args: Value, _ctx: &ToolContext) -> ToolOutput {
        let response = match self.crm.list_campaigns(100).await {
            Ok(r) => r,
            Err(e) => return ToolOutput::error(e.to_string()),
        };
        let campaigns = records(&response);
        if campaigns.is_empty() {
            return ToolOutput::success(json!({
                "message": "No campaigns found in your HubSpot account"
            }));
        }
        ToolOutput::success(json!({
            "total": campaigns.len(),
            "message": format!("Found {} campaigns", campaigns.len()),
            "campaigns": campaigns,
        }))
    }
}

pub struct GetActiveCampaignsTool {
    crm: Arc<dyn CrmAdapter>,
}

impl GetActiveCampaignsTool {
    pub fn new(crm: Arc<dyn CrmAdapter>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for GetActiveCampaignsTool {
    fn name(&self) -> &str {
        "get-active-campaigns-tool"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::without_arguments(
            self.name(),
            "Get all active campaigns in the HubSpot CRM system",
        )
    }

    async fn execute(&self, _args: Value, _ctx: &ToolContext) -> ToolOutput {
        let response = match self.crm.list_campaigns_by_status("active").await {
            Ok(r) => r,
            Err(e) => return ToolOutput::error(e.to_string()),
        };
        let campaigns = records(&response);
        if campaigns.is_empty() {
            return ToolOutput::success(json!({
                "message": "No active campaigns found in your HubSpot account"
            }));
        }
        ToolOutput::success(json!({
            "total": campaigns.len(),
            "message": format!("Found {} active campaigns", campaigns.len()),
            "active_campaigns": campaigns,
        }))
    }
}

pub struct GetCampaignsByStatusTool {
    crm: Arc<dyn CrmAdapter>,
}

impl GetCampaignsByStatusTool {
    pub fn new(crm: Arc<dyn CrmAdapter>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for GetCampaignsByStatusTool {
    fn name(&self) -> &str {
        "get-campaigns-by-status-tool"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::from_schema::<CampaignStatusArgs>(
            self.name(),
            "Get campaigns filtered by status (ACTIVE, INACTIVE, PAUSED, etc.)",
        )
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> ToolOutput {
        let args: CampaignStatusArgs = parse_or_return!(args);
        let response = match self.crm.list_campaigns_by_status(&args.status).await {
            Ok(r) => r,
            Err(e) => return ToolOutput::error(e.to_string()),
        };
        let campaigns = records(&response);
        if campaigns.is_empty() {
            return ToolOutput::success(json!({
                "message": format!("No campaigns found with status '{}'", args.status)
            }));
        }
        ToolOutput::success(json!({
            "status": args.status,
            "total": campaigns.len(),
            "message": format!("Found {} campaigns with status '{}'", campaigns.len(), args.status),
            "campaigns": campaigns,
        }))
    }
}

pub struct GetCampaignsByNameTool {
    crm: Arc<dyn CrmAdapter>,
}

impl GetCampaignsByNameTool {
    pub fn new(crm: Arc<dyn CrmAdapter>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for GetCampaignsByNameTool {
    fn name(&self) -> &str {
        "get-campaigns-by-name-tool"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::from_schema::<CampaignNameArgs>(
            self.name(),
            "Search for campaigns by name (partial match supported)",
        )
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> ToolOutput {
        let args: CampaignNameArgs = parse_or_return!(args);
        let response = match self.crm.list_campaigns_by_name(&args.campaign_name).await {
            Ok(r) => r,
            Err(e) => return ToolOutput::error(e.to_string()),
        };
        let campaigns = records(&response);
        if campaigns.is_empty() {
            return ToolOutput::success(json!({
                "message": format!("No campaigns found matching '{}'", args.campaign_name)
            }));
        }
        ToolOutput::success(json!({
            "search_term": args.campaign_name,
            "total": campaigns.len(),
            "message": format!("Found {} campaigns matching '{}'", campaigns.len(), args.campaign_name),
            "campaigns": campaigns,
        }))
    }
}

// ============================================================================
// Single campaign
// ============================================================================

pub struct GetCampaignByIdTool {
    crm: Arc<dyn CrmAdapter>,
}

impl GetCampaignByIdTool {
    pub fn new(crm: Arc<dyn CrmAdapter>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for GetCampaignByIdTool {
    fn name(&self) -> &str {
        "get-campaign-by-id-tool"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::from_schema::<CampaignIdArgs>(
            self.name(),
            "Get detailed information about a specific campaign by ID",
        )
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> ToolOutput {
        let args: CampaignIdArgs = parse_or_return!(args);
        let campaign = match self.crm.get_campaign(&args.campaign_id).await {
            Ok(c) => c,
            Err(e) => return ToolOutput::error(e.to_string()),
        };
        if campaign.get("properties").is_none() {
            return ToolOutput::error(format!(
                "Campaign with ID {} not found or has no properties",
                args.campaign_id
            ));
        }
        let record = CampaignRecord::from_hubspot(&campaign);
        ToolOutput::success(json!({
            "message": format!("Campaign details for '{}'", record.name),
            "campaign": record,
        }))
    }
}

pub struct ActivateCampaignTool {
    crm: Arc<dyn CrmAdapter>,
}

impl ActivateCampaignTool {
    pub fn new(crm: Arc<dyn CrmAdapter>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for ActivateCampaignTool {
    fn name(&self) -> &str {
        "activate-campaign-tool"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::from_schema::<CampaignIdArgs>(
            self.name(),
            "Activate a campaign by setting its status to ACTIVE",
        )
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> ToolOutput {
        let args: CampaignIdArgs = parse_or_return!(args);
        match self.crm.activate_campaign(&args.campaign_id).await {
            Ok(result) => ToolOutput::success(state_change(&args.campaign_id, &result, "active")),
            Err(e) => ToolOutput::error(e.to_string()),
        }
    }
}

pub struct DeactivateCampaignTool {
    crm: Arc<dyn CrmAdapter>,
}

impl DeactivateCampaignTool {
    pub fn new(crm: Arc<dyn CrmAdapter>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for DeactivateCampaignTool {
    fn name(&self) -> &str {
        "deactivate-campaign-tool"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::from_schema::<CampaignIdArgs>(
            self.name(),
            "Deactivate a campaign by pausing it",
        )
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> ToolOutput {
        let args: CampaignIdArgs = parse_or_return!(args);
        match self.crm.deactivate_campaign(&args.campaign_id).await {
            Ok(result) => ToolOutput::success(state_change(&args.campaign_id, &result, "paused")),
            Err(e) => ToolOutput::error(e.to_string()),
        }
    }
}

fn state_change(campaign_id: &str, result: &Value, target: &str) -> Value {
    let text = |key: &str, default: &str| {
        result
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    };
    // a no-op change reports `status` instead of a transition
    let previous = result
        .get("previous_status")
        .or_else(|| result.get("status"))
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    json!({
        "campaign_id": campaign_id,
        "message": text("message", "Campaign status change completed"),
        "previous_status": previous,
        "new_status": text("new_status", target),
    })
}

pub struct GetCampaignAnalyticsTool {
    crm: Arc<dyn CrmAdapter>,
}

impl GetCampaignAnalyticsTool {
    pub fn new(crm: Arc<dyn CrmAdapter>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for GetCampaignAnalyticsTool {
    fn name(&self) -> &str {
        "get-campaign-analytics-tool"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::from_schema::<CampaignIdArgs>(
            self.name(),
            "Get analytics for a specific campaign (budget, spend and spend percentage)",
        )
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> ToolOutput {
        let args: CampaignIdArgs = parse_or_return!(args);
        match self.crm.campaign_analytics(&args.campaign_id).await {
            Ok(result) => ToolOutput::success(json!({
                "campaign_id": args.campaign_id,
                "analytics": result.get("analytics").cloned().unwrap_or_else(|| json!({})),
                "message": result
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Analytics retrieved for campaign {}", args.campaign_id)),
            })),
            Err(e) => ToolOutput::error(e.to_string()),
        }
    }
}

pub struct CreateCampaignTool {
    crm: Arc<dyn CrmAdapter>,
}

impl CreateCampaignTool {
    pub fn new(crm: Arc<dyn CrmAdapter>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for CreateCampaignTool {
    fn name(&self) -> &str {
        "create-campaign-tool"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::from_schema::<NewCampaign>(
            self.name(),
            "Create a new campaign in HubSpot CRM system",
        )
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> ToolOutput {
        let fields: NewCampaign = parse_or_return!(args);
        let created = match self.crm.create_campaign(&fields).await {
            Ok(c) => c,
            Err(e) => {
                return ToolOutput::from_payload(json!({
                    "error": format!("Failed to create campaign: {}", e),
                    "success": false,
                }))
            }
        };
        let Some(id) = created.get("id").cloned() else {
            return ToolOutput::from_payload(json!({
                "error": "No campaign ID returned from HubSpot API",
                "success": false,
            }));
        };

        tracing::info!(name = %fields.name, id = %id, "campaign created");
        ToolOutput::success(json!({
            "success": true,
            "campaign_id": id,
            "message": format!("Campaign '{}' created successfully with ID: {}", fields.name, render_id(&id)),
            "campaign_details": {
                "id": id,
                "name": fields.name,
                "status": fields.status.as_deref().unwrap_or("PLANNED"),
                "start_date": fields.start_date,
                "end_date": fields.end_date,
                "goal": fields.goal,
                "audience": fields.audience,
            }
        }))
    }
}

fn render_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticCrm;

    fn ctx() -> ToolContext {
        ToolContext::default()
    }

    #[tokio::test]
    async fn test_all_campaigns_are_flattened() {
        let tool = GetAllCampaignsTool::new(Arc::new(StaticCrm::sample()));
        let out = tool.execute(json!({}), &ctx()).await;

        assert_eq!(out.content["total"], 2);
        assert_eq!(out.content["message"], "Found 2 campaigns");
        assert_eq!(out.content["campaigns"][0]["name"], "Spring Launch");
        assert_eq!(out.content["campaigns"][0]["audience"], "N/A");
    }

    #[tokio::test]
    async fn test_empty_account() {
        let tool = GetAllCampaignsTool::new(Arc::new(StaticCrm::default()));
        let out = tool.execute(json!({}), &ctx()).await;
        assert!(!out.is_error);
        assert_eq!(
            out.content,
            json!({"message": "No campaigns found in your HubSpot account"})
        );
    }

    #[tokio::test]
    async fn test_status_filter_uses_hubspot_vocabulary() {
        let crm = Arc::new(StaticCrm::sample());
        let tool = GetCampaignsByStatusTool::new(crm.clone());
        let out = tool.execute(json!({"status": "PAUSED"}), &ctx()).await;

        assert_eq!(out.content["total"], 1);
        assert_eq!(out.content["campaigns"][0]["name"], "Winter Sale");
        assert_eq!(crm.calls(), vec!["list_campaigns_by_status:PAUSED"]);
    }

    #[tokio::test]
    async fn test_name_search() {
        let tool = GetCampaignsByNameTool::new(Arc::new(StaticCrm::sample()));
        let out = tool.execute(json!({"campaign_name": "spring"}), &ctx()).await;
        assert_eq!(out.content["search_term"], "spring");
        assert_eq!(out.content["campaigns"][0]["id"], "1");

        let out = tool.execute(json!({"campaign_name": "autumn"}), &ctx()).await;
        assert_eq!(out.content["message"], "No campaigns found matching 'autumn'");
    }

    #[tokio::test]
    async fn test_campaign_by_id() {
        let tool = GetCampaignByIdTool::new(Arc::new(StaticCrm::sample()));
        let out = tool.execute(json!({"campaign_id": "2"}), &ctx()).await;
        assert_eq!(out.content["message"], "Campaign details for 'Winter Sale'");

        let out = tool.execute(json!({"campaign_id": "99"}), &ctx()).await;
        assert!(out.is_error);
        assert_eq!(out.content["error"], "Campaign 99 not found");
    }

    #[tokio::test]
    async fn test_activation_reports_transition() {
        let tool = ActivateCampaignTool::new(Arc::new(StaticCrm::sample()));
        let out = tool.execute(json!({"campaign_id": "2"}), &ctx()).await;
        assert_eq!(out.content["new_status"], "active");
        assert_eq!(out.content["campaign_id"], "2");
    }

    #[tokio::test]
    async fn test_analytics() {
        let tool = GetCampaignAnalyticsTool::new(Arc::new(StaticCrm::sample()));
        let out = tool.execute(json!({"campaign_id": "1"}), &ctx()).await;
        assert_eq!(out.content["analytics"]["spend_percentage"], 89.0);
    }

    #[tokio::test]
    async fn test_create_campaign() {
        let tool = CreateCampaignTool::new(Arc::new(StaticCrm::sample()));
        let out = tool
            .execute(json!({"name": "Summer", "goal": "1000 leads"}), &ctx())
            .await;
        assert_eq!(out.content["success"], true);
        assert_eq!(
            out.content["message"],
            "Campaign 'Summer' created successfully with ID: new-campaign"
        );
        assert_eq!(out.content["campaign_details"]["status"], "PLANNED");
    }

    #[tokio::test]
    async fn test_adapter_failure_is_a_tool_error() {
        let tool = CreateCampaignTool::new(Arc::new(StaticCrm::failing()));
        let out = tool.execute(json!({"name": "Summer"}), &ctx()).await;
        assert!(out.is_error);
        assert_eq!(out.content["success"], false);
        assert!(out.content["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to create campaign"));
    }
}
