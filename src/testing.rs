//! Test doubles shared by the unit tests

use crate::crm::{CrmAdapter, CrmResult, NewCampaign, NewTask, TaskUpdate};
use crate::error::{CrmError, ProviderError};
use crate::message::Message;
use crate::provider::{ChatModel, ModelRequest, ModelResponse};
use crate::tool::{Tool, ToolContext, ToolDefinition, ToolOutput};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;

/// A model request as the scripted model saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub system_prompt: Option<String>,
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
    pub model: Option<String>,
}

impl RecordedRequest {
    /// Content of the last message sent
    pub fn last_content(&self) -> &str {
        self.messages.last().map(|m| m.content.as_str()).unwrap_or("")
    }
}

/// Replays canned responses in order and records every request
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<ModelResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn invoke(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ProviderError> {
        self.requests.lock().push(RecordedRequest {
            system_prompt: request.system_prompt.map(str::to_string),
            messages: request.transcript.messages().to_vec(),
            tools: request.tools.iter().map(|t| t.name.clone()).collect(),
            model: request.model.map(str::to_string),
        });
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| ProviderError::Api("script exhausted".into()))
    }

    fn default_model(&self) -> &str {
        "scripted"
    }
}

/// Never answers; for deadline and cancellation tests
pub struct StalledModel;

#[async_trait]
impl ChatModel for StalledModel {
    async fn invoke(&self, _request: ModelRequest<'_>) -> Result<ModelResponse, ProviderError> {
        std::future::pending().await
    }

    fn default_model(&self) -> &str {
        "stalled"
    }
}

/// Returns `{<name>: <arguments>}`
pub struct EchoTool {
    name: String,
    direct: bool,
}

impl EchoTool {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            direct: false,
        }
    }

    pub fn direct(mut self) -> Self {
        self.direct = true;
        self
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::without_arguments(&self.name, "Echo the arguments")
    }

    fn returns_direct(&self) -> bool {
        self.direct
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> ToolOutput {
        ToolOutput::success(json!({ self.name.clone(): args }))
    }
}

/// Always fails with `{"error": "<name> is broken"}`
pub struct FailingTool {
    name: String,
}

impl FailingTool {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::without_arguments(&self.name, "Always fails")
    }

    async fn execute(&self, _args: Value, _ctx: &ToolContext) -> ToolOutput {
        ToolOutput::error(format!("{} is broken", self.name))
    }
}

/// In-memory CRM with a fixed campaign list
#[derive(Default)]
pub struct StaticCrm {
    campaigns: Vec<Value>,
    fail: bool,
    calls: Mutex<Vec<String>>,
}

impl StaticCrm {
    /// Campaigns in HubSpot's `results` shape
    pub fn with_campaigns(campaigns: Vec<Value>) -> Self {
        Self {
            campaigns,
            ..Default::default()
        }
    }

    /// Every operation fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Two campaigns with budget and spend
    pub fn sample() -> Self {
        Self::with_campaigns(vec![
            json!({
                "id": "1",
                "properties": {
                    "hs_name": "Spring Launch",
                    "hs_goal": "500 leads",
                    "hs_campaign_status": "active",
                    "hs_budget_items_sum_amount": "1000",
                    "hs_spend_items_sum_amount": "890"
                }
            }),
            json!({
                "id": "2",
                "properties": {
                    "hs_name": "Winter Sale",
                    "hs_goal": "200 purchases",
                    "hs_campaign_status": "paused",
                    "hs_budget_items_sum_amount": "800",
                    "hs_spend_items_sum_amount": "750"
                }
            }),
        ])
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: impl Into<String>) -> Result<(), CrmError> {
        self.calls.lock().push(call.into());
        if self.fail {
            Err(CrmError::Api {
                status: 503,
                message: "service unavailable".into(),
            })
        } else {
            Ok(())
        }
    }

    fn find(&self, id: &str) -> CrmResult {
        self.campaigns
            .iter()
            .find(|c| c["id"] == id)
            .cloned()
            .ok_or_else(|| CrmError::NotFound(format!("Campaign {} not found", id)))
    }
}

#[async_trait]
impl CrmAdapter for StaticCrm {
    async fn get_company_list(&self) -> CrmResult {
        self.record("get_company_list")?;
        Ok(json!({ "companies": ["Acme", "Globex"] }))
    }

    async fn get_company_by_name(&self, name: &str) -> CrmResult {
        self.record(format!("get_company_by_name:{}", name))?;
        Ok(json!({ "results": [{ "id": "c1", "properties": { "name": name } }] }))
    }

    async fn get_contacts_for_company(&self, name: &str) -> CrmResult {
        self.record(format!("get_contacts_for_company:{}", name))?;
        Ok(json!({ "company": name, "contacts": [{ "name": "Jane Doe", "email": "jane@acme.test" }] }))
    }

    async fn get_deals_for_company(&self, name: &str) -> CrmResult {
        self.record(format!("get_deals_for_company:{}", name))?;
        Err(CrmError::NotFound(format!("No deals found for company: {}", name)))
    }

    async fn list_campaigns(&self, limit: u32) -> CrmResult {
        self.record(format!("list_campaigns:{}", limit))?;
        let results: Vec<Value> = self.campaigns.iter().take(limit as usize).cloned().collect();
        Ok(json!({ "results": results }))
    }

    async fn get_campaign(&self, id: &str) -> CrmResult {
        self.record(format!("get_campaign:{}", id))?;
        self.find(id)
    }

    async fn list_campaigns_by_status(&self, status: &str) -> CrmResult {
        self.record(format!("list_campaigns_by_status:{}", status))?;
        let wanted = crate::crm::campaign_status(status);
        let results: Vec<Value> = self
            .campaigns
            .iter()
            .filter(|c| c["properties"]["hs_campaign_status"] == wanted.as_str())
            .cloned()
            .collect();
        Ok(json!({ "total": results.len(), "results": results }))
    }

    async fn list_campaigns_by_name(&self, substring: &str) -> CrmResult {
        self.record(format!("list_campaigns_by_name:{}", substring))?;
        let needle = substring.to_lowercase();
        let results: Vec<Value> = self
            .campaigns
            .iter()
            .filter(|c| {
                c["properties"]["hs_name"]
                    .as_str()
                    .is_some_and(|n| n.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        Ok(json!({ "total": results.len(), "results": results }))
    }

    async fn activate_campaign(&self, id: &str) -> CrmResult {
        self.record(format!("activate_campaign:{}", id))?;
        self.find(id)?;
        Ok(json!({ "message": format!("Campaign {} has been activated", id), "new_status": "active", "campaign_id": id }))
    }

    async fn deactivate_campaign(&self, id: &str) -> CrmResult {
        self.record(format!("deactivate_campaign:{}", id))?;
        self.find(id)?;
        Ok(json!({ "message": format!("Campaign {} has been deactivated (paused)", id), "new_status": "paused", "campaign_id": id }))
    }

    async fn campaign_analytics(&self, id: &str) -> CrmResult {
        self.record(format!("campaign_analytics:{}", id))?;
        let campaign = self.find(id)?;
        let props = &campaign["properties"];
        Ok(json!({
            "analytics": {
                "campaign_id": id,
                "spend_percentage": crate::crm::spend_percentage(
                    props.get("hs_budget_items_sum_amount"),
                    props.get("hs_spend_items_sum_amount"),
                ),
            },
            "message": "Campaign analytics retrieved successfully"
        }))
    }

    async fn create_campaign(&self, fields: &NewCampaign) -> CrmResult {
        self.record(format!("create_campaign:{}", fields.name))?;
        Ok(json!({ "id": "new-campaign", "properties": fields.to_properties() }))
    }

    async fn create_task(&self, fields: &NewTask) -> CrmResult {
        self.record(format!("create_task:{}", fields.subject))?;
        Ok(json!({ "id": "task-1", "properties": fields.to_properties() }))
    }

    async fn update_task(&self, id: &str, fields: &TaskUpdate) -> CrmResult {
        self.record(format!("update_task:{}", id))?;
        Ok(json!({ "id": id, "properties": fields.to_properties() }))
    }

    async fn delete_task(&self, id: &str) -> CrmResult {
        self.record(format!("delete_task:{}", id))?;
        Ok(json!({ "task_id": id, "deleted": true }))
    }

    async fn list_tasks(&self, limit: u32) -> CrmResult {
        self.record(format!("list_tasks:{}", limit))?;
        Ok(json!({ "results": [] }))
    }
}
