//! Tool implementations for the CRM copilot
//!
//! CRM tools wrap a shared `CrmAdapter`; stage and routing tools are pure
//! text framing. Each group has a registry builder used by the agent specs.

mod campaigns;
mod companies;
mod routing;
mod stages;
mod tasks;

pub use campaigns::{
    ActivateCampaignTool, CreateCampaignTool, DeactivateCampaignTool, GetActiveCampaignsTool,
    GetAllCampaignsTool, GetCampaignAnalyticsTool, GetCampaignByIdTool, GetCampaignsByNameTool,
    GetCampaignsByStatusTool,
};
pub use companies::{
    GetCompaniesTool, GetCompanyDetailsTool, GetContactsByCompanyTool, GetDealsByCompanyTool,
};
pub use routing::{RouteToAgentTool, ROUTE_TOOL};
pub use stages::{StageTool, ANALYZE_TOOL, ENGAGE_TOOL, OPTIMIZE_TOOL};
pub use tasks::{CreateTaskTool, DeleteTaskTool, GetTasksTool, UpdateTaskTool};

use crate::crm::CrmAdapter;
use crate::tool::ToolRegistry;
use std::sync::Arc;

/// Every CRM lookup and mutation tool
pub fn crm_tools(crm: Arc<dyn CrmAdapter>) -> ToolRegistry {
    ToolRegistry::new()
        .with(GetCompaniesTool::new(crm.clone()))
        .with(GetCompanyDetailsTool::new(crm.clone()))
        .with(GetContactsByCompanyTool::new(crm.clone()))
        .with(GetDealsByCompanyTool::new(crm.clone()))
        .with(GetAllCampaignsTool::new(crm.clone()))
        .with(GetActiveCampaignsTool::new(crm.clone()))
        .with(GetCampaignsByStatusTool::new(crm.clone()))
        .with(GetCampaignByIdTool::new(crm.clone()))
        .with(GetCampaignsByNameTool::new(crm.clone()))
        .with(ActivateCampaignTool::new(crm.clone()))
        .with(DeactivateCampaignTool::new(crm.clone()))
        .with(GetCampaignAnalyticsTool::new(crm.clone()))
        .with(CreateCampaignTool::new(crm.clone()))
        .with(CreateTaskTool::new(crm.clone()))
        .with(UpdateTaskTool::new(crm.clone()))
        .with(DeleteTaskTool::new(crm.clone()))
        .with(GetTasksTool::new(crm))
}

pub fn routing_tools() -> ToolRegistry {
    ToolRegistry::new().with(RouteToAgentTool)
}
