//! Company, contact and deal lookups

use crate::crm::{into_payload, CrmAdapter};
use crate::tool::{parse_args, Tool, ToolContext, ToolDefinition, ToolOutput};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CompanyArgs {
    /// Name of the customer company for which information is required
    pub company_name: String,
}

pub struct GetCompaniesTool {
    crm: Arc<dyn CrmAdapter>,
}

impl GetCompaniesTool {
    pub fn new(crm: Arc<dyn CrmAdapter>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for GetCompaniesTool {
    fn name(&self) -> &str {
        "get-companies-tool"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::without_arguments(
            self.name(),
            "Get a list of all company names available in the CRM",
        )
    }

    async fn execute(&self, _args: Value, _ctx: &ToolContext) -> ToolOutput {
        ToolOutput::from_payload(into_payload(self.crm.get_company_list().await))
    }
}

pub struct GetCompanyDetailsTool {
    crm: Arc<dyn CrmAdapter>,
}

impl GetCompanyDetailsTool {
    pub fn new(crm: Arc<dyn CrmAdapter>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for GetCompanyDetailsTool {
    fn name(&self) -> &str {
        "get-company-details-tool"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::from_schema::<CompanyArgs>(
            self.name(),
            "Get detailed information about a specific company by name",
        )
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> ToolOutput {
        let args: CompanyArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };
        ToolOutput::from_payload(into_payload(
            self.crm.get_company_by_name(&args.company_name).await,
        ))
    }
}

pub struct GetContactsByCompanyTool {
    crm: Arc<dyn CrmAdapter>,
}

impl GetContactsByCompanyTool {
    pub fn new(crm: Arc<dyn CrmAdapter>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for GetContactsByCompanyTool {
    fn name(&self) -> &str {
        "get-contacts-by-company-tool"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::from_schema::<CompanyArgs>(
            self.name(),
            "Get contacts associated with a specific company",
        )
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> ToolOutput {
        let args: CompanyArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };
        ToolOutput::from_payload(into_payload(
            self.crm.get_contacts_for_company(&args.company_name).await,
        ))
    }
}

pub struct GetDealsByCompanyTool {
    crm: Arc<dyn CrmAdapter>,
}

impl GetDealsByCompanyTool {
    pub fn new(crm: Arc<dyn CrmAdapter>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for GetDealsByCompanyTool {
    fn name(&self) -> &str {
        "get-deals-by-company-tool"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::from_schema::<CompanyArgs>(
            self.name(),
            "Get deals associated with a specific company",
        )
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> ToolOutput {
        let args: CompanyArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };
        ToolOutput::from_payload(into_payload(
            self.crm.get_deals_for_company(&args.company_name).await,
        ))
    }
}
