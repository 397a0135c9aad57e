//! CRM adapter
//!
//! `CrmAdapter` is the capability set the agents need from a CRM. Every
//! operation yields a JSON payload or a `CrmError`; tools turn the error into
//! the `{"error": ...}` object the model sees, so a failing CRM call never
//! aborts an agent turn.

mod hubspot;
mod types;

pub use hubspot::{HubspotClient, DEFAULT_BASE_URL};
pub use types::*;

use crate::error::CrmError;
use async_trait::async_trait;
use serde_json::{json, Value};

pub type CrmResult = Result<Value, CrmError>;

#[async_trait]
pub trait CrmAdapter: Send + Sync {
    /// Names of up to 100 companies
    async fn get_company_list(&self) -> CrmResult;
    async fn get_company_by_name(&self, name: &str) -> CrmResult;
    async fn get_contacts_for_company(&self, name: &str) -> CrmResult;
    async fn get_deals_for_company(&self, name: &str) -> CrmResult;

    async fn list_campaigns(&self, limit: u32) -> CrmResult;
    async fn get_campaign(&self, id: &str) -> CrmResult;
    async fn list_campaigns_by_status(&self, status: &str) -> CrmResult;
    /// Case-insensitive substring match on the campaign name
    async fn list_campaigns_by_name(&self, substring: &str) -> CrmResult;
    async fn activate_campaign(&self, id: &str) -> CrmResult;
    async fn deactivate_campaign(&self, id: &str) -> CrmResult;
    async fn campaign_analytics(&self, id: &str) -> CrmResult;
    async fn create_campaign(&self, fields: &NewCampaign) -> CrmResult;

    async fn create_task(&self, fields: &NewTask) -> CrmResult;
    async fn update_task(&self, id: &str, fields: &TaskUpdate) -> CrmResult;
    async fn delete_task(&self, id: &str) -> CrmResult;
    async fn list_tasks(&self, limit: u32) -> CrmResult;
}

/// Collapse a result into the payload shape tools return
pub fn into_payload(result: CrmResult) -> Value {
    match result {
        Ok(value) => value,
        Err(e) => json!({ "error": e.to_string() }),
    }
}

/// Fetch campaigns for analysis. Adapter failures and empty lists both yield none.
pub async fn fetch_campaign_records(crm: &dyn CrmAdapter, limit: u32) -> Vec<CampaignRecord> {
    match crm.list_campaigns(limit).await {
        Ok(response) => CampaignRecord::from_list(&response),
        Err(e) => {
            tracing::warn!(error = %e, "could not fetch campaigns");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_become_payloads() {
        let payload = into_payload(Err(CrmError::NotFound("No deals found for company: Acme".into())));
        assert_eq!(payload, json!({"error": "No deals found for company: Acme"}));
        assert_eq!(into_payload(Ok(json!({"ok": 1}))), json!({"ok": 1}));
    }
}
