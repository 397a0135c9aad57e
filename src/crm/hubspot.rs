//! HubSpot REST client
//!
//! Campaign status and name filters run client-side over the first 100
//! campaigns, since the marketing API has no search endpoint for them.

use super::types::{campaign_status, field, spend_percentage, NewCampaign, NewTask, TaskUpdate};
use super::{CrmAdapter, CrmResult};
use crate::error::CrmError;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};

pub const DEFAULT_BASE_URL: &str = "https://api.hubapi.com";

const COMPANY_PROPERTIES: &str = "name,domain,industry,phone,city,state,country,description";
const CONTACT_PROPERTIES: &str = "email,firstname,lastname,jobtitle,company,phone";
const DEAL_PROPERTIES: &str = "dealname,dealstage,amount,closedate,pipeline";
const TASK_PROPERTIES: &str =
    "hs_task_subject,hs_task_body,hs_task_status,hs_task_priority,hs_timestamp,hs_created_by_user_id";
const CAMPAIGN_LIST_PROPERTIES: &str = "hs_name,hs_campaign_status,hs_start_date,hs_end_date,hs_goal,hs_audience,hs_notes,hs_budget_items_sum_amount,hs_spend_items_sum_amount";
const CAMPAIGN_DETAIL_PROPERTIES: &str = "hs_name,hs_campaign_status,hs_start_date,hs_end_date,hs_goal,hs_audience,hs_notes,hs_owner,hs_budget_items_sum_amount,hs_spend_items_sum_amount,hs_color_hex,hs_currency_code,hs_created_by_user_id,hs_object_id";

/// Association type id for task → company
const TASK_TO_COMPANY: u32 = 214;

#[derive(Clone)]
pub struct HubspotClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HubspotClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Build from the API key stored in `api_key_env`
    pub fn from_env(api_key_env: &str, base_url: &str) -> Result<Self, CrmError> {
        let _ = dotenvy::dotenv();
        let key = std::env::var(api_key_env)
            .map_err(|_| CrmError::MissingApiKey(api_key_env.to_string()))?;
        Ok(Self::with_base_url(key, base_url))
    }

    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> CrmResult {
        let url = format!("{}/{}", self.base_url, endpoint);
        tracing::debug!(method = %method, url = %url, "hubspot request");

        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(&self.api_key)
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), url = %url, "hubspot request failed");
            return Err(CrmError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(json!({}));
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> CrmResult {
        self.request(Method::GET, endpoint, query, None).await
    }

    async fn send(&self, method: Method, endpoint: &str, body: &Value) -> CrmResult {
        self.request(method, endpoint, &[], Some(body)).await
    }

    async fn companies(&self, limit: u32) -> CrmResult {
        self.get(
            "crm/v3/objects/companies",
            &[("limit", limit.to_string()), ("properties", COMPANY_PROPERTIES.into())],
        )
        .await
    }

    /// Id of the first company whose name matches exactly
    async fn company_id(&self, name: &str) -> Result<Option<String>, CrmError> {
        let found = self.get_company_by_name(name).await?;
        Ok(found
            .get("results")
            .and_then(Value::as_array)
            .and_then(|results| results.first())
            .and_then(|company| company.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Fetch every object of `kind` associated with a company
    async fn associated(
        &self,
        company_id: &str,
        kind: &str,
        properties: &str,
    ) -> Result<Vec<Value>, CrmError> {
        let endpoint = format!("crm/v3/objects/companies/{}/associations/{}", company_id, kind);
        let associations = self.get(&endpoint, &[]).await?;

        let ids: Vec<String> = associations
            .get("results")
            .and_then(Value::as_array)
            .map(|results| {
                results
                    .iter()
                    .filter_map(|a| a.get("id").and_then(value_as_id))
                    .collect()
            })
            .unwrap_or_default();

        let mut objects = Vec::with_capacity(ids.len());
        for id in ids {
            let endpoint = format!("crm/v3/objects/{}/{}", kind, id);
            objects.push(self.get(&endpoint, &[("properties", properties.into())]).await?);
        }
        Ok(objects)
    }

    async fn filtered_campaigns(&self, keep: impl Fn(&Value) -> bool) -> CrmResult {
        let all = self.list_campaigns(100).await?;
        let results: Vec<Value> = all
            .get("results")
            .and_then(Value::as_array)
            .map(|results| {
                results
                    .iter()
                    .filter(|c| c.get("properties").is_some_and(&keep))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(json!({ "total": results.len(), "results": results }))
    }

    async fn update_campaign_status(&self, id: &str, status: &str) -> CrmResult {
        let endpoint = format!("marketing/v3/campaigns/{}", id);
        let body = json!({ "properties": { "hs_campaign_status": campaign_status(status) } });
        self.send(Method::PATCH, &endpoint, &body).await
    }

    /// Move a campaign to `target`, reporting a no-op when it is already there
    async fn set_campaign_state(&self, id: &str, target: &str, verb: &str) -> CrmResult {
        let campaign = self.get_campaign(id).await?;
        let Some(props) = campaign.get("properties") else {
            return Err(CrmError::NotFound("Unable to determine campaign status".into()));
        };
        let current = props
            .get("hs_campaign_status")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        if current == target {
            return Ok(json!({
                "message": format!("Campaign {} is already {}", id, target),
                "status": current,
                "campaign_id": id,
            }));
        }

        if let Err(e) = self.update_campaign_status(id, target).await {
            return Ok(json!({
                "message": format!("Could not {} campaign {}. {}", verb, id, e),
                "status": current,
                "campaign_id": id,
            }));
        }

        Ok(json!({
            "message": format!("Campaign {} has been {}", id, past_tense(verb, target)),
            "previous_status": current,
            "new_status": target,
            "campaign_id": id,
        }))
    }

    async fn associate_task_with_company(&self, task_id: &str, company_name: &str) -> Value {
        let company_id = match self.company_id(company_name).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                return json!({
                    "success": false,
                    "error": format!("Company '{}' not found", company_name),
                })
            }
            Err(e) => return json!({ "success": false, "error": e.to_string() }),
        };

        let endpoint = format!(
            "crm/v4/objects/tasks/{}/associations/companies/{}",
            task_id, company_id
        );
        let body = json!({
            "types": [{
                "associationCategory": "HUBSPOT_DEFINED",
                "associationTypeId": TASK_TO_COMPANY,
            }]
        });

        match self.send(Method::PUT, &endpoint, &body).await {
            Ok(_) => json!({ "success": true, "company_id": company_id }),
            Err(e) => {
                tracing::warn!(task_id, company = company_name, error = %e, "task association failed");
                json!({ "success": false, "error": e.to_string() })
            }
        }
    }
}

fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn past_tense(verb: &str, target: &str) -> String {
    match verb {
        "activate" => "activated".into(),
        _ => format!("deactivated ({})", target),
    }
}

#[async_trait]
impl CrmAdapter for HubspotClient {
    async fn get_company_list(&self) -> CrmResult {
        let data = self.companies(100).await?;
        let Some(results) = data.get("results").and_then(Value::as_array) else {
            return Err(CrmError::NotFound("Could not retrieve companies list".into()));
        };
        let names: Vec<&Value> = results
            .iter()
            .filter_map(|c| c.get("properties").and_then(|p| p.get("name")))
            .collect();
        Ok(json!({ "companies": names }))
    }

    async fn get_company_by_name(&self, name: &str) -> CrmResult {
        let body = json!({
            "filterGroups": [{
                "filters": [{ "propertyName": "name", "operator": "EQ", "value": name }]
            }],
            "properties": COMPANY_PROPERTIES.split(',').collect::<Vec<_>>(),
            "limit": 1
        });
        self.send(Method::POST, "crm/v3/objects/companies/search", &body)
            .await
    }

    async fn get_contacts_for_company(&self, name: &str) -> CrmResult {
        let not_found = || CrmError::NotFound(format!("No contacts found for company: {}", name));
        let company_id = self.company_id(name).await?.ok_or_else(not_found)?;
        let contacts = self
            .associated(&company_id, "contacts", CONTACT_PROPERTIES)
            .await?;
        if contacts.is_empty() {
            return Err(not_found());
        }

        let contacts: Vec<Value> = contacts
            .iter()
            .filter_map(|c| c.get("properties"))
            .map(|props| {
                let first = props.get("firstname").and_then(Value::as_str).unwrap_or("");
                let last = props.get("lastname").and_then(Value::as_str).unwrap_or("");
                json!({
                    "name": format!("{} {}", first, last).trim(),
                    "email": field(props, "email"),
                    "job_title": field(props, "jobtitle"),
                    "phone": field(props, "phone"),
                })
            })
            .collect();

        Ok(json!({ "company": name, "contacts": contacts }))
    }

    async fn get_deals_for_company(&self, name: &str) -> CrmResult {
        let not_found = || CrmError::NotFound(format!("No deals found for company: {}", name));
        let company_id = self.company_id(name).await?.ok_or_else(not_found)?;
        let deals = self.associated(&company_id, "deals", DEAL_PROPERTIES).await?;
        if deals.is_empty() {
            return Err(not_found());
        }

        let text = |props: &Value, key: &str, default: &str| {
            props
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };
        let deals: Vec<Value> = deals
            .iter()
            .filter_map(|d| d.get("properties"))
            .map(|props| {
                json!({
                    "name": text(props, "dealname", "Unnamed Deal"),
                    "stage": text(props, "dealstage", "Unknown"),
                    "amount": text(props, "amount", "0"),
                    "close_date": text(props, "closedate", "N/A"),
                })
            })
            .collect();

        Ok(json!({ "company_name": name, "deals": deals }))
    }

    async fn list_campaigns(&self, limit: u32) -> CrmResult {
        let endpoint = "marketing/v3/campaigns";
        let with_properties = [
            ("limit", limit.to_string()),
            ("properties", CAMPAIGN_LIST_PROPERTIES.to_string()),
        ];
        match self.get(endpoint, &with_properties).await {
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::warn!(error = %e, "campaign list with properties failed, retrying without");
                self.get(endpoint, &[("limit", limit.to_string())]).await
            }
        }
    }

    async fn get_campaign(&self, id: &str) -> CrmResult {
        let endpoint = format!("marketing/v3/campaigns/{}", id);
        self.get(&endpoint, &[("properties", CAMPAIGN_DETAIL_PROPERTIES.into())])
            .await
    }

    async fn list_campaigns_by_status(&self, status: &str) -> CrmResult {
        let wanted = campaign_status(status);
        self.filtered_campaigns(|props| {
            props
                .get("hs_campaign_status")
                .and_then(Value::as_str)
                .is_some_and(|s| s.eq_ignore_ascii_case(&wanted))
        })
        .await
    }

    async fn list_campaigns_by_name(&self, substring: &str) -> CrmResult {
        let needle = substring.to_lowercase();
        self.filtered_campaigns(|props| {
            props
                .get("hs_name")
                .and_then(Value::as_str)
                .is_some_and(|name| name.to_lowercase().contains(&needle))
        })
        .await
    }

    async fn activate_campaign(&self, id: &str) -> CrmResult {
        self.set_campaign_state(id, "active", "activate").await
    }

    async fn deactivate_campaign(&self, id: &str) -> CrmResult {
        self.set_campaign_state(id, "paused", "deactivate").await
    }

    async fn campaign_analytics(&self, id: &str) -> CrmResult {
        let campaign = self.get_campaign(id).await?;
        let Some(props) = campaign.get("properties") else {
            return Err(CrmError::NotFound("Unable to retrieve campaign analytics".into()));
        };

        let analytics = json!({
            "campaign_id": id,
            "name": field(props, "hs_name"),
            "status": field(props, "hs_campaign_status"),
            "budget": field(props, "hs_budget_items_sum_amount"),
            "spend": field(props, "hs_spend_items_sum_amount"),
            "start_date": field(props, "hs_start_date"),
            "end_date": field(props, "hs_end_date"),
            "goal": field(props, "hs_goal"),
            "audience": field(props, "hs_audience"),
            "currency": field(props, "hs_currency_code"),
            "spend_percentage": spend_percentage(
                props.get("hs_budget_items_sum_amount"),
                props.get("hs_spend_items_sum_amount"),
            ),
        });

        Ok(json!({
            "analytics": analytics,
            "message": "Campaign analytics retrieved successfully",
        }))
    }

    async fn create_campaign(&self, fields: &NewCampaign) -> CrmResult {
        if fields.name.trim().is_empty() {
            return Err(CrmError::InvalidInput("Campaign name is required".into()));
        }
        let body = json!({ "properties": fields.to_properties() });
        let created = self
            .send(Method::POST, "marketing/v3/campaigns", &body)
            .await?;
        tracing::info!(id = ?created.get("id"), name = %fields.name, "campaign created");
        Ok(created)
    }

    async fn create_task(&self, fields: &NewTask) -> CrmResult {
        if fields.subject.trim().is_empty() {
            return Err(CrmError::InvalidInput("Task subject is required".into()));
        }
        let body = json!({ "properties": fields.to_properties() });
        let mut created = self.send(Method::POST, "crm/v3/objects/tasks", &body).await?;

        let task_id = created.get("id").and_then(value_as_id);
        if let (Some(task_id), Some(company)) = (task_id, fields.company_name.as_deref()) {
            let association = self.associate_task_with_company(&task_id, company).await;
            if let Value::Object(map) = &mut created {
                map.insert("company_association".into(), association);
            }
        }

        tracing::info!(id = ?created.get("id"), "task created");
        Ok(created)
    }

    async fn update_task(&self, id: &str, fields: &TaskUpdate) -> CrmResult {
        if fields.is_empty() {
            return Err(CrmError::InvalidInput("No task fields to update".into()));
        }
        let endpoint = format!("crm/v3/objects/tasks/{}", id);
        let body = json!({ "properties": fields.to_properties() });
        self.send(Method::PATCH, &endpoint, &body).await
    }

    async fn delete_task(&self, id: &str) -> CrmResult {
        let endpoint = format!("crm/v3/objects/tasks/{}", id);
        self.request(Method::DELETE, &endpoint, &[], None).await?;
        tracing::info!(task_id = id, "task deleted");
        Ok(json!({ "task_id": id, "deleted": true }))
    }

    async fn list_tasks(&self, limit: u32) -> CrmResult {
        self.get(
            "crm/v3/objects/tasks",
            &[("limit", limit.to_string()), ("properties", TASK_PROPERTIES.into())],
        )
        .await
    }
}
