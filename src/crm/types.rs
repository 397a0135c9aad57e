//! HubSpot record shapes and vocabulary mapping

use chrono::{Duration, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Placeholder for any property HubSpot did not return
pub const MISSING: &str = "N/A";

/// Flattened campaign, as handed to the analysis agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRecord {
    pub id: String,
    pub name: String,
    pub goal: String,
    pub status: String,
    pub start_date: String,
    pub end_date: String,
    pub audience: String,
    pub notes: String,
    pub budget: String,
    pub spend: String,
}

impl CampaignRecord {
    /// Build from a `marketing/v3/campaigns` result object
    pub fn from_hubspot(campaign: &Value) -> Self {
        let props = campaign.get("properties").unwrap_or(&Value::Null);
        Self {
            id: field(campaign, "id"),
            name: field(props, "hs_name"),
            goal: field(props, "hs_goal"),
            status: field(props, "hs_campaign_status"),
            start_date: field(props, "hs_start_date"),
            end_date: field(props, "hs_end_date"),
            audience: field(props, "hs_audience"),
            notes: field(props, "hs_notes"),
            budget: field(props, "hs_budget_items_sum_amount"),
            spend: field(props, "hs_spend_items_sum_amount"),
        }
    }

    /// Every campaign in a list response; a missing `results` key yields none
    pub fn from_list(response: &Value) -> Vec<Self> {
        response
            .get("results")
            .and_then(Value::as_array)
            .map(|results| results.iter().map(Self::from_hubspot).collect())
            .unwrap_or_default()
    }
}

/// String value of `key`, or "N/A" when absent, null or empty
pub fn field(object: &Value, key: &str) -> String {
    match object.get(key) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Null) | None => MISSING.to_string(),
        Some(Value::String(_)) => MISSING.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Fields for a new campaign
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NewCampaign {
    /// Name of the campaign
    pub name: String,
    /// Status of the campaign (ACTIVE, INACTIVE, PAUSED, COMPLETED, IN_PROGRESS, PLANNED)
    #[serde(default)]
    pub status: Option<String>,
    /// Campaign start date in YYYY-MM-DD format
    #[serde(default)]
    pub start_date: Option<String>,
    /// Campaign end date in YYYY-MM-DD format
    #[serde(default)]
    pub end_date: Option<String>,
    /// Campaign goal description
    #[serde(default)]
    pub goal: Option<String>,
    /// Target audience description
    #[serde(default)]
    pub audience: Option<String>,
    /// Campaign notes or description
    #[serde(default)]
    pub notes: Option<String>,
    /// Currency code (USD, EUR, GBP, etc.)
    #[serde(default)]
    pub currency_code: Option<String>,
}

impl NewCampaign {
    /// HubSpot `properties` object for the create call
    pub fn to_properties(&self) -> Value {
        let mut props = serde_json::Map::new();
        props.insert("hs_name".into(), json!(self.name));

        if let Some(status) = non_empty(&self.status) {
            props.insert("hs_campaign_status".into(), json!(created_campaign_status(status)));
        }
        for (key, value) in [
            ("hs_goal", &self.goal),
            ("hs_audience", &self.audience),
            ("hs_notes", &self.notes),
        ] {
            if let Some(value) = non_empty(value) {
                props.insert(key.into(), json!(value));
            }
        }
        // dates are only forwarded in YYYY-MM-DD form
        for (key, value) in [("hs_start_date", &self.start_date), ("hs_end_date", &self.end_date)] {
            if let Some(date) = non_empty(value).filter(|d| is_iso_date(d)) {
                props.insert(key.into(), json!(date));
            }
        }

        Value::Object(props)
    }
}

/// Fields for a new task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NewTask {
    /// Task subject line
    pub subject: String,
    /// Task description
    #[serde(default)]
    pub body: Option<String>,
    /// NOT_STARTED, IN_PROGRESS, COMPLETED, WAITING or DEFERRED
    #[serde(default)]
    pub status: Option<String>,
    /// HIGH, MEDIUM or LOW
    #[serde(default)]
    pub priority: Option<String>,
    /// Due date in YYYY-MM-DD format (defaults to tomorrow)
    #[serde(default)]
    pub due_date: Option<String>,
    /// Company to associate the task with
    #[serde(default)]
    pub company_name: Option<String>,
}

impl NewTask {
    pub fn to_properties(&self) -> Value {
        let timestamp = match non_empty(&self.due_date) {
            Some(date) => match due_date_millis(date) {
                Some(millis) => json!(millis),
                None => json!(date),
            },
            None => json!((Utc::now() + Duration::days(1)).timestamp_millis()),
        };

        let mut props = serde_json::Map::new();
        props.insert("hs_task_subject".into(), json!(self.subject));
        props.insert("hs_timestamp".into(), timestamp);
        if let Some(body) = non_empty(&self.body) {
            props.insert("hs_task_body".into(), json!(body));
        }
        props.insert(
            "hs_task_status".into(),
            json!(non_empty(&self.status).map_or("NOT_STARTED", created_task_status)),
        );
        props.insert(
            "hs_task_priority".into(),
            json!(non_empty(&self.priority).map_or("MEDIUM", created_task_priority)),
        );
        Value::Object(props)
    }
}

/// Fields to change on an existing task; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TaskUpdate {
    /// New subject line
    #[serde(default)]
    pub subject: Option<String>,
    /// New description
    #[serde(default)]
    pub body: Option<String>,
    /// NOT_STARTED, IN_PROGRESS or COMPLETED
    #[serde(default)]
    pub status: Option<String>,
    /// HIGH, MEDIUM or LOW
    #[serde(default)]
    pub priority: Option<String>,
}

impl TaskUpdate {
    pub fn to_properties(&self) -> Value {
        let mut props = serde_json::Map::new();
        if let Some(subject) = &self.subject {
            props.insert("hs_task_subject".into(), json!(subject));
        }
        if let Some(body) = &self.body {
            props.insert("hs_task_body".into(), json!(body));
        }
        if let Some(status) = &self.status {
            let upper = status.to_uppercase();
            let mapped = match upper.as_str() {
                "NOT_STARTED" | "IN_PROGRESS" | "COMPLETED" => upper,
                _ => status.clone(),
            };
            props.insert("hs_task_status".into(), json!(mapped));
        }
        if let Some(priority) = &self.priority {
            let upper = priority.to_uppercase();
            let mapped = match upper.as_str() {
                "HIGH" | "MEDIUM" | "LOW" => upper,
                _ => priority.clone(),
            };
            props.insert("hs_task_priority".into(), json!(mapped));
        }
        Value::Object(props)
    }

    pub fn is_empty(&self) -> bool {
        self.subject.is_none() && self.body.is_none() && self.status.is_none() && self.priority.is_none()
    }
}

/// Map a user-facing campaign status onto HubSpot's vocabulary.
/// Unknown values pass through lowercased.
pub fn campaign_status(status: &str) -> String {
    match status.to_uppercase().as_str() {
        "ACTIVE" => "active".into(),
        "INACTIVE" | "PLANNED" => "planned".into(),
        "PAUSED" => "paused".into(),
        "COMPLETED" => "completed".into(),
        "IN_PROGRESS" => "in_progress".into(),
        _ => status.to_lowercase(),
    }
}

/// Status for a newly created campaign; unknown values become `planned`
fn created_campaign_status(status: &str) -> &'static str {
    match status.to_uppercase().as_str() {
        "ACTIVE" => "active",
        "PAUSED" => "paused",
        "COMPLETED" => "completed",
        "IN_PROGRESS" => "in_progress",
        _ => "planned",
    }
}

fn created_task_status(status: &str) -> &'static str {
    match status.to_uppercase().as_str() {
        "IN_PROGRESS" => "IN_PROGRESS",
        "COMPLETED" => "COMPLETED",
        "WAITING" => "WAITING",
        "DEFERRED" => "DEFERRED",
        _ => "NOT_STARTED",
    }
}

fn created_task_priority(priority: &str) -> &'static str {
    match priority.to_uppercase().as_str() {
        "HIGH" => "HIGH",
        "LOW" => "LOW",
        _ => "MEDIUM",
    }
}

/// Epoch millis for midnight (UTC) of a `YYYY-MM-DD` date
pub fn due_date_millis(date: &str) -> Option<i64> {
    if !is_iso_date(date) {
        return None;
    }
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(day.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
}

fn is_iso_date(date: &str) -> bool {
    date.len() == 10 && date.matches('-').count() == 2
}

/// `round(spend / budget * 100, 2)`; 0 when the budget is not positive,
/// "N/A" when either amount does not parse. Missing amounts count as 0.
pub fn spend_percentage(budget: Option<&Value>, spend: Option<&Value>) -> Value {
    let (Some(budget), Some(spend)) = (amount(budget), amount(spend)) else {
        return json!(MISSING);
    };
    if budget > 0.0 {
        json!(((spend / budget) * 100.0 * 100.0).round() / 100.0)
    } else {
        json!(0)
    }
}

fn amount(value: Option<&Value>) -> Option<f64> {
    match value {
        None | Some(Value::Null) => Some(0.0),
        Some(Value::String(s)) if s.trim().is_empty() => Some(0.0),
        Some(Value::String(s)) => s.trim().parse().ok(),
        Some(Value::Number(n)) => n.as_f64(),
        Some(_) => None,
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_campaign_record_defaults_to_na() {
        let record = CampaignRecord::from_hubspot(&json!({
            "id": "123",
            "properties": {"hs_name": "Spring Launch", "hs_goal": null, "hs_notes": ""}
        }));
        assert_eq!(record.id, "123");
        assert_eq!(record.name, "Spring Launch");
        assert_eq!(record.goal, "N/A");
        assert_eq!(record.notes, "N/A");
        assert_eq!(record.budget, "N/A");

        let bare = CampaignRecord::from_hubspot(&json!({}));
        assert_eq!(bare.id, "N/A");
        assert_eq!(bare.status, "N/A");
    }

    #[test]
    fn test_from_list_without_results() {
        assert!(CampaignRecord::from_list(&json!({"total": 0})).is_empty());
        assert_eq!(
            CampaignRecord::from_list(&json!({"results": [{"id": "1"}, {"id": "2"}]})).len(),
            2
        );
    }

    #[test]
    fn test_campaign_status_mapping() {
        assert_eq!(campaign_status("ACTIVE"), "active");
        assert_eq!(campaign_status("inactive"), "planned");
        assert_eq!(campaign_status("Paused"), "paused");
        assert_eq!(campaign_status("IN_PROGRESS"), "in_progress");
        assert_eq!(campaign_status("Archived"), "archived");
    }

    #[test]
    fn test_spend_percentage() {
        assert_eq!(spend_percentage(Some(&json!("1000")), Some(&json!("890"))), json!(89.0));
        assert_eq!(spend_percentage(Some(&json!("300")), Some(&json!("100"))), json!(33.33));
        assert_eq!(spend_percentage(Some(&json!("0")), Some(&json!("50"))), json!(0));
        assert_eq!(spend_percentage(None, Some(&json!("50"))), json!(0));
        assert_eq!(spend_percentage(Some(&json!("lots")), Some(&json!("5"))), json!("N/A"));
    }

    #[test]
    fn test_due_date_conversion() {
        assert_eq!(due_date_millis("2024-01-02"), Some(1_704_153_600_000));
        assert_eq!(due_date_millis("tomorrow"), None);
        assert_eq!(due_date_millis("2024-13-40"), None);
    }

    #[test]
    fn test_new_task_defaults() {
        let props = NewTask {
            subject: "Call Acme".into(),
            ..Default::default()
        }
        .to_properties();

        assert_eq!(props["hs_task_status"], "NOT_STARTED");
        assert_eq!(props["hs_task_priority"], "MEDIUM");
        let due = props["hs_timestamp"].as_i64().unwrap();
        assert!(due > Utc::now().timestamp_millis());
        assert!(props.get("hs_task_body").is_none());
    }

    #[test]
    fn test_new_task_mapping() {
        let props = NewTask {
            subject: "Call Acme".into(),
            status: Some("completed".into()),
            priority: Some("urgent".into()),
            due_date: Some("2024-01-02".into()),
            ..Default::default()
        }
        .to_properties();

        assert_eq!(props["hs_task_status"], "COMPLETED");
        assert_eq!(props["hs_task_priority"], "MEDIUM");
        assert_eq!(props["hs_timestamp"], 1_704_153_600_000i64);
    }

    #[test]
    fn test_task_update_passes_unknown_values_through() {
        let props = TaskUpdate {
            status: Some("in_progress".into()),
            priority: Some("Someday".into()),
            ..Default::default()
        }
        .to_properties();
        assert_eq!(props, json!({"hs_task_status": "IN_PROGRESS", "hs_task_priority": "Someday"}));
    }

    #[test]
    fn test_new_campaign_properties() {
        let props = NewCampaign {
            name: "Summer".into(),
            status: Some("INACTIVE".into()),
            start_date: Some("2024-06-01".into()),
            end_date: Some("June 30".into()),
            goal: Some("".into()),
            ..Default::default()
        }
        .to_properties();

        assert_eq!(
            props,
            json!({
                "hs_name": "Summer",
                "hs_campaign_status": "planned",
                "hs_start_date": "2024-06-01"
            })
        );
    }
}
