//! Task management tools

use crate::crm::{into_payload, CrmAdapter, NewTask, TaskUpdate};
use crate::tool::{parse_args, Tool, ToolContext, ToolDefinition, ToolOutput};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateTaskArgs {
    /// ID of the task to update
    pub task_id: String,
    #[serde(flatten)]
    pub fields: TaskUpdate,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TaskIdArgs {
    /// ID of the task
    pub task_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListTasksArgs {
    /// Maximum number of tasks to return (default 10)
    #[serde(default = "default_task_limit")]
    pub limit: u32,
}

fn default_task_limit() -> u32 {
    10
}

pub struct CreateTaskTool {
    crm: Arc<dyn CrmAdapter>,
}

impl CreateTaskTool {
    pub fn new(crm: Arc<dyn CrmAdapter>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for CreateTaskTool {
    fn name(&self) -> &str {
        "create-task-tool"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::from_schema::<NewTask>(
            self.name(),
            "Create a new task in HubSpot, optionally associated with a company",
        )
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> ToolOutput {
        let fields: NewTask = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };
        match self.crm.create_task(&fields).await {
            Ok(task) => ToolOutput::success(json!({
                "success": true,
                "task_id": task.get("id").cloned().unwrap_or(Value::Null),
                "message": format!("Task '{}' created successfully", fields.subject),
                "task": task,
            })),
            Err(e) => ToolOutput::error(format!("Failed to create task: {}", e)),
        }
    }
}

pub struct UpdateTaskTool {
    crm: Arc<dyn CrmAdapter>,
}

impl UpdateTaskTool {
    pub fn new(crm: Arc<dyn CrmAdapter>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for UpdateTaskTool {
    fn name(&self) -> &str {
        "update-task-tool"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::from_schema::<UpdateTaskArgs>(
            self.name(),
            "Update the subject, description, status or priority of an existing task",
        )
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> ToolOutput {
        let args: UpdateTaskArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };
        if args.fields.is_empty() {
            return ToolOutput::error("No fields to update");
        }
        ToolOutput::from_payload(into_payload(
            self.crm.update_task(&args.task_id, &args.fields).await,
        ))
    }
}

pub struct DeleteTaskTool {
    crm: Arc<dyn CrmAdapter>,
}

impl DeleteTaskTool {
    pub fn new(crm: Arc<dyn CrmAdapter>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for DeleteTaskTool {
    fn name(&self) -> &str {
        "delete-task-tool"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::from_schema::<TaskIdArgs>(self.name(), "Delete a task by ID")
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> ToolOutput {
        let args: TaskIdArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };
        ToolOutput::from_payload(into_payload(self.crm.delete_task(&args.task_id).await))
    }
}

pub struct GetTasksTool {
    crm: Arc<dyn CrmAdapter>,
}

impl GetTasksTool {
    pub fn new(crm: Arc<dyn CrmAdapter>) -> Self {
        Self { crm }
    }
}

#[async_trait]
impl Tool for GetTasksTool {
    fn name(&self) -> &str {
        "get-tasks-tool"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::from_schema::<ListTasksArgs>(
            self.name(),
            "List tasks with subject, description, status, priority and due date",
        )
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> ToolOutput {
        // models often send null for an optional object
        let args = if args.is_null() { json!({}) } else { args };
        let args: ListTasksArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };
        ToolOutput::from_payload(into_payload(self.crm.list_tasks(args.limit).await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticCrm;

    #[tokio::test]
    async fn test_create_task_defaults() {
        let crm = Arc::new(StaticCrm::sample());
        let tool = CreateTaskTool::new(crm.clone());
        let out = tool
            .execute(json!({"subject": "Call Acme"}), &ToolContext::default())
            .await;

        assert!(!out.is_error);
        assert_eq!(out.content["task_id"], "task-1");
        assert_eq!(out.content["task"]["properties"]["hs_task_status"], "NOT_STARTED");
        assert_eq!(out.content["task"]["properties"]["hs_task_priority"], "MEDIUM");
        assert_eq!(crm.calls(), vec!["create_task:Call Acme"]);
    }

    #[tokio::test]
    async fn test_update_flattens_fields() {
        let crm = Arc::new(StaticCrm::sample());
        let tool = UpdateTaskTool::new(crm.clone());
        let out = tool
            .execute(
                json!({"task_id": "42", "status": "completed"}),
                &ToolContext::default(),
            )
            .await;
        assert_eq!(out.content["properties"]["hs_task_status"], "COMPLETED");
        assert_eq!(crm.calls(), vec!["update_task:42"]);
    }

    #[tokio::test]
    async fn test_update_without_fields_is_rejected() {
        let crm = Arc::new(StaticCrm::sample());
        let tool = UpdateTaskTool::new(crm.clone());
        let out = tool
            .execute(json!({"task_id": "42"}), &ToolContext::default())
            .await;
        assert!(out.is_error);
        assert!(crm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_list_tasks_default_limit() {
        let crm = Arc::new(StaticCrm::sample());
        let tool = GetTasksTool::new(crm.clone());
        tool.execute(Value::Null, &ToolContext::default()).await;
        assert_eq!(crm.calls(), vec!["list_tasks:10"]);
    }

    #[tokio::test]
    async fn test_delete_failure_is_payload() {
        let tool = DeleteTaskTool::new(Arc::new(StaticCrm::failing()));
        let out = tool
            .execute(json!({"task_id": "7"}), &ToolContext::default())
            .await;
        assert!(out.is_error);
        assert_eq!(
            out.content["error"],
            "HubSpot API returned 503: service unavailable"
        );
    }
}
