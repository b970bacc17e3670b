use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::operation::get_item::builders::GetItemFluentBuilder;
use aws_sdk_dynamodb::operation::query::builders::QueryFluentBuilder;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client as DynamoClient;
use chrono::{DateTime, Utc};

use super::model::{NewTask, Task, TaskPatch, TaskStatus};
use crate::error::TaskError;

/// Persistence gateway for task records. Every operation is scoped to an
/// owner; a record owned by someone else behaves exactly like a missing one.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create(&self, owner_id: &str, new: NewTask) -> Result<Task, TaskError>;

    /// All tasks owned by `owner_id`, in no particular order.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Task>, TaskError>;

    async fn get(&self, owner_id: &str, task_id: &str) -> Result<Task, TaskError>;

    async fn update(
        &self,
        owner_id: &str,
        task_id: &str,
        patch: TaskPatch,
    ) -> Result<Task, TaskError>;

    async fn delete(&self, owner_id: &str, task_id: &str) -> Result<(), TaskError>;
}

/// How task items are keyed in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableLayout {
    /// `PK=USER#<owner>`, `SK=TASK#<id>`. Listing is a partition query.
    PerOwner,
    /// `PK=SK=TASK#<id>`. Listing goes through a GSI keyed on `owner_id`.
    Flat { owner_index: String },
}

impl TableLayout {
    fn key(&self, owner_id: &str, task_id: &str) -> (String, String) {
        let sk = format!("TASK#{}", task_id);
        match self {
            TableLayout::PerOwner => (format!("USER#{}", owner_id), sk),
            TableLayout::Flat { .. } => (sk.clone(), sk),
        }
    }
}

const OWNED_BY: &str = "attribute_exists(PK) AND owner_id = :owner";

pub struct DynamoTaskStore {
    client: DynamoClient,
    table_name: String,
    layout: TableLayout,
}

impl DynamoTaskStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>, layout: TableLayout) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            layout,
        }
    }

    /// One page of the owner's tasks. Strongly consistent except through the
    /// owner index, since GSIs only serve eventually consistent reads.
    fn owner_query(&self, owner_id: &str) -> QueryFluentBuilder {
        let query = self.client.query().table_name(&self.table_name);
        match &self.layout {
            TableLayout::PerOwner => query
                .consistent_read(true)
                .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
                .expression_attribute_values(":pk", AttributeValue::S(format!("USER#{}", owner_id)))
                .expression_attribute_values(":sk_prefix", AttributeValue::S("TASK#".to_string())),
            TableLayout::Flat { owner_index } => query
                .index_name(owner_index)
                .key_condition_expression("owner_id = :owner")
                .expression_attribute_values(":owner", AttributeValue::S(owner_id.to_string())),
        }
    }

    fn get_request(&self, owner_id: &str, task_id: &str) -> GetItemFluentBuilder {
        let (pk, sk) = self.layout.key(owner_id, task_id);
        self.client
            .get_item()
            .table_name(&self.table_name)
            .consistent_read(true)
            .key("PK", AttributeValue::S(pk))
            .key("SK", AttributeValue::S(sk))
    }
}

#[async_trait]
impl TaskStore for DynamoTaskStore {
    async fn create(&self, owner_id: &str, new: NewTask) -> Result<Task, TaskError> {
        let task = Task::from_new(uuid::Uuid::new_v4().to_string(), owner_id, Utc::now(), new);
        let (pk, sk) = self.layout.key(owner_id, &task.id);

        let mut builder = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item("PK", AttributeValue::S(pk))
            .item("SK", AttributeValue::S(sk))
            .item("task_id", AttributeValue::S(task.id.clone()))
            .item("owner_id", AttributeValue::S(owner_id.to_string()))
            .item("title", AttributeValue::S(task.title.clone()))
            .item("status", AttributeValue::S(task.status.as_str().to_string()))
            .item("created_at", AttributeValue::S(task.created_at.to_rfc3339()))
            .condition_expression("attribute_not_exists(PK)");

        if let Some(description) = &task.description {
            builder = builder.item("description", AttributeValue::S(description.clone()));
        }
        if let Some(due_date) = &task.due_date {
            builder = builder.item("due_date", AttributeValue::S(due_date.to_rfc3339()));
        }

        builder.send().await.map_err(|e| {
            tracing::error!("DynamoDB put_item error: {}", e);
            TaskError::StorageUnavailable(format!("DynamoDB put_item error: {}", e))
        })?;

        Ok(task)
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Task>, TaskError> {
        let mut tasks = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let result = self
                .owner_query(owner_id)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| {
                    tracing::error!("DynamoDB query error: {}", e);
                    TaskError::StorageUnavailable(format!("DynamoDB query error: {}", e))
                })?;

            tasks.extend(
                result
                    .items()
                    .iter()
                    .filter_map(task_from_item)
                    .filter(|task| task.owner_id == owner_id),
            );

            match result.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(tasks)
    }

    async fn get(&self, owner_id: &str, task_id: &str) -> Result<Task, TaskError> {
        let result = self
            .get_request(owner_id, task_id)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("DynamoDB get_item error: {}", e);
                TaskError::StorageUnavailable(format!("DynamoDB get_item error: {}", e))
            })?;

        result
            .item()
            .and_then(task_from_item)
            .filter(|task| task.owner_id == owner_id)
            .ok_or(TaskError::NotFound)
    }

    async fn update(
        &self,
        owner_id: &str,
        task_id: &str,
        patch: TaskPatch,
    ) -> Result<Task, TaskError> {
        if patch.is_empty() {
            return self.get(owner_id, task_id).await;
        }

        let (pk, sk) = self.layout.key(owner_id, task_id);

        let mut set_expr = vec![];
        let mut remove_expr = vec![];
        let mut expr_names = HashMap::new();
        let mut expr_values = HashMap::new();

        if let Some(title) = patch.title {
            set_expr.push("#title = :title");
            expr_names.insert("#title".to_string(), "title".to_string());
            expr_values.insert(":title".to_string(), AttributeValue::S(title));
        }

        match patch.description {
            Some(Some(description)) => {
                set_expr.push("#description = :description");
                expr_values.insert(":description".to_string(), AttributeValue::S(description));
                expr_names.insert("#description".to_string(), "description".to_string());
            }
            Some(None) => {
                remove_expr.push("#description");
                expr_names.insert("#description".to_string(), "description".to_string());
            }
            None => {}
        }

        // `status` is a DynamoDB reserved word
        if let Some(status) = patch.status {
            set_expr.push("#status = :status");
            expr_names.insert("#status".to_string(), "status".to_string());
            expr_values.insert(":status".to_string(), AttributeValue::S(status.as_str().to_string()));
        }

        match patch.due_date {
            Some(Some(due_date)) => {
                set_expr.push("#due_date = :due_date");
                expr_names.insert("#due_date".to_string(), "due_date".to_string());
                expr_values.insert(":due_date".to_string(), AttributeValue::S(due_date.to_rfc3339()));
            }
            Some(None) => {
                remove_expr.push("#due_date");
                expr_names.insert("#due_date".to_string(), "due_date".to_string());
            }
            None => {}
        }

        let mut update_expression = String::new();
        if !set_expr.is_empty() {
            update_expression.push_str(&format!("SET {}", set_expr.join(", ")));
        }
        if !remove_expr.is_empty() {
            if !update_expression.is_empty() {
                update_expression.push(' ');
            }
            update_expression.push_str(&format!("REMOVE {}", remove_expr.join(", ")));
        }

        expr_values.insert(":owner".to_string(), AttributeValue::S(owner_id.to_string()));

        let mut builder = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk))
            .key("SK", AttributeValue::S(sk))
            .update_expression(update_expression)
            .condition_expression(OWNED_BY)
            .return_values(ReturnValue::AllNew);

        for (k, v) in expr_names {
            builder = builder.expression_attribute_names(k, v);
        }

        for (k, v) in expr_values {
            builder = builder.expression_attribute_values(k, v);
        }

        let output = builder.send().await.map_err(|e| {
            let conditional = e
                .as_service_error()
                .map(|se| se.is_conditional_check_failed_exception())
                .unwrap_or(false);
            if conditional {
                return TaskError::NotFound;
            }
            tracing::error!("DynamoDB update_item error: {}", e);
            TaskError::StorageUnavailable(format!("DynamoDB update_item error: {}", e))
        })?;

        output
            .attributes()
            .and_then(task_from_item)
            .ok_or_else(|| TaskError::StorageUnavailable("update_item returned no attributes".to_string()))
    }

    async fn delete(&self, owner_id: &str, task_id: &str) -> Result<(), TaskError> {
        let (pk, sk) = self.layout.key(owner_id, task_id);

        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk))
            .key("SK", AttributeValue::S(sk))
            .condition_expression(OWNED_BY)
            .expression_attribute_values(":owner", AttributeValue::S(owner_id.to_string()))
            .send()
            .await
            .map_err(|e| {
                let conditional = e
                    .as_service_error()
                    .map(|se| se.is_conditional_check_failed_exception())
                    .unwrap_or(false);
                if conditional {
                    return TaskError::NotFound;
                }
                tracing::error!("DynamoDB delete_item error: {}", e);
                TaskError::StorageUnavailable(format!("DynamoDB delete_item error: {}", e))
            })?;

        Ok(())
    }
}

fn string_attr(item: &HashMap<String, AttributeValue>, name: &str) -> Option<String> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
}

fn time_attr(item: &HashMap<String, AttributeValue>, name: &str) -> Option<DateTime<Utc>> {
    string_attr(item, name)
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Rebuilds a task from a stored item. Items missing identity fields are
/// skipped rather than surfaced half-filled.
pub(crate) fn task_from_item(item: &HashMap<String, AttributeValue>) -> Option<Task> {
    let id = string_attr(item, "task_id").or_else(|| {
        string_attr(item, "SK").and_then(|sk| sk.strip_prefix("TASK#").map(str::to_string))
    })?;

    Some(Task {
        id,
        title: string_attr(item, "title").unwrap_or_default(),
        description: string_attr(item, "description"),
        status: string_attr(item, "status")
            .and_then(|s| TaskStatus::from_label(&s))
            .unwrap_or_default(),
        due_date: time_attr(item, "due_date"),
        owner_id: string_attr(item, "owner_id")?,
        created_at: time_attr(item, "created_at")?,
    })
}
