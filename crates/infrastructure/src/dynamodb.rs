use crate::models::{todo_from_item, todo_to_item, DynamoDbKeys, GSI1_NAME, TODO_SORT_KEY};
use crate::repositories::{RepositoryError, TodoRepository};
use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client;
use domain::{sort_newest_first, Todo, TodoId, TodoPatch, UserId};
use shared::Config;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Clone)]
pub struct DynamoDbClient {
    client: Client,
    table_name: String,
}

impl DynamoDbClient {
    /// 設定からクライアントを作成する。
    /// `dynamodb_endpoint` があれば DynamoDB Local などに向ける。
    pub async fn new(config: &Config) -> Self {
        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_dynamodb::config::Region::new(config.aws_region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_dynamodb::config::Builder::from(&aws_config);
        if let Some(endpoint) = &config.dynamodb_endpoint {
            info!(endpoint = %endpoint, "Using custom DynamoDB endpoint");
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            client: Client::from_conf(builder.build()),
            table_name: config.dynamodb_table.clone(),
        }
    }

    /// 構築済みの SDK クライアントを包む（テストやカスタム認証情報向け）
    pub fn from_client(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

fn sdk_error<E: std::error::Error>(error: E) -> RepositoryError {
    RepositoryError::DynamoDb(DisplayErrorContext(error).to_string())
}

/// DynamoDB 上の ToDo リポジトリ
#[derive(Clone)]
pub struct DynamoDbTodoRepository {
    db: DynamoDbClient,
}

impl DynamoDbTodoRepository {
    pub fn new(db: DynamoDbClient) -> Self {
        Self { db }
    }

    fn primary_key(id: &TodoId) -> HashMap<String, AttributeValue> {
        HashMap::from([
            (
                "PK".to_string(),
                AttributeValue::S(DynamoDbKeys::partition_key(id)),
            ),
            (
                "SK".to_string(),
                AttributeValue::S(TODO_SORT_KEY.to_string()),
            ),
        ])
    }
}

/// パッチから UpdateExpression を組み立てる。空のパッチなら `None`。
fn update_expression(patch: &TodoPatch) -> Option<(String, HashMap<String, AttributeValue>)> {
    let mut parts = Vec::new();
    let mut values = HashMap::new();

    if let Some(title) = &patch.title {
        parts.push("Title = :title");
        values.insert(
            ":title".to_string(),
            AttributeValue::S(title.as_str().to_string()),
        );
    }

    if let Some(completed) = patch.completed {
        parts.push("Completed = :completed");
        values.insert(":completed".to_string(), AttributeValue::Bool(completed));
    }

    if parts.is_empty() {
        return None;
    }

    Some((format!("SET {}", parts.join(", ")), values))
}

#[async_trait]
impl TodoRepository for DynamoDbTodoRepository {
    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Todo>, RepositoryError> {
        let mut todos = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        // ページングは内部で読み切る（API としては全件返す）
        loop {
            let result = self
                .db
                .client()
                .query()
                .table_name(self.db.table_name())
                .index_name(GSI1_NAME)
                .key_condition_expression("GSI1PK = :pk")
                .expression_attribute_values(
                    ":pk",
                    AttributeValue::S(DynamoDbKeys::owner_key(owner)),
                )
                .scan_index_forward(false)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(sdk_error)?;

            for item in result.items() {
                todos.push(todo_from_item(item).map_err(RepositoryError::Corrupted)?);
            }

            match result.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        sort_newest_first(&mut todos);
        debug!(user_id = %owner, count = todos.len(), "Listed todos from DynamoDB");
        Ok(todos)
    }

    async fn find(&self, id: &TodoId) -> Result<Option<Todo>, RepositoryError> {
        let result = self
            .db
            .client()
            .get_item()
            .table_name(self.db.table_name())
            .set_key(Some(Self::primary_key(id)))
            .send()
            .await
            .map_err(sdk_error)?;

        result
            .item()
            .map(|item| todo_from_item(item).map_err(RepositoryError::Corrupted))
            .transpose()
    }

    async fn insert(&self, todo: &Todo) -> Result<(), RepositoryError> {
        self.db
            .client()
            .put_item()
            .table_name(self.db.table_name())
            .set_item(Some(todo_to_item(todo)))
            .condition_expression("attribute_not_exists(PK)")
            .send()
            .await
            .map_err(sdk_error)?;

        debug!(todo_id = %todo.id, "Inserted todo");
        Ok(())
    }

    async fn update(
        &self,
        id: &TodoId,
        patch: &TodoPatch,
    ) -> Result<Option<Todo>, RepositoryError> {
        let Some((expression, values)) = update_expression(patch) else {
            return self.find(id).await;
        };

        let result = self
            .db
            .client()
            .update_item()
            .table_name(self.db.table_name())
            .set_key(Some(Self::primary_key(id)))
            .update_expression(expression)
            .set_expression_attribute_values(Some(values))
            .condition_expression("attribute_exists(PK)")
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match result {
            Ok(output) => {
                debug!(todo_id = %id, "Updated todo");
                output
                    .attributes()
                    .map(|item| todo_from_item(item).map_err(RepositoryError::Corrupted))
                    .transpose()
            }
            // 取得後に削除された場合
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                Ok(None)
            }
            Err(e) => Err(sdk_error(e)),
        }
    }

    async fn delete(&self, id: &TodoId) -> Result<bool, RepositoryError> {
        let result = self
            .db
            .client()
            .delete_item()
            .table_name(self.db.table_name())
            .set_key(Some(Self::primary_key(id)))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(sdk_error)?;

        let deleted = result.attributes().is_some_and(|attrs| !attrs.is_empty());
        debug!(todo_id = %id, deleted, "Deleted todo");
        Ok(deleted)
    }
}
