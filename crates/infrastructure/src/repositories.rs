use async_trait::async_trait;
use domain::{Todo, TodoId, TodoPatch, UserId};
use shared::AppError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),

    #[error("Corrupted item: {0}")]
    Corrupted(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<RepositoryError> for AppError {
    fn from(error: RepositoryError) -> Self {
        AppError::Internal(error.to_string())
    }
}

/// ToDo の永続化
///
/// 所有者の確認は呼び出し側の責務。ここでは ID 単位の読み書きのみ行う。
#[async_trait]
pub trait TodoRepository: Send + Sync {
    /// 所有者の ToDo をすべて新しい順で返す
    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Todo>, RepositoryError>;

    async fn find(&self, id: &TodoId) -> Result<Option<Todo>, RepositoryError>;

    async fn insert(&self, todo: &Todo) -> Result<(), RepositoryError>;

    /// パッチのフィールドだけを書き込み、更新後のレコードを返す。
    /// レコードが既に無い場合は `None`。
    async fn update(&self, id: &TodoId, patch: &TodoPatch)
        -> Result<Option<Todo>, RepositoryError>;

    /// 削除した場合は `true`、元から無かった場合は `false`
    async fn delete(&self, id: &TodoId) -> Result<bool, RepositoryError>;
}
