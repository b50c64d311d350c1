//! ToDo リソースの操作
//!
//! 呼び出し元の `UserId` は常に引数で受け取る（暗黙のセッション参照はしない）。
//! 他人のレコードと存在しないレコードは区別せず、どちらも `NotFound` を返す。

use domain::{CreateTodoInput, Todo, TodoId, TodoPatch, UserId};
use infrastructure::TodoRepository;
use serde_json::Value;
use shared::AppError;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct TodoResourceHandler {
    repo: Arc<dyn TodoRepository>,
}

impl TodoResourceHandler {
    pub fn new(repo: Arc<dyn TodoRepository>) -> Self {
        Self { repo }
    }

    /// 呼び出し元の ToDo を新しい順で返す
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<Todo>, AppError> {
        Ok(self.repo.list_by_owner(user_id).await?)
    }

    pub async fn create(&self, user_id: &UserId, body: &Value) -> Result<Todo, AppError> {
        let input = CreateTodoInput::from_json(body)?;
        let todo = Todo::new(input.title, user_id.clone());

        self.repo.insert(&todo).await?;

        info!(user_id = %user_id, todo_id = %todo.id, "Todo created");
        Ok(todo)
    }

    /// パッチに含まれるフィールドだけを更新する。空のパッチは書き込みを行わない。
    pub async fn update(
        &self,
        user_id: &UserId,
        id: &str,
        patch: &TodoPatch,
    ) -> Result<Todo, AppError> {
        self.update_with(user_id, id, || Ok(patch.clone())).await
    }

    /// 所有確認を済ませてから `read_patch` でパッチを組み立て、更新する。
    /// 他人のレコードでは `read_patch` は呼ばれない。
    pub async fn update_with<F>(
        &self,
        user_id: &UserId,
        id: &str,
        read_patch: F,
    ) -> Result<Todo, AppError>
    where
        F: FnOnce() -> Result<TodoPatch, AppError>,
    {
        let current = self.find_owned(user_id, id).await?;
        let patch = read_patch()?;
        self.apply(current, &patch).await
    }

    async fn apply(&self, current: Todo, patch: &TodoPatch) -> Result<Todo, AppError> {
        if patch.is_empty() {
            return Ok(current);
        }

        let updated = self
            .repo
            .update(&current.id, patch)
            .await?
            .ok_or(AppError::NotFound)?;

        info!(
            user_id = %updated.user_id,
            todo_id = %updated.id,
            completed = updated.completed,
            "Todo updated"
        );
        Ok(updated)
    }

    pub async fn delete(&self, user_id: &UserId, id: &str) -> Result<(), AppError> {
        let current = self.find_owned(user_id, id).await?;

        if !self.repo.delete(&current.id).await? {
            return Err(AppError::NotFound);
        }

        info!(user_id = %user_id, todo_id = %current.id, "Todo deleted");
        Ok(())
    }

    /// 呼び出し元が所有するレコードを取得する。他人のものは存在しない扱い。
    async fn find_owned(&self, user_id: &UserId, id: &str) -> Result<Todo, AppError> {
        let id = TodoId::from_string(id.to_string()).map_err(|_| AppError::NotFound)?;

        match self.repo.find(&id).await? {
            Some(todo) if todo.is_owned_by(user_id) => Ok(todo),
            _ => Err(AppError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::TodoTitle;
    use infrastructure::InMemoryTodoRepository;
    use serde_json::json;

    fn user(id: &str) -> UserId {
        UserId::from_string(id.to_string()).unwrap()
    }

    fn setup() -> (Arc<InMemoryTodoRepository>, TodoResourceHandler) {
        let repo = Arc::new(InMemoryTodoRepository::new());
        let handler = TodoResourceHandler::new(repo.clone());
        (repo, handler)
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (_repo, handler) = setup();
        let alice = user("alice");

        let created = handler
            .create(&alice, &json!({"title": "Buy milk"}))
            .await
            .unwrap();

        assert_eq!(created.title, "Buy milk");
        assert!(!created.completed);
        assert_eq!(created.user_id, alice);

        let todos = handler.list(&alice).await.unwrap();
        assert_eq!(todos, vec![created]);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_title_without_persisting() {
        let (repo, handler) = setup();

        for body in [json!({}), json!({"title": ""}), json!({"title": 3})] {
            let result = handler.create(&user("alice"), &body).await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }

        assert_eq!(repo.mutation_count(), 0);
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_update_other_users_todo_is_not_found() {
        let (repo, handler) = setup();
        let created = handler
            .create(&user("alice"), &json!({"title": "secret"}))
            .await
            .unwrap();

        let patch = TodoPatch::default().with_completed(true);
        let result = handler
            .update(&user("mallory"), created.id.as_str(), &patch)
            .await;

        assert_eq!(result.unwrap_err(), AppError::NotFound);
        let stored = repo.find(&created.id).await.unwrap().unwrap();
        assert!(!stored.completed);
        assert_eq!(repo.mutation_count(), 1);
    }

    #[tokio::test]
    async fn test_update_with_reads_patch_only_for_owner() {
        let (repo, handler) = setup();
        let created = handler
            .create(&user("alice"), &json!({"title": "secret"}))
            .await
            .unwrap();
        let mut called = false;

        let result = handler
            .update_with(&user("mallory"), created.id.as_str(), || {
                called = true;
                Err(AppError::Validation("bad body".to_string()))
            })
            .await;

        assert_eq!(result.unwrap_err(), AppError::NotFound);
        assert!(!called);
        assert_eq!(repo.mutation_count(), 1);

        let result = handler
            .update_with(&user("alice"), created.id.as_str(), || {
                Err(AppError::Validation("bad body".to_string()))
            })
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(repo.mutation_count(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_and_malformed_ids_are_not_found() {
        let (_repo, handler) = setup();
        let patch = TodoPatch::default().with_completed(true);

        for id in [TodoId::new().to_string(), String::new(), "a/b".to_string()] {
            let result = handler.update(&user("alice"), &id, &patch).await;
            assert_eq!(result.unwrap_err(), AppError::NotFound);
        }
    }

    #[tokio::test]
    async fn test_partial_updates() {
        let (_repo, handler) = setup();
        let alice = user("alice");
        let created = handler
            .create(&alice, &json!({"title": "Buy milk"}))
            .await
            .unwrap();

        let updated = handler
            .update(
                &alice,
                created.id.as_str(),
                &TodoPatch::default().with_title(TodoTitle::new("x").unwrap()),
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "x");
        assert!(!updated.completed);

        let updated = handler
            .update(
                &alice,
                created.id.as_str(),
                &TodoPatch::default().with_completed(true),
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "x");
        assert!(updated.completed);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_empty_patch_does_not_write() {
        let (repo, handler) = setup();
        let alice = user("alice");
        let created = handler
            .create(&alice, &json!({"title": "Buy milk"}))
            .await
            .unwrap();

        let result = handler
            .update(&alice, created.id.as_str(), &TodoPatch::default())
            .await
            .unwrap();

        assert_eq!(result, created);
        assert_eq!(repo.mutation_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let (_repo, handler) = setup();
        let alice = user("alice");
        let created = handler
            .create(&alice, &json!({"title": "Buy milk"}))
            .await
            .unwrap();

        handler.delete(&alice, created.id.as_str()).await.unwrap();
        let second = handler.delete(&alice, created.id.as_str()).await;

        assert_eq!(second.unwrap_err(), AppError::NotFound);
        assert!(handler.list(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_other_users_todo_is_not_found() {
        let (repo, handler) = setup();
        let created = handler
            .create(&user("alice"), &json!({"title": "keep me"}))
            .await
            .unwrap();

        let result = handler.delete(&user("mallory"), created.id.as_str()).await;

        assert_eq!(result.unwrap_err(), AppError::NotFound);
        assert!(repo.find(&created.id).await.unwrap().is_some());
    }
}
