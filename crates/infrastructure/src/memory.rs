use crate::repositories::{RepositoryError, TodoRepository};
use async_trait::async_trait;
use domain::{Todo, TodoId, TodoPatch, UserId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// 簡易な InMemory 実装（開発/テスト用）
#[derive(Default)]
pub struct InMemoryTodoRepository {
    // 挿入順（同一時刻の作成を安定して並べるため）
    sequence: AtomicU64,
    todos: Mutex<HashMap<TodoId, (u64, Todo)>>,
    // 書き込み呼び出しの回数（テスト観測用）
    mutations: AtomicUsize,
}

impl InMemoryTodoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// insert / update / delete の呼び出し回数
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// 所有者を問わず保存されている件数
    pub fn len(&self) -> usize {
        self.lock().map(|todos| todos.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<TodoId, (u64, Todo)>>, RepositoryError> {
        self.todos
            .lock()
            .map_err(|_| RepositoryError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl TodoRepository for InMemoryTodoRepository {
    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Todo>, RepositoryError> {
        let todos = self.lock()?;

        let mut owned: Vec<&(u64, Todo)> = todos
            .values()
            .filter(|(_, todo)| todo.is_owned_by(owner))
            .collect();
        owned.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| seq_b.cmp(seq_a))
        });

        debug!(user_id = %owner, count = owned.len(), "Listed todos from memory");
        Ok(owned.into_iter().map(|(_, todo)| todo.clone()).collect())
    }

    async fn find(&self, id: &TodoId) -> Result<Option<Todo>, RepositoryError> {
        let todos = self.lock()?;
        Ok(todos.get(id).map(|(_, todo)| todo.clone()))
    }

    async fn insert(&self, todo: &Todo) -> Result<(), RepositoryError> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);

        let mut todos = self.lock()?;
        todos.insert(todo.id.clone(), (seq, todo.clone()));
        Ok(())
    }

    async fn update(
        &self,
        id: &TodoId,
        patch: &TodoPatch,
    ) -> Result<Option<Todo>, RepositoryError> {
        self.mutations.fetch_add(1, Ordering::SeqCst);

        let mut todos = self.lock()?;
        Ok(todos.get_mut(id).map(|(_, todo)| {
            todo.apply(patch);
            todo.clone()
        }))
    }

    async fn delete(&self, id: &TodoId) -> Result<bool, RepositoryError> {
        self.mutations.fetch_add(1, Ordering::SeqCst);

        let mut todos = self.lock()?;
        Ok(todos.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::TodoTitle;

    fn user(id: &str) -> UserId {
        UserId::from_string(id.to_string()).unwrap()
    }

    fn todo(title: &str, owner: &str) -> Todo {
        Todo::new(TodoTitle::new(title).unwrap(), user(owner))
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = InMemoryTodoRepository::new();
        let item = todo("Buy milk", "alice");

        repo.insert(&item).await.unwrap();

        assert_eq!(repo.find(&item.id).await.unwrap(), Some(item));
        assert_eq!(repo.find(&TodoId::new()).await.unwrap(), None);
        assert_eq!(repo.mutation_count(), 1);
    }

    #[tokio::test]
    async fn test_list_filters_by_owner_newest_first() {
        let repo = InMemoryTodoRepository::new();
        let now = Utc::now();
        // 同一時刻でも挿入順の逆で返る
        for title in ["A", "B", "C"] {
            let item = Todo::new_at(TodoTitle::new(title).unwrap(), user("alice"), now);
            repo.insert(&item).await.unwrap();
        }
        repo.insert(&todo("other", "bob")).await.unwrap();

        let titles: Vec<String> = repo
            .list_by_owner(&user("alice"))
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();

        assert_eq!(titles, vec!["C", "B", "A"]);
        assert_eq!(repo.len(), 4);
    }

    #[tokio::test]
    async fn test_update_applies_patch() {
        let repo = InMemoryTodoRepository::new();
        let item = todo("Buy milk", "alice");
        repo.insert(&item).await.unwrap();

        let updated = repo
            .update(&item.id, &TodoPatch::default().with_completed(true))
            .await
            .unwrap()
            .unwrap();

        assert!(updated.completed);
        assert_eq!(updated.title, "Buy milk");
        assert_eq!(updated.created_at, item.created_at);
        assert_eq!(repo.find(&item.id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_update_missing_returns_none() {
        let repo = InMemoryTodoRepository::new();
        let result = repo
            .update(&TodoId::new(), &TodoPatch::default().with_completed(true))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = InMemoryTodoRepository::new();
        let item = todo("Buy milk", "alice");
        repo.insert(&item).await.unwrap();

        assert!(repo.delete(&item.id).await.unwrap());
        assert!(!repo.delete(&item.id).await.unwrap());
        assert!(repo.is_empty());
    }
}
