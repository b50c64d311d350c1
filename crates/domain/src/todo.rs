use crate::errors::DomainError;
use crate::input::TodoPatch;
use crate::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ToDo ID（新規作成時は ULID で採番）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// 外部から受け取った ID を検証して作成する。
    /// 形式は問わず、空文字とパス区切りのみ拒否する。
    pub fn from_string(id: String) -> Result<Self, DomainError> {
        if id.trim().is_empty() || id.contains('/') {
            return Err(DomainError::InvalidTodoId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn timestamp_ms(&self) -> Option<u64> {
        ulid::Ulid::from_string(&self.0)
            .ok()
            .map(|ulid| ulid.timestamp_ms())
    }
}

impl Default for TodoId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TodoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ToDo タイトル（前後の空白を除いて 1 文字以上）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoTitle(String);

impl TodoTitle {
    pub fn new(title: impl Into<String>) -> Result<Self, DomainError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DomainError::Validation("Title is required".to_string()));
        }
        Ok(Self(title))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// ToDo レコード
///
/// 所有者は作成時に一度だけ決まり、以後変わらない。
/// JSON 表現は `{id, title, completed, createdAt, userId}`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub user_id: UserId,
}

impl Todo {
    /// 未完了状態の新しい ToDo を作成
    pub fn new(title: TodoTitle, owner: UserId) -> Self {
        Self::new_at(title, owner, Utc::now())
    }

    pub fn new_at(title: TodoTitle, owner: UserId, created_at: DateTime<Utc>) -> Self {
        Self {
            id: TodoId::new(),
            title: title.into_inner(),
            completed: false,
            created_at,
            user_id: owner,
        }
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// パッチに含まれるフィールドだけを反映する。
    /// 値が変わったかどうかを返す。
    pub fn apply(&mut self, patch: &TodoPatch) -> bool {
        let mut changed = false;

        if let Some(title) = &patch.title {
            if self.title != title.as_str() {
                self.title = title.as_str().to_string();
                changed = true;
            }
        }

        if let Some(completed) = patch.completed {
            if self.completed != completed {
                self.completed = completed;
                changed = true;
            }
        }

        changed
    }
}

/// 作成日時の新しい順に並べる（同時刻は ID の降順）
pub fn sort_newest_first(todos: &mut [Todo]) {
    todos.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
