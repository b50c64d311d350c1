//! リクエストボディからの入力解釈
//!
//! ボディは型付きの構造体ではなく `serde_json::Value` のまま受け取り、
//! フィールド単位で型を確認する。作成時は `title` が必須、
//! 更新時は正しい型で存在するフィールドだけを採用する。

use crate::errors::DomainError;
use crate::todo::TodoTitle;
use serde_json::Value;

/// ToDo 作成入力
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTodoInput {
    pub title: TodoTitle,
}

impl CreateTodoInput {
    /// `title` が欠落・文字列以外・空白のみの場合は `Validation`
    pub fn from_json(body: &Value) -> Result<Self, DomainError> {
        let title = body
            .get("title")
            .and_then(Value::as_str)
            .ok_or_else(|| DomainError::Validation("Title is required".to_string()))?;

        Ok(Self {
            title: TodoTitle::new(title)?,
        })
    }
}

/// ToDo 部分更新
///
/// `None` のフィールドは変更しない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub title: Option<TodoTitle>,
    pub completed: Option<bool>,
}

impl TodoPatch {
    /// 正しい型で存在するフィールドのみ採用し、それ以外は黙って無視する。
    /// 空白のみのタイトルも無視する（タイトル非空の不変条件を保つため）。
    pub fn from_json(body: &Value) -> Self {
        let title = body
            .get("title")
            .and_then(Value::as_str)
            .and_then(|t| TodoTitle::new(t).ok());
        let completed = body.get("completed").and_then(Value::as_bool);

        Self { title, completed }
    }

    pub fn with_title(mut self, title: TodoTitle) -> Self {
        self.title = Some(title);
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none()
    }
}
