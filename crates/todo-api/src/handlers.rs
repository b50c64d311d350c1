use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use domain::{Todo, TodoPatch};
use serde::Serialize;
use serde_json::Value;
use shared::AppError;

use crate::auth::CurrentUser;
use crate::AppState;

/// DELETE /todos/:id レスポンス
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthBody {
    /// サービスの簡易ステータス
    pub status: &'static str,
}

/// ヘルスチェック（認証不要）
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthBody { status: "ok" }))
}

pub async fn list_todos(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Todo>>, AppError> {
    let todos = state.todos.list(user.user_id()).await?;
    Ok(Json(todos))
}

pub async fn create_todo(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Bytes,
) -> Result<Json<Todo>, AppError> {
    let body = parse_body(&body)?;
    let todo = state.todos.create(user.user_id(), &body).await?;
    Ok(Json(todo))
}

pub async fn update_todo(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Todo>, AppError> {
    // ボディは所有確認の後に読む。他人のレコードには内容に関わらず 404 を返す
    let todo = state
        .todos
        .update_with(user.user_id(), &id, || {
            Ok(TodoPatch::from_json(&parse_body(&body)?))
        })
        .await?;
    Ok(Json(todo))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    state.todos.delete(user.user_id(), &id).await?;
    Ok(Json(DeleteResponse { success: true }))
}

/// 空のボディは `null` として扱う（Content-Type は問わない）
fn parse_body(body: &Bytes) -> Result<Value, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(body)?)
}
