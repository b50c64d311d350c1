//! 個人用 ToDo の HTTP API（axum）
//!
//! `/todos` 配下はすべてセッションガードを通る。`/health` のみ認証不要。

pub mod auth;
pub mod handlers;
pub mod middleware;
pub mod service;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch},
    Router,
};
use infrastructure::{InMemoryTodoRepository, TodoRepository};
use shared::{IdentityProvider, StaticIdentityProvider};
use std::sync::Arc;

pub use auth::{extract_session_token, CurrentUser};
pub use middleware::CorsOrigin;
pub use service::TodoResourceHandler;

use crate::middleware::{cors, trace_request};

pub const DEFAULT_SESSION_COOKIE: &str = "next-auth.session-token";

/// アプリケーションの共有状態
#[derive(Clone)]
pub struct AppState {
    pub todos: TodoResourceHandler,
    pub identity: Arc<dyn IdentityProvider>,
    pub cookie_name: Arc<str>,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn TodoRepository>,
        identity: Arc<dyn IdentityProvider>,
        cookie_name: &str,
    ) -> Self {
        Self {
            todos: TodoResourceHandler::new(repo),
            identity,
            cookie_name: Arc::from(cookie_name),
        }
    }
}

impl Default for AppState {
    /// InMemory ストアと、何も解決しない ID プロバイダ
    fn default() -> Self {
        Self::new(
            Arc::new(InMemoryTodoRepository::new()),
            Arc::new(StaticIdentityProvider::new()),
            DEFAULT_SESSION_COOKIE,
        )
    }
}

/// ルータを構築して返します。
pub fn app() -> Router {
    app_with_state(AppState::default())
}

/// 外部から状態を注入できる版（ルート直下、全オリジン許可）
pub fn app_with_state(state: AppState) -> Router {
    app_with_options(state, "", CorsOrigin::any())
}

/// `base_path` 配下に `/todos` をマウントする（`/health` は常にルート）
pub fn app_with_options(state: AppState, base_path: &str, cors_origin: CorsOrigin) -> Router {
    let todos = Router::new()
        .route(
            "/todos",
            get(handlers::list_todos).post(handlers::create_todo),
        )
        .route(
            "/todos/:id",
            patch(handlers::update_todo).delete(handlers::delete_todo),
        );

    let base_path = base_path.trim_end_matches('/');
    let api = if base_path.is_empty() {
        todos
    } else {
        Router::new().nest(base_path, todos)
    };

    Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .layer(from_fn_with_state(cors_origin, cors))
        .layer(from_fn(trace_request))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{self, Body},
        http::{Request, StatusCode},
    };
    use domain::UserId;
    use shared::Session;
    use tower::ServiceExt; // for `oneshot`

    fn state_with_user(token: &str, user: &str) -> AppState {
        let session = Session::new(UserId::from_string(user.to_string()).unwrap());
        AppState::new(
            Arc::new(InMemoryTodoRepository::new()),
            Arc::new(StaticIdentityProvider::new().with_session(token, session)),
            DEFAULT_SESSION_COOKIE,
        )
    }

    #[tokio::test]
    async fn get_health_returns_ok() {
        let app = app();

        let request = Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));

        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn get_todos_without_session_returns_401() {
        let app = app();

        let request = Request::builder()
            .method("GET")
            .uri("/todos")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "Unauthorized");
    }

    fn origin(value: &str) -> CorsOrigin {
        CorsOrigin::new(value).unwrap()
    }

    #[tokio::test]
    async fn preflight_returns_204_with_cors_headers() {
        let app = app_with_options(AppState::default(), "", origin("https://todo.example.com"));

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/todos")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "https://todo.example.com"
        );
        assert_eq!(
            response.headers()["access-control-allow-methods"],
            "GET,POST,PATCH,DELETE,OPTIONS"
        );
        assert_eq!(response.headers()["access-control-allow-credentials"], "true");
        assert_eq!(response.headers()["vary"], "Origin");
    }

    #[tokio::test]
    async fn wildcard_origin_does_not_allow_credentials() {
        let app = app();

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/todos")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert!(!response
            .headers()
            .contains_key("access-control-allow-credentials"));
    }

    #[tokio::test]
    async fn todos_are_mounted_under_base_path() {
        let app = app_with_options(state_with_user("tok", "alice"), "/api", CorsOrigin::any());

        let request = Request::builder()
            .method("GET")
            .uri("/api/todos")
            .header("authorization", "Bearer tok")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let request = Request::builder()
            .method("GET")
            .uri("/todos")
            .header("authorization", "Bearer tok")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn request_id_is_echoed() {
        let app = app();

        let request = Request::builder()
            .method("GET")
            .uri("/health")
            .header("x-request-id", "req-42")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "req-42");
    }
}
