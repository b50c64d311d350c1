//! セッション解決
//!
//! 資格情報の発行・検証は外部の ID プロバイダーに委ねる。
//! ここで行うのは「このトークンの持ち主は誰か（いなければ `None`）」の問い合わせのみ。

use async_trait::async_trait;
use domain::UserId;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// 認証済みセッション（永続化しない）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
}

impl Session {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            name: None,
            email: None,
            image: None,
        }
    }
}

/// リクエストから取り出したセッショントークン
///
/// ID プロバイダーへ転送するときは値を運んでいた Cookie 名をそのまま使う
/// （HTTPS では `__Secure-` 付きの名前しか読まないプロバイダーがある）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    /// Cookie 由来ならその名前、Bearer 由来なら設定上の Cookie 名
    pub cookie_name: String,
    pub value: String,
}

impl SessionToken {
    pub fn new(cookie_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            value: value.into(),
        }
    }

    /// `Cookie` ヘッダ値（`name=value`）
    pub fn cookie_header(&self) -> String {
        format!("{}={}", self.cookie_name, self.value)
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// ID プロバイダーへの問い合わせ自体が失敗した（未認証とは区別する）
    #[error("Identity provider error: {0}")]
    Provider(String),
}

/// セッショントークンから呼び出し元を解決する
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, token: &SessionToken) -> Result<Option<Session>, AuthError>;
}

/// セッション JWT のクレーム
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
}

impl Claims {
    fn into_session(self) -> Option<Session> {
        let user_id = UserId::from_string(self.sub).ok()?;
        Some(Session {
            user_id,
            name: self.name,
            email: self.email,
            image: self.picture,
        })
    }
}

/// ID プロバイダーが共有鍵（HS256）で署名したセッション JWT を検証する
pub struct JwtSessionVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtSessionVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtSessionVerifier {
    async fn resolve(&self, token: &SessionToken) -> Result<Option<Session>, AuthError> {
        match decode::<Claims>(&token.value, &self.key, &self.validation) {
            Ok(data) => Ok(data.claims.into_session()),
            Err(e) => {
                debug!(error = %e, "Session token rejected");
                Ok(None)
            }
        }
    }
}

/// ID プロバイダーのセッションエンドポイント（`/api/auth/session` 形式）に問い合わせる
pub struct RemoteSessionProvider {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct RemoteSessionBody {
    user: Option<RemoteUser>,
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: Option<String>,
    name: Option<String>,
    email: Option<String>,
    image: Option<String>,
}

impl RemoteSessionProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

/// セッションエンドポイントの応答を解釈する。
/// 未ログイン時は `{}` が返るため `None` になる。
fn session_from_body(body: &serde_json::Value) -> Option<Session> {
    let parsed: RemoteSessionBody = serde_json::from_value(body.clone()).ok()?;
    let user = parsed.user?;
    let user_id = UserId::from_string(user.id?).ok()?;

    Some(Session {
        user_id,
        name: user.name,
        email: user.email,
        image: user.image,
    })
}

#[async_trait]
impl IdentityProvider for RemoteSessionProvider {
    async fn resolve(&self, token: &SessionToken) -> Result<Option<Session>, AuthError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::COOKIE, token.cookie_header())
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            warn!(status = status.as_u16(), "Session endpoint returned an error");
            return Err(AuthError::Provider(format!(
                "session endpoint returned {status}"
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        Ok(session_from_body(&body))
    }
}

/// トークンとセッションの固定対応表（ローカル開発・テスト用）
#[derive(Default)]
pub struct StaticIdentityProvider {
    sessions: HashMap<String, Session>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, token: impl Into<String>, session: Session) -> Self {
        self.sessions.insert(token.into(), session);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn resolve(&self, token: &SessionToken) -> Result<Option<Session>, AuthError> {
        Ok(self.sessions.get(&token.value).cloned())
    }
}
