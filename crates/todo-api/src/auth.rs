//! セッションガード
//!
//! リクエストからセッショントークンを取り出し、`IdentityProvider` で呼び出し元を解決する。
//! 解決できなければ `Unauthorized`。データストアには一切触れない。

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use domain::UserId;
use shared::{AppError, Session, SessionToken};
use tracing::debug;

use crate::AppState;

const BEARER_PREFIX: &str = "Bearer ";
const SECURE_COOKIE_PREFIX: &str = "__Secure-";

/// 認証済みの呼び出し元
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

impl CurrentUser {
    pub fn user_id(&self) -> &UserId {
        &self.0.user_id
    }
}

/// Authorization: Bearer を優先し、無ければセッション Cookie を探す。
/// Cookie 由来のトークンは一致した Cookie 名（`__Secure-` 付きを含む）を保持する。
pub fn extract_session_token(headers: &HeaderMap, cookie_name: &str) -> Option<SessionToken> {
    if let Some(token) = bearer_token(headers) {
        return Some(SessionToken::new(cookie_name, token));
    }

    let secure_name = format!("{SECURE_COOKIE_PREFIX}{cookie_name}");
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| (*name == cookie_name || *name == secure_name) && !value.is_empty())
        .map(|(name, value)| SessionToken::new(name, value))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .get(..BEARER_PREFIX.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(BEARER_PREFIX))
        .map(|_| value[BEARER_PREFIX.len()..].trim())?;

    (!token.is_empty()).then(|| token.to_string())
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_session_token(&parts.headers, &state.cookie_name) else {
            debug!("No session token on request");
            return Err(AppError::Unauthorized);
        };

        match state.identity.resolve(&token).await? {
            Some(session) => Ok(CurrentUser(session)),
            None => {
                debug!("Session token did not resolve to a user");
                Err(AppError::Unauthorized)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const COOKIE: &str = "next-auth.session-token";

    fn token(name: &str, value: &str) -> Option<SessionToken> {
        Some(SessionToken::new(name, value))
    }

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_bearer_token() {
        let map = headers(&[(header::AUTHORIZATION, "Bearer abc123")]);
        assert_eq!(extract_session_token(&map, COOKIE), token(COOKIE, "abc123"));

        let map = headers(&[(header::AUTHORIZATION, "bearer abc123")]);
        assert_eq!(extract_session_token(&map, COOKIE), token(COOKIE, "abc123"));
    }

    #[test]
    fn test_non_bearer_authorization_is_ignored() {
        let map = headers(&[(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")]);
        assert_eq!(extract_session_token(&map, COOKIE), None);

        let map = headers(&[(header::AUTHORIZATION, "Bearer   ")]);
        assert_eq!(extract_session_token(&map, COOKIE), None);
    }

    #[test]
    fn test_session_cookie() {
        let map = headers(&[(
            header::COOKIE,
            "theme=dark; next-auth.session-token=tok; other=1",
        )]);
        assert_eq!(extract_session_token(&map, COOKIE), token(COOKIE, "tok"));
    }

    #[test]
    fn test_secure_session_cookie() {
        let map = headers(&[(header::COOKIE, "__Secure-next-auth.session-token=tok")]);
        assert_eq!(
            extract_session_token(&map, COOKIE),
            token("__Secure-next-auth.session-token", "tok")
        );
    }

    #[test]
    fn test_bearer_takes_precedence_over_cookie() {
        let map = headers(&[
            (header::COOKIE, "next-auth.session-token=from-cookie"),
            (header::AUTHORIZATION, "Bearer from-header"),
        ]);
        assert_eq!(
            extract_session_token(&map, COOKIE),
            token(COOKIE, "from-header")
        );
    }

    #[test]
    fn test_missing_or_empty_cookie() {
        assert_eq!(extract_session_token(&HeaderMap::new(), COOKIE), None);

        let map = headers(&[(header::COOKIE, "next-auth.session-token=; theme=dark")]);
        assert_eq!(extract_session_token(&map, COOKIE), None);

        let map = headers(&[(header::COOKIE, "next-auth.session-token.0=tok")]);
        assert_eq!(extract_session_token(&map, COOKIE), None);
    }
}
