use std::env;
use std::net::IpAddr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// ToDo の保存先
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// プロセス内メモリ（開発・テスト用）
    Memory,
    DynamoDb,
}

/// セッション解決の方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionProviderKind {
    /// ID プロバイダーが共有鍵で署名したセッション JWT を検証する
    Jwt { secret: String },
    /// ID プロバイダーのセッションエンドポイントに問い合わせる
    Remote { endpoint: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub provider: SessionProviderKind,
    pub cookie_name: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub bind_address: IpAddr,
    pub port: u16,
    pub api_base_path: String,
    pub storage: StorageBackend,
    pub dynamodb_table: String,
    pub dynamodb_endpoint: Option<String>,
    pub aws_region: String,
    pub session: SessionConfig,
    pub cors_allow_origin: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の取得関数から設定を組み立てる（テストでは環境変数を汚さないためにこちらを使う）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind_address = match get("BIND_ADDRESS") {
            Some(value) => value.parse::<IpAddr>().map_err(|_| ConfigError::Invalid {
                name: "BIND_ADDRESS",
                value,
            })?,
            None => IpAddr::from([127, 0, 0, 1]),
        };

        let port = match get("PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { name: "PORT", value })?,
            None => 3000,
        };

        let storage = match get("STORAGE_BACKEND").as_deref() {
            None | Some("memory") => StorageBackend::Memory,
            Some("dynamodb") => StorageBackend::DynamoDb,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORAGE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let provider = match get("SESSION_PROVIDER").as_deref() {
            None | Some("jwt") => SessionProviderKind::Jwt {
                secret: get("SESSION_SECRET").ok_or(ConfigError::Missing("SESSION_SECRET"))?,
            },
            Some("remote") => SessionProviderKind::Remote {
                endpoint: get("SESSION_ENDPOINT")
                    .ok_or(ConfigError::Missing("SESSION_ENDPOINT"))?,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "SESSION_PROVIDER",
                    value: other.to_string(),
                })
            }
        };

        let cors_allow_origin = match get("CORS_ALLOW_ORIGIN") {
            Some(value) if is_valid_origin(&value) => value,
            Some(value) => {
                return Err(ConfigError::Invalid {
                    name: "CORS_ALLOW_ORIGIN",
                    value,
                })
            }
            None => "*".to_string(),
        };

        Ok(Config {
            environment: get("ENVIRONMENT").unwrap_or_else(|| "dev".to_string()),
            bind_address,
            port,
            api_base_path: normalize_base_path(get("API_BASE_PATH").as_deref().unwrap_or("")),
            storage,
            dynamodb_table: get("DYNAMODB_TABLE")
                .unwrap_or_else(|| "personal-todo-dev".to_string()),
            dynamodb_endpoint: get("DYNAMODB_ENDPOINT"),
            aws_region: get("AWS_REGION").unwrap_or_else(|| "ap-northeast-1".to_string()),
            session: SessionConfig {
                provider,
                cookie_name: get("SESSION_COOKIE_NAME")
                    .unwrap_or_else(|| "next-auth.session-token".to_string()),
            },
            cors_allow_origin,
        })
    }
}

/// `*` か、パスを持たない `scheme://host[:port]` 形式のオリジンのみ受け付ける
fn is_valid_origin(value: &str) -> bool {
    if value == "*" {
        return true;
    }

    let Some(host) = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
    else {
        return false;
    };

    !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']'))
}

/// `api/` → `/api`、`/` → `` のように正規化する
fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
