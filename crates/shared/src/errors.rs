use serde::{Deserialize, Serialize};
use thiserror::Error;

/// アプリケーション全体で使用されるエラー型
///
/// 1 リクエストにつき終端的に扱い、リトライや部分適用は行わない。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// 呼び出し元の ID を解決できない
    #[error("Unauthorized")]
    Unauthorized,

    /// 入力が不正
    #[error("Validation failed: {0}")]
    Validation(String),

    /// レコードが存在しない、または呼び出し元の所有ではない
    #[error("Not found")]
    NotFound,

    /// データストアや ID プロバイダーなどの想定外の失敗
    #[error("Internal error: {0}")]
    Internal(String),
}

/// エラーの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// クライアントエラー（4xx相当）
    Client,
    /// サーバーエラー（5xx相当）
    Server,
}

/// エラーの重要度（ログレベルの決定に使用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
}

impl AppError {
    /// 機械可読なエラーコード
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound => "NOT_FOUND",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::Internal(_) => ErrorCategory::Server,
            _ => ErrorCategory::Client,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::Unauthorized => ErrorSeverity::Warning,
            AppError::Validation(_) | AppError::NotFound => ErrorSeverity::Info,
            AppError::Internal(_) => ErrorSeverity::Error,
        }
    }

    /// HTTPステータスコードを取得
    pub fn http_status_code(&self) -> u16 {
        match self {
            AppError::Unauthorized => 401,
            AppError::Validation(_) => 400,
            AppError::NotFound => 404,
            AppError::Internal(_) => 500,
        }
    }

    /// クライアント向けメッセージを取得
    ///
    /// 内部エラーの詳細は含めない。
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthorized => "Unauthorized".to_string(),
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound => "Not found".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl From<domain::DomainError> for AppError {
    fn from(error: domain::DomainError) -> Self {
        match error {
            domain::DomainError::Validation(msg) => AppError::Validation(msg),
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::Validation(format!("Invalid JSON: {error}"))
    }
}

impl From<crate::auth::AuthError> for AppError {
    fn from(error: crate::auth::AuthError) -> Self {
        AppError::Internal(error.to_string())
    }
}

/// 標準化されたエラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 短いメッセージ
    pub error: String,
    /// エラーコード
    pub code: String,
}

impl ErrorResponse {
    pub fn from_app_error(error: &AppError) -> Self {
        Self {
            error: error.user_message(),
            code: error.code().to_string(),
        }
    }
}
