use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::errors::{AppError, ErrorResponse, ErrorSeverity};

/// 重要度に応じたレベルでエラーをログに記録
pub fn log_error(error: &AppError) {
    let code = error.code();

    match error.severity() {
        ErrorSeverity::Error => {
            tracing::error!(error = %error, code = %code, "Request failed");
        }
        ErrorSeverity::Warning => {
            tracing::warn!(error = %error, code = %code, "Request rejected");
        }
        ErrorSeverity::Info => {
            tracing::info!(error = %error, code = %code, "Request rejected");
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        log_error(&self);

        let status = StatusCode::from_u16(self.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse::from_app_error(&self))).into_response()
    }
}
