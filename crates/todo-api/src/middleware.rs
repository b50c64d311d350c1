use axum::{
    extract::{Request, State},
    http::{header, header::InvalidHeaderValue, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const ALLOWED_METHODS: &str = "GET,POST,PATCH,DELETE,OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type,Authorization";

/// リクエスト単位のスパンを張り、結果とレイテンシを記録する
pub async fn trace_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = info_span!(
        "http_request",
        method = %method,
        path = %path,
        request_id = %request_id,
    );

    let start = Instant::now();
    let mut response = next.run(req).instrument(span.clone()).await;
    let status = response.status().as_u16();
    let latency_ms = start.elapsed().as_millis() as u64;

    span.in_scope(|| {
        if status >= 400 {
            warn!(status, latency_ms, "Request completed with error");
        } else {
            info!(status, latency_ms, "Request completed");
        }
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

/// 許可するオリジン。`*` 以外のときは資格情報付きリクエストも許可する。
#[derive(Debug, Clone)]
pub struct CorsOrigin(HeaderValue);

impl CorsOrigin {
    pub fn new(origin: &str) -> Result<Self, InvalidHeaderValue> {
        HeaderValue::from_str(origin).map(Self)
    }

    pub fn any() -> Self {
        Self(HeaderValue::from_static("*"))
    }

    fn is_any(&self) -> bool {
        self.0.as_bytes() == b"*"
    }
}

/// 全レスポンスに CORS ヘッダを付与する。プリフライトは 204 で即返す。
pub async fn cors(State(origin): State<CorsOrigin>, req: Request, next: Next) -> Response {
    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };

    let headers = response.headers_mut();
    if !origin.is_any() {
        // セッション Cookie を送れるようにする（`*` とは併用できない）
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
    }
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.0);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    response
}
