use super::AppState;
use super::body::{BodyReadError, read_json_body};
use crate::classify::ValidationFailure;
use crate::orchestrator::RequestDescriptor;
use crate::validation::QueryParams;
use axum::Json;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

impl IntoResponse for ValidationFailure {
    fn into_response(self) -> Response {
        let allow = self.allow_header();
        let mut response = (self.status(), Json(self.payload())).into_response();
        if let Some(allow) = allow
            && let Ok(value) = HeaderValue::from_str(&allow)
        {
            response.headers_mut().insert(header::ALLOW, value);
        }
        response
    }
}

/// Validate each request before it reaches the downstream handler.
///
/// Failures are answered here; accepted requests carry a `ValidatedRequest` extension.
pub async fn validate_request(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let config = state.config();
    if !config.enabled {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    let (bytes, body) = match read_json_body(&parts.headers, body, config.max_body_bytes).await {
        Ok(read) => read,
        Err(BodyReadError::TooLarge { limit }) => {
            tracing::warn!("Request body larger than {} bytes rejected", limit);
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("request body exceeds {} bytes", limit),
            )
                .into_response();
        }
        Err(BodyReadError::Stream(e)) => {
            return (StatusCode::BAD_REQUEST, format!("failed to read request body: {}", e))
                .into_response();
        }
    };

    let descriptor = RequestDescriptor {
        method: parts.method.clone(),
        path: parts.uri.path().to_string(),
        headers: parts.headers.clone(),
        query: parts
            .uri
            .query()
            .map(QueryParams::from_query_string)
            .unwrap_or_default(),
        body,
    };

    match state.validator.validate(&descriptor) {
        Ok(validated) => {
            parts.extensions.insert(validated);
            next.run(Request::from_parts(parts, Body::from(bytes))).await
        }
        Err(failure) => failure.into_response(),
    }
}
