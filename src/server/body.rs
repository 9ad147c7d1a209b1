use crate::validation::BodyValue;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, header};

/// Why a body could not be read
#[derive(Debug, PartialEq, Eq)]
pub enum BodyReadError {
    TooLarge { limit: usize },
    Stream(String),
}

/// Buffer a request body and interpret it as JSON.
///
/// Returns the raw bytes too, so the request can be rebuilt for the downstream handler.
pub async fn read_json_body(
    headers: &HeaderMap,
    body: Body,
    limit: usize,
) -> Result<(Bytes, BodyValue), BodyReadError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(BodyReadError::TooLarge { limit });
    }

    let bytes = axum::body::to_bytes(body, limit).await.map_err(|e| {
        // Chunked bodies only hit the limit while streaming
        if declared.is_none() {
            BodyReadError::TooLarge { limit }
        } else {
            BodyReadError::Stream(e.to_string())
        }
    })?;

    let value = BodyValue::from_bytes(&bytes);
    Ok((bytes, value))
}
