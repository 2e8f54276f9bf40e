//! Tracking endpoint: HTTP request to [`RawInput`], pipeline, [`TrackerResponse`] to HTTP.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{RawQuery, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::error;

use hitgate_core::tracker::{
    parse_pairs_lossy, RawInput, TrackerResponse, CONTENT_TYPE_GIF, TRANSPARENT_GIF,
};

use crate::metrics::TRACKER_RESPONSES_TOTAL;
use crate::state::AppState;

/// Handle a single hit or a bulk import.
///
/// The pipeline is synchronous and touches SQLite, so it runs on the
/// blocking pool.
pub async fn track(
    State(state): State<Arc<AppState>>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let input = raw_input(&method, query.as_deref(), &headers, &body);
    let tracker = state.tracker();

    let response = match tokio::task::spawn_blocking(move || tracker.main(&input)).await {
        Ok(response) => response,
        Err(e) => {
            error!("Tracker task failed: {}", e);
            TrackerResponse {
                status: 200,
                content_type: CONTENT_TYPE_GIF,
                headers: Vec::new(),
                body: TRANSPARENT_GIF.to_vec(),
            }
        }
    };

    TRACKER_RESPONSES_TOTAL
        .with_label_values(&[response.content_type, &response.status.to_string()])
        .inc();
    into_response(response)
}

/// Build the framework-independent input. Form bodies are only decoded for
/// `application/x-www-form-urlencoded` requests.
pub fn raw_input(
    method: &Method,
    query: Option<&str>,
    headers: &HeaderMap,
    body: &[u8],
) -> RawInput {
    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    let form = if is_form {
        parse_pairs_lossy(&String::from_utf8_lossy(body))
    } else {
        Vec::new()
    };

    RawInput {
        method: method.as_str().to_string(),
        origin: headers
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        query: query.map(parse_pairs_lossy).unwrap_or_default(),
        form,
        body: body.to_vec(),
    }
}

fn into_response(response: TrackerResponse) -> Response {
    let mut builder = Response::builder()
        .status(response.status)
        .header(header::CONTENT_TYPE, response.content_type);
    for (name, value) in &response.headers {
        builder = builder.header(name, value);
    }
    builder
        .body(Body::from(response.body))
        .unwrap_or_else(|e| {
            error!("Invalid tracker response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_raw_input_reads_form_only_for_urlencoded() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        headers.insert(header::ORIGIN, HeaderValue::from_static("https://shop.example"));

        let input = raw_input(&Method::POST, Some("idsite=1"), &headers, b"rec=1&url=a+b");
        assert_eq!(input.method, "POST");
        assert_eq!(input.origin.as_deref(), Some("https://shop.example"));
        assert_eq!(input.query, vec![("idsite".to_string(), "1".to_string())]);
        assert_eq!(input.form.len(), 2);
        assert_eq!(input.form[1], ("url".to_string(), "a b".to_string()));

        let input = raw_input(&Method::POST, None, &HeaderMap::new(), b"rec=1");
        assert!(input.form.is_empty());
        assert!(input.query.is_empty());
        assert_eq!(input.body, b"rec=1".to_vec());
    }

    #[test]
    fn test_raw_input_keeps_latin1_escapes() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );

        let input = raw_input(
            &Method::POST,
            Some("idsite=1&rec=1&action_name=%E9t%E9"),
            &headers,
            b"urlref=%E9&res=800x600",
        );
        assert_eq!(input.query.len(), 3);
        assert_eq!(input.query[2].1, "\u{FFFD}t\u{FFFD}");
        assert_eq!(input.form.len(), 2);
    }
}
