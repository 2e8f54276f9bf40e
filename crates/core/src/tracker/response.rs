//! Turns a batch outcome into the single response sent to the client.

use serde::Serialize;

use super::{BatchMode, BatchOutcome, PipelineState, RawInput};

/// 1x1 transparent GIF.
pub const TRANSPARENT_GIF: [u8; 43] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

/// Body sent when a request carries no parameters at all.
pub const EMPTY_REQUEST_FRAGMENT: &str = "<p>This is the hitgate tracking endpoint. \
It records page views and events sent by the JavaScript tracker, image pixels and bulk imports.</p>\n";

pub const CONTENT_TYPE_GIF: &str = "image/gif";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";

/// Framework-independent HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl TrackerResponse {
    fn new(status: u16, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_pixel(&self) -> bool {
        self.content_type == CONTENT_TYPE_GIF && self.body == TRANSPARENT_GIF
    }
}

#[derive(Serialize)]
struct BulkBody {
    status: &'static str,
    tracked: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Build the response for a finished batch.
pub fn emit(outcome: &BatchOutcome, input: &RawInput) -> TrackerResponse {
    match outcome.mode {
        BatchMode::Bulk => emit_bulk(outcome),
        BatchMode::Single => emit_single(outcome, input),
    }
}

fn emit_bulk(outcome: &BatchOutcome) -> TrackerResponse {
    let failure = outcome.first_failure();
    let body = BulkBody {
        status: if failure.is_some() { "error" } else { "success" },
        tracked: outcome.tracked,
        message: failure
            .filter(|_| outcome.may_disclose())
            .map(|f| f.error.public_message()),
    };
    let status = match failure {
        None => 200,
        Some(f) if f.error.is_intake() => 400,
        Some(_) => 500,
    };
    let json = serde_json::to_vec(&body).unwrap_or_else(|_| b"{\"status\":\"error\"}".to_vec());
    TrackerResponse::new(status, CONTENT_TYPE_JSON, json)
}

fn emit_single(outcome: &BatchOutcome, input: &RawInput) -> TrackerResponse {
    if let Some(failure) = outcome.first_failure() {
        if outcome.may_disclose() {
            let mut html = debug_output_html(&outcome.output);
            html.push_str(&format!(
                "<p>Error: {}</p>\n",
                escape_html(&failure.error.public_message())
            ));
            return TrackerResponse::new(500, CONTENT_TYPE_HTML, html);
        }
        return pixel(input);
    }

    if outcome.state == PipelineState::EmptyRequest {
        let mut html = debug_output_html(&outcome.output);
        html.push_str(EMPTY_REQUEST_FRAGMENT);
        return TrackerResponse::new(200, CONTENT_TYPE_HTML, html);
    }

    if outcome.debug || !outcome.output.is_empty() {
        return TrackerResponse::new(200, CONTENT_TYPE_HTML, debug_output_html(&outcome.output));
    }

    pixel(input)
}

fn pixel(input: &RawInput) -> TrackerResponse {
    let mut response = TrackerResponse::new(200, CONTENT_TYPE_GIF, TRANSPARENT_GIF.to_vec());
    if !input.is_get() {
        let origin = input
            .origin
            .as_deref()
            .filter(|o| !o.is_empty())
            .unwrap_or("*");
        response
            .headers
            .push(("Access-Control-Allow-Origin".to_string(), origin.to_string()));
        response
            .headers
            .push(("Access-Control-Allow-Credentials".to_string(), "true".to_string()));
    }
    response
}

fn debug_output_html(output: &str) -> String {
    if output.is_empty() {
        String::new()
    } else {
        format!("<pre>{}</pre>\n", escape_html(output))
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthError;
    use crate::tracker::{DbError, TrackerError, DB_CREDENTIALS_MESSAGE};

    fn outcome(mode: BatchMode, state: PipelineState) -> BatchOutcome {
        let mut outcome = BatchOutcome::new(mode, false);
        outcome.state = state;
        outcome
    }

    fn json(response: &TrackerResponse) -> serde_json::Value {
        serde_json::from_slice(&response.body).unwrap()
    }

    #[test]
    fn test_pixel_for_non_error_states() {
        for state in [
            PipelineState::NothingToNotice,
            PipelineState::NoscriptRequest,
            PipelineState::LoggingDisabled,
        ] {
            let response = emit(&outcome(BatchMode::Single, state), &RawInput::get("a=1"));
            assert_eq!(response.status, 200);
            assert!(response.is_pixel());
            assert!(response.headers.is_empty());
        }
    }

    #[test]
    fn test_cors_only_for_non_get() {
        let o = outcome(BatchMode::Single, PipelineState::NothingToNotice);

        let response = emit(&o, &RawInput::post("").with_origin("https://shop.example"));
        assert_eq!(response.header("access-control-allow-origin"), Some("https://shop.example"));
        assert_eq!(response.header("Access-Control-Allow-Credentials"), Some("true"));

        let response = emit(&o, &RawInput::post(""));
        assert_eq!(response.header("Access-Control-Allow-Origin"), Some("*"));
    }

    #[test]
    fn test_empty_request_fragment() {
        let response = emit(
            &outcome(BatchMode::Single, PipelineState::EmptyRequest),
            &RawInput::get(""),
        );
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, CONTENT_TYPE_HTML);
        assert_eq!(response.body_text(), EMPTY_REQUEST_FRAGMENT);
    }

    #[test]
    fn test_pixel_suppressed_in_debug() {
        let mut o = outcome(BatchMode::Single, PipelineState::NothingToNotice);
        o.debug = true;
        o.output = "Token <ok>\n".to_string();
        let response = emit(&o, &RawInput::get("a=1&b=2"));
        assert_eq!(response.content_type, CONTENT_TYPE_HTML);
        assert!(response.body_text().contains("Token &lt;ok&gt;"));
    }

    #[test]
    fn test_single_error_silent_for_anonymous() {
        let mut o = outcome(BatchMode::Single, PipelineState::NothingToNotice);
        o.record_failure(Some(0), TrackerError::Processing("Invalid idSite: '9'".into()));
        let response = emit(&o, &RawInput::get("idsite=9&rec=1"));
        assert!(response.is_pixel());
    }

    #[test]
    fn test_single_error_disclosed_when_authenticated() {
        let mut o = outcome(BatchMode::Single, PipelineState::NothingToNotice);
        o.authenticated = true;
        o.record_failure(Some(0), TrackerError::Processing("Invalid <idSite>".into()));
        let response = emit(&o, &RawInput::get("idsite=9&rec=1"));
        assert_eq!(response.status, 500);
        assert!(response.body_text().contains("Invalid &lt;idSite&gt;"));
    }

    #[test]
    fn test_access_denied_never_disclosed() {
        let mut o = outcome(BatchMode::Single, PipelineState::NothingToNotice);
        o.debug = true;
        o.record_failure(
            Some(0),
            TrackerError::Db(DbError::new(Some(1044), "Access denied for user 'secret_user'")),
        );
        let response = emit(&o, &RawInput::get("a=1&b=2"));
        let body = response.body_text();
        assert!(!body.contains("secret_user"));
        assert!(body.contains(&escape_html(DB_CREDENTIALS_MESSAGE)));
    }

    #[test]
    fn test_bulk_success() {
        let mut o = outcome(BatchMode::Bulk, PipelineState::NothingToNotice);
        o.tracked = 2;
        let response = emit(&o, &RawInput::post("{}"));
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, CONTENT_TYPE_JSON);
        assert_eq!(json(&response), serde_json::json!({"status": "success", "tracked": 2}));
    }

    #[test]
    fn test_bulk_auth_error_has_no_message_for_anonymous() {
        let mut o = outcome(BatchMode::Bulk, PipelineState::NothingToNotice);
        o.record_failure(None, AuthError::SiteDenied("3".into()).into());
        let response = emit(&o, &RawInput::post("{}"));
        assert_eq!(response.status, 400);
        assert_eq!(json(&response), serde_json::json!({"status": "error", "tracked": 0}));
    }

    #[test]
    fn test_bulk_item_error_message_when_authenticated() {
        let mut o = outcome(BatchMode::Bulk, PipelineState::NothingToNotice);
        o.authenticated = true;
        o.tracked = 1;
        o.record_failure(Some(1), TrackerError::Processing("Invalid idSite: '4'".into()));
        let response = emit(&o, &RawInput::post("{}"));
        assert_eq!(response.status, 500);
        let body = json(&response);
        assert_eq!(body["status"], "error");
        assert_eq!(body["tracked"], 1);
        assert_eq!(body["message"], "Invalid idSite: '4'");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;");
    }
}
