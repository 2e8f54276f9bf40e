//! Request intake: raw HTTP input to logical requests.

use std::collections::BTreeMap;

use serde_json::Value;

use super::TrackerError;
use crate::auth::AuthError;

/// Parameter name to string value for one logical request.
pub type Params = BTreeMap<String, String>;

/// The raw pieces of one HTTP submission, independent of the web framework.
#[derive(Debug, Clone, Default)]
pub struct RawInput {
    /// HTTP method, upper case.
    pub method: String,
    /// `Origin` request header.
    pub origin: Option<String>,
    /// Decoded query-string pairs, in order.
    pub query: Vec<(String, String)>,
    /// Decoded form-body pairs, in order (form-urlencoded bodies only).
    pub form: Vec<(String, String)>,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl RawInput {
    /// A GET request carrying the given query string.
    pub fn get(query_string: &str) -> Self {
        Self {
            method: "GET".to_string(),
            query: parse_pairs_lossy(query_string),
            ..Default::default()
        }
    }

    /// A POST request with a raw (JSON) body.
    pub fn post(body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: "POST".to_string(),
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_form(mut self, form_body: &str) -> Self {
        self.form = parse_pairs_lossy(form_body);
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Last value of a query-string parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Decoded bulk payload before per-site authentication.
#[derive(Debug, Clone)]
pub struct BulkRequest {
    pub token: String,
    pub requests: Vec<Params>,
}

/// Result of reading the raw input.
#[derive(Debug, Clone)]
pub enum Intake {
    /// Zero or one logical request built from query and form parameters.
    Single(Vec<Params>),
    Bulk(BulkRequest),
}

/// Split raw input into logical requests, detecting bulk mode.
pub fn read_input(input: &RawInput) -> Result<Intake, TrackerError> {
    if is_bulk_candidate(&input.body) {
        if let Some(bulk) = decode_bulk(&input.body)? {
            return Ok(Intake::Bulk(bulk));
        }
    }

    // Query parameters win over form parameters.
    let mut params = Params::new();
    for (key, value) in input.form.iter().chain(input.query.iter()) {
        params.insert(key.clone(), value.clone());
    }

    if params.is_empty() {
        Ok(Intake::Single(Vec::new()))
    } else {
        Ok(Intake::Single(vec![params]))
    }
}

/// Cheap pre-check before attempting a JSON decode.
fn is_bulk_candidate(body: &[u8]) -> bool {
    let trimmed = body.trim_ascii();
    if !trimmed.starts_with(b"{") {
        return false;
    }
    contains(trimmed, b"\"requests\"") || contains(trimmed, b"'requests'")
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Decode a bulk body.
///
/// Returns `Ok(None)` for a valid JSON object without a top-level
/// `requests` key; such bodies are not bulk submissions.
pub fn decode_bulk(body: &[u8]) -> Result<Option<BulkRequest>, TrackerError> {
    let value: Value =
        serde_json::from_slice(body.trim_ascii()).map_err(|e| TrackerError::Parse(e.to_string()))?;

    let Value::Object(mut root) = value else {
        return Ok(None);
    };
    let Some(requests) = root.remove("requests") else {
        return Ok(None);
    };

    let token = root
        .get("token_auth")
        .and_then(scalar_to_string)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;

    let Value::Array(elements) = requests else {
        return Err(TrackerError::Parse("\"requests\" must be an array".to_string()));
    };

    let requests = elements.iter().map(element_params).collect();
    Ok(Some(BulkRequest { token, requests }))
}

/// One element of the `requests` array.
fn element_params(element: &Value) -> Params {
    match element {
        Value::Object(map) => map
            .iter()
            .filter_map(|(k, v)| json_param(v).map(|v| (k.clone(), v)))
            .collect(),
        Value::String(url) => url_params(url),
        _ => Params::new(),
    }
}

fn json_param(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
        scalar => scalar_to_string(scalar),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parameters from the query component of a URL.
///
/// Best effort: a URL without a query, or with an undecodable one, yields
/// an empty map.
pub fn url_params(url: &str) -> Params {
    let Some((_, rest)) = url.split_once('?') else {
        return Params::new();
    };
    let query = rest.split_once('#').map_or(rest, |(q, _)| q);
    parse_query_string(query).unwrap_or_default()
}

/// Parse `a=1&b=2` into a map, later keys overwriting earlier ones.
/// Returns `None` when a component is not valid percent-encoded UTF-8.
pub fn parse_query_string(query: &str) -> Option<Params> {
    Some(parse_pairs(query)?.into_iter().collect())
}

/// Parse `a=1&b=2` into ordered pairs.
pub fn parse_pairs(query: &str) -> Option<Vec<(String, String)>> {
    let query = query.strip_prefix('?').unwrap_or(query);
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            Some((decode_component(key)?, decode_component(value)?))
        })
        .filter(|pair| !matches!(pair, Some((k, _)) if k.is_empty()))
        .collect()
}

/// Parse `a=1&b=2` into ordered pairs, never dropping a pair.
///
/// Escapes that do not decode to UTF-8 (Latin-1 page titles, for instance)
/// are replaced with U+FFFD instead of failing the whole query.
pub fn parse_pairs_lossy(query: &str) -> Vec<(String, String)> {
    let query = query.strip_prefix('?').unwrap_or(query);
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component_lossy(key), decode_component_lossy(value))
        })
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

fn decode_component(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced).ok().map(|s| s.into_owned())
}

fn decode_component_lossy(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}
