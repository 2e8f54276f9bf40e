//! One logical tracking request and the overrides it may force.

use std::net::IpAddr;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use super::intake::Params;

/// A single hit as seen by the pipeline.
#[derive(Debug, Clone, Default)]
pub struct TrackerRequest {
    params: Params,
    token_auth: Option<String>,
    authenticated: bool,
}

impl TrackerRequest {
    pub fn new(params: Params, token_auth: Option<String>, authenticated: bool) -> Self {
        Self {
            params,
            token_auth: token_auth.filter(|t| !t.is_empty()),
            authenticated,
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn params_count(&self) -> usize {
        self.params.len()
    }

    /// `idsite`, when it is a positive integer.
    pub fn id_site(&self) -> Option<u64> {
        self.param("idsite").and_then(parse_site_id)
    }

    pub fn token_auth(&self) -> Option<&str> {
        self.token_auth.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// True when the parameter is present and equals `1`.
    pub fn flag(&self, name: &str) -> bool {
        self.param(name).is_some_and(|v| v.trim() == "1")
    }
}

/// Parse a site id; only positive integers that fit a SQLite INTEGER are
/// site ids.
pub fn parse_site_id(raw: &str) -> Option<u64> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id > 0 && i64::try_from(*id).is_ok())
}

/// Values an authenticated caller may force on the next visit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForcedOverrides {
    pub ip: Option<IpAddr>,
    pub datetime: Option<DateTime<Utc>>,
    pub visitor_id: Option<String>,
}

impl ForcedOverrides {
    pub fn is_empty(&self) -> bool {
        self.ip.is_none() && self.datetime.is_none() && self.visitor_id.is_none()
    }
}

pub fn parse_forced_ip(raw: &str) -> Option<IpAddr> {
    raw.trim().parse().ok()
}

/// Unix seconds, `YYYY-MM-DD HH:MM:SS` (UTC) or RFC 3339.
pub fn parse_forced_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return Utc.timestamp_opt(secs, 0).single();
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// 16 hex characters, normalized to lower case.
pub fn parse_forced_visitor_id(raw: &str) -> Option<String> {
    let raw = raw.trim();
    (raw.len() == 16 && raw.chars().all(|c| c.is_ascii_hexdigit())).then(|| raw.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(pairs: &[(&str, &str)]) -> TrackerRequest {
        let params = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TrackerRequest::new(params, None, false)
    }

    #[test]
    fn test_site_id_parsing() {
        assert_eq!(parse_site_id("1"), Some(1));
        assert_eq!(parse_site_id(" 42 "), Some(42));
        assert_eq!(parse_site_id("0"), None);
        assert_eq!(parse_site_id("-3"), None);
        assert_eq!(parse_site_id("abc"), None);
        assert_eq!(parse_site_id("9223372036854775807"), Some(i64::MAX as u64));
        assert_eq!(parse_site_id("9223372036854775808"), None);
        assert_eq!(parse_site_id("18446744073709551615"), None);
    }

    #[test]
    fn test_request_accessors() {
        let req = request(&[("idsite", "7"), ("dp", "1"), ("rec", "0")]);
        assert_eq!(req.id_site(), Some(7));
        assert_eq!(req.params_count(), 3);
        assert!(req.flag("dp"));
        assert!(!req.flag("rec"));
        assert!(!req.flag("missing"));
        assert!(req.token_auth().is_none());
    }

    #[test]
    fn test_empty_token_is_no_token() {
        let req = TrackerRequest::new(Params::new(), Some(String::new()), false);
        assert!(req.token_auth().is_none());
    }

    #[test]
    fn test_forced_ip() {
        assert_eq!(parse_forced_ip("10.0.0.1"), Some("10.0.0.1".parse().unwrap()));
        assert!(parse_forced_ip("::1").is_some());
        assert!(parse_forced_ip("not-an-ip").is_none());
    }

    #[test]
    fn test_forced_datetime_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_forced_datetime("1709296200"), Some(expected));
        assert_eq!(parse_forced_datetime("2024-03-01 12:30:00"), Some(expected));
        assert_eq!(parse_forced_datetime("2024-03-01T14:30:00+02:00"), Some(expected));
        assert!(parse_forced_datetime("yesterday").is_none());
    }

    #[test]
    fn test_forced_visitor_id() {
        assert_eq!(
            parse_forced_visitor_id("ABCDEF0123456789"),
            Some("abcdef0123456789".to_string())
        );
        assert!(parse_forced_visitor_id("abc").is_none());
        assert!(parse_forced_visitor_id("zzzzzzzzzzzzzzzz").is_none());
    }
}
