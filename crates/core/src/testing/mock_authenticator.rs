//! Mock site authenticator for testing.

use std::collections::HashSet;
use std::sync::Mutex;

use super::lock;
use crate::auth::SiteAuthenticator;

/// Mock implementation of the SiteAuthenticator trait.
///
/// Records every `(token, id_site)` call and answers from a configurable
/// policy: a default answer, per-site overrides and an optional required
/// token.
#[derive(Debug)]
pub struct MockAuthenticator {
    default_allow: bool,
    denied_sites: Mutex<HashSet<u64>>,
    allowed_sites: Mutex<HashSet<u64>>,
    required_token: Mutex<Option<String>>,
    calls: Mutex<Vec<(String, u64)>>,
}

impl MockAuthenticator {
    fn with_default(default_allow: bool) -> Self {
        Self {
            default_allow,
            denied_sites: Mutex::new(HashSet::new()),
            allowed_sites: Mutex::new(HashSet::new()),
            required_token: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Accept every token for every site unless told otherwise.
    pub fn allow_all() -> Self {
        Self::with_default(true)
    }

    /// Refuse every token for every site unless told otherwise.
    pub fn deny_all() -> Self {
        Self::with_default(false)
    }

    pub fn deny_site(&self, id_site: u64) {
        lock(&self.allowed_sites).remove(&id_site);
        lock(&self.denied_sites).insert(id_site);
    }

    pub fn allow_site(&self, id_site: u64) {
        lock(&self.denied_sites).remove(&id_site);
        lock(&self.allowed_sites).insert(id_site);
    }

    /// Only `token` is ever accepted.
    pub fn require_token(&self, token: &str) {
        *lock(&self.required_token) = Some(token.to_string());
    }

    /// Get all recorded `(token, id_site)` calls in order.
    pub fn recorded_calls(&self) -> Vec<(String, u64)> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }
}

impl SiteAuthenticator for MockAuthenticator {
    fn authenticate(&self, token: &str, id_site: u64) -> bool {
        lock(&self.calls).push((token.to_string(), id_site));

        if let Some(required) = lock(&self.required_token).as_deref() {
            if required != token {
                return false;
            }
        }
        if lock(&self.denied_sites).contains(&id_site) {
            return false;
        }
        if lock(&self.allowed_sites).contains(&id_site) {
            return true;
        }
        self.default_allow
    }

    fn method_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_and_recording() {
        let auth = MockAuthenticator::deny_all();
        auth.allow_site(2);
        auth.require_token("T");

        assert!(!auth.authenticate("T", 1));
        assert!(auth.authenticate("T", 2));
        assert!(!auth.authenticate("other", 2));
        assert_eq!(auth.call_count(), 3);
        assert_eq!(auth.recorded_calls()[1], ("T".to_string(), 2));
    }
}
