use super::SiteAuthenticator;

/// Authenticator that refuses every token.
/// Tracking still works anonymously; bulk import and the tracking overrides do not.
pub struct NoneAuthenticator;

impl NoneAuthenticator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoneAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteAuthenticator for NoneAuthenticator {
    fn authenticate(&self, _token: &str, _id_site: u64) -> bool {
        false
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_authenticator_refuses() {
        let auth = NoneAuthenticator::new();
        assert!(!auth.authenticate("anything", 1));
    }

    #[test]
    fn test_none_authenticator_default() {
        let auth = NoneAuthenticator::default();
        assert_eq!(auth.method_name(), "none");
    }
}
