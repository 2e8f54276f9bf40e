//! Static super-user token authentication.

use super::SiteAuthenticator;

/// Authenticator holding one configured token with admin access on every site.
pub struct TokenAuthenticator {
    expected_token: String,
}

impl TokenAuthenticator {
    pub fn new(token: String) -> Self {
        Self {
            expected_token: token,
        }
    }
}

impl SiteAuthenticator for TokenAuthenticator {
    fn authenticate(&self, token: &str, _id_site: u64) -> bool {
        if token.is_empty() {
            return false;
        }
        // Constant-time comparison to prevent timing attacks
        constant_time_eq(token.as_bytes(), self.expected_token.as_bytes())
    }

    fn method_name(&self) -> &'static str {
        "token"
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_token_any_site() {
        let auth = TokenAuthenticator::new("secret-token-123".to_string());
        assert!(auth.authenticate("secret-token-123", 1));
        assert!(auth.authenticate("secret-token-123", 999));
    }

    #[test]
    fn test_invalid_token() {
        let auth = TokenAuthenticator::new("secret-token-123".to_string());
        assert!(!auth.authenticate("wrong-token", 1));
        assert!(!auth.authenticate("", 1));
    }

    #[test]
    fn test_method_name() {
        let auth = TokenAuthenticator::new("test".to_string());
        assert_eq!(auth.method_name(), "token");
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
        assert!(!constant_time_eq(b"", b"x"));
        assert!(constant_time_eq(b"", b""));
    }
}
