mod none;
mod sqlite;
mod token;
mod traits;

pub use none::*;
pub use sqlite::*;
pub use token::*;
pub use traits::*;

use std::sync::Arc;

use crate::config::{AuthConfig, AuthMethod};
use crate::store::SqliteSiteStore;

/// Factory function to create authenticator from config
pub fn create_authenticator(
    config: &AuthConfig,
    sites: Arc<SqliteSiteStore>,
) -> Result<Box<dyn SiteAuthenticator>, AuthError> {
    match config.method {
        AuthMethod::None => Ok(Box::new(NoneAuthenticator::new())),
        AuthMethod::Token => {
            let token = config
                .token
                .clone()
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    AuthError::ConfigurationError(
                        "token must be set when using the token auth method".to_string(),
                    )
                })?;
            Ok(Box::new(TokenAuthenticator::new(token)))
        }
        AuthMethod::Sqlite => Ok(Box::new(SqliteAuthenticator::new(sites))),
    }
}
