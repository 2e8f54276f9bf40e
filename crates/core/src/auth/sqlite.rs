use std::sync::Arc;

use tracing::warn;

use super::SiteAuthenticator;
use crate::store::SqliteSiteStore;

/// Authenticator backed by the site registry's token and access tables.
pub struct SqliteAuthenticator {
    sites: Arc<SqliteSiteStore>,
}

impl SqliteAuthenticator {
    pub fn new(sites: Arc<SqliteSiteStore>) -> Self {
        Self { sites }
    }
}

impl SiteAuthenticator for SqliteAuthenticator {
    fn authenticate(&self, token: &str, id_site: u64) -> bool {
        if token.is_empty() {
            return false;
        }
        match self.sites.has_admin_access(token, id_site) {
            Ok(granted) => granted,
            Err(e) => {
                warn!(id_site, error = %e, "Access lookup failed, refusing token");
                false
            }
        }
    }

    fn method_name(&self) -> &'static str {
        "sqlite"
    }
}
