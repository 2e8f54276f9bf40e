//! Per-site authentication of bulk imports.

use tracing::{debug, warn};

use super::intake::{BulkRequest, Params};
use super::request::parse_site_id;
use crate::auth::{AuthError, SiteAuthenticator};

/// A bulk import whose every referenced site accepted the token.
#[derive(Debug, Clone)]
pub struct BulkBatch {
    pub token: String,
    pub requests: Vec<Params>,
    /// Distinct site ids, in first-seen order.
    pub sites: Vec<u64>,
}

impl BulkBatch {
    pub fn is_site_validated(&self, id_site: u64) -> bool {
        self.sites.contains(&id_site)
    }
}

/// Authenticate the token once for each distinct `idsite` referenced by the
/// batch, stopping at the first refusal.
///
/// Requests without an `idsite` reference no site and are not checked here.
pub fn authenticate_bulk(
    bulk: BulkRequest,
    authenticator: &dyn SiteAuthenticator,
) -> Result<BulkBatch, AuthError> {
    let mut sites: Vec<u64> = Vec::new();

    for raw in bulk.requests.iter().filter_map(|r| r.get("idsite")) {
        let Some(id_site) = parse_site_id(raw) else {
            warn!(idsite = %raw, "Bulk request references an invalid site id");
            return Err(AuthError::SiteDenied(raw.clone()));
        };
        if sites.contains(&id_site) {
            continue;
        }
        if !authenticator.authenticate(&bulk.token, id_site) {
            warn!(id_site, "Bulk token refused for site");
            return Err(AuthError::SiteDenied(id_site.to_string()));
        }
        sites.push(id_site);
    }

    debug!(sites = ?sites, requests = bulk.requests.len(), "Bulk token accepted");
    Ok(BulkBatch {
        token: bulk.token,
        requests: bulk.requests,
        sites,
    })
}
