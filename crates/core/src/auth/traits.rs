use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token_auth must be specified when using Bulk Tracking Import")]
    MissingToken,

    #[error("token_auth specified does not have Admin permission for idsite={0}")]
    SiteDenied(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Decides whether a token may write tracking data for a site.
///
/// Implementations answer with a plain yes/no; lookup failures are logged
/// and count as a refusal.
pub trait SiteAuthenticator: Send + Sync {
    /// True when `token` belongs to a super user or a site admin of `id_site`.
    fn authenticate(&self, token: &str, id_site: u64) -> bool;

    /// Name of this authentication method
    fn method_name(&self) -> &'static str;
}
