use super::{types::Config, AuthMethod, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Auth section exists (enforced by serde)
/// - A token is configured for the token auth method
/// - Server port and body limit are not 0
/// - The scheduled-task interval is not negative
/// - Seeded site ids are positive and unique
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.auth.method == AuthMethod::Token
        && config.auth.token.as_deref().map_or(true, str::is_empty)
    {
        return Err(ConfigError::ValidationError(
            "auth.token must be set when using the token auth method".to_string(),
        ));
    }

    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.server.max_body_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "server.max_body_bytes cannot be 0".to_string(),
        ));
    }

    if config.tracker.scheduled_tasks_min_interval < 0 {
        return Err(ConfigError::ValidationError(
            "tracker.scheduled_tasks_min_interval cannot be negative".to_string(),
        ));
    }

    let mut seen = std::collections::HashSet::new();
    for site in &config.sites {
        if site.id == 0 {
            return Err(ConfigError::ValidationError(format!(
                "sites: id must be positive (site '{}')",
                site.name
            )));
        }
        if !seen.insert(site.id) {
            return Err(ConfigError::ValidationError(format!(
                "sites: duplicate id {}",
                site.id
            )));
        }
    }

    Ok(())
}
