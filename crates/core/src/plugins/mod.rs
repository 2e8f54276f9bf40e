//! Tracker extension points.
//!
//! Plugins are registered once at startup and consulted in registration
//! order. Each item loads its own plugin set so that an authenticated import
//! can exclude some of them with `dp=1`.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::tracker::TrackerRequest;
use crate::visit::VisitHandler;

#[derive(Debug, Error)]
#[error("Plugin {plugin} failed: {message}")]
pub struct PluginError {
    pub plugin: String,
    pub message: String,
}

impl PluginError {
    pub fn new(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}

/// Hooks a plugin may implement; every hook defaults to a no-op.
pub trait TrackerPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Adjust the tracker database settings before the batch connection opens.
    fn configure_database(&self, _config: &mut DatabaseConfig) {}

    /// Substitute the visit handler.
    fn visit_handler(&self) -> Option<Arc<dyn VisitHandler>> {
        None
    }

    /// Inspect a valid request before it reaches the visit handler.
    fn prepare(&self, _request: &TrackerRequest) -> Result<(), PluginError> {
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn TrackerPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Arc<dyn TrackerPlugin>) {
        debug!(plugin = plugin.name(), "Registered tracker plugin");
        self.plugins.push(plugin);
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Plugin set for one item, without the `excluded` names.
    pub fn load(&self, excluded: &[String]) -> LoadedPlugins<'_> {
        let plugins = self
            .plugins
            .iter()
            .filter(|p| {
                let skip = excluded.iter().any(|name| name == p.name());
                if skip {
                    debug!(plugin = p.name(), "Plugin excluded for this request");
                }
                !skip
            })
            .collect();
        LoadedPlugins { plugins }
    }
}

/// Plugins active for one item.
pub struct LoadedPlugins<'a> {
    plugins: Vec<&'a Arc<dyn TrackerPlugin>>,
}

impl LoadedPlugins<'_> {
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn prepare(&self, request: &TrackerRequest) -> Result<(), PluginError> {
        self.plugins.iter().try_for_each(|p| p.prepare(request))
    }

    pub fn database_config(&self, base: &DatabaseConfig) -> DatabaseConfig {
        let mut config = base.clone();
        for plugin in &self.plugins {
            plugin.configure_database(&mut config);
        }
        config
    }

    /// The first substituted handler, or `default`.
    pub fn visit_handler(&self, default: &Arc<dyn VisitHandler>) -> Arc<dyn VisitHandler> {
        self.plugins
            .iter()
            .find_map(|p| p.visit_handler())
            .unwrap_or_else(|| default.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockPlugin, MockVisitHandler};
    use crate::tracker::Params;
    use crate::visit::SiteVisitHandler;

    fn request() -> TrackerRequest {
        TrackerRequest::new(Params::new(), None, false)
    }

    #[test]
    fn test_load_excludes_named_plugins() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(MockPlugin::new("Provider")));
        registry.register(Arc::new(MockPlugin::new("Heatmap")));

        assert_eq!(registry.load(&[]).names(), vec!["Provider", "Heatmap"]);
        assert_eq!(
            registry.load(&["Provider".to_string()]).names(),
            vec!["Heatmap"]
        );
    }

    #[test]
    fn test_prepare_stops_at_first_failure() {
        let failing = Arc::new(MockPlugin::new("Broken").failing_prepare("bad request"));
        let after = Arc::new(MockPlugin::new("After"));
        let mut registry = PluginRegistry::new();
        registry.register(failing.clone());
        registry.register(after.clone());

        let err = registry.load(&[]).prepare(&request()).unwrap_err();
        assert_eq!(err.to_string(), "Plugin Broken failed: bad request");
        assert_eq!(failing.prepare_count(), 1);
        assert_eq!(after.prepare_count(), 0);
    }

    #[test]
    fn test_database_config_hooks_apply_in_order() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(MockPlugin::new("A").with_busy_timeout(10)));
        registry.register(Arc::new(MockPlugin::new("B").with_busy_timeout(20)));

        let config = registry.load(&[]).database_config(&DatabaseConfig::default());
        assert_eq!(config.busy_timeout_ms, 20);
    }

    #[test]
    fn test_visit_handler_substitution() {
        let default: Arc<dyn VisitHandler> = Arc::new(SiteVisitHandler::new());
        let substitute = Arc::new(MockVisitHandler::new());

        let mut registry = PluginRegistry::new();
        assert_eq!(registry.load(&[]).visit_handler(&default).name(), "site");

        registry.register(Arc::new(MockPlugin::new("Alt").with_visit_handler(substitute)));
        assert_eq!(registry.load(&[]).visit_handler(&default).name(), "mock");
        assert_eq!(
            registry.load(&["Alt".to_string()]).visit_handler(&default).name(),
            "site"
        );
    }
}
