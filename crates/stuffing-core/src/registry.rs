//! App family registry and per-family configuration
//!
//! An app family is a logical application identity that can be the active
//! one inside the shared host process. The registry is an immutable mapping
//! from family name to its static configuration, built once at host startup.
//! Lookup is by exact name; unknown names surface as "not found" and are
//! never defaulted here. Falling back to the default family is the
//! manager's responsibility.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, StuffingError};
use crate::shell::AppDelegate;

/// App-family initialization invoked before its entry point is shown.
/// Runs synchronously on the caller's thread and must not block on UI work.
pub type WarmUpHook = Arc<dyn Fn() + Send + Sync>;

/// Named action dispatched through [`DynamicAppConfig`] events.
pub type EventAction = Arc<dyn Fn() + Send + Sync>;

/// Constructs the app delegate for a family. Factories are resolved at
/// registry-build time, keyed by family name, so picking an implementation
/// by name needs no runtime reflection.
pub type DelegateFactory = Arc<dyn Fn() -> Box<dyn AppDelegate> + Send + Sync>;

/// Opportunity to execute code prior to an app family being changed.
///
/// Invoked synchronously with the outgoing and incoming family names before
/// any persisted mutation. An error aborts the switch and is surfaced to the
/// caller; the hook is never retried.
pub trait AppSwitchHook: Send + Sync {
    fn pre_switch(&self, from_family: &str, to_family: &str) -> anyhow::Result<()>;
}

impl<F> AppSwitchHook for F
where
    F: Fn(&str, &str) -> anyhow::Result<()> + Send + Sync,
{
    fn pre_switch(&self, from_family: &str, to_family: &str) -> anyhow::Result<()> {
        self(from_family, to_family)
    }
}

/// Static configuration for one app family.
#[derive(Clone)]
pub struct AppFamilyConfig {
    name: String,
    default_launch_target: Option<String>,
    warm_up: Option<WarmUpHook>,
    switch_screen: Option<String>,
    delegate_factory: Option<DelegateFactory>,
}

impl AppFamilyConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_launch_target: None,
            warm_up: None,
            switch_screen: None,
            delegate_factory: None,
        }
    }

    /// Sets the entry-point identifier routed to when this family is active.
    pub fn with_launch_target(mut self, target: impl Into<String>) -> Self {
        self.default_launch_target = Some(target.into());
        self
    }

    /// Sets the warm-up hook run before this family's entry point is shown.
    pub fn with_warm_up(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.warm_up = Some(Arc::new(hook));
        self
    }

    /// Sets the interstitial screen resource shown while switching.
    pub fn with_switch_screen(mut self, screen: impl Into<String>) -> Self {
        self.switch_screen = Some(screen.into());
        self
    }

    /// Sets the factory constructing this family's app delegate.
    pub fn with_delegate(
        mut self,
        factory: impl Fn() -> Box<dyn AppDelegate> + Send + Sync + 'static,
    ) -> Self {
        self.delegate_factory = Some(Arc::new(factory));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_launch_target(&self) -> Option<&str> {
        self.default_launch_target.as_deref()
    }

    pub fn warm_up(&self) -> Option<&WarmUpHook> {
        self.warm_up.as_ref()
    }

    pub fn switch_screen(&self) -> Option<&str> {
        self.switch_screen.as_deref()
    }

    pub fn delegate_factory(&self) -> Option<&DelegateFactory> {
        self.delegate_factory.as_ref()
    }
}

impl std::fmt::Debug for AppFamilyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppFamilyConfig")
            .field("name", &self.name)
            .field("default_launch_target", &self.default_launch_target)
            .field("switch_screen", &self.switch_screen)
            .field("warm_up", &self.warm_up.is_some())
            .field("delegate_factory", &self.delegate_factory.is_some())
            .finish()
    }
}

/// Immutable mapping from family name to configuration.
#[derive(Clone)]
pub struct AppFamilyRegistry {
    families: HashMap<String, AppFamilyConfig>,
}

impl AppFamilyRegistry {
    /// Builds a registry from the declared family configurations.
    ///
    /// Rejects empty and duplicate family names, since the name is the key
    /// used everywhere else.
    pub fn new(configs: impl IntoIterator<Item = AppFamilyConfig>) -> Result<Self> {
        let mut families = HashMap::new();
        for config in configs {
            if config.name().is_empty() {
                return Err(StuffingError::InvalidConfig(
                    "app family name must not be empty".to_string(),
                ));
            }
            if families.contains_key(config.name()) {
                return Err(StuffingError::InvalidConfig(format!(
                    "duplicate app family name: {}",
                    config.name()
                )));
            }
            families.insert(config.name().to_string(), config);
        }
        Ok(Self { families })
    }

    /// Looks up a family by exact name.
    pub fn get(&self, name: &str) -> Option<&AppFamilyConfig> {
        self.families.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.families.contains_key(name)
    }

    pub fn families(&self) -> impl Iterator<Item = &AppFamilyConfig> {
        self.families.values()
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

impl std::fmt::Debug for AppFamilyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.families.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("AppFamilyRegistry")
            .field("families", &names)
            .finish()
    }
}

/// Runtime configuration for a dynamic app manager: named actions executed
/// when the corresponding event is dispatched through `on_event`.
#[derive(Clone, Default)]
pub struct DynamicAppConfig {
    events: HashMap<String, EventAction>,
}

impl DynamicAppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action for `event_name`.
    pub fn with_event(
        mut self,
        event_name: impl Into<String>,
        action: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.events.insert(event_name.into(), Arc::new(action));
        self
    }

    pub(crate) fn event(&self, event_name: &str) -> Option<&EventAction> {
        self.events.get(event_name)
    }
}

impl std::fmt::Debug for DynamicAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.events.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("DynamicAppConfig")
            .field("events", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let registry = AppFamilyRegistry::new([
            AppFamilyConfig::new("first").with_launch_target("first.main"),
            AppFamilyConfig::new("second").with_launch_target("second.main"),
        ])
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("first"));
        assert_eq!(
            registry.get("second").unwrap().default_launch_target(),
            Some("second.main")
        );
        assert!(registry.get("third").is_none());
    }

    #[test]
    fn test_registry_rejects_duplicate_names() {
        let err = AppFamilyRegistry::new([
            AppFamilyConfig::new("first"),
            AppFamilyConfig::new("first"),
        ])
        .unwrap_err();

        assert!(matches!(err, StuffingError::InvalidConfig(_)));
    }

    #[test]
    fn test_registry_rejects_empty_name() {
        let err = AppFamilyRegistry::new([AppFamilyConfig::new("")]).unwrap_err();
        assert!(matches!(err, StuffingError::InvalidConfig(_)));
    }

    #[test]
    fn test_family_config_builder() {
        let config = AppFamilyConfig::new("first")
            .with_launch_target("first.main")
            .with_switch_screen("switch_screen")
            .with_warm_up(|| {});

        assert_eq!(config.name(), "first");
        assert_eq!(config.default_launch_target(), Some("first.main"));
        assert_eq!(config.switch_screen(), Some("switch_screen"));
        assert!(config.warm_up().is_some());
        assert!(config.delegate_factory().is_none());
    }
}
