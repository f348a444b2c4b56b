//! App shell and the delegate capability interface
//!
//! The host process forwards its lifecycle to exactly one active
//! [`AppDelegate`] at a time: the one belonging to the currently active app
//! family. [`AppShell`] owns that selection, constructing the delegate
//! lazily through the factory registered for the active family.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Result, StuffingError};
use crate::manager::DynamicAppManager;

/// How aggressively the host is asked to release memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryTrimLevel {
    /// The host moved to the background; release caches opportunistically.
    Background,
    /// Memory is getting tight; release what can be rebuilt.
    Moderate,
    /// The process is close to being killed; release everything possible.
    Critical,
}

/// Snapshot of host environment configuration handed to delegates when it
/// changes.
#[derive(Debug, Clone, Default)]
pub struct HostConfig {
    values: HashMap<String, String>,
}

impl HostConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Capability interface implemented by each app family's application object.
///
/// Exactly one delegate is active at a time; the shell selects it by the
/// active family name and forwards every host lifecycle call to it.
pub trait AppDelegate: Send {
    /// Invoked once when the host process brings this application up.
    fn on_create(&mut self) -> Result<()>;

    /// The host is low on memory.
    fn on_low_memory(&mut self) {}

    /// The host asks the application to trim memory usage.
    fn on_trim_memory(&mut self, _level: MemoryTrimLevel) {}

    /// The host process is about to terminate.
    fn on_terminate(&mut self) {}

    /// The host environment configuration changed.
    fn on_configuration_changed(&mut self, _config: &HostConfig) {}

    /// Resolves a named service owned by this application, if any.
    fn system_service(&self, _name: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        None
    }
}

/// Host-process shell delegating lifecycle calls to the active family's
/// [`AppDelegate`].
///
/// The shell is constructed once at boot and passed down explicitly; it
/// holds no global state. The delegate is created on first use and kept for
/// the process lifetime; changing families requires a process restart, so
/// the selection never changes underneath it.
pub struct AppShell {
    manager: Arc<DynamicAppManager>,
    delegate: Mutex<Option<Box<dyn AppDelegate>>>,
}

impl AppShell {
    pub fn new(manager: Arc<DynamicAppManager>) -> Self {
        Self {
            manager,
            delegate: Mutex::new(None),
        }
    }

    pub fn manager(&self) -> &Arc<DynamicAppManager> {
        &self.manager
    }

    fn with_delegate<T>(&self, f: impl FnOnce(&mut dyn AppDelegate) -> T) -> Result<T> {
        let mut slot = self.delegate.lock();
        if slot.is_none() {
            let family = self.manager.application_family();
            let factory = self
                .manager
                .family_config(&family)
                .and_then(|config| config.delegate_factory())
                .cloned()
                .ok_or_else(|| StuffingError::DelegateUnavailable(family.clone()))?;

            tracing::debug!(%family, "creating app delegate");
            *slot = Some(factory());
        }
        Ok(f(slot.as_mut().expect("delegate just created").as_mut()))
    }

    pub fn on_create(&self) -> Result<()> {
        self.with_delegate(|delegate| delegate.on_create())?
    }

    pub fn on_low_memory(&self) -> Result<()> {
        self.with_delegate(|delegate| delegate.on_low_memory())
    }

    pub fn on_trim_memory(&self, level: MemoryTrimLevel) -> Result<()> {
        self.with_delegate(|delegate| delegate.on_trim_memory(level))
    }

    pub fn on_terminate(&self) -> Result<()> {
        self.with_delegate(|delegate| delegate.on_terminate())
    }

    pub fn on_configuration_changed(&self, config: &HostConfig) -> Result<()> {
        self.with_delegate(|delegate| delegate.on_configuration_changed(config))
    }

    pub fn system_service(&self, name: &str) -> Result<Option<Arc<dyn Any + Send + Sync>>> {
        self.with_delegate(|delegate| delegate.system_service(name))
    }
}
