//! Dynamic app manager
//!
//! Owns the "currently active app family" state: loads it from the
//! persistent identity store at initialization, exposes read accessors, and
//! implements the switch protocol (pre-switch hook → durable persist →
//! process restart). The manager is constructed once at boot in one of two
//! modes fixed for the process lifetime: single-family (switching disabled)
//! or multi-family (registry-backed).

use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};

use crate::error::{Result, StuffingError};
use crate::registry::{AppFamilyConfig, AppFamilyRegistry, AppSwitchHook, DynamicAppConfig};
use crate::restart::ProcessRestarter;
use crate::store::IdentityStore;

/// Storage keys for the persisted identity state.
mod keys {
    pub const CURRENT_FAMILY: &str = "app_family";
    pub const EXPECTED_FAMILY: &str = "expected_app_family";
    pub const PREVIOUS_FAMILY: &str = "previous_app_family";
    pub const CHANGE_SIGNAL: &str = "app_family_change_signal";
    pub const LAYOUT_VERSION: &str = "layout_version";
    pub const SWITCH_ATTEMPTS: &str = "switch_attempts";
    pub const SWITCHED_AT: &str = "switched_at";
}

/// Bumped when the persisted layout changes incompatibly; stale state is
/// discarded in favor of the default family.
const LAYOUT_VERSION: u32 = 2;

/// A switch that was started but never completed its clear-and-reset write
/// leaves a non-zero attempt counter behind; up to this many interrupted
/// attempts fall back to the default family at initialize.
const MAX_SWITCH_ATTEMPTS: u32 = 3;

/// Callback invoked once a non-restarting switch has persisted.
pub type SwitchCallback = Box<dyn FnOnce()>;

enum ManagerMode {
    /// One hardcoded family; switching is a configuration error.
    Single { config: AppFamilyConfig },
    /// Registry-backed; switching enabled.
    Multi {
        registry: AppFamilyRegistry,
        default_family: String,
    },
}

struct ManagerState {
    initialized: bool,
    current_family: String,
    change_signal: bool,
}

/// Manages multiple logical applications within a single host process.
pub struct DynamicAppManager {
    mode: ManagerMode,
    store: Arc<dyn IdentityStore>,
    restarter: Option<Arc<dyn ProcessRestarter>>,
    switch_hook: Option<Arc<dyn AppSwitchHook>>,
    config: DynamicAppConfig,
    state: RwLock<ManagerState>,
    /// Serializes the switch sequence; at most one hook → persist → restart
    /// runs at a time, concurrent callers are rejected as busy.
    switch_lock: Mutex<()>,
}

impl std::fmt::Debug for DynamicAppManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicAppManager").finish_non_exhaustive()
    }
}

impl DynamicAppManager {
    /// Creates a multi-family manager over `registry`.
    ///
    /// `default_family` must be a registry member; it is materialized on
    /// first run and whenever the persisted identity cannot be trusted.
    pub fn multi(
        registry: AppFamilyRegistry,
        default_family: impl Into<String>,
        config: DynamicAppConfig,
        store: Arc<dyn IdentityStore>,
        restarter: Arc<dyn ProcessRestarter>,
    ) -> Result<Self> {
        let default_family = default_family.into();
        if !registry.contains(&default_family) {
            return Err(StuffingError::InvalidConfig(format!(
                "default app family '{default_family}' is not in the registry"
            )));
        }

        Ok(Self {
            mode: ManagerMode::Multi {
                registry,
                default_family,
            },
            store,
            restarter: Some(restarter),
            switch_hook: None,
            config,
            state: RwLock::new(ManagerState {
                initialized: false,
                current_family: String::new(),
                change_signal: false,
            }),
            switch_lock: Mutex::new(()),
        })
    }

    /// Creates a single-family manager for hosts that are not actually
    /// dynamic. Switching is disabled; `config.name()` is always active.
    pub fn single(config: AppFamilyConfig, store: Arc<dyn IdentityStore>) -> Self {
        let family = config.name().to_string();
        Self {
            mode: ManagerMode::Single { config },
            store,
            restarter: None,
            switch_hook: None,
            config: DynamicAppConfig::new(),
            state: RwLock::new(ManagerState {
                initialized: false,
                current_family: family,
                change_signal: false,
            }),
            switch_lock: Mutex::new(()),
        }
    }

    /// Registers the hook notified before any app family switch takes effect.
    pub fn with_switch_hook(mut self, hook: impl AppSwitchHook + 'static) -> Self {
        self.switch_hook = Some(Arc::new(hook));
        self
    }

    /// Whether this manager is actively managing multiple families.
    pub fn active(&self) -> bool {
        matches!(self.mode, ManagerMode::Multi { .. })
    }

    /// The currently active app family name. Never blocks beyond a local
    /// lock read; empty until a multi-family manager is initialized.
    pub fn application_family(&self) -> String {
        self.state.read().current_family.clone()
    }

    /// The family materialized on first run and used as the fallback
    /// whenever persisted state cannot be trusted.
    pub fn default_family(&self) -> &str {
        match &self.mode {
            ManagerMode::Single { config } => config.name(),
            ManagerMode::Multi { default_family, .. } => default_family,
        }
    }

    /// The family that was active before the most recent switch, if any.
    pub fn previous_family(&self) -> Result<Option<String>> {
        self.store.get(keys::PREVIOUS_FAMILY)
    }

    /// Static configuration for `family`, if this manager knows it.
    pub fn family_config(&self, family: &str) -> Option<&AppFamilyConfig> {
        match &self.mode {
            ManagerMode::Single { config } if config.name() == family => Some(config),
            ManagerMode::Single { .. } => None,
            ManagerMode::Multi { registry, .. } => registry.get(family),
        }
    }

    /// Initializes the manager from persisted state. Idempotent: subsequent
    /// calls are no-ops with no additional store reads or writes.
    ///
    /// Fails fast when the store is unavailable: no safe current identity
    /// can be established, so boot must abort rather than continue with an
    /// undefined identity.
    pub fn initialize(&self) -> Result<()> {
        match &self.mode {
            ManagerMode::Multi {
                registry,
                default_family,
            } => self.initialize_multi(registry, default_family),
            ManagerMode::Single { config } => self.initialize_single(config.name().to_string()),
        }
    }

    fn initialize_multi(&self, registry: &AppFamilyRegistry, default_family: &str) -> Result<()> {
        let mut state = self.state.write();
        if state.initialized {
            return Ok(());
        }

        let current = self.store.get(keys::CURRENT_FAMILY)?;
        let change_signal = self.store.get(keys::CHANGE_SIGNAL)?.as_deref() == Some("true");
        let layout_version = self
            .store
            .get(keys::LAYOUT_VERSION)?
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0);
        let attempts = self
            .store
            .get(keys::SWITCH_ATTEMPTS)?
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0);

        tracing::debug!(
            current = current.as_deref().unwrap_or(""),
            change_signal,
            layout_version,
            attempts,
            "initializing dynamic app manager"
        );

        let stale_layout = layout_version != LAYOUT_VERSION;
        let interrupted = (1..=MAX_SWITCH_ATTEMPTS).contains(&attempts);
        let known_family = current
            .as_deref()
            .map(|family| registry.contains(family))
            .unwrap_or(false);

        if stale_layout || interrupted || !known_family {
            // The persisted identity is absent, half-written, or no longer a
            // registry member. Materialize the default family.
            tracing::info!(
                default_family,
                stale_layout,
                interrupted,
                known_family,
                "materializing default app family"
            );
            self.write_identity(default_family, current.as_deref().unwrap_or(""), false)?;
            state.current_family = default_family.to_string();
            state.change_signal = false;
        } else {
            state.current_family = current.expect("known family is present");
            state.change_signal = change_signal;
        }

        state.initialized = true;
        Ok(())
    }

    fn initialize_single(&self, family: String) -> Result<()> {
        let mut state = self.state.write();
        if state.initialized {
            return Ok(());
        }

        let stored = self.store.get(keys::CURRENT_FAMILY)?;
        if stored.as_deref() != Some(family.as_str()) {
            tracing::debug!(%family, "repairing persisted identity for single-family host");
            self.write_identity(&family, stored.as_deref().unwrap_or(""), false)?;
        }

        state.current_family = family;
        state.initialized = true;
        Ok(())
    }

    /// The entry-point identifier configured for the current family.
    pub fn default_launch_target(&self) -> Result<String> {
        let state = self.state.read();
        if !state.initialized {
            return Err(StuffingError::Uninitialized);
        }

        self.family_config(&state.current_family)
            .and_then(|config| config.default_launch_target())
            .map(str::to_owned)
            .ok_or_else(|| StuffingError::MissingLaunchTarget(state.current_family.clone()))
    }

    /// Switches the active app family to `target_family`.
    ///
    /// Sequence: validate → pre-switch hook → durable persist → restart or
    /// callback. The pre-switch hook runs before any state mutation, also
    /// for a same-family no-op switch; a hook error aborts with nothing
    /// persisted. With `restart_process` the restart is fire-and-forget and
    /// `on_complete` is skipped, since the process will not survive to run
    /// it reliably. Concurrent callers are rejected with
    /// [`StuffingError::SwitchInProgress`].
    pub fn switch_to_family(
        &self,
        target_family: &str,
        restart_process: bool,
        on_complete: Option<SwitchCallback>,
    ) -> Result<()> {
        let registry = match &self.mode {
            ManagerMode::Multi { registry, .. } => registry,
            ManagerMode::Single { .. } => return Err(StuffingError::SwitchingUnsupported),
        };

        let guard = self
            .switch_lock
            .try_lock()
            .ok_or(StuffingError::SwitchInProgress)?;

        let current = {
            let state = self.state.read();
            if !state.initialized {
                return Err(StuffingError::Uninitialized);
            }
            state.current_family.clone()
        };

        if !registry.contains(target_family) {
            return Err(StuffingError::UnknownFamily(target_family.to_string()));
        }

        // Happens-before any persisted mutation, and still runs for a
        // same-family switch. Never retried.
        if let Some(hook) = &self.switch_hook {
            hook.pre_switch(&current, target_family)
                .map_err(|e| StuffingError::HookFailed {
                    from: current.clone(),
                    to: target_family.to_string(),
                    reason: e.to_string(),
                })?;
        }

        if target_family == current {
            tracing::debug!(family = %current, "already in requested app family");
            if let Some(on_complete) = on_complete {
                on_complete();
            }
            return Ok(());
        }

        tracing::info!(from = %current, to = %target_family, "switching app families");

        // Mark the attempt first: if the clear-and-reset write below never
        // lands, the next initialize falls back to the default family
        // instead of booting a half-written identity.
        self.store.set(keys::SWITCH_ATTEMPTS, "1")?;
        self.write_identity(target_family, &current, true)?;

        {
            let mut state = self.state.write();
            state.current_family = target_family.to_string();
            state.change_signal = true;
        }

        if restart_process {
            // The restart trigger never returns; release the switch lock
            // rather than holding it across the call.
            drop(guard);
            if let Some(restarter) = &self.restarter {
                restarter.restart();
            }
        } else if let Some(on_complete) = on_complete {
            on_complete();
        }

        Ok(())
    }

    /// Persists the default family as current without restarting. The host
    /// is expected to restart the process afterwards. No-op for
    /// single-family managers.
    pub fn return_to_default_family(&self) -> Result<()> {
        match &self.mode {
            ManagerMode::Single { .. } => Ok(()),
            ManagerMode::Multi { default_family, .. } => {
                let default_family = default_family.clone();
                self.switch_to_family(&default_family, false, None)
            }
        }
    }

    /// Runs the action registered for `event_name`, if any. Events are only
    /// dispatched by multi-family managers; unknown names are ignored.
    pub fn on_event(&self, event_name: &str) {
        if !self.active() {
            return;
        }
        if let Some(action) = self.config.event(event_name) {
            tracing::debug!(event = %event_name, "dispatching app event");
            action();
        }
    }

    /// Whether the current session is the first one following an app family
    /// change.
    pub fn has_pending_family_change_signal(&self) -> bool {
        self.state.read().change_signal
    }

    /// Clears the pending change signal until the next family change.
    pub fn consume_family_change_signal(&self) -> Result<()> {
        let mut state = self.state.write();
        if !state.change_signal {
            return Ok(());
        }
        tracing::debug!("consuming pending app family change signal");
        self.store.set(keys::CHANGE_SIGNAL, "false")?;
        state.change_signal = false;
        Ok(())
    }

    /// Clear-and-reset write of the whole persisted identity in one durable
    /// step.
    fn write_identity(&self, family: &str, previous: &str, change_signal: bool) -> Result<()> {
        self.store.replace_all(&[
            (keys::CURRENT_FAMILY.to_string(), family.to_string()),
            (keys::EXPECTED_FAMILY.to_string(), family.to_string()),
            (keys::PREVIOUS_FAMILY.to_string(), previous.to_string()),
            (keys::CHANGE_SIGNAL.to_string(), change_signal.to_string()),
            (keys::LAYOUT_VERSION.to_string(), LAYOUT_VERSION.to_string()),
            (keys::SWITCH_ATTEMPTS.to_string(), "0".to_string()),
            (keys::SWITCHED_AT.to_string(), Utc::now().to_rfc3339()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restart::RecordingRestarter;
    use crate::store::MemoryIdentityStore;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::OnceLock;

    fn test_registry() -> AppFamilyRegistry {
        AppFamilyRegistry::new([
            AppFamilyConfig::new("first").with_launch_target("first.main"),
            AppFamilyConfig::new("second").with_launch_target("second.main"),
        ])
        .unwrap()
    }

    fn multi_manager(store: Arc<MemoryIdentityStore>) -> DynamicAppManager {
        DynamicAppManager::multi(
            test_registry(),
            "first",
            DynamicAppConfig::new(),
            store,
            Arc::new(RecordingRestarter::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_initialize_materializes_default() {
        let store = Arc::new(MemoryIdentityStore::new());
        let manager = multi_manager(store.clone());

        assert_eq!(manager.application_family(), "");
        manager.initialize().unwrap();

        assert_eq!(manager.application_family(), "first");
        assert_eq!(
            store.get("app_family").unwrap(),
            Some("first".to_string())
        );
        // First-run materialization does not raise the change signal.
        assert!(!manager.has_pending_family_change_signal());
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let store = Arc::new(MemoryIdentityStore::new());
        let manager = multi_manager(store.clone());

        manager.initialize().unwrap();
        let writes_after_first = store.write_count();

        manager.initialize().unwrap();
        manager.initialize().unwrap();

        assert_eq!(manager.application_family(), "first");
        assert_eq!(store.write_count(), writes_after_first);
    }

    #[test]
    fn test_initialize_fails_when_store_unavailable() {
        let store = Arc::new(MemoryIdentityStore::new());
        store.set_failing(true);
        let manager = multi_manager(store);

        let err = manager.initialize().unwrap_err();
        assert!(matches!(err, StuffingError::StoreUnavailable(_)));
    }

    #[test]
    fn test_switch_persists_and_survives_restart() {
        let store = Arc::new(MemoryIdentityStore::new());
        let manager = multi_manager(store.clone());
        manager.initialize().unwrap();

        let completed = Arc::new(AtomicBool::new(false));
        let completed_flag = completed.clone();
        manager
            .switch_to_family(
                "second",
                false,
                Some(Box::new(move || {
                    completed_flag.store(true, Ordering::SeqCst);
                })),
            )
            .unwrap();

        assert!(completed.load(Ordering::SeqCst));
        assert_eq!(manager.application_family(), "second");

        // A fresh manager over the same store simulates a process restart.
        let restarted = multi_manager(store.clone());
        let writes_before = store.write_count();
        restarted.initialize().unwrap();

        assert_eq!(restarted.application_family(), "second");
        assert_eq!(store.write_count(), writes_before);
    }

    #[test]
    fn test_same_family_switch_is_noop_but_notifies() {
        let store = Arc::new(MemoryIdentityStore::new());
        let hook_calls = Arc::new(AtomicUsize::new(0));
        let hook_counter = hook_calls.clone();
        let manager = multi_manager(store.clone()).with_switch_hook(
            move |_: &str, _: &str| -> anyhow::Result<()> {
                hook_counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        );
        manager.initialize().unwrap();

        let writes_before = store.write_count();
        let completed = Arc::new(AtomicBool::new(false));
        let completed_flag = completed.clone();
        manager
            .switch_to_family(
                "first",
                false,
                Some(Box::new(move || {
                    completed_flag.store(true, Ordering::SeqCst);
                })),
            )
            .unwrap();

        assert!(completed.load(Ordering::SeqCst));
        assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.write_count(), writes_before);
        assert_eq!(manager.application_family(), "first");
    }

    #[test]
    fn test_unknown_family_rejected() {
        let store = Arc::new(MemoryIdentityStore::new());
        let hook_calls = Arc::new(AtomicUsize::new(0));
        let hook_counter = hook_calls.clone();
        let manager = multi_manager(store.clone()).with_switch_hook(
            move |_: &str, _: &str| -> anyhow::Result<()> {
                hook_counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        );
        manager.initialize().unwrap();

        let completed = Arc::new(AtomicBool::new(false));
        let completed_flag = completed.clone();
        let err = manager
            .switch_to_family(
                "doesnotexist",
                false,
                Some(Box::new(move || {
                    completed_flag.store(true, Ordering::SeqCst);
                })),
            )
            .unwrap_err();

        assert!(matches!(err, StuffingError::UnknownFamily(_)));
        assert_eq!(manager.application_family(), "first");
        assert!(!completed.load(Ordering::SeqCst));
        assert_eq!(hook_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_hook_failure_aborts_switch() {
        let store = Arc::new(MemoryIdentityStore::new());
        let manager = multi_manager(store.clone()).with_switch_hook(
            |_: &str, _: &str| -> anyhow::Result<()> { Err(anyhow::anyhow!("cleanup failed")) },
        );
        manager.initialize().unwrap();

        let writes_before = store.write_count();
        let err = manager.switch_to_family("second", false, None).unwrap_err();

        assert!(matches!(err, StuffingError::HookFailed { .. }));
        assert_eq!(manager.application_family(), "first");
        assert_eq!(store.write_count(), writes_before);
        assert_eq!(
            store.get("app_family").unwrap(),
            Some("first".to_string())
        );
    }

    #[test]
    fn test_single_family_manager_rejects_switching() {
        let store = Arc::new(MemoryIdentityStore::new());
        let manager = DynamicAppManager::single(
            AppFamilyConfig::new("only").with_launch_target("only.main"),
            store.clone(),
        );
        manager.initialize().unwrap();

        let writes_before = store.write_count();
        let err = manager.switch_to_family("other", false, None).unwrap_err();

        assert!(matches!(err, StuffingError::SwitchingUnsupported));
        assert_eq!(manager.application_family(), "only");
        assert_eq!(store.write_count(), writes_before);
        assert!(!manager.active());
    }

    #[test]
    fn test_switch_with_restart_skips_callback() {
        let store = Arc::new(MemoryIdentityStore::new());
        let restarter = Arc::new(RecordingRestarter::new());
        let manager = DynamicAppManager::multi(
            test_registry(),
            "first",
            DynamicAppConfig::new(),
            store,
            restarter.clone(),
        )
        .unwrap();
        manager.initialize().unwrap();

        let completed = Arc::new(AtomicBool::new(false));
        let completed_flag = completed.clone();
        manager
            .switch_to_family(
                "second",
                true,
                Some(Box::new(move || {
                    completed_flag.store(true, Ordering::SeqCst);
                })),
            )
            .unwrap();

        assert_eq!(restarter.restart_count(), 1);
        // Fire-and-forget: the process may not survive long enough to run
        // the callback, so it is never invoked on the restart path.
        assert!(!completed.load(Ordering::SeqCst));
        assert_eq!(manager.application_family(), "second");
    }

    #[test]
    fn test_concurrent_switch_rejected_as_busy() {
        let store = Arc::new(MemoryIdentityStore::new());
        let manager_cell: Arc<OnceLock<Arc<DynamicAppManager>>> = Arc::new(OnceLock::new());
        let reentrant_result: Arc<Mutex<Option<StuffingError>>> = Arc::new(Mutex::new(None));

        let cell = manager_cell.clone();
        let result_slot = reentrant_result.clone();
        let manager = Arc::new(multi_manager(store).with_switch_hook(
            move |_: &str, _: &str| -> anyhow::Result<()> {
                // A second switch attempted while this one is in flight must
                // be rejected as busy.
                if let Some(manager) = cell.get() {
                    *result_slot.lock() = manager.switch_to_family("second", false, None).err();
                }
                Ok(())
            },
        ));
        manager_cell.set(manager.clone()).ok();
        manager.initialize().unwrap();

        manager.switch_to_family("second", false, None).unwrap();

        assert!(matches!(
            reentrant_result.lock().take(),
            Some(StuffingError::SwitchInProgress)
        ));
        assert_eq!(manager.application_family(), "second");
    }

    #[test]
    fn test_event_invocation() {
        let store = Arc::new(MemoryIdentityStore::new());
        let called = Arc::new(AtomicBool::new(false));
        let called_flag = called.clone();
        let config = DynamicAppConfig::new().with_event("test_event", move || {
            called_flag.store(true, Ordering::SeqCst);
        });
        let manager = DynamicAppManager::multi(
            test_registry(),
            "first",
            config,
            store,
            Arc::new(RecordingRestarter::new()),
        )
        .unwrap();

        manager.on_event("test_event");
        assert!(called.load(Ordering::SeqCst));

        // Unknown events are ignored.
        manager.on_event("unregistered");
    }

    #[test]
    fn test_change_signal_lifecycle() {
        let store = Arc::new(MemoryIdentityStore::new());
        let manager = multi_manager(store.clone());
        manager.initialize().unwrap();
        manager.switch_to_family("second", false, None).unwrap();

        // The first session after the change observes the signal.
        let restarted = multi_manager(store.clone());
        restarted.initialize().unwrap();
        assert!(restarted.has_pending_family_change_signal());

        restarted.consume_family_change_signal().unwrap();
        assert!(!restarted.has_pending_family_change_signal());

        // Later sessions no longer observe it.
        let later = multi_manager(store);
        later.initialize().unwrap();
        assert!(!later.has_pending_family_change_signal());
    }

    #[test]
    fn test_interrupted_switch_falls_back_to_default() {
        let store = Arc::new(MemoryIdentityStore::new());
        let manager = multi_manager(store.clone());
        manager.initialize().unwrap();
        manager.switch_to_family("second", false, None).unwrap();

        // Simulate a switch that bumped the attempt counter but never
        // completed its clear-and-reset write.
        store.set(super::keys::SWITCH_ATTEMPTS, "1").unwrap();

        let restarted = multi_manager(store);
        restarted.initialize().unwrap();
        assert_eq!(restarted.application_family(), "first");
    }

    #[test]
    fn test_stored_family_missing_from_registry_falls_back() {
        let store = Arc::new(MemoryIdentityStore::new());
        let manager = multi_manager(store.clone());
        manager.initialize().unwrap();

        // The host shipped a new registry that no longer contains the
        // persisted family.
        store.set(super::keys::CURRENT_FAMILY, "retired").unwrap();

        let restarted = multi_manager(store);
        restarted.initialize().unwrap();
        assert_eq!(restarted.application_family(), "first");
    }

    #[test]
    fn test_return_to_default_family() {
        let store = Arc::new(MemoryIdentityStore::new());
        let manager = multi_manager(store.clone());
        manager.initialize().unwrap();
        manager.switch_to_family("second", false, None).unwrap();
        assert_eq!(manager.previous_family().unwrap(), Some("first".to_string()));

        manager.return_to_default_family().unwrap();
        assert_eq!(manager.application_family(), "first");
        assert_eq!(
            store.get("app_family").unwrap(),
            Some("first".to_string())
        );
    }

    #[test]
    fn test_default_launch_target() {
        let store = Arc::new(MemoryIdentityStore::new());
        let manager = multi_manager(store);

        // Accessors that depend on the persisted identity require initialize.
        assert!(matches!(
            manager.default_launch_target(),
            Err(StuffingError::Uninitialized)
        ));

        manager.initialize().unwrap();
        assert_eq!(manager.default_launch_target().unwrap(), "first.main");
    }

    #[test]
    fn test_missing_launch_target_is_configuration_error() {
        let store = Arc::new(MemoryIdentityStore::new());
        let registry = AppFamilyRegistry::new([AppFamilyConfig::new("bare")]).unwrap();
        let manager = DynamicAppManager::multi(
            registry,
            "bare",
            DynamicAppConfig::new(),
            store,
            Arc::new(RecordingRestarter::new()),
        )
        .unwrap();
        manager.initialize().unwrap();

        let err = manager.default_launch_target().unwrap_err();
        assert!(matches!(err, StuffingError::MissingLaunchTarget(_)));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_multi_rejects_unknown_default_family() {
        let err = DynamicAppManager::multi(
            test_registry(),
            "missing",
            DynamicAppConfig::new(),
            Arc::new(MemoryIdentityStore::new()),
            Arc::new(RecordingRestarter::new()),
        )
        .unwrap_err();

        assert!(matches!(err, StuffingError::InvalidConfig(_)));
    }

    #[test]
    fn test_single_family_repairs_foreign_state() {
        let store = Arc::new(MemoryIdentityStore::new());
        store.set(super::keys::CURRENT_FAMILY, "other").unwrap();

        let manager = DynamicAppManager::single(
            AppFamilyConfig::new("only").with_launch_target("only.main"),
            store.clone(),
        );
        manager.initialize().unwrap();

        assert_eq!(manager.application_family(), "only");
        assert_eq!(store.get("app_family").unwrap(), Some("only".to_string()));
        assert_eq!(manager.default_launch_target().unwrap(), "only.main");
    }
}
