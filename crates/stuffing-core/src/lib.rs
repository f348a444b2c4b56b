//! Stuffing Core - Multiple Applications in One Host Process
//!
//! This crate lets a single installed host binary contain multiple logical
//! "app families" and switch which one is active at runtime, persisting the
//! choice across process restarts.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                      Host Process                     │
//! ├───────────────────────────────────────────────────────┤
//! │   boot                              user action       │
//! │    │                                     │            │
//! │ ┌──▼───────────┐                 ┌───────▼─────────┐  │
//! │ │ LaunchRouter │                 │ switch_to_family│  │
//! │ └──┬───────────┘                 └───────┬─────────┘  │
//! │    │ active family?                      │ hook       │
//! │ ┌──▼───────────────────┐                 │ persist    │
//! │ │  DynamicAppManager   │◄────────────────┘ restart    │
//! │ └──┬────────────────┬──┘                              │
//! │    │                │                                 │
//! │ ┌──▼─────────────┐ ┌▼───────────────┐                 │
//! │ │ IdentityStore  │ │ FamilyRegistry │                 │
//! │ │  (persistent)  │ │  (immutable)   │                 │
//! │ └────────────────┘ └────────────────┘                 │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! The manager owns the persisted "currently active family" state. A switch
//! runs the pre-switch hook, durably persists the new identity, and
//! triggers a full process restart; the next boot routes into the new
//! family's default entry point. The [`shell::AppShell`] forwards host
//! lifecycle calls to the active family's delegate, selected by name
//! through factories registered at startup, with no runtime reflection.

pub mod error;
pub mod manager;
pub mod registry;
pub mod restart;
pub mod router;
pub mod shell;
pub mod store;

pub use error::{Result, StuffingError};
pub use manager::{DynamicAppManager, SwitchCallback};
pub use registry::{
    AppFamilyConfig, AppFamilyRegistry, AppSwitchHook, DelegateFactory, DynamicAppConfig,
    EventAction, WarmUpHook,
};
pub use restart::{ExecRestarter, ProcessRestarter, RecordingRestarter};
pub use router::{
    EntryPoint, EntryPointResolver, LaunchRequest, LaunchRouter, MapEntryPointResolver,
    RoutedLaunch,
};
pub use shell::{AppDelegate, AppShell, HostConfig, MemoryTrimLevel};
pub use store::{FileIdentityStore, IdentityStore, MemoryIdentityStore};

/// Stuffing version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
