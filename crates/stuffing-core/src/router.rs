//! Launch routing
//!
//! The host launcher always enters through the same surface; which actual
//! entry point comes up depends on the active app family. The router reads
//! the active family's default launch target from the manager, resolves it
//! to a concrete entry point, and hands back the request to deliver there,
//! retargeting an inbound request when one exists so deep links keep their
//! original semantics after the redirect.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, StuffingError};
use crate::manager::DynamicAppManager;

/// An addressed request to bring up an entry point, carrying auxiliary
/// payload data (deep-link parameters and the like).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchRequest {
    /// Request ID
    pub id: Uuid,

    /// Target entry-point identifier
    pub target: String,

    /// Auxiliary addressing data carried to the entry point
    pub payload: HashMap<String, serde_json::Value>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl LaunchRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            target: target.into(),
            payload: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_payload(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// Copy-and-patch retargeting: clones this request with only the target
    /// identifier changed. The original is left untouched, since its caller
    /// may still hold a reference to it.
    pub fn retargeted(&self, target: impl Into<String>) -> Self {
        let mut request = self.clone();
        request.target = target.into();
        request
    }
}

/// A concrete addressable entry point resolved from a launch-target
/// identifier.
#[derive(Clone)]
pub struct EntryPoint {
    name: String,
    launch: Arc<dyn Fn(&LaunchRequest) + Send + Sync>,
}

impl EntryPoint {
    pub fn new(
        name: impl Into<String>,
        launch: impl Fn(&LaunchRequest) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            launch: Arc::new(launch),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delivers `request` to this entry point.
    pub fn launch(&self, request: &LaunchRequest) {
        (self.launch)(request)
    }
}

impl std::fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryPoint").field("name", &self.name).finish()
    }
}

/// Resolves launch-target identifiers to concrete entry points.
///
/// Unknown identifiers surface as [`StuffingError::UnknownLaunchTarget`];
/// the router fails closed on them rather than falling back to an
/// arbitrary screen.
pub trait EntryPointResolver: Send + Sync {
    fn resolve(&self, target: &str) -> Result<EntryPoint>;
}

/// [`EntryPointResolver`] backed by a map of entry points registered at
/// host startup.
#[derive(Default)]
pub struct MapEntryPointResolver {
    entries: HashMap<String, EntryPoint>,
}

impl MapEntryPointResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry_point(mut self, entry_point: EntryPoint) -> Self {
        self.entries
            .insert(entry_point.name().to_string(), entry_point);
        self
    }
}

impl EntryPointResolver for MapEntryPointResolver {
    fn resolve(&self, target: &str) -> Result<EntryPoint> {
        self.entries
            .get(target)
            .cloned()
            .ok_or_else(|| StuffingError::UnknownLaunchTarget(target.to_string()))
    }
}

/// Result of a routing pass: the resolved entry point and the request to
/// deliver to it.
#[derive(Debug)]
pub struct RoutedLaunch {
    pub entry_point: EntryPoint,
    pub request: LaunchRequest,
}

/// One-shot boot-time router.
///
/// Stateless per invocation and consumed by [`LaunchRouter::route`]: the
/// router is an interstitial, never a retained surface.
pub struct LaunchRouter {
    manager: Arc<DynamicAppManager>,
    resolver: Arc<dyn EntryPointResolver>,
}

impl LaunchRouter {
    pub fn new(manager: Arc<DynamicAppManager>, resolver: Arc<dyn EntryPointResolver>) -> Self {
        Self { manager, resolver }
    }

    /// Routes into the active family's default entry point.
    ///
    /// A missing default launch target is a fatal configuration error: the
    /// host has no valid entry point, so the failure is surfaced rather
    /// than recovered. When `inbound` is present it is cloned and
    /// retargeted so the downstream entry point receives the original
    /// request semantics; otherwise a fresh default request is created.
    /// The family's warm-up hook runs before the entry point is handed out.
    pub fn route(self, inbound: Option<&LaunchRequest>) -> Result<RoutedLaunch> {
        let family = self.manager.application_family();
        let target = self.manager.default_launch_target()?;
        let entry_point = self.resolver.resolve(&target)?;

        if let Some(warm_up) = self
            .manager
            .family_config(&family)
            .and_then(|config| config.warm_up())
        {
            tracing::debug!(%family, "running app family warm-up");
            warm_up();
        }

        let request = match inbound {
            Some(original) => original.retargeted(&target),
            None => LaunchRequest::new(&target),
        };

        tracing::debug!(%family, %target, request = %request.id, "routing launch");
        Ok(RoutedLaunch {
            entry_point,
            request,
        })
    }
}
