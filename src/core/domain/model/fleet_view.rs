//! The locally observed fleet state.

use crate::core::domain::model::storage_pool::StoragePool;
use crate::core::domain::model::vm::VirtualMachine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Backend connectivity as returned by `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BackendStatus {
    pub connected: bool,
    pub libvirt_status: String,
}

/// The synchronizer's snapshot of everything last observed from the backend.
///
/// Each resource is replaced wholesale on a successful refresh and left
/// untouched on a failed one; the corresponding error slot records the last
/// refresh failure so callers can show a failure message while still working
/// with last-known-good data. Only the synchronizer mutates this state.
#[derive(Debug, Clone, Default)]
pub struct FleetView {
    /// Observed VMs keyed by their unique name.
    pub vms: BTreeMap<String, VirtualMachine>,
    /// Observed storage pools, in backend order.
    pub pools: Vec<StoragePool>,
    /// Last observed backend connectivity, if any refresh has succeeded.
    pub backend: Option<BackendStatus>,
    /// Message of the last failed VM refresh, cleared on success.
    pub vm_error: Option<String>,
    /// Message of the last failed storage-pool refresh, cleared on success.
    pub pool_error: Option<String>,
    /// Message of the last failed status refresh, cleared on success.
    pub status_error: Option<String>,
}

impl FleetView {
    /// Looks up an observed VM by name.
    pub fn vm(&self, name: &str) -> Option<&VirtualMachine> {
        self.vms.get(name)
    }
}
