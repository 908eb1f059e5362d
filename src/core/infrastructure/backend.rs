//! The seam between the control core and the hypervisor-management backend.
//!
//! The dispatcher and synchronizer talk to [`HypervisorBackend`] only, so the
//! HTTP client can be swapped for a mock in tests.

use crate::core::domain::error::VirtdeckResult;
use crate::core::domain::lifecycle::VmAction;
use crate::core::domain::model::fleet_view::BackendStatus;
use crate::core::domain::model::storage_pool::StoragePool;
use crate::core::domain::model::vm::VirtualMachine;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Logical outcome of a state-changing backend call.
///
/// `success: true` only means the command was accepted; it does not guarantee
/// the VM's status already changed, which is why the dispatcher follows a
/// successful action with a VM refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ActionResponse {
    /// The backend-provided message, preferring `message` over `error`.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

/// Request body for `POST /api/vm/create`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateVmSpec {
    pub name: String,
    pub memory_mb: u64,
    pub vcpu: u32,
    pub disk_path: String,
    pub disk_size_gb: u64,
    pub os_iso_path: Option<String>,
    pub network_bridge: String,
}

impl CreateVmSpec {
    /// A creation spec with the backend's defaults: 512 MB of memory, one
    /// vcpu, a 10 GB disk, no installation ISO, the default libvirt bridge.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            memory_mb: 512,
            vcpu: 1,
            disk_path: "/var/lib/libvirt/images/new_vm.qcow2".to_string(),
            disk_size_gb: 10,
            os_iso_path: None,
            network_bridge: "virbr0".to_string(),
        }
    }
}

/// Operations the hypervisor-management backend exposes to the core.
///
/// The backend owns ground truth about VM existence and state; everything the
/// core holds is an observation of these calls' results.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HypervisorBackend: Send + Sync {
    /// `GET /api/status`
    async fn status(&self) -> VirtdeckResult<BackendStatus>;

    /// `GET /api/vms`
    async fn list_vms(&self) -> VirtdeckResult<Vec<VirtualMachine>>;

    /// `POST /api/vm/{name}/{action}`
    async fn vm_action(&self, name: &str, action: VmAction) -> VirtdeckResult<ActionResponse>;

    /// `POST /api/vm/create`
    async fn create_vm(&self, spec: &CreateVmSpec) -> VirtdeckResult<ActionResponse>;

    /// `GET /api/storage/pools`
    async fn list_pools(&self) -> VirtdeckResult<Vec<StoragePool>>;
}
