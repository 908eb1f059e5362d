//! Domain model for observed virtual machines.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A VM lifecycle state as last reported by the backend.
///
/// Authoritative only as of the last successful refresh; it may be stale
/// between refreshes, which is why the dispatcher's legality check is a
/// precondition and the backend remains the final arbiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VmStatus {
    Running,
    Paused,
    Stopped,
    Shutdown,
    /// The backend reported no state, or a state outside the lifecycle model
    /// (e.g. `Blocked`, `Crashed`, `Suspended`). Treated like a powered-off VM
    /// for gating purposes.
    NoState,
}

impl VmStatus {
    /// Parses a backend status label. Unrecognized labels collapse to
    /// [`VmStatus::NoState`] rather than failing the whole VM list.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Running" => VmStatus::Running,
            "Paused" => VmStatus::Paused,
            "Stopped" | "Shutoff" => VmStatus::Stopped,
            "Shutdown" => VmStatus::Shutdown,
            _ => VmStatus::NoState,
        }
    }

    /// The canonical backend label for this status.
    pub fn as_label(&self) -> &'static str {
        match self {
            VmStatus::Running => "Running",
            VmStatus::Paused => "Paused",
            VmStatus::Stopped => "Stopped",
            VmStatus::Shutdown => "Shutdown",
            VmStatus::NoState => "No State",
        }
    }
}

impl std::fmt::Display for VmStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

impl<'de> Deserialize<'de> for VmStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        Ok(VmStatus::from_label(&label))
    }
}

impl Serialize for VmStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_label())
    }
}

/// A virtual machine as returned by the `/api/vms` endpoint.
///
/// Instances are created wholesale from backend responses on refresh and are
/// never mutated locally; `name` is the unique fleet-wide key.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VirtualMachine {
    /// Unique identifier within the fleet, immutable once created.
    pub name: String,
    /// Backend-assigned identifier, immutable.
    pub uuid: String,
    /// Lifecycle state as of the last successful refresh.
    pub status: VmStatus,
    /// Number of virtual CPUs.
    #[serde(rename = "vcpu")]
    pub vcpu_count: u32,
    /// Allocated memory in megabytes.
    pub memory_mb: u64,
}
