//! Domain model for observed storage pools.

use serde::{Deserialize, Serialize};

/// A storage pool as returned by the `/api/storage/pools` endpoint.
///
/// Display-only: pools are observed, never acted upon through this crate.
/// `used_gb <= capacity_gb` is expected but backend-reported, so it is not
/// enforced locally.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StoragePool {
    /// Unique pool name.
    pub name: String,
    /// Filesystem location, opaque to the core.
    pub path: String,
    /// Total capacity in gigabytes.
    pub capacity_gb: f64,
    /// Used space in gigabytes.
    pub used_gb: f64,
    /// Backend-reported status label (e.g. "active").
    pub status: String,
}
