//! Maintains the locally observed fleet state by polling the backend.

use crate::core::domain::error::{ResourceKind, VirtdeckError, VirtdeckResult};
use crate::core::domain::model::fleet_view::FleetView;
use crate::core::domain::model::config::PollIntervals;
use crate::core::infrastructure::backend::HypervisorBackend;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

/// How a refresh request resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The backend was queried and the observed set replaced.
    Applied,
    /// Another refresh of the same resource was already in flight; this
    /// request was dropped without touching the backend.
    SkippedInFlight,
}

/// Owns the observed VM/pool/connectivity state and keeps it in sync with
/// the backend.
///
/// Guarantees at most one in-flight refresh per resource type: a refresh
/// requested while one is running returns [`RefreshOutcome::SkippedInFlight`]
/// instead of racing a second wholesale replacement. On failure the previous
/// observed set is left untouched and the failure is recorded in the view's
/// per-resource error slot, so callers keep last-known-good data.
pub struct FleetSynchronizer {
    backend: Arc<dyn HypervisorBackend>,
    view: RwLock<FleetView>,
    vm_guard: Mutex<()>,
    pool_guard: Mutex<()>,
    status_guard: Mutex<()>,
}

impl FleetSynchronizer {
    pub fn new(backend: Arc<dyn HypervisorBackend>) -> Self {
        Self {
            backend,
            view: RwLock::new(FleetView::default()),
            vm_guard: Mutex::new(()),
            pool_guard: Mutex::new(()),
            status_guard: Mutex::new(()),
        }
    }

    /// Returns a snapshot of the observed fleet state.
    pub async fn snapshot(&self) -> FleetView {
        self.view.read().await.clone()
    }

    /// Looks up one observed VM by name.
    pub async fn vm(&self, name: &str) -> Option<crate::core::domain::model::vm::VirtualMachine> {
        self.view.read().await.vms.get(name).cloned()
    }

    /// Refreshes the observed VM set.
    ///
    /// # Errors
    /// Returns `VirtdeckError::Refresh` if the backend call failed; the
    /// previously observed VMs are retained in that case.
    pub async fn refresh_vms(&self) -> VirtdeckResult<RefreshOutcome> {
        let Ok(_in_flight) = self.vm_guard.try_lock() else {
            debug!("vm refresh skipped, another refresh in flight");
            return Ok(RefreshOutcome::SkippedInFlight);
        };

        match self.backend.list_vms().await {
            Ok(vms) => {
                let mut view = self.view.write().await;
                view.vms = vms.into_iter().map(|vm| (vm.name.clone(), vm)).collect();
                view.vm_error = None;
                debug!("vm refresh applied, {} vms observed", view.vms.len());
                Ok(RefreshOutcome::Applied)
            }
            Err(e) => Err(self.record_failure(ResourceKind::Vms, e).await),
        }
    }

    /// Refreshes the observed storage-pool set.
    ///
    /// # Errors
    /// Returns `VirtdeckError::Refresh` if the backend call failed; the
    /// previously observed pools are retained in that case.
    pub async fn refresh_pools(&self) -> VirtdeckResult<RefreshOutcome> {
        let Ok(_in_flight) = self.pool_guard.try_lock() else {
            debug!("pool refresh skipped, another refresh in flight");
            return Ok(RefreshOutcome::SkippedInFlight);
        };

        match self.backend.list_pools().await {
            Ok(pools) => {
                let mut view = self.view.write().await;
                view.pools = pools;
                view.pool_error = None;
                debug!("pool refresh applied, {} pools observed", view.pools.len());
                Ok(RefreshOutcome::Applied)
            }
            Err(e) => Err(self.record_failure(ResourceKind::StoragePools, e).await),
        }
    }

    /// Refreshes the backend connectivity indicator.
    ///
    /// # Errors
    /// Returns `VirtdeckError::Refresh` if the backend call failed; the last
    /// observed status is retained in that case.
    pub async fn refresh_status(&self) -> VirtdeckResult<RefreshOutcome> {
        let Ok(_in_flight) = self.status_guard.try_lock() else {
            debug!("status refresh skipped, another refresh in flight");
            return Ok(RefreshOutcome::SkippedInFlight);
        };

        match self.backend.status().await {
            Ok(status) => {
                let mut view = self.view.write().await;
                view.backend = Some(status);
                view.status_error = None;
                Ok(RefreshOutcome::Applied)
            }
            Err(e) => Err(self.record_failure(ResourceKind::Status, e).await),
        }
    }

    async fn record_failure(&self, resource: ResourceKind, error: VirtdeckError) -> VirtdeckError {
        let message = error.to_string();
        warn!("refresh of {} failed: {}", resource, message);

        let mut view = self.view.write().await;
        let slot = match resource {
            ResourceKind::Vms => &mut view.vm_error,
            ResourceKind::StoragePools => &mut view.pool_error,
            ResourceKind::Status => &mut view.status_error,
        };
        *slot = Some(message.clone());

        VirtdeckError::Refresh { resource, message }
    }
}

/// Handles of the background polling tasks; aborted on drop.
pub struct Pollers {
    handles: Vec<JoinHandle<()>>,
}

impl Pollers {
    /// Starts one interval timer per configured resource.
    ///
    /// The per-resource in-flight guards keep a slow backend from stacking
    /// overlapping requests when a tick fires before the previous refresh
    /// finished.
    pub fn spawn(synchronizer: Arc<FleetSynchronizer>, intervals: PollIntervals) -> Self {
        let mut handles = Vec::new();

        let timers = [
            (intervals.status_secs, ResourceKind::Status),
            (intervals.vms_secs, ResourceKind::Vms),
            (intervals.pools_secs, ResourceKind::StoragePools),
        ];
        for (period, resource) in timers {
            if let Some(secs) = period {
                handles.push(tokio::spawn(poll_loop(
                    Arc::clone(&synchronizer),
                    secs,
                    resource,
                )));
            }
        }

        Self { handles }
    }
}

impl Drop for Pollers {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

async fn poll_loop(
    synchronizer: Arc<FleetSynchronizer>,
    period_secs: u64,
    resource: ResourceKind,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(period_secs.max(1)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; skip it so construction stays cheap
    // and the caller controls the initial load.
    interval.tick().await;
    loop {
        interval.tick().await;
        // Failures are already recorded in the view; the poller keeps going.
        let _ = match resource {
            ResourceKind::Status => synchronizer.refresh_status().await,
            ResourceKind::Vms => synchronizer.refresh_vms().await,
            ResourceKind::StoragePools => synchronizer.refresh_pools().await,
        };
    }
}
