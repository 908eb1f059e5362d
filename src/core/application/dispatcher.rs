//! Validates, serializes, and executes VM control actions.

use crate::core::application::synchronizer::FleetSynchronizer;
use crate::core::domain::error::{VirtdeckError, VirtdeckResult};
use crate::core::domain::lifecycle::{self, Confirmation, VmAction};
use crate::core::domain::model::pending_action::PendingAction;
use crate::core::domain::value_object::VmName;
use crate::core::infrastructure::backend::{CreateVmSpec, HypervisorBackend};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Successful outcome of a dispatched action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReceipt {
    pub vm_name: String,
    pub action: VmAction,
    /// The backend's acknowledgement message.
    pub message: String,
}

/// Gates and executes VM lifecycle actions.
///
/// Preconditions are checked in a fixed order, each with a distinct error and
/// none reaching the backend: the VM must be observed (`UnknownVm`), the
/// action legal for its observed status (`IllegalAction`), no other action in
/// flight for the same VM (`ActionInProgress`), and destructive actions
/// confirmed (`ConfirmationRequired`). Actions for distinct VMs run
/// concurrently; per-VM they are strictly sequential.
///
/// Observed status is never mutated optimistically: a successful action only
/// triggers a VM refresh, and the view changes when that refresh lands.
pub struct ActionDispatcher {
    backend: Arc<dyn HypervisorBackend>,
    synchronizer: Arc<FleetSynchronizer>,
    pending: Mutex<HashMap<String, PendingAction>>,
}

impl ActionDispatcher {
    pub fn new(backend: Arc<dyn HypervisorBackend>, synchronizer: Arc<FleetSynchronizer>) -> Self {
        Self {
            backend,
            synchronizer,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Whether an action is currently in flight for the named VM.
    pub async fn is_pending(&self, vm_name: &str) -> bool {
        self.pending.lock().await.contains_key(vm_name)
    }

    /// The currently in-flight actions, keyed by VM name.
    pub async fn pending_actions(&self) -> Vec<PendingAction> {
        self.pending.lock().await.values().cloned().collect()
    }

    /// Dispatches a lifecycle action against a VM.
    ///
    /// On backend acceptance the pending entry is cleared and an immediate VM
    /// refresh is triggered so the observed status catches up. On rejection
    /// or transport failure the pending entry is cleared, the backend message
    /// is surfaced verbatim, and no refresh happens — the view keeps showing
    /// the state the decision was made against.
    ///
    /// # Errors
    /// Any precondition failure from the taxonomy above, `BackendRejected`
    /// with the backend's message, or `Transport`.
    pub async fn dispatch(
        &self,
        vm_name: &str,
        action: VmAction,
        confirmation: Confirmation,
    ) -> VirtdeckResult<ActionReceipt> {
        let vm = self
            .synchronizer
            .vm(vm_name)
            .await
            .ok_or_else(|| VirtdeckError::UnknownVm(vm_name.to_string()))?;

        // Legality comes from the authorization table and nowhere else. The
        // observed status may be stale; the backend remains the final
        // arbiter and rejects commands a stale view let through.
        let Some(legal) = lifecycle::authorization(vm.status, action) else {
            return Err(VirtdeckError::IllegalAction {
                vm: vm_name.to_string(),
                action: action.to_string(),
                status: vm.status.to_string(),
            });
        };

        {
            let mut pending = self.pending.lock().await;
            if pending.contains_key(vm_name) {
                return Err(VirtdeckError::ActionInProgress(vm_name.to_string()));
            }
            if legal.requires_confirmation && confirmation != Confirmation::Confirmed {
                return Err(VirtdeckError::ConfirmationRequired {
                    vm: vm_name.to_string(),
                    action: action.to_string(),
                    warning: action.warning().unwrap_or_default().to_string(),
                });
            }
            pending.insert(vm_name.to_string(), PendingAction::new(vm_name, action));
        }

        debug!("dispatching '{}' on '{}'", action, vm_name);
        let result = self.backend.vm_action(vm_name, action).await;

        // The pending entry is cleared on every exit path so a failed or
        // timed-out request never locks the VM permanently.
        self.pending.lock().await.remove(vm_name);

        match result {
            Ok(outcome) if outcome.success => {
                let message = outcome
                    .message()
                    .unwrap_or("command accepted by backend")
                    .to_string();
                info!("'{}' on '{}' accepted: {}", action, vm_name, message);
                if let Err(e) = self.synchronizer.refresh_vms().await {
                    warn!("post-action vm refresh failed: {}", e);
                }
                Ok(ActionReceipt {
                    vm_name: vm_name.to_string(),
                    action,
                    message,
                })
            }
            Ok(outcome) => Err(VirtdeckError::BackendRejected {
                vm: vm_name.to_string(),
                message: outcome
                    .message()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("failed to {} VM '{}'", action, vm_name)),
            }),
            Err(e) => Err(e),
        }
    }

    /// Creates a new VM definition.
    ///
    /// Creation is not gated by the lifecycle table (there is no VM to gate
    /// on); the name is validated locally before the backend is called, and a
    /// successful creation triggers a VM refresh so the new VM appears in the
    /// observed set.
    ///
    /// # Errors
    /// `Validation` for an unusable name, `BackendRejected` or `Transport`
    /// for backend failures.
    pub async fn create(&self, spec: &CreateVmSpec) -> VirtdeckResult<String> {
        VmName::new(spec.name.clone()).await?;

        let outcome = self.backend.create_vm(spec).await?;
        if outcome.success {
            let message = outcome
                .message()
                .unwrap_or("VM created")
                .to_string();
            info!("created VM '{}': {}", spec.name, message);
            if let Err(e) = self.synchronizer.refresh_vms().await {
                warn!("post-create vm refresh failed: {}", e);
            }
            Ok(message)
        } else {
            Err(VirtdeckError::BackendRejected {
                vm: spec.name.clone(),
                message: outcome
                    .message()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("failed to create VM '{}'", spec.name)),
            })
        }
    }
}
