//! Bookkeeping for in-flight VM actions.

use crate::core::domain::lifecycle::VmAction;
use std::time::Instant;

/// An accepted action that has not yet resolved.
///
/// At most one instance exists per VM name; its presence blocks any further
/// dispatch for that VM until the backend responds or the request errors.
#[derive(Debug, Clone)]
pub struct PendingAction {
    vm_name: String,
    action: VmAction,
    requested_at: Instant,
}

impl PendingAction {
    pub fn new(vm_name: impl Into<String>, action: VmAction) -> Self {
        Self {
            vm_name: vm_name.into(),
            action,
            requested_at: Instant::now(),
        }
    }

    pub fn vm_name(&self) -> &str {
        &self.vm_name
    }

    pub fn action(&self) -> VmAction {
        self.action
    }

    pub fn requested_at(&self) -> Instant {
        self.requested_at
    }
}
