mod core;

#[cfg(test)]
mod tests;

pub use crate::core::application::dispatcher::{ActionDispatcher, ActionReceipt};
pub use crate::core::application::synchronizer::{FleetSynchronizer, Pollers, RefreshOutcome};
pub use crate::core::domain::error::{ResourceKind, ValidationError, VirtdeckError, VirtdeckResult};
pub use crate::core::domain::lifecycle::{Confirmation, LegalAction, VmAction, legal_actions};
pub use crate::core::domain::model::config::{FleetConfig, PollIntervals, RateLimitConfig};
pub use crate::core::domain::model::fleet_view::{BackendStatus, FleetView};
pub use crate::core::domain::model::pending_action::PendingAction;
pub use crate::core::domain::model::storage_pool::StoragePool;
pub use crate::core::domain::model::vm::{VirtualMachine, VmStatus};
pub use crate::core::domain::value_object::{BackendUrl, VmName};
pub use crate::core::infrastructure::api_client::ApiClient;
pub use crate::core::infrastructure::backend::{ActionResponse, CreateVmSpec, HypervisorBackend};

use std::sync::Arc;

/// A client for controlling a libvirt VM fleet behind a hypervisor-management
/// HTTP API.
///
/// The client wires together the three core pieces:
/// - the lifecycle state model, deciding which actions are legal per VM state,
/// - the action dispatcher, gating and serializing per-VM actions,
/// - the fleet synchronizer, owning the observed VM/pool/connectivity state.
///
/// # Examples
///
/// ```no_run
/// use virtdeck::{Confirmation, FleetClient, VirtdeckResult, VmAction};
///
/// #[tokio::main]
/// async fn main() -> VirtdeckResult<()> {
///     let client = FleetClient::builder()
///         .base_url("http://hypervisor.local:5000")
///         .build()
///         .await?;
///
///     client.refresh_vms().await?;
///     client
///         .dispatch("web01", VmAction::Stop, Confirmation::Unconfirmed)
///         .await?;
///     Ok(())
/// }
/// ```
pub struct FleetClient {
    synchronizer: Arc<FleetSynchronizer>,
    dispatcher: ActionDispatcher,
    config: FleetConfig,
}

/// Builder for FleetClient configuration
#[derive(Debug, Default)]
pub struct FleetClientBuilder {
    base_url: Option<String>,
    config: FleetConfig,
}

impl FleetClientBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn config(mut self, config: FleetConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the backend URL and builds the client.
    ///
    /// # Errors
    /// Returns `VirtdeckError::Validation` if the base URL is missing or
    /// invalid, `VirtdeckError::Transport` if the HTTP client cannot be
    /// built.
    pub async fn build(self) -> VirtdeckResult<FleetClient> {
        let raw_url = self.base_url.ok_or_else(|| {
            VirtdeckError::Validation(ValidationError::Field {
                field: "base_url".to_string(),
                message: "Backend base URL is required".to_string(),
            })
        })?;
        let url = BackendUrl::new(raw_url).await?;
        let api_client = ApiClient::new(&url, &self.config).await?;
        Ok(FleetClient::with_backend(Arc::new(api_client), self.config))
    }
}

impl FleetClient {
    /// Creates a new builder for FleetClient configuration
    pub fn builder() -> FleetClientBuilder {
        FleetClientBuilder::default()
    }

    /// Assembles a client on top of an existing backend implementation.
    ///
    /// This is the seam used to plug in a mock backend; `builder()` is the
    /// usual path for the HTTP client.
    pub fn with_backend(backend: Arc<dyn HypervisorBackend>, config: FleetConfig) -> Self {
        let synchronizer = Arc::new(FleetSynchronizer::new(Arc::clone(&backend)));
        let dispatcher = ActionDispatcher::new(backend, Arc::clone(&synchronizer));
        Self {
            synchronizer,
            dispatcher,
            config,
        }
    }

    /// A snapshot of the observed fleet state.
    pub async fn snapshot(&self) -> FleetView {
        self.synchronizer.snapshot().await
    }

    /// Refreshes the observed VM set. See [`FleetSynchronizer::refresh_vms`].
    pub async fn refresh_vms(&self) -> VirtdeckResult<RefreshOutcome> {
        self.synchronizer.refresh_vms().await
    }

    /// Refreshes the observed storage pools. Suitable for tab-activation and
    /// manual refresh triggers.
    pub async fn refresh_pools(&self) -> VirtdeckResult<RefreshOutcome> {
        self.synchronizer.refresh_pools().await
    }

    /// Refreshes the backend connectivity indicator.
    pub async fn refresh_status(&self) -> VirtdeckResult<RefreshOutcome> {
        self.synchronizer.refresh_status().await
    }

    /// The legal actions for a VM given its last observed status.
    ///
    /// This consults the same authorization table the dispatcher enforces,
    /// so a presentation layer rendering these entries cannot drift from
    /// what `dispatch` will accept.
    ///
    /// # Errors
    /// Returns `VirtdeckError::UnknownVm` if the VM is not observed.
    pub async fn legal_actions(&self, vm_name: &str) -> VirtdeckResult<&'static [LegalAction]> {
        let vm = self
            .synchronizer
            .vm(vm_name)
            .await
            .ok_or_else(|| VirtdeckError::UnknownVm(vm_name.to_string()))?;
        Ok(legal_actions(vm.status))
    }

    /// Dispatches a lifecycle action. See [`ActionDispatcher::dispatch`].
    pub async fn dispatch(
        &self,
        vm_name: &str,
        action: VmAction,
        confirmation: Confirmation,
    ) -> VirtdeckResult<ActionReceipt> {
        self.dispatcher.dispatch(vm_name, action, confirmation).await
    }

    /// Whether an action is currently in flight for the named VM.
    pub async fn is_pending(&self, vm_name: &str) -> bool {
        self.dispatcher.is_pending(vm_name).await
    }

    /// Creates a new VM definition. See [`ActionDispatcher::create`].
    pub async fn create(&self, spec: &CreateVmSpec) -> VirtdeckResult<String> {
        self.dispatcher.create(spec).await
    }

    /// Starts the background polling timers configured in
    /// [`FleetConfig::poll`]. The returned handle aborts them when dropped.
    pub fn spawn_pollers(&self) -> Pollers {
        Pollers::spawn(Arc::clone(&self.synchronizer), self.config.poll)
    }

    /// The configuration the client was built with.
    pub fn config(&self) -> &FleetConfig {
        &self.config
    }
}
