use thiserror::Error;

/// The resource types tracked by the fleet synchronizer.
///
/// Refresh failures are recorded per resource so that one failing endpoint
/// never disturbs the observed state of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Vms,
    StoragePools,
    Status,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Vms => write!(f, "virtual machines"),
            ResourceKind::StoragePools => write!(f, "storage pools"),
            ResourceKind::Status => write!(f, "backend status"),
        }
    }
}

/// The main error type for fleet control operations.
///
/// Dispatch preconditions (`UnknownVm`, `IllegalAction`, `ActionInProgress`,
/// `ConfirmationRequired`) fail locally before any backend call is made.
/// `BackendRejected` and `Transport` report backend outcomes; `Refresh` is the
/// non-fatal per-resource failure of a synchronizer poll. No variant is fatal
/// to the process.
#[derive(Error, Debug)]
pub enum VirtdeckError {
    /// The named VM is not present in the observed fleet.
    #[error("unknown virtual machine '{0}'")]
    UnknownVm(String),

    /// The requested action is not legal for the VM's last observed status.
    #[error("action '{action}' is not legal while '{vm}' is {status}")]
    IllegalAction {
        vm: String,
        action: String,
        status: String,
    },

    /// Another action for the same VM is still in flight.
    #[error("an action is already in progress for '{0}'")]
    ActionInProgress(String),

    /// A destructive action was requested without operator confirmation.
    #[error("'{action}' on '{vm}' is destructive and requires confirmation: {warning}")]
    ConfirmationRequired {
        vm: String,
        action: String,
        warning: String,
    },

    /// The backend accepted the request but reported a logical failure.
    #[error("backend rejected the request for '{vm}': {message}")]
    BackendRejected { vm: String, message: String },

    /// The request never produced a usable response (network, timeout, parse).
    #[error("transport error: {0}")]
    Transport(String),

    /// A refresh of one observed resource failed; prior data is retained.
    #[error("refresh of {resource} failed: {message}")]
    Refresh {
        resource: ResourceKind,
        message: String,
    },

    /// Local input validation failed before anything was attempted.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Specialized error type for validation failures.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A specific field failed validation.
    #[error("field '{field}' validation failed: {message}")]
    Field { field: String, message: String },

    /// A value had an invalid format or syntax.
    #[error("format error: {0}")]
    Format(String),

    /// A domain constraint was violated.
    #[error("domain constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Type alias for Results that may fail with a VirtdeckError.
pub type VirtdeckResult<T> = Result<T, VirtdeckError>;
