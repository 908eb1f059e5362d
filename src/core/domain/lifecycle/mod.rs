//! The lifecycle state model: which actions are legal in which VM state.
//!
//! The authorization table here is the single source of truth for legality.
//! Both the dispatcher (enforcement) and any presentation layer (display)
//! consult it through [`legal_actions`]; no other code path may infer
//! legality on its own.

use crate::core::domain::model::vm::VmStatus;
use serde::{Deserialize, Serialize};

/// A control action that can be requested for a VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VmAction {
    Start,
    Stop,
    Destroy,
    Suspend,
    Resume,
    Delete,
}

impl VmAction {
    /// The path segment used in `POST /api/vm/{name}/{action}`.
    pub const fn as_segment(self) -> &'static str {
        match self {
            VmAction::Start => "start",
            VmAction::Stop => "stop",
            VmAction::Destroy => "destroy",
            VmAction::Suspend => "suspend",
            VmAction::Resume => "resume",
            VmAction::Delete => "delete",
        }
    }

    /// Whether the action has irreversible or data-loss-risking effect.
    pub const fn is_destructive(self) -> bool {
        matches!(self, VmAction::Destroy | VmAction::Delete)
    }

    /// The operator-facing warning shown before a destructive action.
    pub const fn warning(self) -> Option<&'static str> {
        match self {
            VmAction::Destroy => Some(
                "Forcefully powers the VM off, equivalent to pulling the plug; \
                 unsaved data in the guest will be lost.",
            ),
            VmAction::Delete => Some(
                "Removes the VM definition from the hypervisor; \
                 its disk image may remain on storage.",
            ),
            _ => None,
        }
    }
}

impl std::fmt::Display for VmAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_segment())
    }
}

/// Explicit operator acknowledgement accompanying a dispatch call.
///
/// Destructive actions are refused unless [`Confirmation::Confirmed`] is
/// passed; non-destructive actions ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Unconfirmed,
    Confirmed,
}

/// One entry of the authorization table: a legal action and whether it needs
/// operator confirmation before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegalAction {
    pub action: VmAction,
    pub requires_confirmation: bool,
}

const fn allow(action: VmAction) -> LegalAction {
    LegalAction {
        action,
        requires_confirmation: action.is_destructive(),
    }
}

static RUNNING_ACTIONS: [LegalAction; 3] = [
    allow(VmAction::Stop),
    allow(VmAction::Destroy),
    allow(VmAction::Suspend),
];

static PAUSED_ACTIONS: [LegalAction; 2] = [allow(VmAction::Destroy), allow(VmAction::Resume)];

static POWERED_OFF_ACTIONS: [LegalAction; 2] = [allow(VmAction::Start), allow(VmAction::Delete)];

/// The set of legal actions for a VM in the given lifecycle state.
///
/// Canonical table:
///
/// | status                         | legal actions                            |
/// |--------------------------------|------------------------------------------|
/// | Running                        | stop, destroy (confirm), suspend         |
/// | Paused                         | destroy (confirm), resume                |
/// | Stopped / Shutdown / No State  | start, delete (confirm)                  |
pub fn legal_actions(status: VmStatus) -> &'static [LegalAction] {
    match status {
        VmStatus::Running => &RUNNING_ACTIONS,
        VmStatus::Paused => &PAUSED_ACTIONS,
        VmStatus::Stopped | VmStatus::Shutdown | VmStatus::NoState => &POWERED_OFF_ACTIONS,
    }
}

/// Table lookup for a single (status, action) pair.
pub fn authorization(status: VmStatus, action: VmAction) -> Option<LegalAction> {
    legal_actions(status).iter().copied().find(|legal| legal.action == action)
}
