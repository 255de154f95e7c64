//! Externally observed workflow state.
//!
//! A workflow moves strictly forward through
//! `Idle → Uploading → Polling → Succeeded | Failed`. Every transition is
//! published on a `watch` channel (latest value wins, good for UIs) and, if
//! one is attached, to a [`StateObserver`] that sees every transition in
//! order.

use crate::error::WorkflowError;
use crate::types::JobId;
use std::sync::Arc;

/// Where a recipe workflow currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientState {
    /// Nothing started yet.
    Idle,
    /// Photos are being encoded and posted.
    Uploading,
    /// The job was created; waiting for it to finish.
    Polling { job_id: JobId },
    /// The job finished. `payload` is the raw final status body.
    Succeeded { job_id: JobId, payload: Option<String> },
    /// The workflow stopped. The error's `Display` is the user-facing reason.
    Failed(WorkflowError),
}

impl ClientState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClientState::Succeeded { .. } | ClientState::Failed(_))
    }

    /// Position in the forward-only order; terminal states share the last rank.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            ClientState::Idle => 0,
            ClientState::Uploading => 1,
            ClientState::Polling { .. } => 2,
            ClientState::Succeeded { .. } | ClientState::Failed(_) => 3,
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            ClientState::Idle => "idle",
            ClientState::Uploading => "uploading",
            ClientState::Polling { .. } => "polling",
            ClientState::Succeeded { .. } => "succeeded",
            ClientState::Failed(_) => "failed",
        }
    }
}

/// Receives every state transition of a workflow.
///
/// # Example
///
/// ```
/// use recipe_jobs::state::{ClientState, StateObserver};
///
/// struct PrintObserver;
///
/// impl StateObserver for PrintObserver {
///     fn on_state(&self, state: &ClientState) {
///         match state {
///             ClientState::Failed(reason) => println!("failed: {}", reason),
///             other => println!("{}", other.label()),
///         }
///     }
/// }
/// ```
pub trait StateObserver: Send + Sync {
    fn on_state(&self, state: &ClientState);
}

pub(crate) fn notify(observer: &Option<Arc<dyn StateObserver>>, state: &ClientState) {
    if let Some(ref o) = observer {
        o.on_state(state);
    }
}

/// A [`StateObserver`] backed by a closure.
pub struct FnStateObserver<F: Fn(&ClientState) + Send + Sync>(pub F);

impl<F: Fn(&ClientState) + Send + Sync> StateObserver for FnStateObserver<F> {
    fn on_state(&self, state: &ClientState) {
        (self.0)(state);
    }
}
