//! Handle state machine.
//!
//! ```text
//! Pending ──issue──▶ Polling ──native done──▶ Completed
//!    │                  │  └──native error──▶ Failed
//!    └──pre-canceled──▶ Canceled ◀──token fired before done
//! ```

/// Internal phase of a handle's wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Phase {
    /// Freshly taken from the pool, no operation issued yet.
    #[default]
    Pending,
    /// Waiting on the native operation.
    Polling,
    Completed,
    Failed,
    Canceled,
}

impl Phase {
    /// Returns true once no further transition can happen.
    pub(crate) fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed | Phase::Canceled)
    }
}

/// Externally visible status of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleStatus {
    /// The native operation is still running.
    Loading,
    /// Finished with a result.
    Succeeded,
    /// Finished with an error, see the handle's `error()`.
    Failed,
    /// Canceled before the native operation finished.
    Canceled,
    /// The handle was disposed.
    Disposed,
}

impl HandleStatus {
    /// Returns true if loading has completed (in any way).
    pub fn is_done(&self) -> bool {
        !matches!(self, HandleStatus::Loading)
    }
}

impl From<Phase> for HandleStatus {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Pending | Phase::Polling => HandleStatus::Loading,
            Phase::Completed => HandleStatus::Succeeded,
            Phase::Failed => HandleStatus::Failed,
            Phase::Canceled => HandleStatus::Canceled,
        }
    }
}
