use serde::Serialize;
use std::fmt;

/// Where a scan session is.
///
/// ```text
/// Idle ─▶ AwaitingFrames ─▶ Classifying ─▶ ResolvingAccount ─▶ Signing ─▶ Done
/// ```
///
/// Single-frame payloads go from `Idle` straight to `Classifying`. Errors
/// lead to `Failed`; cancellation leads to `Cancelled` from anything but
/// `Done`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingFrames,
    Classifying,
    ResolvingAccount,
    Signing,
    Done,
    Failed { message: String },
    Cancelled,
}

impl SessionState {
    /// `Done` and `Failed` need an explicit restart.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Done | SessionState::Failed { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::AwaitingFrames => "awaiting_frames",
            SessionState::Classifying => "classifying",
            SessionState::ResolvingAccount => "resolving_account",
            SessionState::Signing => "signing",
            SessionState::Done => "done",
            SessionState::Failed { .. } => "failed",
            SessionState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
