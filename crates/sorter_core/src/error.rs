use crate::CorrelationId;

/// Why `update` left the state untouched.
///
/// None of these are fatal: the host logs them and carries on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("no approval request is pending")]
    NoPendingRequest,
    #[error("no candidate class is selected")]
    NoSelection,
    #[error("candidate {0:?} is not offered by the pending request")]
    UnknownCandidate(String),
    #[error("selection contains no eligible image files")]
    NoEligibleFiles,
    #[error("stale correlation id {received} (active session is {active})")]
    StaleCorrelation {
        active: CorrelationId,
        received: CorrelationId,
    },
    #[error("no upload is in progress")]
    NoActiveUpload,
    #[error("stale prediction progress {approved}/{total} (already at {current_approved})")]
    StaleProgress {
        approved: u64,
        total: u64,
        current_approved: u64,
    },
    #[error("connection is closed")]
    Disconnected,
}
