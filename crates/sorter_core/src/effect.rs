use crate::{ApprovalDecision, ArtifactHandle, CorrelationId, Mode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    InitUpload {
        correlation_id: CorrelationId,
        number_of_files: usize,
        root_directory_name: String,
    },
    /// Read, encode and send each file. Order across files is not guaranteed.
    StreamFiles {
        correlation_id: CorrelationId,
        relative_paths: Vec<String>,
    },
    CancelUpload,
    SelectMode(Mode),
    InitPredictions,
    SubmitApproval(ApprovalDecision),
    ArtifactPublished(ArtifactHandle),
}
