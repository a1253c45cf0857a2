use crate::{ApprovalRequest, CandidateFile, ConnectionStatus, CorrelationId, Mode};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Transport state changed.
    ConnectionChanged(ConnectionStatus),
    /// User picked a directory; carries every file found under it.
    DirectorySelected(Vec<CandidateFile>),
    /// The init message for this session was handed to the connection.
    UploadInitSent { correlation_id: CorrelationId },
    /// Backend upload progress for a session.
    UploadProgress {
        correlation_id: CorrelationId,
        percentage: f64,
    },
    /// User cancelled the running upload.
    CancelUploadClicked,
    /// User chose an operating mode.
    ModeSelected(Mode),
    /// Backend echoed the mode it is now using.
    ModeConfirmed(Mode),
    /// User asked the backend to start classifying the uploaded files.
    StartPredictionsClicked,
    /// Backend prediction counters.
    PredictionProgress { approved_count: u64, total_count: u64 },
    /// Backend wants a human decision for one product.
    ApprovalRequested(ApprovalRequest),
    /// User highlighted a candidate class.
    CandidateSelected(String),
    /// User confirmed the highlighted candidate.
    SubmitClicked,
    /// Backend delivered the result CSV.
    ArtifactReceived(String),
    /// Host is done with the current artifact.
    ArtifactDiscarded,
}
