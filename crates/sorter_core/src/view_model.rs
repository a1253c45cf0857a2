use crate::{ArtifactHandle, ConnectionStatus, CorrelationId, Mode, ProgressDisplay, UploadStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct AppViewModel {
    pub connection: ConnectionStatus,
    /// False once the socket is closed; sends made while connecting are queued.
    pub actions_enabled: bool,
    pub mode: Mode,
    pub confirmed_mode: Option<Mode>,
    pub upload: UploadView,
    pub prediction: ProgressDisplay,
    pub prediction_label: String,
    pub approval: Option<ApprovalView>,
    pub artifact: Option<ArtifactHandle>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadView {
    pub correlation_id: CorrelationId,
    pub root_directory_name: Option<String>,
    pub total_files: usize,
    pub status: UploadStatus,
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalView {
    pub product_identifier: String,
    pub candidates: Vec<CandidateView>,
    pub display_file_paths: Vec<String>,
    pub can_submit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateView {
    pub label: String,
    pub confidence_label: String,
    pub selected: bool,
}
