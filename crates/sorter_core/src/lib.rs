//! Sorter core: pure upload and approval state machines plus view-model helpers.
mod approval;
mod artifact;
mod effect;
mod error;
mod mode;
mod msg;
mod progress;
mod state;
mod update;
mod upload;
mod view_model;

pub use approval::{
    confidence_percent, format_confidence, ApprovalDecision, ApprovalRequest, ApprovalWorkflow,
    CandidateClass, CONFIDENCE_DECIMALS, MAX_DISPLAY_FILES,
};
pub use artifact::{ArtifactHandle, ArtifactHolder, CSV_MEDIA_TYPE, DEFAULT_ARTIFACT_FILENAME};
pub use effect::Effect;
pub use error::WorkflowError;
pub use mode::{Mode, UnknownMode};
pub use msg::Msg;
pub use progress::{percentage, PredictionProgress, ProgressDisplay};
pub use state::{AppState, ConnectionStatus};
pub use update::update;
pub use upload::{
    filter_eligible, is_allowed_image, root_directory_name, CandidateFile, CorrelationId,
    CorrelationIds, UploadSession, UploadStatus, ALLOWED_IMAGE_EXTENSIONS, PATH_SEPARATOR,
};
pub use view_model::{AppViewModel, ApprovalView, CandidateView, UploadView};
