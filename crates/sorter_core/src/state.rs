use crate::view_model::{AppViewModel, ApprovalView, CandidateView, UploadView};
use crate::{
    format_confidence, ApprovalWorkflow, ArtifactHolder, CorrelationIds, Mode, PredictionProgress,
    ProgressDisplay, UploadSession, WorkflowError,
};

/// Mirror of the transport state, as far as the workflows care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    connection: ConnectionStatus,
    mode: Mode,
    confirmed_mode: Option<Mode>,
    ids: CorrelationIds,
    pub(crate) upload: UploadSession,
    pub(crate) approval: ApprovalWorkflow,
    prediction: Option<PredictionProgress>,
    pub(crate) artifact: ArtifactHolder,
    rejection: Option<WorkflowError>,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_seed(1)
    }

    /// Start correlation ids at `seed`. Hosts pass a time-derived value so ids
    /// also differ from those of earlier processes.
    pub fn with_seed(seed: u64) -> Self {
        let mut ids = CorrelationIds::starting_at(seed);
        let upload = UploadSession::idle(ids.allocate());
        Self {
            connection: ConnectionStatus::default(),
            mode: Mode::default(),
            confirmed_mode: None,
            ids,
            upload,
            approval: ApprovalWorkflow::default(),
            prediction: None,
            artifact: ArtifactHolder::default(),
            rejection: None,
            dirty: false,
        }
    }

    pub fn view(&self) -> AppViewModel {
        let prediction = ProgressDisplay::from_progress(self.prediction);
        AppViewModel {
            connection: self.connection,
            actions_enabled: self.connection != ConnectionStatus::Closed,
            mode: self.mode,
            confirmed_mode: self.confirmed_mode,
            upload: UploadView {
                correlation_id: self.upload.id(),
                root_directory_name: self.upload.root_directory_name().map(str::to_owned),
                total_files: self.upload.total_files(),
                status: self.upload.status(),
                percentage: self.upload.percentage(),
            },
            prediction_label: prediction.label(),
            prediction,
            approval: self.approval_view(),
            artifact: self.artifact.current().cloned(),
            dirty: self.dirty,
        }
    }

    fn approval_view(&self) -> Option<ApprovalView> {
        let request = self.approval.pending()?;
        let selection = self.approval.selection();
        Some(ApprovalView {
            product_identifier: request.product_identifier().to_string(),
            candidates: request
                .candidates()
                .iter()
                .map(|candidate| CandidateView {
                    label: candidate.label.clone(),
                    confidence_label: format_confidence(candidate.confidence),
                    selected: selection == Some(candidate.label.as_str()),
                })
                .collect(),
            display_file_paths: request.display_file_paths().to_vec(),
            can_submit: selection.is_some() && self.connection != ConnectionStatus::Closed,
        })
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn prediction_progress(&self) -> Option<PredictionProgress> {
        self.prediction
    }

    /// Returns whether the state changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Most recent reason an update was refused, if not yet collected.
    pub fn take_rejection(&mut self) -> Option<WorkflowError> {
        self.rejection.take()
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn reject(&mut self, error: WorkflowError) {
        self.rejection = Some(error);
    }

    /// Outbound actions are refused only once the connection has failed for good;
    /// while connecting they are queued by the transport.
    pub(crate) fn can_send(&self) -> bool {
        self.connection != ConnectionStatus::Closed
    }

    pub(crate) fn set_connection(&mut self, status: ConnectionStatus) {
        if self.connection != status {
            self.connection = status;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.mark_dirty();
    }

    pub(crate) fn confirm_mode(&mut self, mode: Mode) {
        self.confirmed_mode = Some(mode);
        self.mark_dirty();
    }

    pub(crate) fn allocate_id(&mut self) -> crate::CorrelationId {
        self.ids.allocate()
    }

    pub(crate) fn reset_prediction(&mut self) {
        self.prediction = None;
        self.approval.clear();
        self.mark_dirty();
    }

    /// Counters only move forward within a run; a shrinking approved count
    /// for the same total is a late frame.
    pub(crate) fn apply_prediction_progress(
        &mut self,
        progress: PredictionProgress,
    ) -> Result<(), WorkflowError> {
        if let Some(current) = self.prediction {
            if current.total_count == progress.total_count
                && progress.approved_count < current.approved_count
            {
                return Err(WorkflowError::StaleProgress {
                    approved: progress.approved_count,
                    total: progress.total_count,
                    current_approved: current.approved_count,
                });
            }
        }
        self.prediction = Some(progress);
        self.mark_dirty();
        Ok(())
    }
}
