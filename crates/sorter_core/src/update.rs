use crate::{
    filter_eligible, root_directory_name, AppState, ApprovalRequest, CandidateFile, Effect, Msg,
    PredictionProgress, WorkflowError,
};

/// Pure update function: applies a message to state and returns any effects.
///
/// A refused message leaves the state as it was, returns no effects and
/// records the reason for [`AppState::take_rejection`].
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let result = match msg {
        Msg::ConnectionChanged(status) => {
            state.set_connection(status);
            Ok(Vec::new())
        }
        Msg::DirectorySelected(files) => select_directory(&mut state, files),
        Msg::UploadInitSent { correlation_id } => state
            .upload
            .mark_init_sent(correlation_id)
            .map(|()| {
                state.mark_dirty();
                Vec::new()
            }),
        Msg::UploadProgress {
            correlation_id,
            percentage,
        } => state
            .upload
            .apply_progress(correlation_id, percentage)
            .map(|()| {
                state.mark_dirty();
                Vec::new()
            }),
        Msg::CancelUploadClicked => cancel_upload(&mut state),
        Msg::ModeSelected(mode) => {
            if state.can_send() {
                state.set_mode(mode);
                Ok(vec![Effect::SelectMode(mode)])
            } else {
                Err(WorkflowError::Disconnected)
            }
        }
        Msg::ModeConfirmed(mode) => {
            state.confirm_mode(mode);
            Ok(Vec::new())
        }
        Msg::StartPredictionsClicked => {
            if state.can_send() {
                state.reset_prediction();
                Ok(vec![Effect::InitPredictions])
            } else {
                Err(WorkflowError::Disconnected)
            }
        }
        Msg::PredictionProgress {
            approved_count,
            total_count,
        } => state
            .apply_prediction_progress(PredictionProgress {
                approved_count,
                total_count,
            })
            .map(|()| Vec::new()),
        Msg::ApprovalRequested(request) => {
            receive_request(&mut state, request);
            Ok(Vec::new())
        }
        Msg::CandidateSelected(label) => state.approval.select_candidate(&label).map(|()| {
            state.mark_dirty();
            Vec::new()
        }),
        Msg::SubmitClicked => submit(&mut state),
        Msg::ArtifactReceived(csv) => {
            let handle = state.artifact.publish(csv);
            state.mark_dirty();
            Ok(vec![Effect::ArtifactPublished(handle)])
        }
        Msg::ArtifactDiscarded => {
            if state.artifact.discard() {
                state.mark_dirty();
            }
            Ok(Vec::new())
        }
    };

    match result {
        Ok(effects) => (state, effects),
        Err(error) => {
            state.reject(error);
            (state, Vec::new())
        }
    }
}

fn select_directory(
    state: &mut AppState,
    files: Vec<CandidateFile>,
) -> Result<Vec<Effect>, WorkflowError> {
    if !state.can_send() {
        return Err(WorkflowError::Disconnected);
    }
    let eligible = filter_eligible(files);
    let Some(first) = eligible.first() else {
        return Err(WorkflowError::NoEligibleFiles);
    };
    let root = root_directory_name(&first.relative_path).to_string();
    let correlation_id = state.allocate_id();
    state.upload.begin(correlation_id, root.clone(), eligible.len());
    state.mark_dirty();

    Ok(vec![
        Effect::InitUpload {
            correlation_id,
            number_of_files: eligible.len(),
            root_directory_name: root,
        },
        Effect::StreamFiles {
            correlation_id,
            relative_paths: eligible.into_iter().map(|f| f.relative_path).collect(),
        },
    ])
}

fn cancel_upload(state: &mut AppState) -> Result<Vec<Effect>, WorkflowError> {
    if !state.can_send() {
        return Err(WorkflowError::Disconnected);
    }
    if !state.upload.status().is_active() {
        return Err(WorkflowError::NoActiveUpload);
    }
    let fresh_id = state.allocate_id();
    state.upload.cancel(fresh_id);
    state.mark_dirty();
    Ok(vec![Effect::CancelUpload])
}

fn receive_request(state: &mut AppState, request: ApprovalRequest) {
    // Replacing an unresolved request is expected; the protocol has no queue.
    state.approval.receive(request);
    state.mark_dirty();
}

fn submit(state: &mut AppState) -> Result<Vec<Effect>, WorkflowError> {
    if !state.can_send() {
        return Err(WorkflowError::Disconnected);
    }
    let decision = state.approval.submit()?;
    state.mark_dirty();
    Ok(vec![Effect::SubmitApproval(decision)])
}
