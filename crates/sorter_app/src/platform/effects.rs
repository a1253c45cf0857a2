use std::path::PathBuf;

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use sorter_core::{
    ApprovalRequest, CandidateClass, ConnectionStatus, CorrelationId, Effect, Mode, Msg,
};
use sorter_engine::protocol::{InitUpload, PredictionApproval, SelectMode};
use sorter_engine::{
    AtomicFileWriter, ConnectionError, ConnectionState, EngineEvent, EngineHandle,
    InboundMessage, OutboundMessage, WireMode,
};

/// What the runner needs from the engine.
pub trait EffectTarget {
    fn send(&self, message: &OutboundMessage) -> Result<(), ConnectionError>;
    fn stream_files(&self, correlation_id: CorrelationId, relative_paths: Vec<String>);
}

impl EffectTarget for EngineHandle {
    fn send(&self, message: &OutboundMessage) -> Result<(), ConnectionError> {
        EngineHandle::send(self, message)
    }

    fn stream_files(&self, correlation_id: CorrelationId, relative_paths: Vec<String>) {
        // Completion is reported through engine events.
        drop(EngineHandle::stream_files(self, correlation_id, relative_paths));
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Applied {
    /// Messages to feed back into `update`.
    pub follow_up: Vec<Msg>,
    pub saved_artifact: Option<PathBuf>,
}

pub struct EffectRunner {
    writer: AtomicFileWriter,
}

impl EffectRunner {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(output_dir),
        }
    }

    pub fn apply(&self, target: &dyn EffectTarget, effects: Vec<Effect>) -> Applied {
        let mut applied = Applied::default();
        for effect in effects {
            match effect {
                Effect::StreamFiles {
                    correlation_id,
                    relative_paths,
                } => {
                    target.stream_files(correlation_id, relative_paths);
                }
                Effect::ArtifactPublished(handle) => {
                    match self.writer.write(handle.suggested_filename(), handle.data()) {
                        Ok(path) => {
                            engine_info!(
                                "Saved artifact generation {} ({} bytes) to {:?}",
                                handle.generation(),
                                handle.data().len(),
                                path
                            );
                            applied.saved_artifact = Some(path);
                            applied.follow_up.push(Msg::ArtifactDiscarded);
                        }
                        Err(err) => engine_error!("Failed to save artifact: {}", err),
                    }
                }
                other => {
                    let Some(message) = to_outbound(&other) else {
                        continue;
                    };
                    match target.send(&message) {
                        Ok(()) => {
                            engine_debug!("Sent {:?}", message.kind());
                            if let Effect::InitUpload { correlation_id, .. } = other {
                                applied
                                    .follow_up
                                    .push(Msg::UploadInitSent { correlation_id });
                            }
                        }
                        Err(err) => engine_warn!("Could not send {:?}: {}", message.kind(), err),
                    }
                }
            }
        }
        applied
    }
}

/// Protocol message for effects that map one-to-one onto a frame.
pub fn to_outbound(effect: &Effect) -> Option<OutboundMessage> {
    match effect {
        Effect::InitUpload {
            correlation_id,
            number_of_files,
            root_directory_name,
        } => Some(OutboundMessage::InitUpload(InitUpload {
            number_of_files: *number_of_files as u64,
            root_directory_name: root_directory_name.clone(),
            correlation_id: *correlation_id,
        })),
        Effect::CancelUpload => Some(OutboundMessage::CancelUpload),
        Effect::SelectMode(mode) => Some(OutboundMessage::SelectMode(SelectMode {
            mode: to_wire_mode(*mode),
        })),
        Effect::InitPredictions => Some(OutboundMessage::InitPredictions),
        Effect::SubmitApproval(decision) => {
            Some(OutboundMessage::PredictionApproval(PredictionApproval {
                product_identifier: decision.product_identifier.clone(),
                chosen_class: decision.chosen_class.clone(),
            }))
        }
        Effect::StreamFiles { .. } | Effect::ArtifactPublished(_) => None,
    }
}

pub fn inbound_to_msg(message: InboundMessage) -> Msg {
    match message {
        InboundMessage::UploadProgress(progress) => Msg::UploadProgress {
            correlation_id: progress.correlation_id,
            percentage: progress.percentage,
        },
        InboundMessage::PredictionProgress(progress) => Msg::PredictionProgress {
            approved_count: progress.approved_count,
            total_count: progress.total_count,
        },
        InboundMessage::PredictionApprovalRequest(request) => {
            let file = request.file_to_approve;
            let candidates = file
                .candidate_classes
                .into_iter()
                .map(|class| CandidateClass::new(class.label, class.confidence))
                .collect();
            Msg::ApprovalRequested(ApprovalRequest::new(
                file.product_identifier,
                candidates,
                file.display_file_paths,
            ))
        }
        InboundMessage::CsvFile(csv) => Msg::ArtifactReceived(csv.content),
        InboundMessage::ModeSelected(selected) => Msg::ModeConfirmed(from_wire_mode(selected.mode)),
    }
}

/// Engine events that matter to the core; file-level outcomes are logged only.
pub fn event_to_msg(event: EngineEvent) -> Option<Msg> {
    match event {
        EngineEvent::Connection(state) => Some(Msg::ConnectionChanged(connection_status(&state))),
        EngineEvent::FileSent {
            correlation_id,
            relative_path,
        } => {
            engine_debug!("Upload {}: sent {}", correlation_id, relative_path);
            None
        }
        EngineEvent::FileFailed {
            correlation_id,
            relative_path,
            reason,
        } => {
            engine_warn!(
                "Upload {}: {} not sent: {}",
                correlation_id,
                relative_path,
                reason
            );
            None
        }
        EngineEvent::StreamFinished {
            correlation_id,
            sent,
            failed,
        } => {
            engine_info!(
                "Upload {}: {} file(s) sent, {} failed",
                correlation_id,
                sent,
                failed
            );
            None
        }
    }
}

pub fn connection_status(state: &ConnectionState) -> ConnectionStatus {
    match state {
        ConnectionState::Connecting => ConnectionStatus::Connecting,
        ConnectionState::Open => ConnectionStatus::Open,
        ConnectionState::Closed(_) => ConnectionStatus::Closed,
    }
}

fn to_wire_mode(mode: Mode) -> WireMode {
    match mode {
        Mode::Automatic => WireMode::Automatic,
        Mode::SemiAutomatic => WireMode::SemiAutomatic,
        Mode::Manual => WireMode::Manual,
    }
}

fn from_wire_mode(mode: WireMode) -> Mode {
    match mode {
        WireMode::Automatic => Mode::Automatic,
        WireMode::SemiAutomatic => Mode::SemiAutomatic,
        WireMode::Manual => Mode::Manual,
    }
}
