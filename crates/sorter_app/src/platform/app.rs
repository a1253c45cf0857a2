use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use engine_logging::{engine_debug, engine_info, engine_warn};
use sorter_core::{
    is_allowed_image, update, AppState, AppViewModel, CandidateFile, ConnectionStatus, Msg,
    UploadStatus, ALLOWED_IMAGE_EXTENSIONS,
};
use sorter_engine::{
    ConnectionState, DirectoryScanner, DirectorySource, EngineEvent, EngineHandle, EventRouter,
    InboundKind, SharedRouter,
};
use tokio::sync::mpsc;

use super::config::AppConfig;
use super::effects::{event_to_msg, inbound_to_msg, EffectRunner};
use super::prompt::{self, PromptOutcome};

/// Uploads `directory`, runs the prediction/approval cycle and saves the
/// result CSV. Returns once the artifact is written or the connection closes.
pub async fn run(config: AppConfig, directory: &Path) -> anyhow::Result<()> {
    let mode = config.mode()?;
    let scan = DirectoryScanner::new()
        .scan(directory)
        .with_context(|| format!("Failed to scan {}", directory.display()))?;
    engine_info!(
        "Found {} file(s) under {}",
        scan.relative_paths.len(),
        scan.root_name
    );
    let files: Vec<CandidateFile> = scan
        .relative_paths
        .iter()
        .map(|path| CandidateFile::new(path.as_str()))
        .collect();
    if !files.iter().any(|file| is_allowed_image(&file.relative_path)) {
        bail!(
            "No uploadable images in {} (allowed: {})",
            directory.display(),
            ALLOWED_IMAGE_EXTENSIONS.join(", ")
        );
    }

    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<Msg>();
    let router = EventRouter::shared();
    register_handlers(&router, &msg_tx);

    let source = Arc::new(DirectorySource::new(scan.base_dir.clone()));
    let mut engine = EngineHandle::start(config.engine_settings(), router, source)
        .context("Failed to start connection")?;
    let previews = config.fetch_previews.then(|| engine.image_fetcher());

    let mut session = Session::new(AppState::with_seed(clock_seed()));
    let runner = EffectRunner::new(config.output_dir.clone());
    let (prompt_tx, mut prompt_rx) = mpsc::unbounded_channel::<PromptOutcome>();

    let mut queue: VecDeque<Msg> =
        VecDeque::from([Msg::ModeSelected(mode), Msg::DirectorySelected(files)]);
    let mut closed: Option<String> = None;

    loop {
        while let Some(msg) = queue.pop_front() {
            let applied = runner.apply(&engine, session.dispatch(msg));
            queue.extend(applied.follow_up);
            if let Some(path) = applied.saved_artifact {
                println!("Predictions saved to {}", path.display());
                session.finished = true;
            }
        }

        if let Some(view) = session.take_view() {
            session.render(&view);
            if let Some(msg) = session.next_action(&view) {
                queue.push_back(msg);
                continue;
            }
        }
        // Also re-checked after an answer, which may leave a newer request waiting.
        let view = session.state.view();
        if let Some(approval) = session.prompt_needed(&view) {
            let tx = prompt_tx.clone();
            let previews = previews.clone();
            tokio::spawn(async move {
                let _ = tx.send(prompt::ask(approval, previews).await);
            });
        }

        if session.finished {
            engine.close();
            return Ok(());
        }
        if let Some(reason) = closed.take() {
            bail!("Connection closed before predictions were saved: {reason}");
        }

        tokio::select! {
            Some(msg) = msg_rx.recv() => queue.push_back(msg),
            Some(event) = engine.next_event() => {
                if let EngineEvent::Connection(ConnectionState::Closed(reason)) = &event {
                    closed = Some(reason.to_string());
                    // Frames received before the close are already queued.
                    while let Ok(msg) = msg_rx.try_recv() {
                        queue.push_back(msg);
                    }
                }
                queue.extend(event_to_msg(event));
            }
            Some(outcome) = prompt_rx.recv() => queue.extend(session.answer(outcome)),
            _ = tokio::signal::ctrl_c() => {
                if session.state.view().upload.status.is_active() {
                    println!("Cancelling upload");
                    queue.push_back(Msg::CancelUploadClicked);
                } else {
                    engine.close();
                    bail!("Interrupted");
                }
            }
        }
    }
}

fn register_handlers(router: &SharedRouter, msg_tx: &mpsc::UnboundedSender<Msg>) {
    let mut router = router.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    for kind in InboundKind::ALL {
        let tx = msg_tx.clone();
        router.register(kind, move |message| {
            let _ = tx.send(inbound_to_msg(message));
        });
    }
}

fn clock_seed() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(1)
}

/// Core state plus the host-side bookkeeping of one CLI run.
struct Session {
    state: AppState,
    predictions_started: bool,
    prompted_product: Option<String>,
    /// A terminal prompt is open; only one may own stdin at a time.
    prompt_in_flight: bool,
    last_lines: Vec<String>,
    finished: bool,
}

impl Session {
    fn new(state: AppState) -> Self {
        Self {
            state,
            predictions_started: false,
            prompted_product: None,
            prompt_in_flight: false,
            last_lines: Vec::new(),
            finished: false,
        }
    }

    fn dispatch(&mut self, msg: Msg) -> Vec<sorter_core::Effect> {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        if let Some(rejection) = state.take_rejection() {
            engine_debug!("Ignored: {}", rejection);
        }
        self.state = state;
        effects
    }

    fn take_view(&mut self) -> Option<AppViewModel> {
        self.state.consume_dirty().then(|| self.state.view())
    }

    /// Follow-up the CLI takes on its own, like starting predictions once the
    /// backend reports the upload complete.
    fn next_action(&mut self, view: &AppViewModel) -> Option<Msg> {
        if view.upload.status == UploadStatus::Completed
            && !self.predictions_started
            && view.connection != ConnectionStatus::Closed
        {
            self.predictions_started = true;
            return Some(Msg::StartPredictionsClicked);
        }
        None
    }

    fn prompt_needed(&mut self, view: &AppViewModel) -> Option<sorter_core::ApprovalView> {
        if self.prompt_in_flight {
            return None;
        }
        let approval = view.approval.as_ref()?;
        if self.prompted_product.as_deref() == Some(approval.product_identifier.as_str()) {
            return None;
        }
        self.prompted_product = Some(approval.product_identifier.clone());
        self.prompt_in_flight = true;
        Some(approval.clone())
    }

    /// Turns an operator answer into core messages, unless the request it
    /// answers has been replaced in the meantime. In that case the next
    /// `prompt_needed` asks about the replacement.
    fn answer(&mut self, outcome: PromptOutcome) -> Vec<Msg> {
        self.prompt_in_flight = false;
        let pending = self.state.view().approval.map(|a| a.product_identifier);
        if pending.as_deref() != Some(outcome.product_identifier.as_str()) {
            engine_warn!(
                "Discarding answer for {}: request no longer pending",
                outcome.product_identifier
            );
            return Vec::new();
        }
        match outcome.chosen_label {
            Some(label) => {
                self.prompted_product = None;
                vec![Msg::CandidateSelected(label), Msg::SubmitClicked]
            }
            None => {
                println!("Skipped {}", outcome.product_identifier);
                Vec::new()
            }
        }
    }

    fn render(&mut self, view: &AppViewModel) {
        let mut lines = vec![format!("Connection: {:?}", view.connection)];
        if let Some(root) = &view.upload.root_directory_name {
            let progress = view
                .upload
                .percentage
                .map(|pct| format!("{pct:.0}%"))
                .unwrap_or_else(|| "waiting".to_string());
            lines.push(format!(
                "Upload {} ({} files): {:?} {}",
                root, view.upload.total_files, view.upload.status, progress
            ));
        }
        if self.predictions_started {
            lines.push(view.prediction_label.clone());
        }
        if let Some(confirmed) = view.confirmed_mode {
            lines.push(format!("Mode: {confirmed}"));
        }

        for line in &lines {
            if !self.last_lines.contains(line) {
                println!("{line}");
            }
        }
        self.last_lines = lines;
    }
}
