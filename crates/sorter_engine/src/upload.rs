//! IO half of the upload pipeline: concurrent file reads, base64 encoding and
//! one `file_upload` message per file.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use engine_logging::{engine_debug, engine_info, engine_warn};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::connection::{ConnectionError, ConnectionHandle};
use crate::protocol::{FileUpload, OutboundMessage};
use crate::types::{CorrelationId, EngineEvent, EventSink};

#[derive(Debug, Clone, Default)]
pub struct UploadSettings {
    /// `None` reads every file at once.
    pub max_concurrent_reads: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid relative path {0:?}")]
    InvalidPath(String),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Send(#[from] ConnectionError),
}

#[async_trait::async_trait]
pub trait FileSource: Send + Sync {
    async fn read(&self, relative_path: &str) -> Result<Vec<u8>, UploadError>;
}

/// Reads files relative to the directory that contains the selected root.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    base: PathBuf,
}

impl DirectorySource {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn resolve(&self, relative_path: &str) -> Result<PathBuf, UploadError> {
        let relative = Path::new(relative_path);
        let plain = !relative_path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !plain {
            return Err(UploadError::InvalidPath(relative_path.to_string()));
        }
        Ok(relative_path
            .split('/')
            .fold(self.base.clone(), |path, segment| path.join(segment)))
    }
}

#[async_trait::async_trait]
impl FileSource for DirectorySource {
    async fn read(&self, relative_path: &str) -> Result<Vec<u8>, UploadError> {
        let path = self.resolve(relative_path)?;
        tokio::fs::read(&path)
            .await
            .map_err(|source| UploadError::Read { path, source })
    }
}

pub trait MessageSink: Send + Sync {
    fn send(&self, message: &OutboundMessage) -> Result<(), ConnectionError>;
}

impl MessageSink for ConnectionHandle {
    fn send(&self, message: &OutboundMessage) -> Result<(), ConnectionError> {
        ConnectionHandle::send(self, message)
    }
}

pub fn file_upload_message(relative_path: &str, bytes: &[u8]) -> OutboundMessage {
    OutboundMessage::FileUpload(FileUpload {
        relative_path: relative_path.to_string(),
        encoded_data: STANDARD.encode(bytes),
    })
}

#[derive(Clone)]
pub struct Uploader {
    source: Arc<dyn FileSource>,
    sink: Arc<dyn MessageSink>,
    events: Arc<dyn EventSink>,
    limit: Option<Arc<Semaphore>>,
}

impl Uploader {
    pub fn new(
        source: Arc<dyn FileSource>,
        sink: Arc<dyn MessageSink>,
        events: Arc<dyn EventSink>,
        settings: &UploadSettings,
    ) -> Self {
        let limit = settings
            .max_concurrent_reads
            .map(|permits| Arc::new(Semaphore::new(permits.max(1))));
        Self {
            source,
            sink,
            events,
            limit,
        }
    }

    /// Spawns one task per file and returns a handle that completes once all
    /// of them have finished. Dropping the handle does not stop the reads.
    pub fn stream(
        &self,
        correlation_id: CorrelationId,
        relative_paths: Vec<String>,
    ) -> JoinHandle<()> {
        engine_info!(
            "Streaming {} file(s) for upload {}",
            relative_paths.len(),
            correlation_id
        );
        let tasks: Vec<JoinHandle<bool>> = relative_paths
            .into_iter()
            .map(|relative_path| {
                let uploader = self.clone();
                tokio::spawn(async move { uploader.send_one(correlation_id, relative_path).await })
            })
            .collect();

        let events = self.events.clone();
        tokio::spawn(async move {
            let mut sent = 0;
            let mut failed = 0;
            for task in tasks {
                match task.await {
                    Ok(true) => sent += 1,
                    Ok(false) => failed += 1,
                    Err(err) => {
                        engine_warn!("Upload task for {} aborted: {}", correlation_id, err);
                        failed += 1;
                    }
                }
            }
            events.emit(EngineEvent::StreamFinished {
                correlation_id,
                sent,
                failed,
            });
        })
    }

    async fn send_one(&self, correlation_id: CorrelationId, relative_path: String) -> bool {
        let _permit = match &self.limit {
            Some(limit) => limit.clone().acquire_owned().await.ok(),
            None => None,
        };

        let result = match self.source.read(&relative_path).await {
            Ok(bytes) => {
                engine_debug!("Read {} ({} bytes)", relative_path, bytes.len());
                self.sink
                    .send(&file_upload_message(&relative_path, &bytes))
                    .map_err(UploadError::from)
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => {
                self.events.emit(EngineEvent::FileSent {
                    correlation_id,
                    relative_path,
                });
                true
            }
            Err(err) => {
                engine_warn!("Upload of {} failed: {}", relative_path, err);
                self.events.emit(EngineEvent::FileFailed {
                    correlation_id,
                    relative_path,
                    reason: err.to_string(),
                });
                false
            }
        }
    }
}
