use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::connection::{ConnectionError, ConnectionHandle, ConnectionSettings, ConnectionState};
use crate::fetch::{FetchSettings, ImageFetcher, ReqwestImageFetcher};
use crate::protocol::OutboundMessage;
use crate::router::SharedRouter;
use crate::types::{ChannelEventSink, CorrelationId, EngineEvent};
use crate::upload::{FileSource, UploadSettings, Uploader};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub connection: ConnectionSettings,
    pub upload: UploadSettings,
    pub fetch: FetchSettings,
}

/// Owns the connection, the upload workers and the event channel. Inbound
/// protocol messages go to the router; everything else arrives as
/// [`EngineEvent`]s.
pub struct EngineHandle {
    connection: ConnectionHandle,
    uploader: Uploader,
    fetcher: Arc<dyn ImageFetcher>,
    event_rx: mpsc::UnboundedReceiver<EngineEvent>,
}

impl EngineHandle {
    /// Connects in the background. Handlers should already be registered on
    /// `router`. Must be called inside a tokio runtime.
    pub fn start(
        settings: EngineSettings,
        router: SharedRouter,
        source: Arc<dyn FileSource>,
    ) -> Result<Self, ConnectionError> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let connection = ConnectionHandle::connect(settings.connection, router)?;
        let events = Arc::new(ChannelEventSink::new(event_tx.clone()));
        let uploader = Uploader::new(
            source,
            Arc::new(connection.clone()),
            events,
            &settings.upload,
        );
        let fetcher: Arc<dyn ImageFetcher> = Arc::new(ReqwestImageFetcher::new(settings.fetch));

        let mut state_rx = connection.subscribe();
        tokio::spawn(async move {
            loop {
                let state = state_rx.borrow_and_update().clone();
                let closed = state.is_closed();
                if event_tx.send(EngineEvent::Connection(state)).is_err() || closed {
                    break;
                }
                if state_rx.changed().await.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            connection,
            uploader,
            fetcher,
            event_rx,
        })
    }

    pub fn send(&self, message: &OutboundMessage) -> Result<(), ConnectionError> {
        self.connection.send(message)
    }

    pub fn stream_files(
        &self,
        correlation_id: CorrelationId,
        relative_paths: Vec<String>,
    ) -> JoinHandle<()> {
        self.uploader.stream(correlation_id, relative_paths)
    }

    pub fn image_fetcher(&self) -> Arc<dyn ImageFetcher> {
        self.fetcher.clone()
    }

    pub fn close(&self) {
        self.connection.close();
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub async fn next_event(&mut self) -> Option<EngineEvent> {
        self.event_rx.recv().await
    }
}
