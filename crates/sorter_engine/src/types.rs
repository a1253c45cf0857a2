use tokio::sync::mpsc;

use crate::connection::ConnectionState;

pub type CorrelationId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Connection(ConnectionState),
    FileSent {
        correlation_id: CorrelationId,
        relative_path: String,
    },
    FileFailed {
        correlation_id: CorrelationId,
        relative_path: String,
        reason: String,
    },
    /// Every file task of a stream has finished, successfully or not.
    StreamFinished {
        correlation_id: CorrelationId,
        sent: usize,
        failed: usize,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}
