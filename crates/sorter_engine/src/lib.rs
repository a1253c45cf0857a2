//! Sorter engine: socket connection, wire codec and upload/fetch IO.
mod connection;
mod engine;
mod fetch;
mod persist;
pub mod protocol;
mod router;
mod scan;
mod types;
mod upload;

pub use connection::{
    deliver_frame, CloseReason, ConnectionError, ConnectionHandle, ConnectionSettings,
    ConnectionState,
};
pub use engine::{EngineHandle, EngineSettings};
pub use fetch::{
    FailureKind, FetchError, FetchSettings, ImageBytes, ImageFetcher, ReqwestImageFetcher,
};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use protocol::{
    decode, encode, DecodeError, EncodeError, InboundKind, InboundMessage, OutboundKind,
    OutboundMessage, WireMessage, WireMode,
};
pub use router::{Dispatch, EventRouter, Handler, SharedRouter};
pub use scan::{DirectoryScanner, ScanError, ScanOutput};
pub use types::{ChannelEventSink, CorrelationId, EngineEvent, EventSink};
pub use upload::{
    file_upload_message, DirectorySource, FileSource, MessageSink, UploadError, UploadSettings,
    Uploader,
};
