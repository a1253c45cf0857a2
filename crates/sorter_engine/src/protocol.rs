//! Wire codec for the socket protocol.
//!
//! Every frame is a JSON object `{"type": <discriminant>, "data": <payload>}`;
//! payload-less messages carry no `data`. Outbound messages are serialized with
//! serde's adjacent tagging. Decoding is done in explicit steps so that an
//! unparseable frame, an unknown discriminant and a payload of the wrong shape
//! are reported separately.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed frame: {0}")]
    Malformed(String),
    #[error("unknown discriminant {0:?}")]
    UnknownDiscriminant(String),
    #[error("invalid payload for {discriminant}: {message}")]
    InvalidPayload {
        discriminant: &'static str,
        message: String,
    },
}

#[derive(Debug, thiserror::Error)]
#[error("failed to encode {discriminant}: {source}")]
pub struct EncodeError {
    pub discriminant: &'static str,
    #[source]
    pub source: serde_json::Error,
}

/// Operating mode as spelled on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WireMode {
    Automatic,
    SemiAutomatic,
    Manual,
}

// ---- outbound payloads ----

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitUpload {
    #[serde(rename = "numberOfFiles")]
    pub number_of_files: u64,
    #[serde(rename = "rootDir")]
    pub root_directory_name: String,
    #[serde(rename = "uploadId")]
    pub correlation_id: u64,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUpload {
    #[serde(rename = "fileName")]
    pub relative_path: String,
    /// Standard base64 of the raw file bytes.
    #[serde(rename = "fileData")]
    pub encoded_data: String,
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("relative_path", &self.relative_path)
            .field("encoded_len", &self.encoded_data.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectMode {
    pub mode: WireMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionApproval {
    #[serde(rename = "productName")]
    pub product_identifier: String,
    #[serde(rename = "class")]
    pub chosen_class: String,
}

// ---- inbound payloads ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadProgress {
    #[serde(rename = "uploadId")]
    pub correlation_id: u64,
    #[serde(rename = "progress")]
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionProgress {
    #[serde(rename = "approvedFiles")]
    pub approved_count: u64,
    #[serde(rename = "filesToPredict")]
    pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedClass {
    #[serde(rename = "class")]
    pub label: String,
    #[serde(rename = "weight")]
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileToApprove {
    #[serde(rename = "productName")]
    pub product_identifier: String,
    #[serde(rename = "predictedClasses")]
    pub candidate_classes: Vec<PredictedClass>,
    #[serde(rename = "filePaths")]
    pub display_file_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    #[serde(rename = "fileToApprove")]
    pub file_to_approve: FileToApprove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvFile {
    #[serde(rename = "csvData")]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeSelected {
    pub mode: WireMode,
}

// ---- envelopes ----

/// Client to backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OutboundMessage {
    InitUpload(InitUpload),
    FileUpload(FileUpload),
    CancelUpload,
    SelectMode(SelectMode),
    InitPredictions,
    PredictionApproval(PredictionApproval),
}

/// Backend to client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum InboundMessage {
    UploadProgress(UploadProgress),
    PredictionProgress(PredictionProgress),
    PredictionApprovalRequest(ApprovalRequest),
    CsvFile(CsvFile),
    ModeSelected(ModeSelected),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutboundKind {
    InitUpload,
    FileUpload,
    CancelUpload,
    SelectMode,
    InitPredictions,
    PredictionApproval,
}

impl OutboundKind {
    pub const ALL: [OutboundKind; 6] = [
        OutboundKind::InitUpload,
        OutboundKind::FileUpload,
        OutboundKind::CancelUpload,
        OutboundKind::SelectMode,
        OutboundKind::InitPredictions,
        OutboundKind::PredictionApproval,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OutboundKind::InitUpload => "init_upload",
            OutboundKind::FileUpload => "file_upload",
            OutboundKind::CancelUpload => "cancel_upload",
            OutboundKind::SelectMode => "select_mode",
            OutboundKind::InitPredictions => "init_predictions",
            OutboundKind::PredictionApproval => "prediction_approval",
        }
    }

    pub fn from_wire(discriminant: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == discriminant)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundKind {
    UploadProgress,
    PredictionProgress,
    PredictionApprovalRequest,
    CsvFile,
    ModeSelected,
}

impl InboundKind {
    pub const COUNT: usize = 5;

    pub const ALL: [InboundKind; Self::COUNT] = [
        InboundKind::UploadProgress,
        InboundKind::PredictionProgress,
        InboundKind::PredictionApprovalRequest,
        InboundKind::CsvFile,
        InboundKind::ModeSelected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InboundKind::UploadProgress => "upload_progress",
            InboundKind::PredictionProgress => "prediction_progress",
            InboundKind::PredictionApprovalRequest => "prediction_approval_request",
            InboundKind::CsvFile => "csv_file",
            InboundKind::ModeSelected => "mode_selected",
        }
    }

    pub fn from_wire(discriminant: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == discriminant)
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for InboundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closed set of envelope types that can be carried in one direction.
pub trait WireMessage: Serialize + Sized {
    fn discriminant(&self) -> &'static str;

    /// Build a message from an already-split envelope.
    fn from_parts(discriminant: &str, data: Option<Value>) -> Result<Self, DecodeError>;
}

impl OutboundMessage {
    pub fn kind(&self) -> OutboundKind {
        match self {
            OutboundMessage::InitUpload(_) => OutboundKind::InitUpload,
            OutboundMessage::FileUpload(_) => OutboundKind::FileUpload,
            OutboundMessage::CancelUpload => OutboundKind::CancelUpload,
            OutboundMessage::SelectMode(_) => OutboundKind::SelectMode,
            OutboundMessage::InitPredictions => OutboundKind::InitPredictions,
            OutboundMessage::PredictionApproval(_) => OutboundKind::PredictionApproval,
        }
    }
}

impl WireMessage for OutboundMessage {
    fn discriminant(&self) -> &'static str {
        self.kind().as_str()
    }

    fn from_parts(discriminant: &str, data: Option<Value>) -> Result<Self, DecodeError> {
        let kind = OutboundKind::from_wire(discriminant)
            .ok_or_else(|| DecodeError::UnknownDiscriminant(discriminant.to_string()))?;
        let tag = kind.as_str();
        Ok(match kind {
            OutboundKind::InitUpload => OutboundMessage::InitUpload(payload(tag, data)?),
            OutboundKind::FileUpload => OutboundMessage::FileUpload(payload(tag, data)?),
            OutboundKind::CancelUpload => OutboundMessage::CancelUpload,
            OutboundKind::SelectMode => OutboundMessage::SelectMode(payload(tag, data)?),
            OutboundKind::InitPredictions => OutboundMessage::InitPredictions,
            OutboundKind::PredictionApproval => {
                OutboundMessage::PredictionApproval(payload(tag, data)?)
            }
        })
    }
}

impl InboundMessage {
    pub fn kind(&self) -> InboundKind {
        match self {
            InboundMessage::UploadProgress(_) => InboundKind::UploadProgress,
            InboundMessage::PredictionProgress(_) => InboundKind::PredictionProgress,
            InboundMessage::PredictionApprovalRequest(_) => {
                InboundKind::PredictionApprovalRequest
            }
            InboundMessage::CsvFile(_) => InboundKind::CsvFile,
            InboundMessage::ModeSelected(_) => InboundKind::ModeSelected,
        }
    }
}

impl WireMessage for InboundMessage {
    fn discriminant(&self) -> &'static str {
        self.kind().as_str()
    }

    fn from_parts(discriminant: &str, data: Option<Value>) -> Result<Self, DecodeError> {
        let kind = InboundKind::from_wire(discriminant)
            .ok_or_else(|| DecodeError::UnknownDiscriminant(discriminant.to_string()))?;
        let tag = kind.as_str();
        Ok(match kind {
            InboundKind::UploadProgress => InboundMessage::UploadProgress(payload(tag, data)?),
            InboundKind::PredictionProgress => {
                InboundMessage::PredictionProgress(payload(tag, data)?)
            }
            InboundKind::PredictionApprovalRequest => {
                InboundMessage::PredictionApprovalRequest(payload(tag, data)?)
            }
            InboundKind::CsvFile => InboundMessage::CsvFile(payload(tag, data)?),
            InboundKind::ModeSelected => InboundMessage::ModeSelected(payload(tag, data)?),
        })
    }
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    discriminant: String,
    #[serde(default)]
    data: Option<Value>,
}

fn payload<T: DeserializeOwned>(
    discriminant: &'static str,
    data: Option<Value>,
) -> Result<T, DecodeError> {
    let data = data.ok_or_else(|| DecodeError::InvalidPayload {
        discriminant,
        message: "missing data".to_string(),
    })?;
    serde_json::from_value(data).map_err(|err| DecodeError::InvalidPayload {
        discriminant,
        message: err.to_string(),
    })
}

pub fn encode<M: WireMessage>(message: &M) -> Result<String, EncodeError> {
    serde_json::to_string(message).map_err(|source| EncodeError {
        discriminant: message.discriminant(),
        source,
    })
}

pub fn decode<M: WireMessage>(text: &str) -> Result<M, DecodeError> {
    let raw: RawEnvelope =
        serde_json::from_str(text).map_err(|err| DecodeError::Malformed(err.to_string()))?;
    M::from_parts(&raw.discriminant, raw.data)
}
