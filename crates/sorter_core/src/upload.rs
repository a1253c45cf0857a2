use crate::WorkflowError;

pub type CorrelationId = u64;

/// Extensions accepted for upload. Matching is case-sensitive.
pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg"];

/// Separator used in relative paths, independent of the host platform.
pub const PATH_SEPARATOR: char = '/';

/// A file offered by a directory selection, addressed relative to the
/// parent of the selected directory (so the first segment is the directory name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub relative_path: String,
}

impl CandidateFile {
    pub fn new(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
        }
    }
}

pub fn is_allowed_image(relative_path: &str) -> bool {
    let file_name = relative_path
        .rsplit(PATH_SEPARATOR)
        .next()
        .unwrap_or(relative_path);
    match file_name.rsplit_once('.') {
        Some((_, extension)) => ALLOWED_IMAGE_EXTENSIONS.contains(&extension),
        None => false,
    }
}

/// Keep only allowed images, preserving selection order.
pub fn filter_eligible(files: Vec<CandidateFile>) -> Vec<CandidateFile> {
    files
        .into_iter()
        .filter(|file| is_allowed_image(&file.relative_path))
        .collect()
}

/// Segment before the first separator.
pub fn root_directory_name(relative_path: &str) -> &str {
    relative_path
        .split(PATH_SEPARATOR)
        .next()
        .unwrap_or(relative_path)
}

/// Strictly increasing id source; an id is never handed out twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationIds {
    next: CorrelationId,
}

impl CorrelationIds {
    pub fn starting_at(seed: CorrelationId) -> Self {
        Self { next: seed }
    }

    pub fn allocate(&mut self) -> CorrelationId {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadStatus {
    #[default]
    Idle,
    Initializing,
    Streaming,
    Cancelled,
    Completed,
}

impl UploadStatus {
    pub fn is_active(self) -> bool {
        matches!(
            self,
            UploadStatus::Initializing | UploadStatus::Streaming | UploadStatus::Completed
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadSession {
    id: CorrelationId,
    root_directory_name: Option<String>,
    total_files: usize,
    status: UploadStatus,
    percentage: Option<f64>,
}

impl UploadSession {
    pub fn idle(id: CorrelationId) -> Self {
        Self {
            id,
            root_directory_name: None,
            total_files: 0,
            status: UploadStatus::Idle,
            percentage: None,
        }
    }

    pub fn id(&self) -> CorrelationId {
        self.id
    }

    pub fn root_directory_name(&self) -> Option<&str> {
        self.root_directory_name.as_deref()
    }

    pub fn total_files(&self) -> usize {
        self.total_files
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    pub fn percentage(&self) -> Option<f64> {
        self.percentage
    }

    /// Replace whatever session was here with a fresh one under `id`.
    pub(crate) fn begin(&mut self, id: CorrelationId, root: String, total_files: usize) {
        *self = Self {
            id,
            root_directory_name: Some(root),
            total_files,
            status: UploadStatus::Initializing,
            percentage: None,
        };
    }

    pub(crate) fn mark_init_sent(&mut self, id: CorrelationId) -> Result<(), WorkflowError> {
        self.check_correlation(id)?;
        if self.status == UploadStatus::Initializing {
            self.status = UploadStatus::Streaming;
        }
        Ok(())
    }

    pub(crate) fn apply_progress(
        &mut self,
        id: CorrelationId,
        percentage: f64,
    ) -> Result<(), WorkflowError> {
        self.check_correlation(id)?;
        let percentage = if percentage.is_nan() {
            0.0
        } else {
            percentage.clamp(0.0, 100.0)
        };
        self.percentage = Some(percentage);
        if percentage >= 100.0 {
            self.status = UploadStatus::Completed;
        } else if self.status == UploadStatus::Initializing {
            self.status = UploadStatus::Streaming;
        }
        Ok(())
    }

    /// Drop the current session and park under a fresh id so that anything
    /// still tagged with the old one reads as stale.
    pub(crate) fn cancel(&mut self, fresh_id: CorrelationId) {
        *self = Self {
            status: UploadStatus::Cancelled,
            ..Self::idle(fresh_id)
        };
    }

    fn check_correlation(&self, id: CorrelationId) -> Result<(), WorkflowError> {
        if id != self.id {
            return Err(WorkflowError::StaleCorrelation {
                active: self.id,
                received: id,
            });
        }
        if !self.status.is_active() {
            return Err(WorkflowError::NoActiveUpload);
        }
        Ok(())
    }
}
