use std::sync::Arc;

use bytes::Bytes;

pub const CSV_MEDIA_TYPE: &str = "text/csv";
pub const DEFAULT_ARTIFACT_FILENAME: &str = "predictions.csv";

#[derive(Debug, PartialEq, Eq)]
struct Artifact {
    generation: u64,
    media_type: &'static str,
    data: Bytes,
}

/// Shared, read-only view of a published result artifact.
///
/// The underlying buffer is released when the holder has moved on and the
/// last handle is dropped.
#[derive(Debug, Clone)]
pub struct ArtifactHandle(Arc<Artifact>);

impl ArtifactHandle {
    /// 1 for the first artifact published by a holder, then increasing.
    pub fn generation(&self) -> u64 {
        self.0.generation
    }

    pub fn media_type(&self) -> &'static str {
        self.0.media_type
    }

    pub fn data(&self) -> &Bytes {
        &self.0.data
    }

    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.0.data).ok()
    }

    pub fn suggested_filename(&self) -> &'static str {
        DEFAULT_ARTIFACT_FILENAME
    }
}

impl PartialEq for ArtifactHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ArtifactHandle {}

/// Buffers at most one artifact; publishing replaces the previous one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactHolder {
    current: Option<ArtifactHandle>,
    published: u64,
}

impl ArtifactHolder {
    pub fn publish(&mut self, csv: String) -> ArtifactHandle {
        self.published += 1;
        let handle = ArtifactHandle(Arc::new(Artifact {
            generation: self.published,
            media_type: CSV_MEDIA_TYPE,
            data: Bytes::from(csv),
        }));
        self.current = Some(handle.clone());
        handle
    }

    pub fn current(&self) -> Option<&ArtifactHandle> {
        self.current.as_ref()
    }

    pub fn is_current(&self, handle: &ArtifactHandle) -> bool {
        self.current.as_ref() == Some(handle)
    }

    /// Returns whether anything was held.
    pub fn discard(&mut self) -> bool {
        self.current.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_artifact_supersedes_old_handle() {
        let mut holder = ArtifactHolder::default();
        let first = holder.publish("product,class\nboots,shoes\n".into());
        let second = holder.publish("product,class\nhat,headwear\n".into());

        assert!(!holder.is_current(&first));
        assert!(holder.is_current(&second));
        assert_eq!(second.generation(), 2);
        // A consumer still holding the old handle can read it.
        assert_eq!(first.as_text(), Some("product,class\nboots,shoes\n"));
    }

    #[test]
    fn old_buffer_released_once_unreferenced() {
        let mut holder = ArtifactHolder::default();
        let first = holder.publish("a".into());
        let weak = Arc::downgrade(&first.0);
        holder.publish("b".into());
        assert!(weak.upgrade().is_some());
        drop(first);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn discard_empties_holder() {
        let mut holder = ArtifactHolder::default();
        assert!(!holder.discard());
        let handle = holder.publish("x".into());
        assert!(holder.discard());
        assert!(holder.current().is_none());
        assert_eq!(handle.media_type(), CSV_MEDIA_TYPE);
    }
}
