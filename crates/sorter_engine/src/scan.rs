use std::path::{Path, PathBuf};

use engine_logging::{engine_debug, engine_warn};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("directory name is not valid UTF-8: {0}")]
    InvalidName(PathBuf),
}

/// Files found under a selected directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutput {
    /// Directory containing the selected root; relative paths resolve against it.
    pub base_dir: PathBuf,
    pub root_name: String,
    /// `/`-separated paths beginning with `root_name`, sorted.
    pub relative_paths: Vec<String>,
}

/// Walks a directory the way a browser directory picker lists it. Every
/// regular file is reported; extension filtering happens later.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    ignore_names: Vec<String>,
}

impl Default for DirectoryScanner {
    fn default() -> Self {
        Self {
            ignore_names: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".git".to_string(),
                ".svn".to_string(),
            ],
        }
    }
}

impl DirectoryScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scan(&self, root: &Path) -> Result<ScanOutput, ScanError> {
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let root = root
            .canonicalize()
            .map_err(|_| ScanError::PathNotFound(root.to_path_buf()))?;
        let root_name = root
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ScanError::InvalidName(root.clone()))?
            .to_string();
        let base_dir = root
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.clone());

        let mut relative_paths = Vec::new();
        let walker = WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_ignored(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    engine_warn!("Skipping unreadable entry: {}", err);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            match relative_path(&root_name, &root, entry.path()) {
                Some(path) => relative_paths.push(path),
                None => engine_warn!("Skipping non UTF-8 path {}", entry.path().display()),
            }
        }

        relative_paths.sort();
        engine_debug!(
            "Scanned {}: {} file(s)",
            root.display(),
            relative_paths.len()
        );

        Ok(ScanOutput {
            base_dir,
            root_name,
            relative_paths,
        })
    }

    fn is_ignored(&self, entry: &DirEntry) -> bool {
        entry
            .file_name()
            .to_str()
            .map(|name| self.ignore_names.iter().any(|ignored| ignored == name))
            .unwrap_or(false)
    }
}

fn relative_path(root_name: &str, root: &Path, path: &Path) -> Option<String> {
    let rest = path.strip_prefix(root).ok()?;
    let mut joined = root_name.to_string();
    for component in rest.components() {
        joined.push('/');
        joined.push_str(component.as_os_str().to_str()?);
    }
    Some(joined)
}
