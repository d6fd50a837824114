//! Crash-recovery journal for in-flight job payloads.
//!
//! Parse and execute jobs write their payload here before running, keyed by
//! the originating session id, so a crash mid-handler leaves a recoverable
//! record on disk.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use msghub_core::result::AppResult;

/// File-backed journal rooted at a configured directory.
#[derive(Debug, Clone)]
pub struct JobJournal {
    root: PathBuf,
}

impl JobJournal {
    /// Create a journal rooted at `root`. The directory is created lazily on
    /// first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The journal root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist a payload under the session id. Returns the file path.
    pub fn save(&self, id: &str, job_name: &str, payload: &[u8]) -> AppResult<PathBuf> {
        let dir = self.root.join(sanitize(id));
        std::fs::create_dir_all(&dir)?;

        let path = dir.join(format!("{}-{}.job", sanitize(job_name), Uuid::new_v4()));
        std::fs::write(&path, payload)?;

        Ok(path)
    }
}

/// Restrict a path component to filesystem-safe characters.
fn sanitize(part: &str) -> String {
    if part.is_empty() {
        return "_".to_string();
    }
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_writes_payload_under_session_dir() {
        let dir = tempfile::tempdir().unwrap();
        let journal = JobJournal::new(dir.path());

        let path = journal.save("client-a", "parse", b"payload bytes").unwrap();
        assert!(path.starts_with(dir.path().join("client-a")));
        assert_eq!(std::fs::read(&path).unwrap(), b"payload bytes");
    }

    #[test]
    fn test_sanitize_blocks_path_traversal() {
        assert_eq!(sanitize("../evil"), ".._evil");
        assert_eq!(sanitize(""), "_");
        assert_eq!(sanitize("ok-id_1.2"), "ok-id_1.2");
    }
}
