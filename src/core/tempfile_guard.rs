use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

/// Scoped acquisition of a temporary artifact path, deleted on every exit
/// path -- success, dump/upload error, or cancellation. There is nothing
/// useful to recover from a half-written local temp file, so the guard
/// just removes it on drop rather than leaving a marker behind.
pub struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    pub fn new(dir: &Path, prefix: &str) -> Self {
        let path = dir.join(format!("{prefix}-{}.tmp", Uuid::new_v4()));
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!("failed to remove temp artifact {}: {e}", self.path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_lives_under_the_given_directory_with_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = TempArtifact::new(dir.path(), "dumpkeeper-backup");
        assert_eq!(artifact.path().parent(), Some(dir.path()));
        assert!(artifact.path().file_name().unwrap().to_str().unwrap().starts_with("dumpkeeper-backup-"));
    }

    #[test]
    fn drop_removes_the_file_if_it_was_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let artifact = TempArtifact::new(dir.path(), "dumpkeeper-backup");
            std::fs::write(artifact.path(), b"partial dump").unwrap();
            artifact.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn drop_is_a_no_op_when_nothing_was_ever_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let artifact = TempArtifact::new(dir.path(), "dumpkeeper-backup");
            artifact.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
