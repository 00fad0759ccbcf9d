//! Per-call scoped working directory.
//!
//! Grounded on spec.md §4.1 step 1 ("allocate a unique per-thread working
//! directory") and §5's scoped-acquisition pattern: every exit path,
//! including cancellation, releases the resource. Implemented as an RAII
//! guard whose `Drop` removes the directory tree unconditionally.
use std::path::{Path, PathBuf};

pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    /// Create a unique directory under `base` named after `video_id` and a
    /// random nonce, so concurrent acquirer workers never collide even when
    /// processing the same video id twice (e.g. a retried run).
    pub fn create(base: &Path, video_id: &str) -> std::io::Result<Self> {
        let nonce: u64 = {
            use std::collections::hash_map::DefaultHasher;
            use std::hash::{Hash, Hasher};
            use std::time::{SystemTime, UNIX_EPOCH};
            let mut h = DefaultHasher::new();
            std::thread::current().id().hash(&mut h);
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
                .hash(&mut h);
            h.finish()
        };
        let safe_id: String = video_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        let path = base.join(format!("{safe_id}-{nonce:x}"));
        std::fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to clean up acquirer work dir");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_drop_removes_directory() {
        let base = tempfile::tempdir().unwrap();
        let path;
        {
            let wd = WorkDir::create(base.path(), "video?123").unwrap();
            path = wd.path().to_path_buf();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn sanitises_unsafe_characters_in_id() {
        let base = tempfile::tempdir().unwrap();
        let wd = WorkDir::create(base.path(), "../../etc/passwd").unwrap();
        assert!(wd.path().starts_with(base.path()));
    }
}
