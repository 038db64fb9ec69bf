//! Temp artifact tracking.
//!
//! Each run gets its own scratch directory; intermediate files are
//! registered as they are created and released as soon as the next stage
//! no longer needs them. Whatever is still around when the tracker drops
//! is swept together with the run directory, so no exit path leaks
//! scratch files. The sweep is the safety net; explicit release is the
//! primary mechanism.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

pub struct ResourceTracker {
    run_dir: PathBuf,
    tracked: Vec<PathBuf>,
}

impl ResourceTracker {
    /// Create the tracker and its per-run scratch directory.
    pub fn create(work_root: &Path) -> std::io::Result<Self> {
        let run_dir = work_root.join(format!("run-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&run_dir)?;
        debug!(run_dir = ?run_dir, "created run directory");

        Ok(Self {
            run_dir,
            tracked: Vec::new(),
        })
    }

    /// Scratch directory for this run.
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Register a path for cleanup.
    pub fn register(&mut self, path: impl Into<PathBuf>) {
        self.tracked.push(path.into());
    }

    /// Remove a tracked file now that no stage needs it.
    pub fn release(&mut self, path: &Path) {
        self.tracked.retain(|p| p != path);
        if path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = ?path, error = %e, "failed to remove temp file");
            } else {
                debug!(path = ?path, "released temp file");
            }
        }
    }

    fn sweep(&mut self) {
        for path in self.tracked.drain(..) {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!(path = ?path, error = %e, "failed to remove tracked file");
                }
            }
        }
        if self.run_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.run_dir) {
                warn!(run_dir = ?self.run_dir, error = %e, "failed to remove run directory");
            } else {
                debug!(run_dir = ?self.run_dir, "swept run directory");
            }
        }
    }
}

impl Drop for ResourceTracker {
    fn drop(&mut self) {
        self.sweep();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_drop_sweeps_run_dir_and_tracked_files() {
        let root = TempDir::new().unwrap();

        let run_dir;
        let outside = root.path().join("outside.tmp");
        {
            let mut tracker = ResourceTracker::create(root.path()).unwrap();
            run_dir = tracker.run_dir().to_path_buf();

            let inside = tracker.run_dir().join("stage.mp4");
            std::fs::write(&inside, b"x").unwrap();
            tracker.register(&inside);

            std::fs::write(&outside, b"y").unwrap();
            tracker.register(&outside);

            assert!(run_dir.exists());
        }

        assert!(!run_dir.exists());
        assert!(!outside.exists());
    }

    #[test]
    fn test_release_removes_single_file() {
        let root = TempDir::new().unwrap();
        let mut tracker = ResourceTracker::create(root.path()).unwrap();

        let a = tracker.run_dir().join("a.mp4");
        let b = tracker.run_dir().join("b.mp4");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();
        tracker.register(&a);
        tracker.register(&b);

        tracker.release(&a);
        assert!(!a.exists());
        assert!(b.exists());
    }

    #[test]
    fn test_moved_out_artifact_survives_sweep() {
        let root = TempDir::new().unwrap();
        let kept = root.path().join("kept.gif");
        {
            let mut tracker = ResourceTracker::create(root.path()).unwrap();
            let staged = tracker.run_dir().join("output.gif");
            std::fs::write(&staged, b"gif").unwrap();
            tracker.register(&staged);

            // The pipeline moves the artifact out before the sweep runs
            std::fs::rename(&staged, &kept).unwrap();
        }
        assert!(kept.exists());
    }

    #[test]
    fn test_release_of_missing_file_is_harmless() {
        let root = TempDir::new().unwrap();
        let mut tracker = ResourceTracker::create(root.path()).unwrap();
        tracker.release(Path::new("/no/such/file.mp4"));
    }
}
