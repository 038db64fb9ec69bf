//! Cross-device-safe file placement.

use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Errno for a rename that crosses filesystems.
const EXDEV: i32 = 18;

/// Move `src` to `dst`, surviving a destination on another filesystem.
///
/// A plain rename is tried first. When it fails with EXDEV the file is
/// copied to a staging name beside `dst` and renamed into place, so the
/// destination appears atomically on its own filesystem.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(EXDEV) => {
            debug!(
                src = %src.display(),
                dst = %dst.display(),
                "rename crossed filesystems, staging a copy"
            );
            copy_into_place(src, dst).await
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

async fn copy_into_place(src: &Path, dst: &Path) -> MediaResult<()> {
    // Staging file sits beside dst, so the final rename stays on one
    // filesystem.
    let staged = dst.with_extension("tmp");

    fs::copy(src, &staged).await?;

    if let Err(e) = fs::rename(&staged, dst).await {
        let _ = std::fs::remove_file(&staged);
        return Err(MediaError::from(e));
    }

    if let Err(e) = fs::remove_file(src).await {
        warn!(src = %src.display(), error = %e, "could not remove source after move");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_move_within_one_filesystem() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.gif");
        let dst = dir.path().join("b.gif");

        fs::write(&src, b"gif bytes").await.unwrap();
        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"gif bytes");
    }

    #[tokio::test]
    async fn test_move_creates_missing_parent() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.gif");
        let dst = dir.path().join("nested/deep/b.gif");

        fs::write(&src, b"x").await.unwrap();
        move_file(&src, &dst).await.unwrap();

        assert!(dst.exists());
    }

    #[tokio::test]
    async fn test_move_replaces_existing_destination() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.gif");
        let dst = dir.path().join("b.gif");

        fs::write(&src, b"new").await.unwrap();
        fs::write(&dst, b"old").await.unwrap();
        move_file(&src, &dst).await.unwrap();

        assert_eq!(fs::read(&dst).await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_staged_copy_path() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.gif");
        let dst = dir.path().join("b.gif");

        fs::write(&src, b"payload").await.unwrap();
        copy_into_place(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert!(!dst.with_extension("tmp").exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"payload");
    }
}
