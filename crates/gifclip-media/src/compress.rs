//! Lossy post-compression via gifsicle.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::command::check_gifsicle;
use gifclip_models::{DitherMode, MAX_COLORS};

/// Shrink an encoded GIF in place with gifsicle.
///
/// Best effort by design: a missing tool or a failed run leaves the
/// encoded file as is and only warns. The replacement is staged through a
/// sibling file so the output never ends up half-written.
pub async fn post_compress(path: &Path, colors: u16, lossy: u32, dither: DitherMode) {
    if colors == MAX_COLORS && lossy == 0 {
        debug!("full palette and no lossy level requested, skipping post-compression");
        return;
    }

    if check_gifsicle().is_err() {
        warn!("gifsicle not found in PATH, keeping unoptimized output");
        return;
    }

    let staged = path.with_extension("opt.gif");
    let before = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    let mut cmd = Command::new("gifsicle");
    cmd.arg("-O3").arg("--colors").arg(colors.to_string());
    if lossy > 0 {
        cmd.arg(format!("--lossy={lossy}"));
    }
    match dither {
        DitherMode::None => cmd.arg("--no-dither"),
        DitherMode::FloydSteinberg => cmd.arg("--dither=floyd-steinberg"),
        DitherMode::Ordered => cmd.arg("--dither=ordered"),
    };
    cmd.arg(path).arg("-o").arg(&staged);

    let result = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            warn!(error = %e, "could not spawn gifsicle, keeping unoptimized output");
            return;
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(
            stderr = %stderr.trim(),
            "gifsicle failed, keeping unoptimized output"
        );
        let _ = tokio::fs::remove_file(&staged).await;
        return;
    }

    let after = std::fs::metadata(&staged).map(|m| m.len()).unwrap_or(0);
    if after == 0 {
        warn!("gifsicle wrote an empty file, keeping unoptimized output");
        let _ = tokio::fs::remove_file(&staged).await;
        return;
    }

    match tokio::fs::rename(&staged, path).await {
        Ok(()) => {
            info!(
                before_bytes = before,
                after_bytes = after,
                "post-compression finished"
            );
        }
        Err(e) => {
            warn!(error = %e, "could not swap in compressed output, keeping original");
            let _ = tokio::fs::remove_file(&staged).await;
        }
    }
}
