//! Rendition selection.
//!
//! Picks which of the remote renditions to transfer. Audio is discarded
//! downstream (GIFs are silent), so video-only renditions win when
//! available; within the pool, the quality tier decides the width.

use gifclip_models::QualityTier;
use tracing::debug;

use crate::error::{SourceError, SourceResult};
use crate::metadata::Rendition;

/// Widest source worth fetching when quality is Auto.
const AUTO_MAX_TARGET_WIDTH: u32 = 1920;

/// Headroom over the requested output width when quality is Auto.
const AUTO_TARGET_FACTOR: f64 = 1.5;

/// Target source width for Auto quality: 1.5x the requested output width,
/// capped at 1920. Fetching wider buys nothing for a GIF target.
pub fn auto_target_width(requested_width: u32) -> u32 {
    let scaled = (requested_width as f64 * AUTO_TARGET_FACTOR) as u32;
    scaled.min(AUTO_MAX_TARGET_WIDTH)
}

/// Choose the rendition to transfer.
///
/// Video-only renditions are preferred; mixed streams are considered only
/// when no video-only rendition exists. Auto quality picks the
/// lowest-width rendition at or above the target width, falling back to
/// the largest available. Named tiers index the ascending-width list by
/// their fraction. An empty rendition set is the only hard failure.
pub fn select_rendition<'a>(
    renditions: &'a [Rendition],
    quality: QualityTier,
    requested_width: u32,
) -> SourceResult<&'a Rendition> {
    if renditions.is_empty() {
        return Err(SourceError::no_suitable_format(
            "source offers no renditions",
        ));
    }

    let video_only: Vec<&Rendition> = renditions.iter().filter(|r| !r.has_audio).collect();
    let mut pool: Vec<&Rendition> = if video_only.is_empty() {
        renditions.iter().collect()
    } else {
        video_only
    };
    pool.sort_by_key(|r| r.width);

    let chosen = match quality.fraction() {
        None => pick_auto(&pool, requested_width),
        Some(fraction) => {
            let index = ((fraction * pool.len() as f64).floor() as usize).min(pool.len() - 1);
            pool[index]
        }
    };

    debug!(
        format_id = chosen.format_id.as_str(),
        width = chosen.width,
        height = chosen.height,
        quality = quality.as_str(),
        "selected rendition"
    );
    Ok(chosen)
}

fn pick_auto<'a>(sorted: &[&'a Rendition], requested_width: u32) -> &'a Rendition {
    let target = auto_target_width(requested_width);
    sorted
        .iter()
        .find(|r| r.width >= target)
        .copied()
        .unwrap_or(sorted[sorted.len() - 1])
}
