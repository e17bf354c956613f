//! Image token estimation for vision-capable models
//!
//! Implements the published tiling formula: a low-detail image costs a flat
//! 85 tokens; a high-detail image is scaled into a 2048px square, then to
//! 768px on its shortest side, and billed at 170 tokens per 512x512 tile
//! plus the 85-token base. `auto` is treated as `high`.
//!
//! Only base64 data URIs are accepted. A non-data URI, corrupt base64, or an
//! undecodable image is a fatal error for the message, never a zero cost.

use crate::error::{Error, Result};
use crate::types::ImageDetail;
use base64::Engine;

const LOW_DETAIL_COST: usize = 85;
const HIGH_DETAIL_COST_PER_TILE: usize = 170;
const ADDITIONAL_COST: usize = 85;

/// Calculate the number of tokens required to send an image
pub fn count_tokens_for_image(image_uri: &str, detail: ImageDetail) -> Result<usize> {
    match detail {
        // Low detail images have a fixed cost; no decode happens
        ImageDetail::Low => Ok(LOW_DETAIL_COST),
        // Assume high detail for auto
        ImageDetail::High | ImageDetail::Auto => {
            let (width, height) = image_dimensions(image_uri)?;
            let (width, height) = scale_for_high_detail(width, height);
            let tiles = width.div_ceil(512) as usize * height.div_ceil(512) as usize;
            Ok(tiles * HIGH_DETAIL_COST_PER_TILE + ADDITIONAL_COST)
        }
    }
}

/// Decode a base64 data URI and return the image's pixel dimensions
pub fn image_dimensions(image_uri: &str) -> Result<(u32, u32)> {
    let payload = strip_data_uri(image_uri)?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|err| Error::invalid_image(format!("base64 decode failed: {err}")))?;
    let decoded = image::load_from_memory(&bytes)
        .map_err(|err| Error::invalid_image(format!("image decode failed: {err}")))?;
    Ok((decoded.width(), decoded.height()))
}

/// Split a `data:image/<fmt>;base64,<payload>` URI, returning the payload
fn strip_data_uri(image_uri: &str) -> Result<&str> {
    let rest = image_uri
        .strip_prefix("data:image/")
        .ok_or_else(|| Error::invalid_image("image must be a base64 data URI"))?;
    let (format, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| Error::invalid_image("image must be a base64 data URI"))?;
    if format.is_empty() || !format.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::invalid_image("image must be a base64 data URI"));
    }
    Ok(payload)
}

/// Apply the two-stage scale-down rule for high-detail billing.
///
/// Ratios are computed in f64 and the results truncated, matching the
/// reference arithmetic exactly (the boundary pixels matter for tile counts).
fn scale_for_high_detail(width: u32, height: u32) -> (u32, u32) {
    let (mut width, mut height) = (width, height);
    // Fit within a 2048 x 2048 square
    if width.max(height) > 2048 {
        let ratio = 2048.0 / f64::from(width.max(height));
        width = (f64::from(width) * ratio) as u32;
        height = (f64::from(height) * ratio) as u32;
    }
    // Further scale down to 768px on the shortest side
    if width.min(height) > 768 {
        let ratio = 768.0 / f64::from(width.min(height));
        width = (f64::from(width) * ratio) as u32;
        height = (f64::from(height) * ratio) as u32;
    }
    (width, height)
}
