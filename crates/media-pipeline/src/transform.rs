//! Image normalization before upload.
//!
//! Every selected image is resized to a fixed width and re-encoded as JPEG
//! at reduced quality to bound upload size on constrained connections.

use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, GenericImageView};

use roomshare_common::{RoomshareError, RoomshareResult};

use crate::config::PipelineConfig;

/// Normalize raw image bytes.
///
/// Resizes to the configured width (height scaled from the aspect ratio;
/// narrower inputs are scaled up) and re-encodes as JPEG at the configured
/// quality. Deterministic and stateless; safe to run concurrently.
pub fn normalize_image(data: &[u8], config: &PipelineConfig) -> RoomshareResult<Vec<u8>> {
    let img = image::load_from_memory(data)
        .map_err(|e| RoomshareError::Transform(format!("Failed to decode image: {}", e)))?;

    let (width, height) = img.dimensions();
    let (new_width, new_height) = scaled_dimensions(width, height, config.target_width);
    let resized = img.resize_exact(new_width, new_height, FilterType::Triangle);

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, config.jpeg_quality);
    encoder
        .encode_image(&resized.to_rgb8())
        .map_err(|e| RoomshareError::Transform(format!("Failed to encode JPEG: {}", e)))?;

    Ok(out)
}

/// Dimensions after scaling to the target width, aspect ratio preserved.
pub fn scaled_dimensions(width: u32, height: u32, target_width: u32) -> (u32, u32) {
    let scaled = (height as f64 * target_width as f64 / width as f64).round() as u32;
    (target_width, scaled.max(1))
}
