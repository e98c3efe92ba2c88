//! Image assets tracked through the upload pipeline.

use std::path::PathBuf;

/// Pipeline state of a single selected image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetState {
    /// Picked from the media library, not yet processed
    Selected,
    /// Being normalized and uploaded
    Transforming,
    /// Stored remotely; the asset carries its download address
    Uploaded,
    /// Normalization or upload failed
    Failed,
}

/// A single image tracked from selection to upload.
///
/// Created on selection, mutated only by the pipeline, and discarded once
/// the owning record references the remote address.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAsset {
    /// Handle to the local image data
    pub local: PathBuf,
    pub state: AssetState,
    /// Publicly retrievable address, set once uploaded
    pub remote: Option<String>,
}

impl ImageAsset {
    /// Create a freshly selected asset.
    pub fn selected(local: impl Into<PathBuf>) -> Self {
        Self {
            local: local.into(),
            state: AssetState::Selected,
            remote: None,
        }
    }
}
