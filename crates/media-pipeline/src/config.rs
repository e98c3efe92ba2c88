//! Pipeline configuration.

use serde::{Deserialize, Serialize};

use roomshare_common::{RoomshareError, RoomshareResult};

/// Tunables for the media ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of images in one selection
    pub max_selection: usize,
    /// Number of images uploaded concurrently in one batch
    pub batch_size: usize,
    /// Width of normalized images in pixels
    pub target_width: u32,
    /// JPEG quality of normalized images (1-100)
    pub jpeg_quality: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_selection: 5,
            // 2 concurrent uploads keeps peak network/memory usage
            // predictable on constrained mobile connections
            batch_size: 2,
            target_width: 800,
            jpeg_quality: 50,
        }
    }
}

impl PipelineConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> RoomshareResult<()> {
        if self.batch_size == 0 {
            return Err(RoomshareError::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.target_width == 0 {
            return Err(RoomshareError::InvalidConfig(
                "target_width must be at least 1".to_string(),
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(RoomshareError::InvalidConfig(format!(
                "jpeg_quality must be in 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();

        assert_eq!(config.max_selection, 5);
        assert_eq!(config.batch_size, 2);
        assert_eq!(config.target_width, 800);
        assert_eq!(config.jpeg_quality, 50);
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        let zero_batch = PipelineConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(zero_batch.validate().is_err());

        let zero_width = PipelineConfig {
            target_width: 0,
            ..Default::default()
        };
        assert!(zero_width.validate().is_err());

        let bad_quality = PipelineConfig {
            jpeg_quality: 0,
            ..Default::default()
        };
        assert!(bad_quality.validate().is_err());
    }
}
