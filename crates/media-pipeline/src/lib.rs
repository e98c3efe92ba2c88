//! Media ingestion pipeline for the roomshare client.
//!
//! Turns a user's raw photo selection into persisted, publicly retrievable
//! image records attached to a profile or listing:
//!
//! - Bounded, ordered selection from a media library
//! - Per-image normalization (resize + JPEG re-encode)
//! - Sequential-batch, concurrent-within-batch upload to object storage
//! - Record persistence once every upload has succeeded
//!
//! The submission orchestrator ties the stages together behind an explicit
//! per-screen state machine.

pub mod asset;
pub mod config;
pub mod metadata;
pub mod scheduler;
pub mod selector;
pub mod submission;
pub mod transform;

// Re-exports
pub use asset::{AssetState, ImageAsset};
pub use config::PipelineConfig;
pub use metadata::{ListingRecord, MetadataWriter, ProfileRecord, RecordSink};
pub use scheduler::{AssetUploader, BatchFailure, BatchScheduler, StorageUploader};
pub use selector::{FsMediaLibrary, ImageSelector, MediaLibrary};
pub use submission::{
    ListingFields, SubmissionError, SubmissionOrchestrator, SubmissionReport, SubmissionState,
    SubmitOutcome,
};
pub use transform::{normalize_image, scaled_dimensions};
