//! Backend service clients for the roomshare client.
//!
//! Provides unified interfaces for:
//! - Object storage (MinIO/S3) holding uploaded user images
//! - The key-value record service holding profile and listing records

pub mod object_store;
pub mod records;

pub use self::object_store::{
    generated_image_name, ObjectStorage, ObjectStorageConfig, StoragePath,
};
pub use records::{RecordEvent, RecordEventKind, RecordPath, RecordStore, RecordStoreConfig};
