//! Object storage interface for user images (MinIO/S3 compatible).

use bytes::Bytes;
use object_store::{aws::AmazonS3Builder, path::Path, ObjectStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use roomshare_common::{RoomshareError, RoomshareResult};

/// Configuration for object storage connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStorageConfig {
    /// S3/MinIO endpoint URL
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// AWS region (use "us-east-1" for MinIO)
    pub region: String,
    /// Allow HTTP (for local MinIO)
    pub allow_http: bool,
    /// Base URL for public download addresses; the endpoint when unset
    pub public_base_url: Option<String>,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://minio:9000".to_string(),
            bucket: "user-media".to_string(),
            access_key_id: "minioadmin".to_string(),
            secret_access_key: "minioadmin".to_string(),
            region: "us-east-1".to_string(),
            allow_http: true,
            public_base_url: None,
        }
    }
}

/// Object storage client for uploaded user images.
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    public_base: String,
}

impl ObjectStorage {
    /// Create a new object storage client from config.
    pub fn new(config: &ObjectStorageConfig) -> RoomshareResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_endpoint(&config.endpoint)
            .with_bucket_name(&config.bucket)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key)
            .with_region(&config.region);

        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder.build().map_err(|e| {
            RoomshareError::InvalidConfig(format!("Failed to create S3 client: {}", e))
        })?;

        let public_base = config
            .public_base_url
            .as_deref()
            .unwrap_or(&config.endpoint)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            store: Arc::new(store),
            bucket: config.bucket.clone(),
            public_base,
        })
    }

    /// Write image bytes to a path in the bucket.
    #[instrument(skip(self, data), fields(bucket = %self.bucket, path = %path))]
    pub async fn put(&self, path: &str, data: Bytes) -> RoomshareResult<()> {
        let location = Path::from(path);
        debug!(size = data.len(), "Writing object");

        self.store
            .put(&location, data.into())
            .await
            .map_err(|e| RoomshareError::Upload(format!("Failed to write {}: {}", path, e)))?;

        Ok(())
    }

    /// Get the publicly retrievable address for an uploaded object.
    pub fn download_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.public_base, self.bucket, path)
    }
}

/// Path builder for consistent storage layout.
pub struct StoragePath;

impl StoragePath {
    /// Build path for an uploaded user image.
    /// Format: userImages/{userId}/{generatedName}
    pub fn user_image(user_id: &str, name: &str) -> String {
        format!("userImages/{}/{}", user_id, name)
    }
}

/// Generate a storage object name for an uploaded image.
///
/// Collision-improbable, not guaranteed unique.
pub fn generated_image_name() -> String {
    format!("image_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_paths() {
        assert_eq!(
            StoragePath::user_image("uid123", "image_abc"),
            "userImages/uid123/image_abc"
        );
    }

    #[test]
    fn test_generated_names_are_distinct() {
        let a = generated_image_name();
        let b = generated_image_name();

        assert!(a.starts_with("image_"));
        assert!(b.starts_with("image_"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_download_url_uses_endpoint_by_default() {
        let storage = ObjectStorage::new(&ObjectStorageConfig::default()).unwrap();

        assert_eq!(
            storage.download_url("userImages/uid123/image_abc"),
            "http://minio:9000/user-media/userImages/uid123/image_abc"
        );
    }

    #[test]
    fn test_download_url_prefers_public_base() {
        let config = ObjectStorageConfig {
            public_base_url: Some("https://media.example.com/".to_string()),
            ..Default::default()
        };
        let storage = ObjectStorage::new(&config).unwrap();

        assert_eq!(
            storage.download_url("userImages/uid123/image_abc"),
            "https://media.example.com/user-media/userImages/uid123/image_abc"
        );
    }
}
