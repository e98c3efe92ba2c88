//! Client configuration.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

use media_pipeline::PipelineConfig;
use storage::{ObjectStorageConfig, RecordStoreConfig};

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Object storage configuration
    pub storage: ObjectStorageConfig,

    /// Record service configuration
    pub records: RecordStoreConfig,

    /// Authenticated user id (issued by the auth service)
    pub user_id: String,

    /// Pipeline tunables
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let storage = ObjectStorageConfig {
            endpoint: env::var("S3_ENDPOINT").unwrap_or_else(|_| "http://minio:9000".to_string()),
            bucket: env::var("S3_BUCKET").unwrap_or_else(|_| "user-media".to_string()),
            access_key_id: env::var("S3_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".to_string()),
            secret_access_key: env::var("S3_SECRET_KEY")
                .unwrap_or_else(|_| "minioadmin".to_string()),
            region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            allow_http: env::var("S3_ALLOW_HTTP")
                .map(|v| v == "true")
                .unwrap_or(true),
            public_base_url: env::var("S3_PUBLIC_BASE_URL").ok(),
        };

        let records = RecordStoreConfig {
            base_url: env::var("RECORDS_URL")
                .unwrap_or_else(|_| "http://records:8080".to_string()),
            auth_token: env::var("RECORDS_AUTH_TOKEN").ok(),
            ..Default::default()
        };

        let user_id = env::var("ROOMSHARE_USER_ID")
            .map_err(|_| anyhow::anyhow!("ROOMSHARE_USER_ID must be set (sign in first)"))?;

        let pipeline = PipelineConfig::default();
        pipeline.validate()?;

        Ok(Self {
            storage,
            records,
            user_id,
            pipeline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_defaults() {
        env::set_var("ROOMSHARE_USER_ID", "uid123");
        env::remove_var("S3_ENDPOINT");
        env::remove_var("RECORDS_URL");

        let config = AppConfig::from_env().unwrap();

        assert_eq!(config.user_id, "uid123");
        assert_eq!(config.storage.endpoint, "http://minio:9000");
        assert_eq!(config.records.base_url, "http://records:8080");
        assert_eq!(config.pipeline.batch_size, 2);
        assert_eq!(config.pipeline.max_selection, 5);
    }
}
