//! Batched, bounded-concurrency upload scheduling.
//!
//! Uploads run in consecutive batches: batches strictly one after another,
//! items within a batch concurrently. This bounds peak concurrent network
//! and memory usage to the batch size regardless of selection length, while
//! keeping results in selection order.

use async_trait::async_trait;
use bytes::Bytes;
use futures::future;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use roomshare_common::{RoomshareError, RoomshareResult, UserId};
use storage::{generated_image_name, ObjectStorage, StoragePath};

use crate::asset::{AssetState, ImageAsset};
use crate::config::PipelineConfig;
use crate::transform::normalize_image;

/// Uploads one local image and returns its remote address.
#[async_trait]
pub trait AssetUploader: Send + Sync {
    async fn upload(&self, local: &Path) -> RoomshareResult<String>;
}

/// Production uploader: read, normalize, store, resolve the download address.
pub struct StorageUploader {
    storage: Arc<ObjectStorage>,
    user: UserId,
    config: PipelineConfig,
}

impl StorageUploader {
    pub fn new(storage: Arc<ObjectStorage>, user: UserId, config: PipelineConfig) -> Self {
        Self {
            storage,
            user,
            config,
        }
    }
}

#[async_trait]
impl AssetUploader for StorageUploader {
    #[instrument(skip(self), fields(local = %local.display()))]
    async fn upload(&self, local: &Path) -> RoomshareResult<String> {
        let raw = tokio::fs::read(local).await.map_err(|e| {
            RoomshareError::Upload(format!("Failed to read {}: {}", local.display(), e))
        })?;

        let normalized = normalize_image(&raw, &self.config)?;

        let path = StoragePath::user_image(self.user.as_str(), &generated_image_name());
        self.storage.put(&path, Bytes::from(normalized)).await?;

        let url = self.storage.download_url(&path);
        debug!(url = %url, "Image uploaded");
        Ok(url)
    }
}

/// A failed scheduler run.
///
/// `completed` carries the addresses from batches that finished before the
/// failure. Those objects stay in storage (no rollback) and are surfaced
/// here so a cleanup policy can be layered on top.
#[derive(Debug)]
pub struct BatchFailure {
    pub error: RoomshareError,
    pub completed: Vec<String>,
}

/// Drives sequential-batch, concurrent-within-batch uploads.
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    batch_size: usize,
}

impl BatchScheduler {
    pub fn new(batch_size: usize) -> Self {
        // a zero chunk would never drain the input
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Upload every asset, returning them in input order with their remote
    /// addresses set.
    ///
    /// Batch k+1 starts only after every item of batch k has resolved, and
    /// each batch's results are appended in item order, so the output
    /// ordering matches the input without index bookkeeping. The first
    /// failing item fails the whole run; later batches never start.
    pub async fn run(
        &self,
        assets: Vec<ImageAsset>,
        uploader: &dyn AssetUploader,
    ) -> Result<Vec<ImageAsset>, BatchFailure> {
        let total = assets.len();
        let batches = total.div_ceil(self.batch_size);
        let mut done: Vec<ImageAsset> = Vec::with_capacity(total);

        let mut remaining = assets.into_iter();
        for index in 0..batches {
            let batch: Vec<ImageAsset> = remaining.by_ref().take(self.batch_size).collect();
            debug!(
                batch = index + 1,
                batches,
                size = batch.len(),
                "Uploading batch"
            );

            let uploads = batch.into_iter().map(|mut asset| async move {
                asset.state = AssetState::Transforming;
                match uploader.upload(&asset.local).await {
                    Ok(url) => {
                        asset.state = AssetState::Uploaded;
                        asset.remote = Some(url);
                        Ok(asset)
                    }
                    Err(e) => Err(e),
                }
            });

            match future::try_join_all(uploads).await {
                Ok(uploaded) => done.extend(uploaded),
                Err(error) => {
                    let completed: Vec<String> =
                        done.iter().filter_map(|a| a.remote.clone()).collect();
                    warn!(
                        batch = index + 1,
                        orphaned = completed.len(),
                        error = %error,
                        "Batch upload failed"
                    );
                    return Err(BatchFailure { error, completed });
                }
            }
        }

        Ok(done)
    }
}
