//! Record persistence after successful uploads.

use async_trait::async_trait;
use chrono::{serde::ts_milliseconds, DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

use roomshare_common::{RoomshareResult, UserId};
use storage::{RecordPath, RecordStore};

/// Destination for persisted records.
///
/// `write` replaces the record at a path, `merge` upserts fields into it;
/// both are idempotent, keyed by the path.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn write(&self, path: &str, value: &Value) -> RoomshareResult<()>;
    async fn merge(&self, path: &str, value: &Value) -> RoomshareResult<()>;
}

#[async_trait]
impl RecordSink for RecordStore {
    async fn write(&self, path: &str, value: &Value) -> RoomshareResult<()> {
        RecordStore::write(self, path, value).await
    }

    async fn merge(&self, path: &str, value: &Value) -> RoomshareResult<()> {
        RecordStore::merge(self, path, value).await
    }
}

/// A user's profile record, in the service's wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub name: String,
    pub age: u32,
    /// Whether the user has a room to offer (vs. looking for one)
    pub has_place: bool,
    pub bio: String,
}

/// A published listing, keyed under the owning user's residence sub-path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub address: String,
    /// Room size in square meters
    pub room_size: u32,
    /// Monthly price
    pub price: u32,
    /// Uploaded image addresses, in selection order
    pub images: Vec<String>,
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Persists profile and listing records once uploads have completed.
///
/// Only called with a complete, ordered address list; a failure surfaces as
/// `Persist` without retry, leaving any uploaded bytes orphaned in storage.
pub struct MetadataWriter {
    sink: Arc<dyn RecordSink>,
}

impl MetadataWriter {
    pub fn new(sink: Arc<dyn RecordSink>) -> Self {
        Self { sink }
    }

    /// Write the full profile record for a user.
    #[instrument(skip(self, profile), fields(user = %user))]
    pub async fn write_profile(
        &self,
        user: &UserId,
        profile: &ProfileRecord,
    ) -> RoomshareResult<()> {
        let path = RecordPath::user(user.as_str());
        self.sink
            .write(&path, &serde_json::to_value(profile)?)
            .await?;

        debug!("Profile record written");
        Ok(())
    }

    /// Attach uploaded image addresses to an existing profile record.
    #[instrument(skip(self, images), fields(user = %user, count = images.len()))]
    pub async fn attach_profile_images(
        &self,
        user: &UserId,
        images: &[String],
    ) -> RoomshareResult<()> {
        let path = RecordPath::user(user.as_str());
        self.sink.merge(&path, &json!({ "images": images })).await?;

        debug!("Profile images attached");
        Ok(())
    }

    /// Write or update the listing record for a user.
    #[instrument(skip(self, listing), fields(user = %user, images = listing.images.len()))]
    pub async fn write_listing(
        &self,
        user: &UserId,
        listing: &ListingRecord,
    ) -> RoomshareResult<()> {
        let path = RecordPath::residence_info(user.as_str());
        self.sink
            .merge(&path, &serde_json::to_value(listing)?)
            .await?;

        debug!("Listing record written");
        Ok(())
    }
}
