//! Submission orchestration: one explicit state machine per screen.

use chrono::Utc;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use roomshare_common::{RoomshareError, RoomshareResult, UserId};
use storage::RecordPath;

use crate::asset::ImageAsset;
use crate::metadata::{ListingRecord, MetadataWriter, ProfileRecord};
use crate::scheduler::{AssetUploader, BatchScheduler};
use crate::selector::{ImageSelector, MediaLibrary};

/// Submission machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

/// Result of a submit call.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// The submission ran to success
    Completed(SubmissionReport),
    /// Another submission was already in flight; nothing was started
    Ignored,
}

/// What a successful submission produced.
#[derive(Debug, Clone)]
pub struct SubmissionReport {
    /// Record path the submission wrote to
    pub record_path: String,
    /// Uploaded image addresses, in selection order
    pub images: Vec<String>,
}

/// A failed submission: the collapsed pipeline error plus any addresses
/// uploaded before the failure. Those objects stay in storage unreferenced
/// (no rollback); the list lets a cleanup policy be layered on top.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct SubmissionError {
    pub error: RoomshareError,
    pub orphaned: Vec<String>,
}

impl SubmissionError {
    fn new(error: RoomshareError) -> Self {
        Self {
            error,
            orphaned: Vec::new(),
        }
    }
}

/// Listing fields provided by the user; images and timestamp are added by
/// the pipeline.
#[derive(Debug, Clone)]
pub struct ListingFields {
    pub address: String,
    pub room_size: u32,
    pub price: u32,
}

/// Orchestrates one screen's selection and submissions.
///
/// Explicit state machine: `Idle → Submitting → (Succeeded | Failed) → Idle`.
/// The in-progress guard is a first-class state: a submit while another is
/// in flight is ignored rather than rejected, and the machine is back at
/// `Idle` by the time a call returns, with terminal states surfaced through
/// the return value. On failure the selection is left untouched so the user
/// can retry, which re-runs the whole pipeline from scratch.
pub struct SubmissionOrchestrator {
    scheduler: BatchScheduler,
    uploader: Arc<dyn AssetUploader>,
    writer: MetadataWriter,
    selector: tokio::sync::Mutex<ImageSelector>,
    state: Mutex<SubmissionState>,
}

impl SubmissionOrchestrator {
    pub fn new(
        scheduler: BatchScheduler,
        uploader: Arc<dyn AssetUploader>,
        writer: MetadataWriter,
        selector: ImageSelector,
    ) -> Self {
        Self {
            scheduler,
            uploader,
            writer,
            selector: tokio::sync::Mutex::new(selector),
            state: Mutex::new(SubmissionState::Idle),
        }
    }

    /// Current machine state.
    pub fn state(&self) -> SubmissionState {
        *self.state.lock().unwrap()
    }

    /// Number of currently selected images.
    pub async fn selection_len(&self) -> usize {
        self.selector.lock().await.len()
    }

    /// Let the user pick images into this screen's selection.
    ///
    /// Selection errors are surfaced directly (specific notice, no state
    /// mutation); they never enter the submission pipeline.
    pub async fn pick_images(&self, library: &dyn MediaLibrary) -> RoomshareResult<usize> {
        self.selector.lock().await.select(library).await
    }

    /// Submit the user's profile, uploading any selected images.
    ///
    /// The base profile record is written first; images are uploaded and
    /// attached afterwards, so the images field only ever references a
    /// complete upload set.
    #[instrument(skip(self, profile), fields(user = %user))]
    pub async fn submit_profile(
        &self,
        user: &UserId,
        profile: ProfileRecord,
    ) -> Result<SubmitOutcome, SubmissionError> {
        if !self.begin() {
            debug!("Submission already in flight, ignoring");
            return Ok(SubmitOutcome::Ignored);
        }

        let result = self.run_profile(user, profile).await;
        self.settle(&result);
        self.reset();
        result.map(SubmitOutcome::Completed)
    }

    /// Submit a listing built from the current selection.
    ///
    /// No record is written unless every selected image uploads.
    #[instrument(skip(self, fields), fields(user = %user))]
    pub async fn submit_listing(
        &self,
        user: &UserId,
        fields: ListingFields,
    ) -> Result<SubmitOutcome, SubmissionError> {
        if !self.begin() {
            debug!("Submission already in flight, ignoring");
            return Ok(SubmitOutcome::Ignored);
        }

        let result = self.run_listing(user, fields).await;
        self.settle(&result);
        self.reset();
        result.map(SubmitOutcome::Completed)
    }

    async fn run_profile(
        &self,
        user: &UserId,
        profile: ProfileRecord,
    ) -> Result<SubmissionReport, SubmissionError> {
        self.writer
            .write_profile(user, &profile)
            .await
            .map_err(SubmissionError::new)?;

        let assets = self.selector.lock().await.snapshot();
        let mut images = Vec::new();

        if !assets.is_empty() {
            images = self.upload_all(assets).await?;

            self.writer
                .attach_profile_images(user, &images)
                .await
                .map_err(|error| SubmissionError {
                    error,
                    orphaned: images.clone(),
                })?;

            self.selector.lock().await.clear();
        }

        Ok(SubmissionReport {
            record_path: RecordPath::user(user.as_str()),
            images,
        })
    }

    async fn run_listing(
        &self,
        user: &UserId,
        fields: ListingFields,
    ) -> Result<SubmissionReport, SubmissionError> {
        let assets = self.selector.lock().await.snapshot();
        let images = self.upload_all(assets).await?;

        let listing = ListingRecord {
            address: fields.address,
            room_size: fields.room_size,
            price: fields.price,
            images: images.clone(),
            timestamp: Utc::now(),
        };

        self.writer
            .write_listing(user, &listing)
            .await
            .map_err(|error| SubmissionError {
                error,
                orphaned: images.clone(),
            })?;

        self.selector.lock().await.clear();

        Ok(SubmissionReport {
            record_path: RecordPath::residence_info(user.as_str()),
            images,
        })
    }

    /// Run the batch pipeline over a selection snapshot, returning the
    /// ordered address list.
    async fn upload_all(
        &self,
        assets: Vec<ImageAsset>,
    ) -> Result<Vec<String>, SubmissionError> {
        let uploaded = self
            .scheduler
            .run(assets, self.uploader.as_ref())
            .await
            .map_err(|failure| SubmissionError {
                error: failure.error,
                orphaned: failure.completed,
            })?;

        Ok(uploaded.iter().filter_map(|a| a.remote.clone()).collect())
    }

    /// Enter `Submitting` unless a submission is already in flight.
    fn begin(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if *state == SubmissionState::Submitting {
            return false;
        }
        *state = SubmissionState::Submitting;
        true
    }

    /// Transition to the terminal state for the finished run.
    fn settle(&self, result: &Result<SubmissionReport, SubmissionError>) {
        let terminal = match result {
            Ok(report) => {
                info!(
                    record = %report.record_path,
                    images = report.images.len(),
                    "Submission succeeded"
                );
                SubmissionState::Succeeded
            }
            Err(e) => {
                warn!(error = %e.error, orphaned = e.orphaned.len(), "Submission failed");
                SubmissionState::Failed
            }
        };

        *self.state.lock().unwrap() = terminal;
    }

    /// Rest at `Idle` once the terminal state has been surfaced, so the
    /// screen can submit again.
    fn reset(&self) {
        *self.state.lock().unwrap() = SubmissionState::Idle;
    }
}
