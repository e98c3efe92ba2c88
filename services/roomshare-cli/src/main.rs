//! Roomshare command-line client.
//!
//! Drives profile and listing submissions through the media pipeline and can
//! read or watch the resulting records.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use futures::{pin_mut, StreamExt};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use media_pipeline::{
    BatchScheduler, FsMediaLibrary, ImageSelector, ListingFields, MetadataWriter, ProfileRecord,
    StorageUploader, SubmissionError, SubmissionOrchestrator, SubmitOutcome,
};
use roomshare_common::UserId;
use storage::{ObjectStorage, RecordPath, RecordStore};

use config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "roomshare")]
#[command(about = "Roomshare client: publish your profile and listing")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or update your profile, optionally with photos
    Profile {
        #[arg(long)]
        name: String,

        #[arg(long)]
        age: u32,

        /// Free-form introduction
        #[arg(long, default_value = "")]
        bio: String,

        /// You have a room and are looking for a roommate
        #[arg(long)]
        has_place: bool,

        /// Directory of photos to upload (at most 5 images)
        #[arg(long)]
        images: Option<PathBuf>,
    },

    /// Publish a listing for your place
    Listing {
        #[arg(long)]
        address: String,

        /// Room size in square meters
        #[arg(long)]
        room_size: u32,

        /// Monthly price
        #[arg(long)]
        price: u32,

        /// Directory of photos to upload (at most 5 images)
        #[arg(long)]
        images: PathBuf,
    },

    /// Print your current user record
    Show,

    /// Watch a record and print changes as they arrive
    Watch {
        /// Watch the listing record instead of the profile
        #[arg(long)]
        listing: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = AppConfig::from_env()?;
    let user = UserId::new(config.user_id.clone());

    match args.command {
        Command::Profile {
            name,
            age,
            bio,
            has_place,
            images,
        } => {
            let orchestrator = build_orchestrator(&config)?;

            if let Some(dir) = images {
                pick(&orchestrator, dir).await?;
            }

            let profile = ProfileRecord {
                name,
                age,
                has_place,
                bio,
            };
            report(
                orchestrator.submit_profile(&user, profile).await,
                "Profile saved",
            )
        }

        Command::Listing {
            address,
            room_size,
            price,
            images,
        } => {
            let orchestrator = build_orchestrator(&config)?;
            pick(&orchestrator, images).await?;

            let fields = ListingFields {
                address,
                room_size,
                price,
            };
            report(
                orchestrator.submit_listing(&user, fields).await,
                "Listing saved",
            )
        }

        Command::Show => show(&config, &user).await,

        Command::Watch { listing } => watch(&config, &user, listing).await,
    }
}

/// Wire the pipeline components against the configured backends.
fn build_orchestrator(config: &AppConfig) -> Result<SubmissionOrchestrator> {
    let storage = Arc::new(ObjectStorage::new(&config.storage)?);
    let records = Arc::new(RecordStore::new(&config.records)?);
    let user = UserId::new(config.user_id.clone());

    let uploader = Arc::new(StorageUploader::new(
        storage,
        user,
        config.pipeline.clone(),
    ));
    let writer = MetadataWriter::new(records);

    Ok(SubmissionOrchestrator::new(
        BatchScheduler::new(config.pipeline.batch_size),
        uploader,
        writer,
        ImageSelector::new(config.pipeline.max_selection),
    ))
}

/// Select images from a local directory standing in for the photo roll.
async fn pick(orchestrator: &SubmissionOrchestrator, dir: PathBuf) -> Result<()> {
    let library = FsMediaLibrary::new(dir);

    match orchestrator.pick_images(&library).await {
        Ok(count) => {
            info!(count, "Images selected");
            Ok(())
        }
        Err(e) if e.is_selection_error() => {
            eprintln!("{}", e.user_notice());
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

/// Surface a submission outcome: success summary on stdout, the generic
/// failure notice on stderr with a non-zero exit.
fn report(result: Result<SubmitOutcome, SubmissionError>, success: &str) -> Result<()> {
    match result {
        Ok(SubmitOutcome::Completed(report)) => {
            if report.images.is_empty() {
                println!("{}.", success);
            } else {
                println!("{} with {} image(s).", success, report.images.len());
            }
            Ok(())
        }
        Ok(SubmitOutcome::Ignored) => {
            println!("A submission is already in progress.");
            Ok(())
        }
        Err(e) => {
            if !e.orphaned.is_empty() {
                warn!(
                    orphaned = e.orphaned.len(),
                    "Uploaded images left unreferenced in storage"
                );
            }
            eprintln!("{}", e.error.user_notice());
            std::process::exit(1);
        }
    }
}

/// Print the current user record.
async fn show(config: &AppConfig, user: &UserId) -> Result<()> {
    let records = RecordStore::new(&config.records)?;

    match records.get(&RecordPath::user(user.as_str())).await? {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => println!("No profile record yet."),
    }
    Ok(())
}

/// Subscribe to a record path and print events until the server closes the
/// stream.
async fn watch(config: &AppConfig, user: &UserId, listing: bool) -> Result<()> {
    let records = RecordStore::new(&config.records)?;
    let path = if listing {
        RecordPath::residence_info(user.as_str())
    } else {
        RecordPath::user(user.as_str())
    };

    info!(path = %path, "Watching for changes");
    let events = records.subscribe(&path).await?;
    pin_mut!(events);

    while let Some(event) = events.next().await {
        let event = event?;
        println!(
            "{:<5} {} {}",
            format!("{:?}", event.kind).to_lowercase(),
            event.path,
            serde_json::to_string(&event.data)?
        );
    }

    info!("Subscription ended");
    Ok(())
}
