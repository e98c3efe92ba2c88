//! Common types shared across the roomshare client crates.

pub mod error;
pub mod types;

pub use error::{RoomshareError, RoomshareResult};
pub use types::UserId;
