//! # Zonia Core
//!
//! Pure, I/O-free building blocks of the Zonia comment SDK:
//!
//! - [`model`]: local thread representation (`Post`, `Page`, `RemainingCount`)
//! - [`wire`]: candid records of the comment canister interface
//! - [`mapper`]: remote page to local page transform
//! - [`thread`]: aggregated view state with per-level pagination
//! - [`errors`]: the `ZoniaError` taxonomy
//! - [`config`]: `SdkConfig`
//!
//! Everything that talks to a canister lives in `zonia-sdk`.

#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod ids;
pub mod locator;
pub mod mapper;
pub mod model;
pub mod thread;
pub mod wire;

pub use config::{SdkConfig, DEFAULT_PAGE_LIMIT};
pub use errors::{ErrorKind, Result, ZoniaError};
pub use ids::{ChannelId, Cursor, PostId};
pub use locator::Locator;
pub use mapper::{map_remote_comment, map_remote_page, nat_to_u64};
pub use model::{Page, Post, RemainingCount};
pub use thread::{LoadGate, MergeReport, PaginationState, ThreadEntry, ThreadLevel, ThreadState};
