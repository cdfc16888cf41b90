//! # Zonia SDK
//!
//! Async access to a Zonia comment canister:
//!
//! - [`CanisterAgent`]: raw query/update boundary, implemented by the host
//!   application (or `zonia-testkit` in tests)
//! - [`ZoniaClient`]: typed calls with input validation and error normalization
//! - [`ThreadAggregator`]: paginated, de-duplicated view of one channel
//!
//! ```ignore
//! let client = ZoniaClient::new(SdkConfig::new(canister_id), agent)?;
//! let view = ThreadAggregator::new(client);
//! view.load_initial("channel-1", None, None).await?;
//! view.load_more(&Locator::replies_of("post-1")).await?;
//! ```

#![forbid(unsafe_code)]

pub mod agent;
pub mod aggregator;
pub mod client;

pub use agent::{AgentError, CanisterAgent, RejectCode};
pub use aggregator::{LoadOutcome, ThreadAggregator};
pub use client::{
    normalize_agent_error, GetThreadInput, IdGenerator, RemovePostInput, UpsertPostInput,
    ZoniaClient,
};

pub use zonia_core::{
    ChannelId, Cursor, ErrorKind, Locator, MergeReport, Page, PaginationState, Post, PostId,
    RemainingCount, Result, SdkConfig, ThreadState, ZoniaError,
};
