//! # Zonia Testkit
//!
//! Test support for the Zonia SDK: an in-memory comment canister that speaks
//! the same candid interface as the real one, and fixture builders.

pub mod canister;
pub mod fixtures;

pub use canister::{InMemoryCanister, CANISTER_BYTES, DEFAULT_USER};

use std::sync::Arc;
use zonia_core::Result;
use zonia_sdk::{ThreadAggregator, ZoniaClient};

/// Client wired to `canister`, with sequential post ids `p1`, `p2`, ...
pub fn client_for(canister: &InMemoryCanister) -> Result<ZoniaClient> {
    let counter = Arc::new(std::sync::atomic::AtomicU64::new(0));
    let client = ZoniaClient::new(canister.config(), Arc::new(canister.clone()))?;
    Ok(client.with_id_generator(move || {
        let n = counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
        zonia_core::PostId::new(format!("p{n}"))
    }))
}

/// Empty aggregator over `canister`.
pub fn aggregator_for(canister: &InMemoryCanister) -> Result<ThreadAggregator> {
    Ok(ThreadAggregator::new(client_for(canister)?))
}
