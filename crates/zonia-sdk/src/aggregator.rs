//! # Thread Aggregator
//!
//! Keeps one channel's [`ThreadState`] in sync with the canister as the user
//! pages through it. Each [`Locator`] (the root or one post's replies) pages
//! independently.
//!
//! ## Concurrency
//!
//! - The state lock is a `parking_lot::Mutex` and is never held across an
//!   `.await`. Each load takes it once to start and once to apply.
//! - A level in `Loading` is the in-flight guard: a second `load_more` on the
//!   same locator returns [`LoadOutcome::InFlight`] without fetching.
//! - `load_initial` (when it starts and again when it applies), `seed` and
//!   `discard` bump a generation counter. A fetch that comes back under a
//!   different generation is dropped.
//!
//! Mutations (`add_post`, `update_post`, `remove_post`) only talk to the
//! canister. Local reconciliation goes through [`ThreadAggregator::patch`].

use crate::client::{GetThreadInput, RemovePostInput, UpsertPostInput, ZoniaClient};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};
use zonia_core::{
    ChannelId, Cursor, LoadGate, Locator, MergeReport, Page, PaginationState, PostId, Result,
    ThreadState, ZoniaError,
};

/// Result of [`ThreadAggregator::load_more`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A non-empty page was merged
    Merged(MergeReport),
    /// The fetch returned no posts; pagination was still updated
    EmptyPage {
        /// Pagination state after the fetch
        pagination: PaginationState,
    },
    /// The level has nothing left; no fetch was made
    Exhausted,
    /// A fetch for this level is already running; no fetch was made
    InFlight,
    /// The view was replaced or the level removed while fetching
    Discarded,
}

#[derive(Debug, Default)]
struct Inner {
    channel: Option<ChannelId>,
    generation: u64,
    limit: Option<u32>,
    state: ThreadState,
}

impl Inner {
    /// Drop the current view and invalidate in-flight fetches.
    fn reset(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }
}

/// Work captured under the lock before a `load_more` fetch.
struct PendingFetch {
    generation: u64,
    input: GetThreadInput,
}

/// Paginated view of one channel's comment tree.
///
/// Clones share the same view.
#[derive(Debug, Clone)]
pub struct ThreadAggregator {
    client: ZoniaClient,
    inner: Arc<Mutex<Inner>>,
}

impl ThreadAggregator {
    /// Create an empty view backed by `client`.
    pub fn new(client: ZoniaClient) -> Self {
        Self {
            client,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Client used for remote calls.
    pub fn client(&self) -> &ZoniaClient {
        &self.client
    }

    // ─── Loading ─────────────────────────────────────────────

    /// Fetch the first root page of `channel_id` and replace the view with it.
    ///
    /// The page is returned even when a later `load_initial`, `seed` or
    /// `discard` made it stale; it is then not applied.
    pub async fn load_initial(
        &self,
        channel_id: impl Into<ChannelId>,
        cursor: Option<Cursor>,
        limit: Option<u32>,
    ) -> Result<Page> {
        let channel_id = channel_id.into();
        if limit == Some(0) {
            return Err(ZoniaError::invalid("limit must be at least 1"));
        }

        let (generation, previous) = {
            let mut inner = self.inner.lock();
            let generation = inner.reset();
            let root = inner.state.root_mut().pagination_mut();
            // An overlapping reload leaves the root `Loading`; fall back to
            // what that load would restore.
            let previous = root.settled();
            *root = previous;
            if root.begin() != LoadGate::Started {
                // Reloads are allowed from any state.
                *root = PaginationState::Loading {
                    previous: Some(previous.remaining()),
                };
            }
            (generation, previous)
        };

        debug!(
            channel_id = %channel_id,
            cursor = ?cursor,
            limit = ?limit,
            generation,
            "Loading initial thread page"
        );
        let input = GetThreadInput {
            channel_id: channel_id.clone(),
            cursor,
            limit,
        };
        let result = self.client.get_thread(input).await;

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            warn!(
                channel_id = %channel_id,
                "Initial page arrived for a replaced view; not applied"
            );
            return result;
        }

        match result {
            Ok(page) => {
                inner.state.replace(page.clone());
                // Loads begun against the replaced tree must not merge into this one.
                let generation = inner.reset();
                inner.channel = Some(channel_id.clone());
                inner.limit = limit;
                debug!(
                    channel_id = %channel_id,
                    posts = page.len(),
                    remaining = page.remaining_count.as_i64(),
                    generation,
                    "Initial thread page applied"
                );
                Ok(page)
            }
            Err(err) => {
                *inner.state.root_mut().pagination_mut() = previous;
                warn!(
                    channel_id = %channel_id,
                    transient = err.kind().is_transient(),
                    error = %err,
                    "Initial load failed"
                );
                Err(err)
            }
        }
    }

    /// Fetch and merge the next page at `locator`.
    pub async fn load_more(&self, locator: &Locator) -> Result<LoadOutcome> {
        let pending = match self.begin_fetch(locator)? {
            Ok(pending) => pending,
            Err(outcome) => {
                debug!(locator = %locator, outcome = ?outcome, "Skipping load_more");
                return Ok(outcome);
            }
        };

        debug!(
            channel_id = %pending.input.channel_id,
            locator = %locator,
            cursor = ?pending.input.cursor,
            limit = ?pending.input.limit,
            "Loading more posts"
        );
        let result = self.client.get_thread(pending.input).await;

        let mut inner = self.inner.lock();
        if inner.generation != pending.generation {
            warn!(locator = %locator, "Dropping page fetched for a replaced view");
            return Ok(LoadOutcome::Discarded);
        }
        let Some(level) = inner
            .state
            .level_mut(locator)
            .filter(|level| level.pagination().is_loading())
        else {
            warn!(locator = %locator, "Dropping page for a level removed while fetching");
            return Ok(LoadOutcome::Discarded);
        };

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                level.pagination_mut().restore();
                warn!(
                    locator = %locator,
                    transient = err.kind().is_transient(),
                    error = %err,
                    "load_more failed; pagination restored"
                );
                return Err(err);
            }
        };

        let empty = page.is_empty();
        let report = level.merge(page);
        debug!(
            locator = %locator,
            appended = report.appended,
            duplicates = report.duplicates,
            pagination = ?report.pagination,
            "Merged page"
        );

        Ok(if empty {
            LoadOutcome::EmptyPage {
                pagination: report.pagination,
            }
        } else {
            LoadOutcome::Merged(report)
        })
    }

    /// Claim `locator` for a fetch, or say why no fetch should happen.
    fn begin_fetch(
        &self,
        locator: &Locator,
    ) -> Result<std::result::Result<PendingFetch, LoadOutcome>> {
        let mut inner = self.inner.lock();
        let Inner {
            channel,
            generation,
            limit,
            state,
        } = &mut *inner;

        let channel = channel
            .as_ref()
            .ok_or_else(|| ZoniaError::invalid("no thread loaded; call load_initial first"))?;
        let level = state
            .level_mut(locator)
            .ok_or_else(|| ZoniaError::not_found(format!("no thread level at {locator}")))?;

        match level.pagination_mut().begin() {
            LoadGate::Started => {}
            LoadGate::InFlight => return Ok(Err(LoadOutcome::InFlight)),
            LoadGate::Exhausted => return Ok(Err(LoadOutcome::Exhausted)),
        }

        Ok(Ok(PendingFetch {
            generation: *generation,
            input: GetThreadInput {
                channel_id: locator.fetch_channel(channel),
                cursor: level.cursor().cloned(),
                limit: *limit,
            },
        }))
    }

    /// Replace the view with a page the caller already holds.
    pub fn seed(&self, channel_id: impl Into<ChannelId>, page: Page) {
        let mut inner = self.inner.lock();
        inner.reset();
        inner.channel = Some(channel_id.into());
        inner.limit = None;
        inner.state = ThreadState::from_page(page);
    }

    /// Drop the view. Fetches still in flight are ignored when they return.
    pub fn discard(&self) {
        let mut inner = self.inner.lock();
        let generation = inner.reset();
        inner.channel = None;
        inner.limit = None;
        inner.state = ThreadState::new();
        debug!(generation, "Thread view discarded");
    }

    // ─── Mutations ───────────────────────────────────────────

    /// Submit a new post. The view is not changed.
    pub async fn add_post(&self, input: UpsertPostInput) -> Result<PostId> {
        self.client.upsert_post(input).await
    }

    /// Submit an edit of an existing post. The view is not changed.
    pub async fn update_post(&self, input: UpsertPostInput) -> Result<PostId> {
        if input.post_id.is_none() {
            return Err(ZoniaError::invalid("post_id is required to update a post"));
        }
        self.client.upsert_post(input).await
    }

    /// Submit a deletion. The view is not changed.
    pub async fn remove_post(&self, input: RemovePostInput) -> Result<PostId> {
        self.client.remove_post(input).await
    }

    /// Apply a local change to the view, typically after a confirmed mutation.
    pub fn patch<T>(&self, f: impl FnOnce(&mut ThreadState) -> T) -> T {
        f(&mut self.inner.lock().state)
    }

    // ─── Queries ─────────────────────────────────────────────

    /// Copy of the current view.
    pub fn snapshot(&self) -> ThreadState {
        self.inner.lock().state.clone()
    }

    /// Pagination state at `locator`, if that level exists.
    pub fn pagination(&self, locator: &Locator) -> Option<PaginationState> {
        self.inner.lock().state.pagination(locator)
    }

    /// Whether "load more" should be offered at `locator`.
    pub fn has_more(&self, locator: &Locator) -> bool {
        self.pagination(locator)
            .is_some_and(|pagination| pagination.has_more())
    }

    /// Channel of the current view.
    pub fn channel_id(&self) -> Option<ChannelId> {
        self.inner.lock().channel.clone()
    }
}
