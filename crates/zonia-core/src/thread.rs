//! # Thread View State
//!
//! Client-side aggregate of a channel's comment tree. Every level (the root
//! thread and each post's reply list) is a [`ThreadLevel`]: an
//! insertion-ordered, id-keyed map of entries plus that level's own
//! [`PaginationState`] and resume [`Cursor`].
//!
//! Levels are addressed through [`Locator`]s so merges at any depth can be
//! applied and tested without touching sibling levels.
//!
//! Note: this type does NOT talk to the canister and does NOT apply remote
//! mutations on its own. Fetching lives in `zonia-sdk`; reconciling local
//! state after a confirmed add/update/remove is the caller's job, through
//! [`ThreadState::insert_post`], [`ThreadState::update_content`] and
//! [`ThreadState::remove_post`].

use crate::errors::{Result, ZoniaError};
use crate::ids::{Cursor, PostId};
use crate::locator::Locator;
use crate::model::{Page, Post, RemainingCount};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// Pagination State
// ============================================================================

/// Pagination lifecycle of one level.
///
/// `NotLoaded -> Loading -> Loaded -> Loading -> ... -> Exhausted`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaginationState {
    /// Nothing fetched yet
    #[default]
    NotLoaded,
    /// A fetch is in flight; `previous` is restored if it fails
    Loading {
        /// Remaining count before the fetch, `None` if the level was not loaded
        previous: Option<RemainingCount>,
    },
    /// At least one page merged and more may exist
    Loaded {
        /// Remaining count reported by the last fetch
        remaining: RemainingCount,
    },
    /// The server reported nothing left
    Exhausted,
}

/// Result of trying to start a fetch on a level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadGate {
    /// The level moved to `Loading`; the caller owns the fetch
    Started,
    /// Another fetch for this level is already running
    InFlight,
    /// Nothing left to fetch
    Exhausted,
}

impl PaginationState {
    /// State after a successful fetch reporting `remaining`.
    #[must_use]
    pub fn after_fetch(remaining: RemainingCount) -> Self {
        if remaining.has_more() {
            Self::Loaded { remaining }
        } else {
            Self::Exhausted
        }
    }

    /// Whether "load more" should be offered for this level.
    #[must_use]
    pub fn has_more(&self) -> bool {
        match self {
            Self::NotLoaded => true,
            Self::Loading { previous } => previous.map_or(true, |r| r.has_more()),
            Self::Loaded { remaining } => remaining.has_more(),
            Self::Exhausted => false,
        }
    }

    /// Whether a fetch is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    /// Whether the level is exhausted.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }

    /// Remaining count implied by this state.
    #[must_use]
    pub fn remaining(&self) -> RemainingCount {
        match self {
            Self::NotLoaded => RemainingCount::Unknown,
            Self::Loading { previous } => previous.unwrap_or(RemainingCount::Unknown),
            Self::Loaded { remaining } => *remaining,
            Self::Exhausted => RemainingCount::NONE,
        }
    }

    /// Try to move into `Loading`.
    pub fn begin(&mut self) -> LoadGate {
        let previous = match *self {
            Self::NotLoaded => None,
            Self::Loaded { remaining } => Some(remaining),
            Self::Loading { .. } => return LoadGate::InFlight,
            Self::Exhausted => return LoadGate::Exhausted,
        };
        *self = Self::Loading { previous };
        LoadGate::Started
    }

    /// Undo [`begin`](Self::begin) after a failed fetch.
    pub fn restore(&mut self) {
        *self = self.settled();
    }

    /// The state this one returns to once any in-flight fetch is abandoned.
    ///
    /// Never `Loading`.
    #[must_use]
    pub fn settled(&self) -> Self {
        match *self {
            Self::Loading { previous } => {
                previous.map_or(Self::NotLoaded, |remaining| Self::Loaded { remaining })
            }
            other => other,
        }
    }
}

// ============================================================================
// Thread Levels
// ============================================================================

/// A post held in the view state, with its own paginated reply level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadEntry {
    /// Post identifier
    pub id: PostId,
    /// Message body
    pub content: String,
    /// Creation time as reported by the canister
    pub created_at: u64,
    /// Author identifier
    pub user_id: String,
    /// Replies to this post
    pub replies: ThreadLevel,
}

impl ThreadEntry {
    /// Build an entry (and its reply levels) from a mapped post.
    pub fn from_post(post: Post) -> Self {
        let Post {
            id,
            content,
            created_at,
            user_id,
            replies,
        } = post;
        Self {
            id,
            content,
            created_at,
            user_id,
            replies: ThreadLevel::from_page(replies),
        }
    }

    /// Convert back into a [`Post`] carrying everything loaded so far.
    pub fn to_post(&self) -> Post {
        Post {
            id: self.id.clone(),
            content: self.content.clone(),
            created_at: self.created_at,
            user_id: self.user_id.clone(),
            replies: self.replies.to_page(),
        }
    }

    fn detached(&self) -> Post {
        Post::new(
            self.id.clone(),
            self.content.clone(),
            self.created_at,
            self.user_id.clone(),
        )
    }
}

/// Outcome of merging one page into a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    /// Posts appended to the level
    pub appended: usize,
    /// Posts skipped because their id was already present
    pub duplicates: usize,
    /// Pagination state after the merge
    pub pagination: PaginationState,
}

/// One independently paginated list of posts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadLevel {
    posts: IndexMap<PostId, ThreadEntry>,
    pagination: PaginationState,
    cursor: Option<Cursor>,
}

/// Level under construction in [`ThreadLevel::from_page`].
struct BuildFrame {
    owner: Option<Post>,
    remaining: RemainingCount,
    pending: std::vec::IntoIter<Post>,
    level: ThreadLevel,
}

impl BuildFrame {
    fn open(owner: Option<Post>, page: Page) -> Self {
        Self {
            owner,
            remaining: page.remaining_count,
            level: ThreadLevel {
                posts: IndexMap::with_capacity(page.thread.len()),
                ..ThreadLevel::default()
            },
            pending: page.thread.into_iter(),
        }
    }
}

impl ThreadLevel {
    /// An empty, not yet loaded level.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a loaded level, and all nested reply levels, from a page.
    ///
    /// Duplicate ids within a page keep the first occurrence.
    pub fn from_page(page: Page) -> Self {
        let mut stack = vec![BuildFrame::open(None, page)];

        while let Some(frame) = stack.last_mut() {
            if let Some(mut post) = frame.pending.next() {
                let replies = std::mem::take(&mut post.replies);
                stack.push(BuildFrame::open(Some(post), replies));
                continue;
            }

            let Some(done) = stack.pop() else { break };
            let mut level = done.level;
            level.pagination = PaginationState::after_fetch(done.remaining);
            level.cursor = level.posts.keys().next_back().map(Cursor::from);

            let Some(parent) = stack.last_mut() else {
                return level;
            };
            if let Some(owner) = done.owner {
                let entry = ThreadEntry {
                    id: owner.id,
                    content: owner.content,
                    created_at: owner.created_at,
                    user_id: owner.user_id,
                    replies: level,
                };
                parent.level.posts.entry(entry.id.clone()).or_insert(entry);
            }
        }

        Self::default()
    }

    /// Convert back into a [`Page`] carrying everything loaded so far.
    pub fn to_page(&self) -> Page {
        struct Frame<'a> {
            owner: Option<&'a ThreadEntry>,
            remaining: RemainingCount,
            entries: indexmap::map::Values<'a, PostId, ThreadEntry>,
            built: Vec<Post>,
        }

        fn open<'a>(owner: Option<&'a ThreadEntry>, level: &'a ThreadLevel) -> Frame<'a> {
            Frame {
                owner,
                remaining: level.pagination.remaining(),
                entries: level.posts.values(),
                built: Vec::with_capacity(level.posts.len()),
            }
        }

        let mut stack = vec![open(None, self)];

        while let Some(frame) = stack.last_mut() {
            if let Some(entry) = frame.entries.next() {
                stack.push(open(Some(entry), &entry.replies));
                continue;
            }

            let Some(done) = stack.pop() else { break };
            let page = Page::new(done.remaining, done.built);
            let Some(parent) = stack.last_mut() else {
                return page;
            };
            if let Some(owner) = done.owner {
                parent.built.push(owner.detached().with_replies(page));
            }
        }

        Page::exhausted()
    }

    /// Merge a freshly fetched page: append unseen posts in order, skip ids
    /// already present, then settle pagination from the page's remaining count.
    pub fn merge(&mut self, page: Page) -> MergeReport {
        let Page {
            remaining_count,
            thread,
        } = page;

        let mut appended = 0;
        let mut duplicates = 0;
        let mut last_seen = None;
        for post in thread {
            last_seen = Some(Cursor::from(&post.id));
            if self.posts.contains_key(&post.id) {
                duplicates += 1;
                continue;
            }
            let entry = ThreadEntry::from_post(post);
            self.posts.insert(entry.id.clone(), entry);
            appended += 1;
        }

        if last_seen.is_some() {
            self.cursor = last_seen;
        }
        self.pagination = PaginationState::after_fetch(remaining_count);

        MergeReport {
            appended,
            duplicates,
            pagination: self.pagination,
        }
    }

    // ─── Queries ─────────────────────────────────────────────

    /// Get an entry by id.
    pub fn get(&self, id: &str) -> Option<&ThreadEntry> {
        self.posts.get(id)
    }

    /// Get a mutable entry by id.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut ThreadEntry> {
        self.posts.get_mut(id)
    }

    /// Whether an entry with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.posts.contains_key(id)
    }

    /// Entries in display order.
    pub fn entries(&self) -> impl Iterator<Item = &ThreadEntry> {
        self.posts.values()
    }

    /// Ids in display order.
    pub fn ids(&self) -> impl Iterator<Item = &PostId> {
        self.posts.keys()
    }

    /// Number of entries on this level (not counting replies).
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    /// Whether this level holds no entries.
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Pagination state of this level.
    pub fn pagination(&self) -> PaginationState {
        self.pagination
    }

    /// Mutable pagination state, used by the aggregator's in-flight guard.
    pub fn pagination_mut(&mut self) -> &mut PaginationState {
        &mut self.pagination
    }

    /// Resume position for the next fetch.
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }
}

// ============================================================================
// Thread State
// ============================================================================

/// Aggregated comment tree of one channel view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadState {
    root: ThreadLevel,
}

impl ThreadState {
    /// An empty state whose root is not loaded yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// State holding exactly the given root page.
    pub fn from_page(page: Page) -> Self {
        Self {
            root: ThreadLevel::from_page(page),
        }
    }

    /// Root thread level.
    pub fn root(&self) -> &ThreadLevel {
        &self.root
    }

    /// Mutable root thread level.
    pub fn root_mut(&mut self) -> &mut ThreadLevel {
        &mut self.root
    }

    /// Level addressed by `locator`, if every post on its path is present.
    pub fn level(&self, locator: &Locator) -> Option<&ThreadLevel> {
        let mut level = &self.root;
        for id in locator.path() {
            level = &level.posts.get(id)?.replies;
        }
        Some(level)
    }

    /// Mutable level addressed by `locator`.
    pub fn level_mut(&mut self, locator: &Locator) -> Option<&mut ThreadLevel> {
        let mut level = &mut self.root;
        for id in locator.path() {
            level = &mut level.posts.get_mut(id)?.replies;
        }
        Some(level)
    }

    /// Pagination state of the level addressed by `locator`.
    pub fn pagination(&self, locator: &Locator) -> Option<PaginationState> {
        self.level(locator).map(ThreadLevel::pagination)
    }

    /// Replace everything with a fresh root page.
    pub fn replace(&mut self, page: Page) {
        self.root = ThreadLevel::from_page(page);
    }

    /// Merge a fetched page into the level addressed by `locator`.
    pub fn merge(&mut self, locator: &Locator, page: Page) -> Result<MergeReport> {
        let level = self.require_level_mut(locator)?;
        Ok(level.merge(page))
    }

    // ─── Caller-side reconciliation ──────────────────────────

    /// Append a post the caller knows was accepted by the canister.
    pub fn insert_post(&mut self, locator: &Locator, post: Post) -> Result<()> {
        let level = self.require_level_mut(locator)?;
        if level.contains(post.id.as_str()) {
            return Err(ZoniaError::invalid(format!(
                "post {} already present at {locator}",
                post.id
            )));
        }
        let entry = ThreadEntry::from_post(post);
        level.posts.insert(entry.id.clone(), entry);
        Ok(())
    }

    /// Replace the content of a post in place, keeping its position.
    pub fn update_content(
        &mut self,
        locator: &Locator,
        id: &str,
        content: impl Into<String>,
    ) -> Result<()> {
        let level = self.require_level_mut(locator)?;
        let entry = level
            .get_mut(id)
            .ok_or_else(|| ZoniaError::not_found(format!("post {id} at {locator}")))?;
        entry.content = content.into();
        Ok(())
    }

    /// Remove a post (and its replies), keeping sibling order.
    pub fn remove_post(&mut self, locator: &Locator, id: &str) -> Result<ThreadEntry> {
        let level = self.require_level_mut(locator)?;
        level
            .posts
            .shift_remove(id)
            .ok_or_else(|| ZoniaError::not_found(format!("post {id} at {locator}")))
    }

    // ─── Queries ─────────────────────────────────────────────

    /// Depth-first walk in display order, yielding `(depth, entry)`.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![self.root.posts.values()],
        }
    }

    /// Total number of posts loaded at every depth.
    pub fn total_posts(&self) -> usize {
        self.walk().count()
    }

    /// Everything loaded so far as a nested [`Page`].
    pub fn to_page(&self) -> Page {
        self.root.to_page()
    }

    fn require_level_mut(&mut self, locator: &Locator) -> Result<&mut ThreadLevel> {
        self.level_mut(locator)
            .ok_or_else(|| ZoniaError::not_found(format!("no thread level at {locator}")))
    }
}

/// Depth-first iterator over a [`ThreadState`].
pub struct Walk<'a> {
    stack: Vec<indexmap::map::Values<'a, PostId, ThreadEntry>>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a ThreadEntry);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(entry) => {
                    let depth = self.stack.len() - 1;
                    self.stack.push(entry.replies.posts.values());
                    return Some((depth, entry));
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}
