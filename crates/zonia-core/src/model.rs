//! # Thread Data Model
//!
//! Local, wire-independent representation of a comment thread. A [`Post`]
//! carries its own [`Page`] of replies, so the structure is recursive and
//! every level is paginated on its own.
//!
//! Serialized field names follow the shape UI consumers already expect
//! (`userId`, `remainingCount`).

use crate::ids::PostId;
use serde::{Deserialize, Serialize};

/// Server-reported count of items not yet fetched at a level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum RemainingCount {
    /// Count unknown; assume more may exist. Serialized as `-1`.
    #[default]
    Unknown,
    /// Exact number of items still on the server.
    Exactly(u64),
}

impl RemainingCount {
    /// Nothing left to fetch.
    pub const NONE: Self = Self::Exactly(0);

    /// Whether "load more" should still be offered.
    #[must_use]
    pub fn has_more(&self) -> bool {
        match self {
            Self::Unknown => true,
            Self::Exactly(n) => *n > 0,
        }
    }

    /// Integer form with `-1` for unknown.
    #[must_use]
    pub fn as_i64(&self) -> i64 {
        i64::from(*self)
    }
}

impl From<i64> for RemainingCount {
    fn from(raw: i64) -> Self {
        u64::try_from(raw).map_or(Self::Unknown, Self::Exactly)
    }
}

impl From<RemainingCount> for i64 {
    fn from(count: RemainingCount) -> Self {
        match count {
            RemainingCount::Unknown => -1,
            RemainingCount::Exactly(n) => i64::try_from(n).unwrap_or(i64::MAX),
        }
    }
}

/// A single comment with its paginated replies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Post identifier
    pub id: PostId,
    /// Message body
    pub content: String,
    /// Creation time as reported by the canister
    pub created_at: u64,
    /// Author identifier
    #[serde(rename = "userId")]
    pub user_id: String,
    /// First page of replies to this post
    pub replies: Page,
}

impl Post {
    /// Create a post with no replies.
    pub fn new(
        id: impl Into<PostId>,
        content: impl Into<String>,
        created_at: u64,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            created_at,
            user_id: user_id.into(),
            replies: Page::exhausted(),
        }
    }

    /// Replace the reply page.
    #[must_use]
    pub fn with_replies(mut self, replies: Page) -> Self {
        self.replies = replies;
        self
    }
}

/// One page of a thread level
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Items still on the server after this page
    #[serde(rename = "remainingCount")]
    pub remaining_count: RemainingCount,
    /// Posts in server order
    pub thread: Vec<Post>,
}

impl Page {
    /// Create a page.
    pub fn new(remaining_count: RemainingCount, thread: Vec<Post>) -> Self {
        Self {
            remaining_count,
            thread,
        }
    }

    /// An empty page with nothing left on the server.
    pub fn exhausted() -> Self {
        Self::new(RemainingCount::NONE, Vec::new())
    }

    /// Number of posts on this page (not counting nested replies).
    pub fn len(&self) -> usize {
        self.thread.len()
    }

    /// Whether this page carries no posts.
    pub fn is_empty(&self) -> bool {
        self.thread.is_empty()
    }

    /// Whether the server reported more items after this page.
    pub fn has_more(&self) -> bool {
        self.remaining_count.has_more()
    }

    /// Id of the last post on this page, used as the resume cursor.
    pub fn last_id(&self) -> Option<&PostId> {
        self.thread.last().map(|post| &post.id)
    }
}
