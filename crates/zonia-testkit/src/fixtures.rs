//! Builders for thread fixtures
//!
//! Local model fixtures use `i64` remaining counts so tests can write the
//! unknown sentinel as `-1`.

use candid::Nat;
use zonia_core::wire::{RemoteComment, RemotePage};
use zonia_core::{Page, Post, RemainingCount};

/// Post with no replies and content derived from its id.
pub fn post(id: &str) -> Post {
    Post::new(id, format!("content of {id}"), 0, "user-1")
}

/// Post with a reply page.
pub fn post_with_replies(id: &str, replies: Page) -> Post {
    post(id).with_replies(replies)
}

/// Page of leaf posts.
pub fn page(remaining: i64, ids: &[&str]) -> Page {
    Page::new(
        RemainingCount::from(remaining),
        ids.iter().map(|id| post(id)).collect(),
    )
}

/// Page of arbitrary posts.
pub fn page_of(remaining: i64, posts: Vec<Post>) -> Page {
    Page::new(RemainingCount::from(remaining), posts)
}

/// Remote comment without replies.
pub fn remote_comment(id: &str) -> RemoteComment {
    RemoteComment {
        id: id.to_string(),
        content: format!("content of {id}"),
        created_at: Nat::from(0u64),
        user_id: "user-1".to_string(),
        replies: remote_page(0, Vec::new()),
    }
}

/// Remote page of the given comments.
pub fn remote_page(remaining: u64, comments: Vec<RemoteComment>) -> RemotePage {
    RemotePage {
        remaining_count: Nat::from(remaining),
        comments,
    }
}

/// Ids at the root level of a page, in order.
pub fn ids(page: &Page) -> Vec<&str> {
    page.thread.iter().map(|post| post.id.as_str()).collect()
}
