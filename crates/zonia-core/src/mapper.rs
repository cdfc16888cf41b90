//! # Thread Mapper
//!
//! Converts canister [`RemotePage`]s into local [`Page`]s. The transform is
//! structural only: same shape, same order, numeric fields narrowed from
//! candid `nat` to `u64`.
//!
//! Nesting depth is driven by the data, so the walk keeps its own stack of
//! open levels instead of recursing.

use crate::ids::PostId;
use crate::model::{Page, Post, RemainingCount};
use crate::wire::{RemoteComment, RemotePage};
use candid::Nat;

/// Narrow a candid `nat` to `u64`, saturating above `u64::MAX`.
pub fn nat_to_u64(value: &Nat) -> u64 {
    match value.0.to_u64_digits().as_slice() {
        [] => 0,
        [low] => *low,
        _ => u64::MAX,
    }
}

/// Post fields waiting for their reply page to finish mapping.
struct PendingPost {
    id: PostId,
    content: String,
    created_at: u64,
    user_id: String,
}

impl PendingPost {
    fn split(comment: RemoteComment) -> (Self, RemotePage) {
        let RemoteComment {
            id,
            content,
            created_at,
            user_id,
            replies,
        } = comment;
        let pending = Self {
            id: PostId::new(id),
            content,
            created_at: nat_to_u64(&created_at),
            user_id,
        };
        (pending, replies)
    }

    fn finish(self, replies: Page) -> Post {
        Post {
            id: self.id,
            content: self.content,
            created_at: self.created_at,
            user_id: self.user_id,
            replies,
        }
    }
}

/// One open level of the walk.
struct Frame {
    owner: Option<PendingPost>,
    remaining: RemainingCount,
    comments: std::vec::IntoIter<RemoteComment>,
    mapped: Vec<Post>,
}

impl Frame {
    fn open(owner: Option<PendingPost>, page: RemotePage) -> Self {
        Self {
            owner,
            remaining: RemainingCount::Exactly(nat_to_u64(&page.remaining_count)),
            mapped: Vec::with_capacity(page.comments.len()),
            comments: page.comments.into_iter(),
        }
    }
}

/// Map a remote page, and every nested reply page, into a local [`Page`].
pub fn map_remote_page(remote: RemotePage) -> Page {
    let mut stack = vec![Frame::open(None, remote)];

    while let Some(frame) = stack.last_mut() {
        if let Some(comment) = frame.comments.next() {
            let (pending, replies) = PendingPost::split(comment);
            stack.push(Frame::open(Some(pending), replies));
            continue;
        }

        let Some(done) = stack.pop() else { break };
        let page = Page::new(done.remaining, done.mapped);
        let Some(parent) = stack.last_mut() else {
            return page;
        };
        if let Some(owner) = done.owner {
            parent.mapped.push(owner.finish(page));
        }
    }

    Page::exhausted()
}

/// Map a single remote comment and its replies.
pub fn map_remote_comment(remote: RemoteComment) -> Post {
    let (pending, replies) = PendingPost::split(remote);
    pending.finish(map_remote_page(replies))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaf_page(remaining: u64) -> RemotePage {
        RemotePage {
            remaining_count: Nat::from(remaining),
            comments: vec![],
        }
    }

    fn comment(id: &str, created_at: u64, replies: RemotePage) -> RemoteComment {
        RemoteComment {
            id: id.to_string(),
            content: format!("content of {id}"),
            created_at: Nat::from(created_at),
            user_id: format!("user-{id}"),
            replies,
        }
    }

    #[test]
    fn test_nat_narrowing() {
        assert_eq!(nat_to_u64(&Nat::from(0u64)), 0);
        assert_eq!(nat_to_u64(&Nat::from(u64::MAX)), u64::MAX);
        assert_eq!(nat_to_u64(&Nat::from(u128::MAX)), u64::MAX);
        // Nanosecond timestamps are well inside the exact range.
        let ts = 1_718_000_000_123_456_789u64;
        assert_eq!(nat_to_u64(&Nat::from(ts)), ts);
    }

    #[test]
    fn test_maps_nested_replies_in_order() {
        let remote = RemotePage {
            remaining_count: Nat::from(5u64),
            comments: vec![
                comment(
                    "a",
                    10,
                    RemotePage {
                        remaining_count: Nat::from(1u64),
                        comments: vec![
                            comment("a1", 11, leaf_page(0)),
                            comment("a2", 12, leaf_page(4)),
                        ],
                    },
                ),
                comment("b", 20, leaf_page(0)),
            ],
        };

        let page = map_remote_page(remote);

        assert_eq!(page.remaining_count, RemainingCount::Exactly(5));
        let ids: Vec<_> = page.thread.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);

        let a = &page.thread[0];
        assert_eq!(a.created_at, 10);
        assert_eq!(a.user_id, "user-a");
        assert_eq!(a.replies.remaining_count, RemainingCount::Exactly(1));
        let reply_ids: Vec<_> = a.replies.thread.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(reply_ids, ["a1", "a2"]);
        assert_eq!(
            a.replies.thread[1].replies.remaining_count,
            RemainingCount::Exactly(4)
        );
        assert!(page.thread[1].replies.is_empty());
    }

    #[test]
    fn test_empty_page() {
        let page = map_remote_page(leaf_page(0));
        assert!(page.is_empty());
        assert!(!page.has_more());
    }

    #[test]
    fn test_deep_reply_chain() {
        let depth = 1_000;
        let mut remote = leaf_page(0);
        for level in (0..depth).rev() {
            remote = RemotePage {
                remaining_count: Nat::from(0u64),
                comments: vec![comment(&format!("n{level}"), level, remote)],
            };
        }

        let mut page = &map_remote_page(remote);
        let mut seen = 0u64;
        while let Some(post) = page.thread.first() {
            assert_eq!(post.id.as_str(), format!("n{seen}"));
            assert_eq!(post.created_at, seen);
            seen += 1;
            page = &post.replies;
        }
        assert_eq!(seen, depth);
    }

    #[test]
    fn test_single_comment() {
        let post = map_remote_comment(comment("x", 7, leaf_page(2)));
        assert_eq!(post.id.as_str(), "x");
        assert_eq!(post.replies.remaining_count, RemainingCount::Exactly(2));
    }

    proptest! {
        #[test]
        fn prop_shape_is_preserved(
            top in proptest::collection::vec((any::<u64>(), 0usize..6, any::<u64>()), 0..12),
            remaining in any::<u64>(),
        ) {
            let remote = RemotePage {
                remaining_count: Nat::from(remaining),
                comments: top
                    .iter()
                    .enumerate()
                    .map(|(i, (ts, replies, reply_remaining))| {
                        let nested = RemotePage {
                            remaining_count: Nat::from(*reply_remaining),
                            comments: (0..*replies)
                                .map(|j| {
                                    let id = format!("{i}.{j}");
                                    comment(&id, ts.wrapping_add(j as u64), leaf_page(0))
                                })
                                .collect(),
                        };
                        comment(&i.to_string(), *ts, nested)
                    })
                    .collect(),
            };

            let page = map_remote_page(remote);

            prop_assert_eq!(page.remaining_count, RemainingCount::Exactly(remaining));
            prop_assert_eq!(page.len(), top.len());
            let pairs = page.thread.iter().zip(&top).enumerate();
            for (i, (post, (ts, replies, reply_remaining))) in pairs {
                prop_assert_eq!(post.id.as_str(), i.to_string());
                prop_assert_eq!(post.created_at, *ts);
                prop_assert_eq!(post.replies.len(), *replies);
                prop_assert_eq!(
                    post.replies.remaining_count,
                    RemainingCount::Exactly(*reply_remaining)
                );
                for (j, reply) in post.replies.thread.iter().enumerate() {
                    prop_assert_eq!(reply.id.as_str(), format!("{i}.{j}"));
                    prop_assert_eq!(reply.created_at, ts.wrapping_add(j as u64));
                }
            }
        }
    }
}
