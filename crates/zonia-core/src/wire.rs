//! Candid records exchanged with the comment canister
//!
//! These mirror the canister interface one-to-one:
//!
//! ```text
//! type page    = record { remaining_count : nat; comments : vec comment };
//! type comment = record { id : text; content : text; created_at : nat; user_id : text; replies : page };
//!
//! get_thread     : (record { channel_id : text; cursor : opt text; limit : nat32 }) -> (page) query;
//! upsert_comment : (record { channel_id : text; parent_id : opt text; message : text; comment_id : text }) -> (text);
//! delete_comment : (record { channel_id : text; comment_id : text }) -> (text);
//! ```
//!
//! Nothing outside `zonia-sdk` and the mapper should need these types.

use candid::{CandidType, Deserialize, Nat};

/// Canister method names.
pub mod methods {
    /// Query returning one [`RemotePage`](super::RemotePage).
    pub const GET_THREAD: &str = "get_thread";
    /// Update creating or editing a comment.
    pub const UPSERT_COMMENT: &str = "upsert_comment";
    /// Update deleting a comment.
    pub const DELETE_COMMENT: &str = "delete_comment";
}

/// Paginated comment list as returned by `get_thread`
#[derive(CandidType, Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct RemotePage {
    /// Comments left on the server after this page
    pub remaining_count: Nat,
    /// Comments in server order
    pub comments: Vec<RemoteComment>,
}

/// Comment record with its first page of replies
#[derive(CandidType, Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct RemoteComment {
    /// Comment id
    pub id: String,
    /// Message body
    pub content: String,
    /// Canister timestamp
    pub created_at: Nat,
    /// Author id
    pub user_id: String,
    /// Nested reply page
    pub replies: RemotePage,
}

/// Arguments of `get_thread`
#[derive(CandidType, Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct GetThreadArgs {
    /// Channel, or parent comment id when fetching replies
    pub channel_id: String,
    /// Resume after this comment id
    pub cursor: Option<String>,
    /// Maximum comments on the returned level
    pub limit: u32,
}

/// Arguments of `upsert_comment`
#[derive(CandidType, Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct UpsertCommentArgs {
    /// Target channel
    pub channel_id: String,
    /// Parent comment when replying
    pub parent_id: Option<String>,
    /// Message body
    pub message: String,
    /// Client-chosen id; reusing it edits the comment
    pub comment_id: String,
}

/// Arguments of `delete_comment`
#[derive(CandidType, Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct DeleteCommentArgs {
    /// Target channel
    pub channel_id: String,
    /// Comment to delete
    pub comment_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use candid::{decode_one, encode_one};

    #[test]
    fn test_nested_page_survives_candid() {
        let page = RemotePage {
            remaining_count: Nat::from(3u64),
            comments: vec![RemoteComment {
                id: "a".into(),
                content: "hello".into(),
                created_at: Nat::from(1_700_000_000_000_000_000u64),
                user_id: "u1".into(),
                replies: RemotePage {
                    remaining_count: Nat::from(0u64),
                    comments: vec![],
                },
            }],
        };

        let bytes = encode_one(page.clone()).unwrap();
        let decoded: RemotePage = decode_one(&bytes).unwrap();
        assert_eq!(decoded, page);
    }

    #[test]
    fn test_absent_cursor_is_opt_none() {
        let args = GetThreadArgs {
            channel_id: "c1".into(),
            cursor: None,
            limit: 10,
        };
        let decoded: GetThreadArgs = decode_one(&encode_one(args).unwrap()).unwrap();
        assert_eq!(decoded.cursor, None);
    }
}
