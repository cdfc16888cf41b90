//! In-memory comment canister
//!
//! [`InMemoryCanister`] implements [`CanisterAgent`] by decoding the candid
//! arguments of each call and serving them from a comment store held in
//! memory. It follows the addressing the SDK uses: a root level lives under
//! its channel id, a reply level under the id of the post it answers.
//!
//! Besides the store it offers:
//! - fault injection ([`InMemoryCanister::fail_next`])
//! - a query gate that parks `get_thread` calls (all of them, or those for
//!   chosen channels) until released, so tests can line up concurrent loads
//!   deterministically
//! - a log of every `get_thread` request

use async_trait::async_trait;
use candid::{CandidType, Nat, Principal};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;
use zonia_core::wire::{
    methods, DeleteCommentArgs, GetThreadArgs, RemoteComment, RemotePage, UpsertCommentArgs,
};
use zonia_core::SdkConfig;
use zonia_sdk::{AgentError, CanisterAgent, RejectCode};

/// Raw id of the in-memory canister (`rrkah-fqaaa-aaaaa-aaaaq-cai`).
pub const CANISTER_BYTES: [u8; 10] = [0, 0, 0, 0, 0, 0, 0, 1, 1, 1];

/// Author recorded for comments created through the agent interface.
pub const DEFAULT_USER: &str = "user-1";

#[derive(Debug, Clone)]
struct StoredComment {
    id: String,
    /// Channel id for root comments, parent id for replies
    bucket: String,
    content: String,
    created_at: u64,
    user_id: String,
}

#[derive(Debug)]
struct CanisterState {
    comments: Vec<StoredComment>,
    clock: u64,
    reply_limit: u32,
    failures: VecDeque<AgentError>,
    thread_requests: Vec<GetThreadArgs>,
    calls: usize,
}

impl CanisterState {
    fn position(&self, id: &str) -> Option<usize> {
        self.comments.iter().position(|c| c.id == id)
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn page(
        &self,
        bucket: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<RemotePage, AgentError> {
        let level: Vec<&StoredComment> =
            self.comments.iter().filter(|c| c.bucket == bucket).collect();

        let start = match cursor {
            None => 0,
            Some(cursor) => {
                let index = level.iter().position(|c| c.id == cursor).ok_or_else(|| {
                    AgentError::rejected(
                        RejectCode::CanisterReject,
                        format!("cursor comment {cursor} not found"),
                    )
                })?;
                index + 1
            }
        };
        let end = start.saturating_add(limit as usize).min(level.len());

        let mut comments = Vec::with_capacity(end - start);
        for stored in &level[start..end] {
            comments.push(RemoteComment {
                id: stored.id.clone(),
                content: stored.content.clone(),
                created_at: Nat::from(stored.created_at),
                user_id: stored.user_id.clone(),
                replies: self.page(&stored.id, None, self.reply_limit)?,
            });
        }

        Ok(RemotePage {
            remaining_count: Nat::from((level.len() - end) as u64),
            comments,
        })
    }

    fn upsert(&mut self, args: UpsertCommentArgs) -> Result<String, AgentError> {
        if args.message.trim().is_empty() {
            return Err(AgentError::rejected(RejectCode::CanisterReject, "message is empty"));
        }

        if let Some(index) = self.position(&args.comment_id) {
            self.comments[index].content = args.message;
            return Ok(args.comment_id);
        }

        let bucket = match args.parent_id {
            Some(parent) => {
                if self.position(&parent).is_none() {
                    return Err(AgentError::rejected(
                        RejectCode::CanisterReject,
                        format!("parent comment {parent} not found"),
                    ));
                }
                parent
            }
            None => args.channel_id,
        };
        let created_at = self.tick();
        self.comments.push(StoredComment {
            id: args.comment_id.clone(),
            bucket,
            content: args.message,
            created_at,
            user_id: DEFAULT_USER.to_string(),
        });
        Ok(args.comment_id)
    }

    fn delete(&mut self, args: DeleteCommentArgs) -> Result<String, AgentError> {
        if self.position(&args.comment_id).is_none() {
            return Err(AgentError::rejected(
                RejectCode::CanisterReject,
                format!("comment {} not found", args.comment_id),
            ));
        }

        // Replies go with their parent.
        let mut doomed = vec![args.comment_id.clone()];
        let mut next = 0;
        while next < doomed.len() {
            let parent = doomed[next].clone();
            doomed.extend(
                self.comments
                    .iter()
                    .filter(|c| c.bucket == parent)
                    .map(|c| c.id.clone()),
            );
            next += 1;
        }
        self.comments.retain(|c| !doomed.contains(&c.id));
        Ok(args.comment_id)
    }
}

/// Which `get_thread` calls park.
#[derive(Debug, Default)]
struct Gate {
    all: bool,
    channels: HashSet<String>,
}

impl Gate {
    fn blocks(&self, channel: &str) -> bool {
        self.all || self.channels.contains(channel)
    }
}

/// Comment canister served from memory. Clones share the same store.
#[derive(Debug, Clone)]
pub struct InMemoryCanister {
    principal: Principal,
    state: Arc<Mutex<CanisterState>>,
    gate: Arc<watch::Sender<Gate>>,
    parked: Arc<watch::Sender<usize>>,
}

impl Default for InMemoryCanister {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCanister {
    /// Empty canister at [`CANISTER_BYTES`].
    pub fn new() -> Self {
        let (gate, _) = watch::channel(Gate::default());
        let (parked, _) = watch::channel(0);
        Self {
            principal: Principal::from_slice(&CANISTER_BYTES),
            state: Arc::new(Mutex::new(CanisterState {
                comments: Vec::new(),
                clock: 1_700_000_000_000_000_000,
                reply_limit: 3,
                failures: VecDeque::new(),
                thread_requests: Vec::new(),
                calls: 0,
            })),
            gate: Arc::new(gate),
            parked: Arc::new(parked),
        }
    }

    /// Principal this canister answers to.
    pub fn principal(&self) -> Principal {
        self.principal
    }

    /// SDK config pointing at this canister.
    pub fn config(&self) -> SdkConfig {
        SdkConfig::new(self.principal.to_text())
    }

    /// Number of replies embedded under each comment of a page.
    pub fn set_reply_limit(&self, reply_limit: u32) {
        self.state.lock().reply_limit = reply_limit;
    }

    // ─── Store ───────────────────────────────────────────────

    /// Insert a root comment into `channel` directly.
    pub fn insert_comment(&self, channel: &str, id: &str, content: &str) {
        self.insert(channel, id, content);
    }

    /// Insert a reply to `parent` directly.
    pub fn insert_reply(&self, parent: &str, id: &str, content: &str) {
        self.insert(parent, id, content);
    }

    fn insert(&self, bucket: &str, id: &str, content: &str) {
        let mut state = self.state.lock();
        let created_at = state.tick();
        state.comments.push(StoredComment {
            id: id.to_string(),
            bucket: bucket.to_string(),
            content: content.to_string(),
            created_at,
            user_id: DEFAULT_USER.to_string(),
        });
    }

    /// Content of a stored comment.
    pub fn content_of(&self, id: &str) -> Option<String> {
        let state = self.state.lock();
        state
            .position(id)
            .map(|index| state.comments[index].content.clone())
    }

    /// Ids stored under a channel or parent, in creation order.
    pub fn ids_in(&self, bucket: &str) -> Vec<String> {
        self.state
            .lock()
            .comments
            .iter()
            .filter(|c| c.bucket == bucket)
            .map(|c| c.id.clone())
            .collect()
    }

    // ─── Faults and inspection ───────────────────────────────

    /// Fail the next call (of any method) with `err`. Queues if called twice.
    pub fn fail_next(&self, err: AgentError) {
        self.state.lock().failures.push_back(err);
    }

    /// Fail the next call with a reject.
    pub fn reject_next(&self, code: RejectCode, message: &str) {
        self.fail_next(AgentError::rejected(code, message));
    }

    /// Every `get_thread` request received so far.
    pub fn thread_requests(&self) -> Vec<GetThreadArgs> {
        self.state.lock().thread_requests.clone()
    }

    /// Total calls received, including failed ones.
    pub fn call_count(&self) -> usize {
        self.state.lock().calls
    }

    // ─── Query gate ──────────────────────────────────────────

    /// Park every `get_thread` call until [`release_queries`](Self::release_queries).
    pub fn hold_queries(&self) {
        self.gate.send_modify(|gate| gate.all = true);
    }

    /// Lift every hold, per-channel ones included.
    pub fn release_queries(&self) {
        self.gate.send_modify(|gate| {
            gate.all = false;
            gate.channels.clear();
        });
    }

    /// Park `get_thread` calls for `channel` until
    /// [`release_channel`](Self::release_channel).
    pub fn hold_channel(&self, channel: &str) {
        self.gate.send_modify(|gate| {
            gate.channels.insert(channel.to_owned());
        });
    }

    /// Let parked and future queries for `channel` through, unless
    /// [`hold_queries`](Self::hold_queries) is in force.
    pub fn release_channel(&self, channel: &str) {
        self.gate.send_modify(|gate| {
            gate.channels.remove(channel);
        });
    }

    /// Wait until at least `count` queries are parked at the gate.
    pub async fn wait_for_parked(&self, count: usize) {
        let mut parked = self.parked.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = parked.wait_for(|n| *n >= count).await;
    }

    async fn pass_gate(&self, channel: &str) {
        let mut gate = self.gate.subscribe();
        if !gate.borrow_and_update().blocks(channel) {
            return;
        }
        self.parked.send_modify(|n| *n += 1);
        let _ = gate.wait_for(|gate| !gate.blocks(channel)).await;
        self.parked.send_modify(|n| *n -= 1);
    }

    // ─── Dispatch ────────────────────────────────────────────

    fn check_target(&self, canister: &Principal) -> Result<(), AgentError> {
        if *canister != self.principal {
            return Err(AgentError::rejected(
                RejectCode::DestinationInvalid,
                format!("canister {canister} not found"),
            ));
        }
        let mut state = self.state.lock();
        state.calls += 1;
        match state.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn dispatch(&self, method: &str, arg: &[u8]) -> Result<Vec<u8>, AgentError> {
        let mut state = self.state.lock();
        match method {
            methods::GET_THREAD => {
                let args: GetThreadArgs = decode(arg)?;
                state.thread_requests.push(args.clone());
                let page = state.page(&args.channel_id, args.cursor.as_deref(), args.limit)?;
                encode(page)
            }
            methods::UPSERT_COMMENT => encode(state.upsert(decode(arg)?)?),
            methods::DELETE_COMMENT => encode(state.delete(decode(arg)?)?),
            other => Err(AgentError::rejected(
                RejectCode::DestinationInvalid,
                format!("method {other} not found"),
            )),
        }
    }
}

fn decode<T>(arg: &[u8]) -> Result<T, AgentError>
where
    T: CandidType + for<'de> candid::Deserialize<'de>,
{
    candid::decode_one(arg).map_err(|e| {
        AgentError::rejected(RejectCode::CanisterError, format!("argument decode failed: {e}"))
    })
}

fn encode<T: CandidType>(reply: T) -> Result<Vec<u8>, AgentError> {
    candid::encode_one(reply).map_err(|e| {
        AgentError::rejected(RejectCode::CanisterError, format!("reply encode failed: {e}"))
    })
}

#[async_trait]
impl CanisterAgent for InMemoryCanister {
    async fn query(
        &self,
        canister: &Principal,
        method: &str,
        arg: Vec<u8>,
    ) -> Result<Vec<u8>, AgentError> {
        if method == methods::GET_THREAD {
            // Undecodable args fall through to `dispatch`, which rejects them.
            if let Ok(args) = candid::decode_one::<GetThreadArgs>(&arg) {
                self.pass_gate(&args.channel_id).await;
            }
        }
        self.check_target(canister)?;
        debug!(method, "in-memory query");
        self.dispatch(method, &arg)
    }

    async fn update(
        &self,
        canister: &Principal,
        method: &str,
        arg: Vec<u8>,
    ) -> Result<Vec<u8>, AgentError> {
        self.check_target(canister)?;
        debug!(method, "in-memory update");
        self.dispatch(method, &arg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn get_thread(channel: &str, cursor: Option<&str>, limit: u32) -> Vec<u8> {
        candid::encode_one(GetThreadArgs {
            channel_id: channel.into(),
            cursor: cursor.map(Into::into),
            limit,
        })
        .unwrap()
    }

    async fn fetch(canister: &InMemoryCanister, arg: Vec<u8>) -> RemotePage {
        let bytes = canister
            .query(&canister.principal(), methods::GET_THREAD, arg)
            .await
            .unwrap();
        candid::decode_one(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_pages_by_cursor() {
        let canister = InMemoryCanister::new();
        for id in ["a", "b", "c"] {
            canister.insert_comment("c1", id, id);
        }
        canister.insert_reply("a", "a1", "reply");

        let first = fetch(&canister, get_thread("c1", None, 2)).await;
        assert_eq!(first.remaining_count, Nat::from(1u64));
        assert_eq!(first.comments.len(), 2);
        assert_eq!(first.comments[0].replies.comments[0].id, "a1");

        let second = fetch(&canister, get_thread("c1", Some("b"), 2)).await;
        assert_eq!(second.remaining_count, Nat::from(0u64));
        assert_eq!(second.comments[0].id, "c");

        let replies = fetch(&canister, get_thread("a", None, 10)).await;
        assert_eq!(replies.comments.len(), 1);
    }

    #[tokio::test]
    async fn test_principal_is_checked() {
        let canister = InMemoryCanister::new();
        let other = Principal::anonymous();
        let err = canister
            .query(&other, methods::GET_THREAD, get_thread("c1", None, 1))
            .await
            .unwrap_err();
        assert_matches!(
            err,
            AgentError::Rejected {
                code: RejectCode::DestinationInvalid,
                ..
            }
        );
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed() {
        let canister = InMemoryCanister::new();
        canister.fail_next(AgentError::Transport("reset".into()));

        let arg = get_thread("c1", None, 1);
        assert!(canister
            .query(&canister.principal(), methods::GET_THREAD, arg.clone())
            .await
            .is_err());
        assert!(canister
            .query(&canister.principal(), methods::GET_THREAD, arg)
            .await
            .is_ok());
        assert_eq!(canister.call_count(), 2);
    }

    #[tokio::test]
    async fn test_channel_hold_parks_only_that_channel() {
        let canister = InMemoryCanister::new();
        canister.insert_comment("c1", "a", "x");
        canister.insert_comment("c2", "b", "y");
        canister.hold_channel("c1");

        let (held, ()) = tokio::join!(fetch(&canister, get_thread("c1", None, 5)), async {
            canister.wait_for_parked(1).await;
            let free = fetch(&canister, get_thread("c2", None, 5)).await;
            assert_eq!(free.comments[0].id, "b");
            assert_eq!(canister.thread_requests().len(), 1);
            canister.release_channel("c1");
        });

        assert_eq!(held.comments[0].id, "a");
        assert_eq!(canister.thread_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_takes_replies() {
        let canister = InMemoryCanister::new();
        canister.insert_comment("c1", "a", "x");
        canister.insert_reply("a", "a1", "y");
        canister.insert_reply("a1", "a1x", "z");

        let arg = candid::encode_one(DeleteCommentArgs {
            channel_id: "c1".into(),
            comment_id: "a".into(),
        })
        .unwrap();
        canister
            .update(&canister.principal(), methods::DELETE_COMMENT, arg)
            .await
            .unwrap();

        assert!(canister.ids_in("c1").is_empty());
        assert!(canister.ids_in("a").is_empty());
        assert!(canister.content_of("a1x").is_none());
    }
}
