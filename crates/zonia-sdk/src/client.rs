//! Typed comment canister client
//!
//! [`ZoniaClient`] validates inputs, encodes candid arguments, issues the raw
//! call through a [`CanisterAgent`], decodes the reply and maps it into the
//! local model. Agent failures are normalized into [`ZoniaError`] here and
//! nowhere else.

use crate::agent::{AgentError, CanisterAgent, RejectCode};
use candid::{CandidType, Principal};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use zonia_core::wire::{methods, DeleteCommentArgs, GetThreadArgs, RemotePage, UpsertCommentArgs};
use zonia_core::{map_remote_page, ChannelId, Cursor, Page, PostId, Result, SdkConfig, ZoniaError};

/// Source of client-generated post ids.
pub type IdGenerator = Arc<dyn Fn() -> PostId + Send + Sync>;

fn uuid_post_id() -> PostId {
    PostId::new(uuid::Uuid::new_v4().simple().to_string())
}

// ============================================================================
// Inputs
// ============================================================================

/// Arguments of [`ZoniaClient::get_thread`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetThreadInput {
    /// Channel, or the owning post id when fetching a reply level
    pub channel_id: ChannelId,
    /// Resume after this post
    pub cursor: Option<Cursor>,
    /// Page size; `None` uses the configured default
    pub limit: Option<u32>,
}

impl GetThreadInput {
    /// First page of `channel_id` with the default page size.
    pub fn new(channel_id: impl Into<ChannelId>) -> Self {
        Self {
            channel_id: channel_id.into(),
            cursor: None,
            limit: None,
        }
    }

    /// Resume after `cursor`.
    #[must_use]
    pub fn after(mut self, cursor: Option<Cursor>) -> Self {
        self.cursor = cursor;
        self
    }

    /// Override the page size.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Arguments of [`ZoniaClient::upsert_post`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertPostInput {
    /// Target channel
    pub channel_id: ChannelId,
    /// Parent post when replying
    pub parent_id: Option<PostId>,
    /// Message body
    pub content: String,
    /// Existing post to edit; `None` creates a post with a fresh id
    pub post_id: Option<PostId>,
}

impl UpsertPostInput {
    /// New root-level post.
    pub fn new(channel_id: impl Into<ChannelId>, content: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            parent_id: None,
            content: content.into(),
            post_id: None,
        }
    }

    /// Post as a reply to `parent_id`.
    #[must_use]
    pub fn reply_to(mut self, parent_id: impl Into<PostId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Edit the existing post `post_id`.
    #[must_use]
    pub fn editing(mut self, post_id: impl Into<PostId>) -> Self {
        self.post_id = Some(post_id.into());
        self
    }

    fn validate(&self) -> Result<()> {
        require_channel(&self.channel_id)?;
        if self.content.trim().is_empty() {
            return Err(ZoniaError::invalid("content must not be blank"));
        }
        if self.parent_id.as_ref().is_some_and(PostId::is_blank) {
            return Err(ZoniaError::invalid("parent_id must not be blank"));
        }
        if self.post_id.as_ref().is_some_and(PostId::is_blank) {
            return Err(ZoniaError::invalid("post_id must not be blank"));
        }
        Ok(())
    }
}

/// Arguments of [`ZoniaClient::remove_post`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovePostInput {
    /// Channel holding the post
    pub channel_id: ChannelId,
    /// Post to delete
    pub post_id: PostId,
}

impl RemovePostInput {
    /// Delete `post_id` from `channel_id`.
    pub fn new(channel_id: impl Into<ChannelId>, post_id: impl Into<PostId>) -> Self {
        Self {
            channel_id: channel_id.into(),
            post_id: post_id.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        require_channel(&self.channel_id)?;
        if self.post_id.is_blank() {
            return Err(ZoniaError::invalid("post_id must not be blank"));
        }
        Ok(())
    }
}

fn require_channel(channel_id: &ChannelId) -> Result<()> {
    if channel_id.is_blank() {
        return Err(ZoniaError::invalid("channel_id must not be blank"));
    }
    Ok(())
}

// ============================================================================
// Error normalization
// ============================================================================

/// Map a raw agent failure onto the SDK error taxonomy.
pub fn normalize_agent_error(method: &str, err: AgentError) -> ZoniaError {
    match err {
        AgentError::Transport(reason) => {
            ZoniaError::internal(format!("{method}: transport failed: {reason}"))
        }
        AgentError::Rejected { code, message } => {
            let message = format!("{method}: {message}");
            match code {
                RejectCode::DestinationInvalid => ZoniaError::not_found(message),
                RejectCode::CanisterReject if message.to_lowercase().contains("not found") => {
                    ZoniaError::not_found(message)
                }
                RejectCode::CanisterReject => ZoniaError::invalid(message),
                RejectCode::SysFatal | RejectCode::SysTransient | RejectCode::CanisterError => {
                    ZoniaError::internal(format!("{message} ({code})"))
                }
            }
        }
    }
}

// ============================================================================
// Client
// ============================================================================

#[derive(Clone, Copy)]
enum CallKind {
    Query,
    Update,
}

/// Typed handle to one comment canister. Cheap to clone.
#[derive(Clone)]
pub struct ZoniaClient {
    agent: Arc<dyn CanisterAgent>,
    canister: Principal,
    config: SdkConfig,
    next_id: IdGenerator,
}

impl fmt::Debug for ZoniaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoniaClient")
            .field("canister", &self.canister.to_text())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ZoniaClient {
    /// Create a client. Fails with `InvalidInput` on a malformed config.
    pub fn new(config: SdkConfig, agent: Arc<dyn CanisterAgent>) -> Result<Self> {
        config.validate()?;
        let canister = config.principal()?;
        Ok(Self {
            agent,
            canister,
            config,
            next_id: Arc::new(uuid_post_id),
        })
    }

    /// Replace the post id generator.
    #[must_use]
    pub fn with_id_generator(
        mut self,
        next_id: impl Fn() -> PostId + Send + Sync + 'static,
    ) -> Self {
        self.next_id = Arc::new(next_id);
        self
    }

    /// Configuration this client was built from.
    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// Target canister.
    pub fn canister(&self) -> &Principal {
        &self.canister
    }

    /// Fetch one page of a thread level.
    pub async fn get_thread(&self, input: GetThreadInput) -> Result<Page> {
        require_channel(&input.channel_id)?;
        let limit = input.limit.unwrap_or(self.config.page_limit);
        if limit == 0 {
            return Err(ZoniaError::invalid("limit must be at least 1"));
        }

        let args = GetThreadArgs {
            channel_id: input.channel_id.into_inner(),
            cursor: input.cursor.map(Cursor::into_inner),
            limit,
        };
        debug!(
            channel_id = %args.channel_id,
            cursor = ?args.cursor,
            limit,
            "Fetching thread page"
        );

        let remote: RemotePage = self.call(CallKind::Query, methods::GET_THREAD, args).await?;
        let page = map_remote_page(remote);

        debug!(
            posts = page.len(),
            remaining = page.remaining_count.as_i64(),
            "Fetched thread page"
        );
        Ok(page)
    }

    /// Create or edit a post. Returns the canonical id.
    pub async fn upsert_post(&self, input: UpsertPostInput) -> Result<PostId> {
        input.validate()?;
        let post_id = input.post_id.unwrap_or_else(|| (self.next_id)());

        let args = UpsertCommentArgs {
            channel_id: input.channel_id.into_inner(),
            parent_id: input.parent_id.map(PostId::into_inner),
            message: input.content,
            comment_id: post_id.into_inner(),
        };
        debug!(
            channel_id = %args.channel_id,
            parent_id = ?args.parent_id,
            comment_id = %args.comment_id,
            "Upserting post"
        );

        let id: String = self.call(CallKind::Update, methods::UPSERT_COMMENT, args).await?;
        Ok(PostId::new(id))
    }

    /// Delete a post. Returns the id the canister reports.
    pub async fn remove_post(&self, input: RemovePostInput) -> Result<PostId> {
        input.validate()?;

        let args = DeleteCommentArgs {
            channel_id: input.channel_id.into_inner(),
            comment_id: input.post_id.into_inner(),
        };
        debug!(
            channel_id = %args.channel_id,
            comment_id = %args.comment_id,
            "Removing post"
        );

        let id: String = self.call(CallKind::Update, methods::DELETE_COMMENT, args).await?;
        Ok(PostId::new(id))
    }

    async fn call<A, R>(&self, kind: CallKind, method: &'static str, args: A) -> Result<R>
    where
        A: CandidType,
        R: CandidType + DeserializeOwned,
    {
        let arg = candid::encode_one(args)?;
        let reply = match kind {
            CallKind::Query => self.agent.query(&self.canister, method, arg).await,
            CallKind::Update => self.agent.update(&self.canister, method, arg).await,
        };

        let bytes = reply.map_err(|err| {
            let normalized = normalize_agent_error(method, err);
            warn!(method, kind = %normalized.kind(), error = %normalized, "Canister call failed");
            normalized
        })?;

        candid::decode_one(&bytes).map_err(|err| {
            warn!(method, error = %err, "Undecodable canister reply");
            ZoniaError::from(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonia_core::ErrorKind;

    #[test]
    fn test_reject_normalization() {
        let cases = [
            (
                AgentError::rejected(RejectCode::DestinationInvalid, "no such canister"),
                ErrorKind::NotFound,
            ),
            (
                AgentError::rejected(RejectCode::CanisterReject, "Comment Not Found"),
                ErrorKind::NotFound,
            ),
            (
                AgentError::rejected(RejectCode::CanisterReject, "message too long"),
                ErrorKind::InvalidInput,
            ),
            (AgentError::rejected(RejectCode::CanisterError, "trapped"), ErrorKind::Internal),
            (AgentError::rejected(RejectCode::SysTransient, "busy"), ErrorKind::Internal),
            (AgentError::rejected(RejectCode::SysFatal, "boom"), ErrorKind::Internal),
            (AgentError::Transport("connection reset".into()), ErrorKind::Internal),
        ];
        for (err, expected) in cases {
            let normalized = normalize_agent_error("get_thread", err.clone());
            assert_eq!(normalized.kind(), expected, "{err}");
            assert!(normalized.message().starts_with("get_thread"));
        }
    }

    #[test]
    fn test_upsert_validation() {
        assert!(UpsertPostInput::new("c1", "hi").validate().is_ok());

        let invalid = [
            UpsertPostInput::new("c1", "   "),
            UpsertPostInput::new("", "hi"),
            UpsertPostInput::new("c1", "hi").reply_to(" "),
            UpsertPostInput::new("c1", "hi").editing(""),
        ];
        for input in invalid {
            let err = input.validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{input:?}");
        }
    }

    #[test]
    fn test_remove_validation() {
        assert!(RemovePostInput::new("c1", "p1").validate().is_ok());
        assert!(RemovePostInput::new("c1", "").validate().is_err());
        assert!(RemovePostInput::new(" ", "p1").validate().is_err());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = uuid_post_id();
        let b = uuid_post_id();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }
}
