//! Pagination locators
//!
//! A [`Locator`] names one independently paginated level of a thread: the
//! root, or the reply list of a post reached by following a path of post ids
//! from the root.

use crate::ids::{ChannelId, PostId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Path of post ids from the root to the level being addressed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    path: Vec<PostId>,
}

impl Locator {
    /// The root thread of a channel.
    pub fn root() -> Self {
        Self::default()
    }

    /// Reply list of a top-level post.
    pub fn replies_of(post: impl Into<PostId>) -> Self {
        Self {
            path: vec![post.into()],
        }
    }

    /// Locator from an explicit path of post ids.
    pub fn from_path(path: impl IntoIterator<Item = impl Into<PostId>>) -> Self {
        Self {
            path: path.into_iter().map(Into::into).collect(),
        }
    }

    /// Reply list of `post`, which lives at this level.
    #[must_use]
    pub fn child(&self, post: impl Into<PostId>) -> Self {
        let mut path = self.path.clone();
        path.push(post.into());
        Self { path }
    }

    /// Level containing the owner of this level, `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.path.split_last()?;
        Some(Self {
            path: rest.to_vec(),
        })
    }

    /// Whether this is the root thread.
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Post whose replies this level holds.
    pub fn owner(&self) -> Option<&PostId> {
        self.path.last()
    }

    /// Nesting depth; the root is 0.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Ids from the root down to the owner.
    pub fn path(&self) -> &[PostId] {
        &self.path
    }

    /// Channel id the canister expects when fetching this level.
    ///
    /// Root pages are addressed by the channel itself; reply pages by the id
    /// of the post that owns them.
    pub fn fetch_channel(&self, channel: &ChannelId) -> ChannelId {
        match self.owner() {
            Some(owner) => ChannelId::new(owner.as_str()),
            None => channel.clone(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return f.write_str("root");
        }
        let mut first = true;
        for id in &self.path {
            if !first {
                f.write_str("/")?;
            }
            f.write_str(id.as_str())?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root() {
        let root = Locator::root();
        assert!(root.is_root());
        assert_eq!(root.depth(), 0);
        assert!(root.parent().is_none());
        assert_eq!(root.to_string(), "root");
    }

    #[test]
    fn test_child_and_parent() {
        let nested = Locator::replies_of("a").child("a1");
        assert_eq!(nested.depth(), 2);
        assert_eq!(nested.owner().map(PostId::as_str), Some("a1"));
        assert_eq!(nested.parent(), Some(Locator::replies_of("a")));
        assert_eq!(nested, Locator::from_path(["a", "a1"]));
        assert_eq!(nested.to_string(), "a/a1");
    }

    #[test]
    fn test_fetch_channel() {
        let channel = ChannelId::from("c1");
        assert_eq!(Locator::root().fetch_channel(&channel), channel);
        assert_eq!(
            Locator::from_path(["a", "b"]).fetch_channel(&channel),
            ChannelId::from("b")
        );
    }
}
