//! String-backed identifiers
//!
//! Channel ids, post ids and cursors are opaque strings chosen by the server
//! (or by the client for new posts). Wrapping them keeps call sites from
//! swapping a channel id for a post id.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw string.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the raw string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Unwrap into the raw string.
            pub fn into_inner(self) -> String {
                self.0
            }

            /// Whether the id is empty or whitespace only.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a post, unique within its thread level.
    PostId
);

string_id!(
    /// Namespace containing one root-level thread.
    ChannelId
);

string_id!(
    /// Opaque resume position for the next page fetch.
    Cursor
);

impl From<&PostId> for Cursor {
    fn from(id: &PostId) -> Self {
        Self(id.0.clone())
    }
}
