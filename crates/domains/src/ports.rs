//! # Ports
//!
//! Any adapter must implement these traits to be wired into the binary.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Comment, Post, PostId, User, UserId};

/// How many records a cascading delete removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    pub users: usize,
    pub posts: usize,
    pub comments: usize,
}

/// Entity persistence contract.
///
/// Implementations must make each call atomic with respect to other calls:
/// uniqueness and parent-existence checks happen under the same critical
/// section as the write they guard.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    // User Operations

    /// Appends `user`; `Conflict` if another user already has the email.
    async fn insert_user(&self, user: User) -> Result<User>;
    async fn get_user(&self, id: &UserId) -> Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;
    /// Replaces the stored user with the same id, provided its `updated_at`
    /// still equals `expected`. `NotFound`, or `Conflict` on a stale read or a
    /// taken email.
    async fn update_user(&self, user: User, expected: DateTime<Utc>) -> Result<User>;
    /// Removes the user and every post and comment they authored.
    async fn delete_user_cascade(&self, id: &UserId) -> Result<CascadeReport>;

    // Post Operations

    /// Appends `post`; `MissingParent` if the author does not exist.
    async fn insert_post(&self, post: Post) -> Result<Post>;
    async fn get_post(&self, id: &PostId) -> Result<Option<Post>>;
    async fn list_posts(&self) -> Result<Vec<Post>>;
    /// Flips `published` and bumps `updated_at`.
    async fn toggle_published(&self, id: &PostId) -> Result<Post>;
    /// Sets `published` and bumps `updated_at`.
    async fn set_published(&self, id: &PostId, published: bool) -> Result<Post>;
    /// Removes the post and every comment attached to it.
    async fn delete_post_cascade(&self, id: &PostId) -> Result<CascadeReport>;

    // Comment Operations

    /// Appends `comment`; `MissingParent` if the post or author does not exist.
    async fn insert_comment(&self, comment: Comment) -> Result<Comment>;
    async fn list_comments(&self) -> Result<Vec<Comment>>;
    async fn comments_for_post(&self, id: &PostId) -> Result<Vec<Comment>>;
}

/// The kind of mutation that triggered an invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheOp {
    Create,
    Update,
    Delete,
}

/// A named cache partition: a rendered path or a data tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum Partition {
    Path(String),
    Tag(String),
}

impl Partition {
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into())
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "path:{p}"),
            Self::Tag(t) => write!(f, "tag:{t}"),
        }
    }
}

/// A partition marked stale, with the time of the latest invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleEntry {
    pub partition: Partition,
    pub invalidated_at: DateTime<Utc>,
}

/// Marks cache partitions stale so read paths know to rebuild them.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait CacheInvalidator: Send + Sync {
    fn invalidate(&self, partitions: &[Partition]);
    /// Every partition currently stale, oldest invalidation first.
    fn stale(&self) -> Vec<StaleEntry>;
    /// Marks `partition` fresh again. Returns whether it was stale.
    fn clear(&self, partition: &Partition) -> bool;
}
