//! # Action Service
//!
//! Validated entry points that mutate the store and then tell the cache which
//! partitions went stale. Every failure comes back as an [`ActionError`];
//! nothing here panics on bad input.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    next_timestamp, ActionError, CacheInvalidator, CacheOp, CascadeReport, Comment, CommentId,
    EntityKind, FieldErrors, FormData, Partition, Post, PostId, Result, Role, StaleEntry, Store,
    User, UserId, ADMIN_ONLY, AUTHOR_MISSING, EMAIL_TAKEN, POST_MISSING, USER_CHANGED,
    USER_MISSING,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::invalidation::partitions_for;
use crate::schemas;
use crate::search::{SearchPage, SearchQuery};

/// Read-modify-write cycles tried before a contended user update gives up.
pub const UPDATE_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchAction {
    Delete,
    Publish,
    Archive,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub processed: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// The action layer. Cheap to clone; the store and cache are shared.
#[derive(Clone)]
pub struct ActionService {
    store: Arc<dyn Store>,
    cache: Arc<dyn CacheInvalidator>,
}

impl ActionService {
    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn CacheInvalidator>) -> Self {
        Self { store, cache }
    }

    fn invalidate(&self, op: CacheOp, kind: EntityKind, id: Option<&str>) {
        let partitions = partitions_for(op, kind, id);
        debug!(?op, %kind, count = partitions.len(), "invalidating cache partitions");
        self.cache.invalidate(&partitions);
    }

    // ── Users ───────────────────────────────────────────────────────────────

    pub async fn create_user(&self, form: &FormData) -> Result<User> {
        let input =
            schemas::new_user(form).inspect_err(|e| debug!(error = %e, "create_user rejected"))?;

        // Early out; the store repeats the check atomically with the insert.
        if self.store.find_user_by_email(&input.email).await?.is_some() {
            debug!(email = %input.email, "create_user: duplicate email");
            return Err(ActionError::Conflict(EMAIL_TAKEN.into()));
        }

        let now = Utc::now();
        let user = self
            .store
            .insert_user(User {
                id: UserId::generate(),
                name: input.name,
                email: input.email,
                role: input.role,
                profile: None,
                created_at: now,
                updated_at: now,
            })
            .await?;

        self.invalidate(CacheOp::Create, EntityKind::User, Some(user.id.as_str()));
        info!(user_id = %user.id, role = ?user.role, "user created");
        Ok(user)
    }

    pub async fn update_user(&self, id: &UserId, form: &FormData) -> Result<User> {
        let changes = schemas::user_changes(form)?;
        if changes.is_empty() {
            let mut errors = FieldErrors::new();
            errors.push("form", "No changes were supplied");
            return Err(ActionError::Validation(errors));
        }
        if let Some(email) = &changes.email {
            if let Some(holder) = self.store.find_user_by_email(email).await? {
                if &holder.id != id {
                    return Err(ActionError::Conflict(EMAIL_TAKEN.into()));
                }
            }
        }

        let user = self
            .modify_user(id, |user| {
                if let Some(name) = &changes.name {
                    user.name = name.clone();
                }
                if let Some(email) = &changes.email {
                    user.email = email.clone();
                }
                if let Some(role) = changes.role {
                    user.role = role;
                }
            })
            .await?;

        self.invalidate(CacheOp::Update, EntityKind::User, Some(user.id.as_str()));
        info!(user_id = %user.id, "user updated");
        Ok(user)
    }

    pub async fn update_profile(&self, id: &UserId, form: &FormData) -> Result<User> {
        let profile = schemas::profile(form)?;
        let user = self
            .modify_user(id, |user| user.profile = Some(profile.clone()))
            .await?;

        self.invalidate(CacheOp::Update, EntityKind::User, Some(user.id.as_str()));
        info!(user_id = %user.id, "profile updated");
        Ok(user)
    }

    /// Read, apply `change`, write back conditioned on the read's `updated_at`.
    /// A concurrent writer in between makes the store refuse the write, and
    /// the cycle starts again from a fresh read.
    async fn modify_user(&self, id: &UserId, change: impl Fn(&mut User)) -> Result<User> {
        let mut attempt = 1;
        loop {
            let mut user = self.require_user(id).await?;
            let read_at = user.updated_at;
            change(&mut user);
            user.updated_at = next_timestamp(read_at);

            match self.store.update_user(user, read_at).await {
                Err(ActionError::Conflict(msg))
                    if msg == USER_CHANGED && attempt < UPDATE_ATTEMPTS =>
                {
                    debug!(user_id = %id, attempt, "user changed underneath update, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Deletes the user together with their posts and comments.
    pub async fn delete_user(&self, id: &UserId) -> Result<CascadeReport> {
        let report = self.store.delete_user_cascade(id).await?;

        self.invalidate(CacheOp::Delete, EntityKind::User, Some(id.as_str()));
        if report.posts > 0 {
            self.invalidate(CacheOp::Delete, EntityKind::Post, None);
        }
        if report.comments > 0 {
            self.invalidate(CacheOp::Delete, EntityKind::Comment, None);
        }
        info!(user_id = %id, posts = report.posts, comments = report.comments, "user deleted");
        Ok(report)
    }

    /// [`Self::delete_user`] gated on the acting user being an administrator.
    pub async fn admin_delete_user(&self, actor: &UserId, id: &UserId) -> Result<CascadeReport> {
        let allowed = matches!(
            self.store.get_user(actor).await?,
            Some(User { role: Role::Admin, .. })
        );
        if !allowed {
            warn!(actor = %actor, target = %id, "non-admin attempted user deletion");
            return Err(ActionError::Forbidden(ADMIN_ONLY.into()));
        }
        self.delete_user(id).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.store.list_users().await
    }

    async fn require_user(&self, id: &UserId) -> Result<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| ActionError::NotFound(USER_MISSING.into()))
    }

    // ── Posts ───────────────────────────────────────────────────────────────

    pub async fn create_post(&self, form: &FormData) -> Result<Post> {
        let input =
            schemas::new_post(form).inspect_err(|e| debug!(error = %e, "create_post rejected"))?;

        if self.store.get_user(&input.author_id).await?.is_none() {
            return Err(ActionError::MissingParent(AUTHOR_MISSING.into()));
        }

        let now = Utc::now();
        let post = self
            .store
            .insert_post(Post {
                id: PostId::generate(),
                title: input.title,
                content: input.content,
                author_id: input.author_id,
                published: input.published,
                created_at: now,
                updated_at: now,
            })
            .await?;

        self.invalidate(CacheOp::Create, EntityKind::Post, Some(post.id.as_str()));
        info!(post_id = %post.id, author_id = %post.author_id, "post created");
        Ok(post)
    }

    /// Deletes the post and its comments.
    pub async fn delete_post(&self, id: &PostId) -> Result<CascadeReport> {
        let report = self.store.delete_post_cascade(id).await?;
        self.invalidate(CacheOp::Delete, EntityKind::Post, Some(id.as_str()));
        if report.comments > 0 {
            self.invalidate(CacheOp::Delete, EntityKind::Comment, None);
        }
        info!(post_id = %id, comments = report.comments, "post deleted");
        Ok(report)
    }

    pub async fn toggle_post_status(&self, id: &PostId) -> Result<Post> {
        let post = self.store.toggle_published(id).await?;
        self.invalidate(CacheOp::Update, EntityKind::Post, Some(id.as_str()));
        info!(post_id = %id, published = post.published, "post status toggled");
        Ok(post)
    }

    pub async fn set_post_status(&self, id: &PostId, published: bool) -> Result<Post> {
        let post = self.store.set_published(id, published).await?;
        self.invalidate(CacheOp::Update, EntityKind::Post, Some(id.as_str()));
        info!(post_id = %id, published, "post status set");
        Ok(post)
    }

    /// Applies `action` to each post in turn. A failing item is recorded and
    /// the batch moves on.
    pub async fn batch_process(&self, ids: &[PostId], action: BatchAction) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        for id in ids {
            let result = match action {
                BatchAction::Delete => self.delete_post(id).await.map(|_| ()),
                BatchAction::Publish => self.set_post_status(id, true).await.map(|_| ()),
                BatchAction::Archive => self.set_post_status(id, false).await.map(|_| ()),
            };
            match result {
                Ok(()) => outcome.processed += 1,
                Err(err) => {
                    outcome.failed += 1;
                    let reason = err
                        .message()
                        .map(str::to_owned)
                        .unwrap_or_else(|| err.to_string());
                    outcome.errors.push(format!("item {id}: {reason}"));
                }
            }
        }
        info!(?action, processed = outcome.processed, failed = outcome.failed, "batch finished");
        Ok(outcome)
    }

    pub async fn search_posts(&self, query: &SearchQuery) -> Result<SearchPage<Post>> {
        let posts = self.store.list_posts().await?;
        query.run(posts)
    }

    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        self.store.list_posts().await
    }

    pub async fn get_post(&self, id: &PostId) -> Result<Post> {
        self.store
            .get_post(id)
            .await?
            .ok_or_else(|| ActionError::NotFound(POST_MISSING.into()))
    }

    pub async fn post_comments(&self, id: &PostId) -> Result<Vec<Comment>> {
        self.store.comments_for_post(id).await
    }

    // ── Comments ────────────────────────────────────────────────────────────

    pub async fn create_comment(&self, form: &FormData) -> Result<Comment> {
        let input =
            schemas::new_comment(form).inspect_err(|e| debug!(error = %e, "create_comment rejected"))?;
        let post_id = PostId::from(input.post_id);

        if self.store.get_post(&post_id).await?.is_none() {
            return Err(ActionError::MissingParent(POST_MISSING.into()));
        }
        if self.store.get_user(&input.author_id).await?.is_none() {
            return Err(ActionError::MissingParent(AUTHOR_MISSING.into()));
        }

        let now = Utc::now();
        let comment = self
            .store
            .insert_comment(Comment {
                id: CommentId::generate(),
                content: input.content,
                post_id,
                author_id: input.author_id,
                created_at: now,
                updated_at: now,
            })
            .await?;

        self.invalidate(CacheOp::Create, EntityKind::Comment, Some(comment.id.as_str()));
        self.cache
            .invalidate(&[Partition::path(format!("/posts/{}", comment.post_id))]);
        info!(comment_id = %comment.id, post_id = %comment.post_id, "comment created");
        Ok(comment)
    }

    pub async fn list_comments(&self) -> Result<Vec<Comment>> {
        self.store.list_comments().await
    }

    // ── Cache ───────────────────────────────────────────────────────────────

    pub fn stale_partitions(&self) -> Vec<StaleEntry> {
        self.cache.stale()
    }

    /// Marks a partition fresh, as a reader would after rebuilding it.
    pub fn revalidated(&self, partition: &Partition) -> bool {
        self.cache.clear(partition)
    }
}
