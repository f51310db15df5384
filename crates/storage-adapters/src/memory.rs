//! # In-memory Store
//!
//! Three insertion-ordered collections behind one `RwLock`. Every port call
//! takes the lock once, so uniqueness and parent checks cannot interleave
//! with another writer's insert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    next_timestamp, ActionError, CascadeReport, Comment, Post, PostId, Result, Store, User,
    UserId, AUTHOR_MISSING, EMAIL_TAKEN, POST_MISSING, USER_CHANGED, USER_MISSING,
};
use tokio::sync::RwLock;
use tracing::trace;

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
}

impl Tables {
    fn user_exists(&self, id: &UserId) -> bool {
        self.users.iter().any(|u| &u.id == id)
    }

    fn email_taken(&self, email: &str, except: Option<&UserId>) -> bool {
        self.users
            .iter()
            .any(|u| u.email == email && Some(&u.id) != except)
    }

    fn post_mut(&mut self, id: &PostId) -> Result<&mut Post> {
        self.posts
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| ActionError::NotFound(POST_MISSING.into()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&user.email, None) {
            return Err(ActionError::Conflict(EMAIL_TAKEN.into()));
        }
        trace!(user_id = %user.id, "insert user");
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| &u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.tables.read().await.users.clone())
    }

    async fn update_user(&self, user: User, expected: DateTime<Utc>) -> Result<User> {
        let mut tables = self.tables.write().await;
        let index = tables
            .users
            .iter()
            .position(|u| u.id == user.id)
            .ok_or_else(|| ActionError::NotFound(USER_MISSING.into()))?;
        if tables.users[index].updated_at != expected {
            trace!(user_id = %user.id, "stale user write refused");
            return Err(ActionError::Conflict(USER_CHANGED.into()));
        }
        if tables.email_taken(&user.email, Some(&user.id)) {
            return Err(ActionError::Conflict(EMAIL_TAKEN.into()));
        }
        tables.users[index] = user.clone();
        Ok(user)
    }

    async fn delete_user_cascade(&self, id: &UserId) -> Result<CascadeReport> {
        let mut tables = self.tables.write().await;
        let index = tables
            .users
            .iter()
            .position(|u| &u.id == id)
            .ok_or_else(|| ActionError::NotFound(USER_MISSING.into()))?;
        tables.users.remove(index);

        let posts_before = tables.posts.len();
        tables.posts.retain(|p| &p.author_id != id);
        let comments_before = tables.comments.len();
        tables.comments.retain(|c| &c.author_id != id);

        Ok(CascadeReport {
            users: 1,
            posts: posts_before - tables.posts.len(),
            comments: comments_before - tables.comments.len(),
        })
    }

    async fn insert_post(&self, post: Post) -> Result<Post> {
        let mut tables = self.tables.write().await;
        if !tables.user_exists(&post.author_id) {
            return Err(ActionError::MissingParent(AUTHOR_MISSING.into()));
        }
        trace!(post_id = %post.id, "insert post");
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn get_post(&self, id: &PostId) -> Result<Option<Post>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|p| &p.id == id).cloned())
    }

    async fn list_posts(&self) -> Result<Vec<Post>> {
        Ok(self.tables.read().await.posts.clone())
    }

    async fn toggle_published(&self, id: &PostId) -> Result<Post> {
        let mut tables = self.tables.write().await;
        let post = tables.post_mut(id)?;
        post.published = !post.published;
        post.updated_at = next_timestamp(post.updated_at);
        Ok(post.clone())
    }

    async fn set_published(&self, id: &PostId, published: bool) -> Result<Post> {
        let mut tables = self.tables.write().await;
        let post = tables.post_mut(id)?;
        post.published = published;
        post.updated_at = next_timestamp(post.updated_at);
        Ok(post.clone())
    }

    async fn delete_post_cascade(&self, id: &PostId) -> Result<CascadeReport> {
        let mut tables = self.tables.write().await;
        let index = tables
            .posts
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| ActionError::NotFound(POST_MISSING.into()))?;
        tables.posts.remove(index);

        let before = tables.comments.len();
        tables.comments.retain(|c| &c.post_id != id);

        Ok(CascadeReport {
            users: 0,
            posts: 1,
            comments: before - tables.comments.len(),
        })
    }

    async fn insert_comment(&self, comment: Comment) -> Result<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.posts.iter().any(|p| p.id == comment.post_id) {
            return Err(ActionError::MissingParent(POST_MISSING.into()));
        }
        if !tables.user_exists(&comment.author_id) {
            return Err(ActionError::MissingParent(AUTHOR_MISSING.into()));
        }
        trace!(comment_id = %comment.id, "insert comment");
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self) -> Result<Vec<Comment>> {
        Ok(self.tables.read().await.comments.clone())
    }

    async fn comments_for_post(&self, id: &PostId) -> Result<Vec<Comment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .iter()
            .filter(|c| &c.post_id == id)
            .cloned()
            .collect())
    }
}
