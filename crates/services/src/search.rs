//! Post search: filtering plus page arithmetic.

use chrono::{DateTime, Utc};
use domains::{ActionError, FieldErrors, Post, Result, UserId};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Published,
    Draft,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Case-insensitive substring matched against title and content.
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default)]
    pub author_id: Option<UserId>,
    #[serde(default)]
    pub date_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage<T> {
    pub results: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub total_pages: u32,
}

impl SearchQuery {
    fn page_and_limit(&self) -> Result<(u32, u32)> {
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);

        let mut errors = FieldErrors::new();
        if page == 0 {
            errors.push("page", "Page must be at least 1");
        }
        if limit == 0 || limit > MAX_LIMIT {
            errors.push("limit", format!("Limit must be between 1 and {MAX_LIMIT}"));
        }
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                errors.push("dateFrom", "Start date must not be after end date");
            }
        }
        if errors.is_empty() {
            Ok((page, limit))
        } else {
            Err(ActionError::Validation(errors))
        }
    }

    pub fn matches(&self, post: &Post) -> bool {
        if let Some(needle) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let needle = needle.to_lowercase();
            if !post.title.to_lowercase().contains(&needle)
                && !post.content.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        match self.status {
            Some(PostStatus::Published) if !post.published => return false,
            Some(PostStatus::Draft) if post.published => return false,
            _ => {}
        }
        if let Some(author) = &self.author_id {
            if &post.author_id != author {
                return false;
            }
        }
        if self.date_from.is_some_and(|from| post.created_at < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| post.created_at > to) {
            return false;
        }
        true
    }

    /// Filters `posts` (kept in store order) and slices out the requested page.
    pub fn run(&self, posts: Vec<Post>) -> Result<SearchPage<Post>> {
        let (page, limit) = self.page_and_limit()?;
        let matched: Vec<Post> = posts.into_iter().filter(|p| self.matches(p)).collect();

        let total = matched.len();
        let total_pages = total.div_ceil(limit as usize) as u32;
        let start = (page as usize - 1).saturating_mul(limit as usize);
        let results = matched.into_iter().skip(start).take(limit as usize).collect();

        Ok(SearchPage {
            results,
            total,
            page,
            total_pages,
        })
    }
}
