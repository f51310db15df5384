//! Action service over the in-memory adapters, checked end to end.

use std::sync::Arc;

use domains::{ActionError, FormData, Partition, PostId, Store};
use integration_tests::memory_actions;
use services::{ActionService, BatchAction, PostStatus, SearchQuery};
use storage_adapters::{MemoryCache, MemoryStore};

struct Harness {
    actions: ActionService,
    store: Arc<MemoryStore>,
    cache: Arc<MemoryCache>,
}

fn harness() -> Harness {
    let (actions, store, cache) = memory_actions();
    Harness {
        actions,
        store,
        cache,
    }
}

fn user_form(name: &str, email: &str, role: &str) -> FormData {
    FormData::new()
        .with("name", name)
        .with("email", email)
        .with("role", role)
}

fn post_form(author: &str, title: &str) -> FormData {
    FormData::new()
        .with("title", title)
        .with("content", "A body that is long enough.")
        .with("authorId", author)
}

#[tokio::test]
async fn ten_thousand_creations_yield_distinct_ids() {
    let h = harness();
    for i in 0..10_000 {
        h.actions
            .create_user(&user_form("Bulk User", &format!("bulk{i}@example.com"), "user"))
            .await
            .unwrap();
    }

    let users = h.store.list_users().await.unwrap();
    let ids: std::collections::HashSet<_> = users.iter().map(|u| u.id.clone()).collect();
    assert_eq!(users.len(), 10_000);
    assert_eq!(ids.len(), 10_000);
}

#[tokio::test]
async fn second_user_with_the_same_email_conflicts() {
    let h = harness();
    h.actions
        .create_user(&user_form("Ada", "ada@example.com", "user"))
        .await
        .unwrap();

    let err = h
        .actions
        .create_user(&user_form("Not Ada", "ada@example.com", "admin"))
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::Conflict(_)));
    assert_eq!(h.store.list_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_creates_admit_exactly_one_email() {
    let h = harness();
    let tasks: Vec<_> = (0..12)
        .map(|i| {
            let actions = h.actions.clone();
            tokio::spawn(async move {
                actions
                    .create_user(&user_form(&format!("User {i}"), "race@example.com", "user"))
                    .await
            })
        })
        .collect();

    let mut created = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => created += 1,
            Err(ActionError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(created, 1);
}

#[tokio::test]
async fn updates_keep_emails_unique_and_bump_timestamps() {
    let h = harness();
    let ada = h
        .actions
        .create_user(&user_form("Ada", "ada@example.com", "user"))
        .await
        .unwrap();
    h.actions
        .create_user(&user_form("Grace", "grace@example.com", "user"))
        .await
        .unwrap();

    let taken = FormData::new().with("email", "grace@example.com");
    let err = h.actions.update_user(&ada.id, &taken).await.unwrap_err();
    assert!(matches!(err, ActionError::Conflict(_)));

    let err = h
        .actions
        .update_user(&ada.id, &FormData::new())
        .await
        .unwrap_err();
    assert!(err.field_errors().unwrap().contains("form"));

    let renamed = h
        .actions
        .update_user(&ada.id, &FormData::new().with("name", "Ada L.").with("role", "admin"))
        .await
        .unwrap();
    assert_eq!(renamed.name, "Ada L.");
    assert_eq!(renamed.email, "ada@example.com");
    assert!(renamed.updated_at > ada.updated_at);
    assert!(h.cache.is_stale(&Partition::path(format!("/users/{}", ada.id))));

    let err = h
        .actions
        .update_user(&domains::UserId::from("user_0_missing"), &FormData::new().with("name", "Nobody"))
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::NotFound(_)));
}

#[tokio::test]
async fn concurrent_user_and_profile_updates_both_land() {
    let h = harness();
    let ada = h
        .actions
        .create_user(&user_form("Ada", "ada@example.com", "user"))
        .await
        .unwrap();

    for round in 0..20u8 {
        let rename = {
            let actions = h.actions.clone();
            let id = ada.id.clone();
            tokio::spawn(async move {
                let form = FormData::new().with("name", format!("Ada {round}"));
                actions.update_user(&id, &form).await
            })
        };
        let profile = {
            let actions = h.actions.clone();
            let id = ada.id.clone();
            tokio::spawn(async move {
                let form = FormData::new()
                    .with("age", 20.0 + f64::from(round))
                    .with("newsletter", true)
                    .with("theme", "dark")
                    .with("language", "en");
                actions.update_profile(&id, &form).await
            })
        };
        rename.await.unwrap().unwrap();
        profile.await.unwrap().unwrap();

        let stored = h.store.get_user(&ada.id).await.unwrap().unwrap();
        assert_eq!(stored.name, format!("Ada {round}"));
        assert_eq!(stored.profile.unwrap().age, 20 + round);
    }
}

#[tokio::test]
async fn post_title_and_content_limits() {
    let h = harness();
    let author = h
        .actions
        .create_user(&user_form("Writer", "writer@example.com", "user"))
        .await
        .unwrap();
    let author = author.id.as_str();

    let empty_title = post_form(author, "");
    let err = h.actions.create_post(&empty_title).await.unwrap_err();
    assert!(err.field_errors().unwrap().contains("title"));

    let long_title = post_form(author, &"x".repeat(101));
    let err = h.actions.create_post(&long_title).await.unwrap_err();
    assert!(err.field_errors().unwrap().contains("title"));

    let short_body = post_form(author, "Fine").with("content", "too short");
    let err = h.actions.create_post(&short_body).await.unwrap_err();
    assert_eq!(
        err.field_errors().unwrap().get("content"),
        Some(&["Content must be at least 10 characters".to_owned()][..])
    );

    let edge = post_form(author, &"x".repeat(100)).with("content", "x".repeat(10));
    assert!(h.actions.create_post(&edge).await.is_ok());
}

#[tokio::test]
async fn toggling_twice_restores_the_flag() {
    let h = harness();
    let author = h
        .actions
        .create_user(&user_form("Writer", "toggle@example.com", "user"))
        .await
        .unwrap();
    let post = h
        .actions
        .create_post(&post_form(author.id.as_str(), "Toggle me"))
        .await
        .unwrap();
    assert!(!post.published);

    let once = h.actions.toggle_post_status(&post.id).await.unwrap();
    let twice = h.actions.toggle_post_status(&post.id).await.unwrap();
    assert!(once.published);
    assert!(!twice.published);
    assert!(post.updated_at < once.updated_at);
    assert!(once.updated_at < twice.updated_at);
}

#[tokio::test]
async fn deleting_a_user_removes_exactly_their_authored_records() {
    let h = harness();
    let author = h
        .actions
        .create_user(&user_form("Author", "author@example.com", "user"))
        .await
        .unwrap();
    let other = h
        .actions
        .create_user(&user_form("Other", "other@example.com", "user"))
        .await
        .unwrap();
    let theirs = h
        .actions
        .create_post(&post_form(author.id.as_str(), "Theirs"))
        .await
        .unwrap();
    let mine = h
        .actions
        .create_post(&post_form(other.id.as_str(), "Mine"))
        .await
        .unwrap();

    for (post, by) in [(&theirs, &other), (&mine, &author), (&mine, &other)] {
        let form = FormData::new()
            .with("content", "hello")
            .with("postId", post.id.as_str())
            .with("authorId", by.id.as_str());
        h.actions.create_comment(&form).await.unwrap();
    }

    let report = h.actions.delete_user(&author.id).await.unwrap();
    assert_eq!(report.users, 1);
    assert_eq!(report.posts, 1);
    assert_eq!(report.comments, 1);

    let posts = h.store.list_posts().await.unwrap();
    let comments = h.store.list_comments().await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(comments.len(), 2);
    assert!(comments.iter().all(|c| c.author_id == other.id));
    // The other user's comment on the removed post is left in place.
    assert!(comments.iter().any(|c| c.post_id == theirs.id));
}

#[tokio::test]
async fn comments_need_existing_parents() {
    let h = harness();
    let form = FormData::new()
        .with("content", "hello")
        .with("postId", "post_0_missing")
        .with("authorId", "user_0_missing");
    let err = h.actions.create_comment(&form).await.unwrap_err();
    assert!(matches!(err, ActionError::MissingParent(_)));
}

#[tokio::test]
async fn non_admins_cannot_delete_users() {
    let h = harness();
    let member = h
        .actions
        .create_user(&user_form("Member", "member@example.com", "user"))
        .await
        .unwrap();
    let admin = h
        .actions
        .create_user(&user_form("Admin", "admin@example.com", "admin"))
        .await
        .unwrap();

    let err = h
        .actions
        .admin_delete_user(&member.id, &admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::Forbidden(_)));

    h.actions
        .admin_delete_user(&admin.id, &member.id)
        .await
        .unwrap();
    assert!(h.store.get_user(&member.id).await.unwrap().is_none());
}

#[tokio::test]
async fn batch_keeps_going_past_failures() {
    let h = harness();
    let author = h
        .actions
        .create_user(&user_form("Batcher", "batch@example.com", "user"))
        .await
        .unwrap();
    let mut ids = Vec::new();
    for title in ["a", "b"] {
        let post = h
            .actions
            .create_post(&post_form(author.id.as_str(), title))
            .await
            .unwrap();
        ids.push(post.id);
    }
    ids.insert(1, PostId::from("post_0_missing"));

    let outcome = h
        .actions
        .batch_process(&ids, BatchAction::Delete)
        .await
        .unwrap();
    assert_eq!(outcome.processed, 2);
    assert_eq!(outcome.failed, 1);
    assert!(outcome.errors[0].starts_with("item post_0_missing:"));
    assert!(h.store.list_posts().await.unwrap().is_empty());
}

#[tokio::test]
async fn search_by_status_and_author() {
    let h = harness();
    let a = h
        .actions
        .create_user(&user_form("Alpha", "alpha@example.com", "user"))
        .await
        .unwrap();
    let b = h
        .actions
        .create_user(&user_form("Beta", "beta@example.com", "user"))
        .await
        .unwrap();
    let published = h
        .actions
        .create_post(&post_form(a.id.as_str(), "Out").with("published", true))
        .await
        .unwrap();
    h.actions
        .create_post(&post_form(a.id.as_str(), "Draft"))
        .await
        .unwrap();
    h.actions
        .create_post(&post_form(b.id.as_str(), "Other"))
        .await
        .unwrap();

    let query = SearchQuery {
        status: Some(PostStatus::Published),
        author_id: Some(a.id.clone()),
        ..SearchQuery::default()
    };
    let page = h.actions.search_posts(&query).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.results[0].id, published.id);
}

#[tokio::test]
async fn creating_a_post_invalidates_the_listing_partitions() {
    let h = harness();
    let author = h
        .actions
        .create_user(&user_form("Cacher", "cache@example.com", "user"))
        .await
        .unwrap();

    for partition in ["/dashboard", "/posts"] {
        h.actions.revalidated(&Partition::path(partition));
    }
    h.actions.revalidated(&Partition::tag("posts"));

    h.actions
        .create_post(&post_form(author.id.as_str(), "Fresh"))
        .await
        .unwrap();

    assert!(h.cache.is_stale(&Partition::path("/dashboard")));
    assert!(h.cache.is_stale(&Partition::path("/posts")));
    assert!(h.cache.is_stale(&Partition::tag("posts")));
    assert!(h.cache.is_stale(&Partition::tag("dashboard")));
}
