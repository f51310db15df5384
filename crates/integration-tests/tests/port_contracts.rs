//! The action service against mocked ports: what it asks of the store and
//! which partitions it hands the cache.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    ActionError, CascadeReport, FormData, MockCacheInvalidator, MockStore, Partition, Post,
    PostId, UserId,
};
use mockall::predicate::eq;
use services::ActionService;

fn post(id: &str, published: bool) -> Post {
    Post {
        id: PostId::from(id),
        title: "t".into(),
        content: "0123456789".into(),
        author_id: UserId::from("user_1"),
        published,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn store_failures_surface_without_invalidating() {
    let mut store = MockStore::new();
    store
        .expect_find_user_by_email()
        .returning(|_| Err(ActionError::Internal("disk on fire".into())));
    let mut cache = MockCacheInvalidator::new();
    cache.expect_invalidate().never();

    let actions = ActionService::new(Arc::new(store), Arc::new(cache));
    let form = FormData::new()
        .with("name", "Ada")
        .with("email", "ada@example.com")
        .with("role", "user");

    let err = actions.create_user(&form).await.unwrap_err();
    assert_eq!(err, ActionError::Internal("disk on fire".into()));
}

#[tokio::test]
async fn invalid_forms_never_reach_the_store() {
    let store = MockStore::new();
    let cache = MockCacheInvalidator::new();
    let actions = ActionService::new(Arc::new(store), Arc::new(cache));

    let err = actions
        .create_post(&FormData::new().with("title", "only a title"))
        .await
        .unwrap_err();
    let errors = err.field_errors().expect("validation error");
    assert!(errors.contains("content"));
    assert!(errors.contains("authorId"));
}

#[tokio::test]
async fn toggle_invalidates_the_post_detail_and_listing() {
    let mut store = MockStore::new();
    store
        .expect_toggle_published()
        .with(eq(PostId::from("post_7")))
        .times(1)
        .returning(|id| Ok(post(id.as_str(), true)));

    let mut cache = MockCacheInvalidator::new();
    cache
        .expect_invalidate()
        .withf(|partitions| {
            partitions
                == [
                    Partition::path("/posts/post_7"),
                    Partition::path("/posts"),
                    Partition::tag("posts"),
                ]
        })
        .times(1)
        .return_const(());

    let actions = ActionService::new(Arc::new(store), Arc::new(cache));
    let toggled = actions
        .toggle_post_status(&PostId::from("post_7"))
        .await
        .unwrap();
    assert!(toggled.published);
}

#[tokio::test]
async fn post_delete_without_comments_touches_only_post_partitions() {
    let mut store = MockStore::new();
    store
        .expect_delete_post_cascade()
        .with(eq(PostId::from("post_1")))
        .returning(|_| {
            Ok(CascadeReport {
                users: 0,
                posts: 1,
                comments: 0,
            })
        });

    let mut cache = MockCacheInvalidator::new();
    cache
        .expect_invalidate()
        .withf(|partitions| partitions.contains(&Partition::tag("posts")))
        .times(1)
        .return_const(());

    let actions = ActionService::new(Arc::new(store), Arc::new(cache));
    let report = actions.delete_post(&PostId::from("post_1")).await.unwrap();
    assert_eq!(report.posts, 1);
}

#[test]
fn missing_post_lookup_is_not_found() {
    let mut store = MockStore::new();
    store
        .expect_get_post()
        .with(eq(PostId::from("post_404")))
        .times(1)
        .returning(|_| Ok(None));
    let actions = ActionService::new(Arc::new(store), Arc::new(MockCacheInvalidator::new()));

    let err = tokio_test::block_on(actions.get_post(&PostId::from("post_404"))).unwrap_err();
    assert!(matches!(err, ActionError::NotFound(_)));
}
