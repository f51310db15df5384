//! `/api` routes: one handler per action, every response in the
//! `ActionResult` envelope.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use domains::{Partition, PostId, UserId};
use serde::Deserialize;
use services::{BatchAction, SearchQuery};

use crate::respond::{bad_request, respond, ActionForm};
use crate::AppState;

/// Header naming the acting user for role-gated deletes.
pub const ACTOR_HEADER: &str = "x-actor-id";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route("/users/{id}", patch(update_user).delete(delete_user))
        .route("/users/{id}/profile", put(update_profile))
        .route("/posts", post(create_post).get(list_posts))
        .route("/posts/search", get(search_posts))
        .route("/posts/batch", post(batch_process))
        .route("/posts/{id}", get(get_post).delete(delete_post))
        .route("/posts/{id}/toggle", post(toggle_post_status))
        .route("/posts/{id}/comments", get(post_comments))
        .route("/comments", post(create_comment).get(list_comments))
        .route("/cache/stale", get(stale_partitions))
        .route("/cache/revalidate", post(revalidate))
}

async fn create_user(State(state): State<AppState>, ActionForm(form): ActionForm) -> Response {
    respond(state.actions.create_user(&form).await, StatusCode::CREATED)
}

async fn list_users(State(state): State<AppState>) -> Response {
    respond(state.actions.list_users().await, StatusCode::OK)
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ActionForm(form): ActionForm,
) -> Response {
    let id = UserId::from(id);
    respond(state.actions.update_user(&id, &form).await, StatusCode::OK)
}

async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ActionForm(form): ActionForm,
) -> Response {
    let id = UserId::from(id);
    respond(state.actions.update_profile(&id, &form).await, StatusCode::OK)
}

async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let id = UserId::from(id);
    let actor = headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(UserId::from);

    let result = match actor {
        Some(actor) => state.actions.admin_delete_user(&actor, &id).await,
        None => state.actions.delete_user(&id).await,
    };
    respond(result, StatusCode::OK)
}

async fn create_post(State(state): State<AppState>, ActionForm(form): ActionForm) -> Response {
    respond(state.actions.create_post(&form).await, StatusCode::CREATED)
}

async fn list_posts(State(state): State<AppState>) -> Response {
    respond(state.actions.list_posts().await, StatusCode::OK)
}

async fn search_posts(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Response {
    match query {
        Ok(Query(query)) => respond(state.actions.search_posts(&query).await, StatusCode::OK),
        Err(rejection) => bad_request(rejection.body_text()),
    }
}

async fn get_post(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    respond(state.actions.get_post(&PostId::from(id)).await, StatusCode::OK)
}

async fn delete_post(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    respond(state.actions.delete_post(&PostId::from(id)).await, StatusCode::OK)
}

async fn toggle_post_status(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    respond(
        state.actions.toggle_post_status(&PostId::from(id)).await,
        StatusCode::OK,
    )
}

async fn post_comments(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    respond(
        state.actions.post_comments(&PostId::from(id)).await,
        StatusCode::OK,
    )
}

#[derive(Debug, Deserialize)]
struct BatchRequest {
    items: Vec<PostId>,
    action: BatchAction,
}

async fn batch_process(
    State(state): State<AppState>,
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(req)) => respond(
            state.actions.batch_process(&req.items, req.action).await,
            StatusCode::OK,
        ),
        Err(rejection) => bad_request(rejection.body_text()),
    }
}

async fn create_comment(State(state): State<AppState>, ActionForm(form): ActionForm) -> Response {
    respond(state.actions.create_comment(&form).await, StatusCode::CREATED)
}

async fn list_comments(State(state): State<AppState>) -> Response {
    respond(state.actions.list_comments().await, StatusCode::OK)
}

async fn stale_partitions(State(state): State<AppState>) -> Response {
    respond(Ok(state.actions.stale_partitions()), StatusCode::OK)
}

async fn revalidate(
    State(state): State<AppState>,
    body: Result<Json<Partition>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(partition)) => respond(Ok(state.actions.revalidated(&partition)), StatusCode::OK),
        Err(rejection) => bad_request(rejection.body_text()),
    }
}
