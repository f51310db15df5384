//! HTTP surface for actionboard.
//!
//! Two halves share one router: the JSON action endpoints under `/api` and a
//! handful of HTML pages. Every request not under an excluded prefix runs
//! through the [`interceptor`] chain first.

pub mod actions;
pub mod interceptor;
pub mod pages;
pub mod respond;

use std::sync::Arc;

use axum::http::{StatusCode, Uri};
use axum::middleware::from_fn_with_state;
use axum::response::IntoResponse;
use axum::Router;
use services::ActionService;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub use interceptor::Interceptor;

#[derive(Clone)]
pub struct AppState {
    pub actions: ActionService,
    pub interceptor: Arc<Interceptor>,
}

impl AppState {
    pub fn new(actions: ActionService, interceptor: Interceptor) -> Self {
        Self {
            actions,
            interceptor: Arc::new(interceptor),
        }
    }
}

/// Assembles pages, `/api` and the middleware stack.
///
/// The fallback is registered before the interceptor layer so unrouted paths
/// such as unknown `/protected/*` pages still pass through the chain.
pub fn build_router(state: AppState) -> Router {
    let chain = Arc::clone(&state.interceptor);

    Router::new()
        .merge(pages::routes())
        .nest("/api", actions::routes())
        .fallback(not_found)
        .layer(from_fn_with_state(chain, interceptor::intercept))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    (StatusCode::NOT_FOUND, format!("no route for {}", uri.path()))
}
