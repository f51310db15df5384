//! Shared wiring for the cross-crate tests in `tests/`.

use std::sync::Arc;

use api_adapters::{build_router, AppState, Interceptor};
use axum::Router;
use configs::InterceptorSettings;
use services::ActionService;
use storage_adapters::{MemoryCache, MemoryStore};

/// An action service over fresh in-memory adapters. The adapters are
/// returned as well so tests can inspect them directly.
pub fn memory_actions() -> (ActionService, Arc<MemoryStore>, Arc<MemoryCache>) {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(MemoryCache::new());
    let actions = ActionService::new(store.clone(), cache.clone());
    (actions, store, cache)
}

/// The full router as the binary assembles it.
pub fn router(settings: &InterceptorSettings, secure_cookies: bool) -> Router {
    let (actions, _, _) = memory_actions();
    build_router(AppState::new(
        actions,
        Interceptor::from_settings(settings, secure_cookies),
    ))
}
