//! # services
//!
//! The action layer: schema validation, mutation through the [`domains::Store`]
//! port, and cache invalidation through [`domains::CacheInvalidator`].

pub mod actions;
pub mod invalidation;
pub mod result;
pub mod schemas;
pub mod search;

pub use actions::{ActionService, BatchAction, BatchOutcome};
pub use invalidation::partitions_for;
pub use result::ActionResult;
pub use search::{PostStatus, SearchPage, SearchQuery};
