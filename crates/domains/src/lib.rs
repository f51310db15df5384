//! # domains
//!
//! Entities, the action error taxonomy, form input, validation rules and the
//! port traits every adapter implements. Nothing in here performs I/O.

pub mod error;
pub mod form;
pub mod models;
pub mod ports;
pub mod validation;

// Re-exporting for easier access in other crates
pub use error::*;
pub use form::*;
pub use models::*;
pub use ports::*;
pub use validation::*;
