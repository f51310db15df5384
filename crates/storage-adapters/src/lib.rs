//! # storage-adapters
//!
//! Process-local implementations of the storage and cache ports. All state is
//! lost on restart.

pub mod cache;
pub mod memory;

pub use cache::MemoryCache;
pub use memory::MemoryStore;
