//! Cache inspection tools.
//!
//! These operate on the agent's current generations only.

pub mod get;
pub mod purge;

pub use get::{CacheGetParams, get_impl};
pub use purge::{CachePurgeParams, purge_impl};
