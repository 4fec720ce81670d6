//! SQLite-backed cache generations for intercepted responses.
//!
//! This module provides the persistent store behind every cache generation,
//! using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named generations (static and dynamic) that are dropped wholesale
//! - Request-addressed entries keyed by SHA-256 of method and URL
//! - Automatic schema migrations
//! - Oldest-first trimming of a generation

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CacheKey;
pub use generations::{CacheGeneration, CachePurpose};
pub use storage::{Cache, CacheStorage};
