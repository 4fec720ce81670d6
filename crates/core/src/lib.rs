//! Core types and shared functionality for harbor.
//!
//! This crate provides:
//! - Cache generations with a SQLite backend
//! - Request/response values seen by the agent
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{Cache, CacheDb, CacheGeneration, CacheKey, CachePurpose, CacheStorage};
pub use config::AppConfig;
pub use error::Error;
pub use http::{AgentRequest, AgentResponse, Method};
