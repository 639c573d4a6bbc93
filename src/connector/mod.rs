//! # Connector Layer
//!
//! External integrations and transport:
//! - Adapters for the embedding, generation, and extraction collaborators
//! - Storage (vector index, corpus metadata, ingestion checkpoints)
//! - The TCP serving surface (framing, routing, sessions, rate limiting)

pub mod adapter;
pub mod api;
pub mod storage;

pub use adapter::*;
pub use api::*;
pub use storage::*;
