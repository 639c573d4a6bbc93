//! # Domain Layer
//!
//! Core models, the chunker, and the error taxonomy. This layer is
//! independent of transport and infrastructure.

pub mod chunker;
pub mod error;
pub mod models;

pub use error::DomainError;
pub use models::*;
