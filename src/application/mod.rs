//! # Application Layer
//!
//! Use cases and the collaborator interfaces they are wired against.

pub mod interfaces;
pub mod use_cases;

pub use interfaces::*;
pub use use_cases::*;
