//! Domain layer types and invariants.

pub mod contact;
pub mod content;
pub mod entities;
pub mod error;
