//! Domain layer types and invariants.

pub mod blocks;
pub mod document;
pub mod entities;
pub mod extract;
pub mod seed;
pub mod types;
