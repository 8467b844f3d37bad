//! Pedium: a Medium-style publishing system built on a block content
//! model, an external document store, and AI-assisted drafting.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod util;
