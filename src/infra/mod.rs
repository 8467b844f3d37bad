//! Infrastructure adapters and runtime bootstrap.

pub mod ai;
pub mod client;
pub mod error;
pub mod identity;
pub mod realtime;
pub mod state;
pub mod storage;
pub mod store;
pub mod telemetry;
