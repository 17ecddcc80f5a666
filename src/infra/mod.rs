//! Infrastructure adapters and runtime bootstrap.

pub mod auth;
pub mod contact;
pub mod db;
pub mod error;
pub mod http;
pub mod storage;
pub mod telemetry;
