//! quillpress: a small blog CMS with a public article site, a public posts API
//! and a session-gated admin API for posts and categories.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
