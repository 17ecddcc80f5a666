//! Server-rendered views for the public site.

pub mod views;
