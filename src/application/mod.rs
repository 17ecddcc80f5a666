//! Application services layer.

pub mod admin;
pub mod contact;
pub mod error;
pub mod feed;
pub mod repos;
pub mod session;
pub mod thumbnails;
