//! Application services layer.

pub mod auth;
pub mod error;
pub mod loader;
pub mod notify;
pub mod questions;
pub mod repos;
