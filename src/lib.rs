//! qanda: a Q&A backend with a cached single-question read path and
//! real-time change notices.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
