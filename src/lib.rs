//! Trending Tracker Library
//!
//! Core library for crawling GitHub trending pages, scoring repository
//! activity, and tracking history in SQLite.

pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod notify;
pub mod numbers;
pub mod report;
pub mod score;
pub mod store;
pub mod types;

pub use types::*;
