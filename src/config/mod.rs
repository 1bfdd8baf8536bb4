//! Configuration module for sprite2gif
//!
//! Provides types and parsing for `sprite2gif.toml` conversion defaults.

pub mod loader;
pub mod schema;

pub use schema::*;
