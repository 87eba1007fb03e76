//! Core types and trait definitions for the Covid Italy monitor.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it.

pub mod clock;
pub mod error;
pub mod filter;
pub mod record;
pub mod store;
pub mod summary;

pub use error::{Error, Result};
