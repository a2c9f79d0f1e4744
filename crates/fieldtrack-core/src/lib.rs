//! Core types and presence/live-location logic for the fieldtrack backend.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; storage and transport are reached through
//! the traits in [`store`] and [`ingest`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod fanout;
pub mod ingest;
pub mod presence;
pub mod sample;
pub mod store;
pub mod surveyor;

pub use error::{Error, Result};
