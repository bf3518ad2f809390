//! Core types and trait definitions for Blake Vision.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! The storage backend, the API and the ingestion services all depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod category;
pub mod code;
pub mod episode;
pub mod error;
pub mod extraction;
pub mod ficha;
pub mod media;
pub mod prefix;
pub mod relation;
pub mod session;
pub mod similarity;
pub mod store;
pub mod universe;
pub mod world;

pub use error::{Error, Result};
