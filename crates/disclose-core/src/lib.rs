//! # Disclose Core
//!
//! Shared logic for Disclose: data models, the error taxonomy, text
//! chunking, the vector-store abstraction, the search service, the
//! requirements parser, and the gap analyzer.
//!
//! This crate contains no tokio runtime, sqlx, filesystem I/O, or other
//! native-only dependencies. Embedding backends and persistent stores
//! live in the `disclose` app crate and plug in through the
//! [`embedding::EmbeddingProvider`] and [`store::VectorStore`] traits.

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod gap;
pub mod models;
pub mod requirements;
pub mod search;
pub mod store;
