//! Disclose application crate: configuration, SQLite persistence,
//! document extraction, embedding providers, and the CLI command
//! runners that wire them into the `disclose-core` contracts.

pub mod catalogue;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod gap_cmd;
pub mod ingest;
pub mod migrate;
pub mod search_cmd;
pub mod sqlite_store;
