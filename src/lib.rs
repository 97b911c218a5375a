pub mod access;
pub mod config;
pub mod discovery;
pub mod error;
pub mod format;
pub mod inference;
pub mod ingest;
pub mod models;
pub mod monitor;
pub mod tui;
