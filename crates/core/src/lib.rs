//! Pure domain logic for the archive migration pipeline.
//!
//! This crate has zero internal dependencies (no DB, no async, no I/O).
//! Everything here is a pure function or a plain data type, so the parsing,
//! inference, classification, and reconciliation rules can be unit-tested
//! without a database or a blob store.

pub mod checkpoint;
pub mod classify;
pub mod dedup;
pub mod error;
pub mod filename;
pub mod manifest;
pub mod migration;
pub mod refmap;
pub mod report;
pub mod session;
pub mod types;
