//! Image ingestion pipeline
//!
//! Consumes object-created notifications for the upload bucket, derives a half-size JPEG for
//! each upload, writes it to the processed bucket and records the run in the metadata table.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Consumer configuration
pub mod config;

/// SQS poll loop and payload entry point
pub mod consumer;

/// Trigger payload parsing
pub mod event;

/// Health check server
pub mod health;

/// Per-notification orchestration
pub mod pipeline;

/// Event notification queue
pub mod queue;

/// Image resize and re-encode policy
pub mod transform;
