//! Storage capabilities for the image pipeline
//!
//! This crate provides the storage functionality shared between the image processor and
//! the URL issuer: object storage (S3), image metadata storage (Dynamo DB) and the
//! environment configuration both services are started from.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Deployment environment and service configuration
pub mod environment;
/// Image metadata records and their storage
pub mod metadata;
/// Binary object storage
pub mod object_store;
