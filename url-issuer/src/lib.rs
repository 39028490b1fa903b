//! URL Issuer service
//!
//! Mints short-lived presigned URLs so clients can upload originals and download derived images
//! without holding storage credentials.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Presigned URL issuing against the object store
pub mod issuer;
/// HTTP routes
pub mod routes;
/// Router assembly and server lifecycle
pub mod server;
/// Error envelope and request extractors
pub mod types;
