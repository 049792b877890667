//! Access to the content repository's admin REST API.
//!
//! [`client`] carries the transport (pooled HTTP with shared-secret or
//! mutual-TLS authentication); [`service`] wraps it with typed endpoint calls.

pub mod client;
pub mod service;

pub use client::{HttpRepositoryClient, RepositoryClient, SecureComms};
pub use service::RepositoryService;
