//! Inference service boundary.
//!
//! This crate holds the types exchanged with the external image
//! classification service, the pre-checks applied to uploads before they are
//! sent, and the clients used to reach the service. The blocking HTTP client
//! is behind the `http` feature.

pub mod client;
pub mod prediction;
pub mod upload;

pub use client::*;
pub use prediction::*;
pub use upload::*;
