//! Makan Server: HTTP co-signer for the escrow logic signature.
//!
//! The binary in `main.rs` wires these modules together; they are exposed
//! as a library so the router can be exercised in-process.

pub mod api;
pub mod config;
pub mod service;
