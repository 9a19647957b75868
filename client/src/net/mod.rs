//! Networking modules for the blog REST backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` defines the collaborator traits and their HTTP implementation,
//! `types` defines the wire schema, and `error` the shared failure taxonomy.

pub mod api;
pub mod error;
pub mod types;
