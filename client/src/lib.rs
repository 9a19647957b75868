//! # blogsphere-client
//!
//! Client core for the Blogsphere blogging platform: the REST API layer,
//! session lifecycle, and the paginated explore listing.
//!
//! Surfaces (the `blogsphere` CLI, tests) build a [`ClientContext`] and drive
//! the state controllers in [`state`]. All I/O goes through the traits in
//! [`net::api`] and [`storage`], so every controller runs against in-memory
//! fakes in tests.

pub mod config;
pub mod context;
pub mod net;
pub mod state;
pub mod storage;
pub mod util;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::{ClientConfig, ConfigError, ListingConfig};
pub use context::ClientContext;
pub use net::error::ApiError;
pub use state::listing::{FetchStatus, ListingQuery, ListingState};
pub use state::session::{SessionState, SessionStore};
