//! Application-wide handles wired from one configuration.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every surface (CLI commands, tests) gets the same session store, API
//! clients, and listing settings from a single `ClientContext` instead of
//! building its own.

#[cfg(test)]
#[path = "context_test.rs"]
mod context_test;

use std::sync::Arc;

use crate::config::{ClientConfig, ListingConfig};
use crate::net::api::{AuthApi, HttpApi, PostsApi};
use crate::net::error::ApiError;
use crate::state::compose::PostComposer;
use crate::state::listing::ListingQuery;
use crate::state::session::SessionStore;
use crate::storage::{DurableStorage, FileStorage};

#[derive(Clone)]
pub struct ClientContext {
    pub api_url: String,
    pub listing: ListingConfig,
    pub posts: Arc<dyn PostsApi>,
    pub session: Arc<SessionStore>,
}

impl ClientContext {
    /// Wire the HTTP API and file-backed session storage from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::HttpClientBuild`] if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = Arc::new(HttpApi::new(config)?);
        let storage = Arc::new(FileStorage::in_dir(&config.state_dir));
        Ok(Self::with_parts(&config.api_url, config.listing, http.clone(), http, storage))
    }

    #[must_use]
    pub fn with_parts(
        api_url: &str,
        listing: ListingConfig,
        auth: Arc<dyn AuthApi>,
        posts: Arc<dyn PostsApi>,
        storage: Arc<dyn DurableStorage>,
    ) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_owned(),
            listing,
            posts,
            session: Arc::new(SessionStore::new(auth, storage)),
        }
    }

    /// A fresh listing over this context's posts API.
    #[must_use]
    pub fn listing(&self) -> ListingQuery {
        ListingQuery::new(Arc::clone(&self.posts), self.listing)
    }

    #[must_use]
    pub fn composer(&self) -> PostComposer {
        PostComposer::new(Arc::clone(&self.posts), Arc::clone(&self.session))
    }
}
