//! Create and edit flow for posts.
//!
//! SYSTEM CONTEXT
//! ==============
//! The composer turns a [`PostDraft`] into backend calls: validate locally,
//! upload the cover image if one is attached, then create or update the post
//! with the uploaded URL.

#[cfg(test)]
#[path = "compose_test.rs"]
mod compose_test;

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::net::api::PostsApi;
use crate::net::error::ApiError;
use crate::net::types::{PostPayload, PostSummary};
use crate::state::session::SessionStore;
use crate::util::validation::{PostDraft, normalize_tags, validate_post_draft};

/// Observable composer status.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComposeState {
    pub submitting: bool,
    pub error: Option<String>,
    /// Id of the most recently published or updated post.
    pub last_post_id: Option<String>,
}

pub struct PostComposer {
    posts: Arc<dyn PostsApi>,
    session: Arc<SessionStore>,
    state: Mutex<ComposeState>,
}

impl PostComposer {
    #[must_use]
    pub fn new(posts: Arc<dyn PostsApi>, session: Arc<SessionStore>) -> Self {
        Self { posts, session, state: Mutex::new(ComposeState::default()) }
    }

    #[must_use]
    pub fn state(&self) -> ComposeState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Publish `draft` as a new post.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request, `Unauthenticated` when
    /// signed out, or the upload/create failure.
    pub async fn publish(&self, draft: &PostDraft) -> Result<PostSummary, ApiError> {
        self.submit(async {
            let (token, payload) = self.prepare(draft).await?;
            self.posts.create_post(&token, &payload).await
        })
        .await
    }

    /// Replace the contents of post `id` with `draft`.
    ///
    /// # Errors
    ///
    /// Same contract as [`PostComposer::publish`].
    pub async fn update(&self, id: &str, draft: &PostDraft) -> Result<PostSummary, ApiError> {
        self.submit(async {
            let (token, payload) = self.prepare(draft).await?;
            self.posts.update_post(&token, id, &payload).await
        })
        .await
    }

    /// Delete post `id`.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` when signed out, or the backend failure.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let token = self.session.require_token()?;
        self.posts.delete_post(&token, id).await?;
        info!(post_id = id, "post deleted");
        Ok(())
    }

    async fn prepare(&self, draft: &PostDraft) -> Result<(String, PostPayload), ApiError> {
        validate_post_draft(draft)?;
        let token = self.session.require_token()?;

        let image = match &draft.image {
            Some(attachment) => Some(self.posts.upload_image(&token, attachment).await?.image_url),
            None => None,
        };

        let payload = PostPayload {
            title: draft.title.trim().to_owned(),
            description: draft.description.trim().to_owned(),
            content: draft.content.clone(),
            image,
            tags: normalize_tags(&draft.tags),
            read_time: draft.read_time,
        };
        Ok((token, payload))
    }

    async fn submit(
        &self,
        work: impl Future<Output = Result<PostSummary, ApiError>>,
    ) -> Result<PostSummary, ApiError> {
        self.set_state(|state| {
            state.submitting = true;
            state.error = None;
        });

        let result = work.await;

        match &result {
            Ok(post) => {
                info!(post_id = %post.id, "post saved");
                self.set_state(|state| {
                    state.submitting = false;
                    state.last_post_id = Some(post.id.clone());
                });
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "post submission failed");
                self.set_state(|state| {
                    state.submitting = false;
                    state.error = Some(e.to_string());
                });
            }
        }
        result
    }

    fn set_state(&self, f: impl FnOnce(&mut ComposeState)) {
        f(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner));
    }
}
