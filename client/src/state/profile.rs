//! Signed-in user's profile view: identity plus their own posts.

#[cfg(test)]
#[path = "profile_test.rs"]
mod profile_test;

use tracing::warn;

use crate::net::api::PostsApi;
use crate::net::types::{PostSummary, User};
use crate::state::session::SessionStore;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileState {
    pub user: Option<User>,
    pub posts: Vec<PostSummary>,
    pub error: Option<String>,
}

/// Load the current user's posts. Signed out yields an empty profile; a
/// failed fetch keeps the user and records the error.
pub async fn load_profile(session: &SessionStore, posts: &dyn PostsApi) -> ProfileState {
    let Some(user) = session.current_user() else {
        return ProfileState::default();
    };
    match posts.list_posts_by_user(&user.id).await {
        Ok(list) => ProfileState { user: Some(user), posts: list, error: None },
        Err(e) => {
            warn!(user_id = %user.id, error = %e, "failed to load profile posts");
            ProfileState { user: Some(user), posts: Vec::new(), error: Some(e.to_string()) }
        }
    }
}
