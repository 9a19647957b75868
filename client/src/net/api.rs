//! REST collaborators for the blog backend.
//!
//! DESIGN
//! ======
//! `AuthApi` and `PostsApi` are the seams the state controllers depend on, so
//! tests drive them with in-memory mocks. `HttpApi` is the production
//! implementation over `reqwest`. Tokens are passed explicitly per call; the
//! HTTP layer never reads session storage itself.
//!
//! ERROR HANDLING
//! ==============
//! Non-2xx responses become `ApiError::Backend` carrying the server's
//! `message` when it sent one, or an operation-specific fallback otherwise.
//! A 2xx envelope with `success: false` is treated the same way.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::ApiError;
use super::types::{
    Attachment, AuthResponse, Credentials, Envelope, ListPostsQuery, ListPostsResponse, PopularTagsResponse,
    PostPage, PostPayload, PostSummary, Registration, UploadResponse, User,
};
use crate::config::ClientConfig;
use crate::util::validation::{FieldError, ValidationErrors};

// =============================================================================
// COLLABORATOR TRAITS
// =============================================================================

/// Authentication endpoints.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a user record and token.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or backend rejection.
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError>;

    /// Register a new account. An avatar, when present, is sent as multipart.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or backend rejection.
    async fn signup(&self, registration: &Registration) -> Result<AuthResponse, ApiError>;

    /// Invalidate `token` server-side.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the backend is unreachable or refuses.
    async fn logout(&self, token: &str) -> Result<(), ApiError>;

    /// Validate `token` and return its user, or `None` if the backend no
    /// longer recognizes it.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or unexpected responses.
    async fn current_user(&self, token: &str) -> Result<Option<User>, ApiError>;
}

/// Post listing, detail, and authoring endpoints.
#[async_trait::async_trait]
pub trait PostsApi: Send + Sync {
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or non-2xx status.
    async fn list_posts(&self, query: &ListPostsQuery) -> Result<ListPostsResponse, ApiError>;

    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or non-2xx status.
    async fn popular_tags(&self) -> Result<PopularTagsResponse, ApiError>;

    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or backend rejection.
    async fn get_post(&self, id: &str) -> Result<PostSummary, ApiError>;

    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or backend rejection.
    async fn list_posts_by_user(&self, user_id: &str) -> Result<Vec<PostSummary>, ApiError>;

    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or backend rejection.
    async fn create_post(&self, token: &str, payload: &PostPayload) -> Result<PostSummary, ApiError>;

    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or backend rejection.
    async fn update_post(&self, token: &str, id: &str, payload: &PostPayload) -> Result<PostSummary, ApiError>;

    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or backend rejection.
    async fn delete_post(&self, token: &str, id: &str) -> Result<(), ApiError>;

    /// Upload an image and return the stored reference.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or backend rejection.
    async fn upload_image(&self, token: &str, image: &Attachment) -> Result<UploadResponse, ApiError>;
}

// =============================================================================
// ENDPOINTS
// =============================================================================

const LOGIN_PATH: &str = "/auth/login";
const SIGNUP_PATH: &str = "/auth/signup";
const LOGOUT_PATH: &str = "/auth/logout";
const CURRENT_USER_PATH: &str = "/auth/me";
const LIST_POSTS_PATH: &str = "/blog/all-blog";
const POPULAR_TAGS_PATH: &str = "/blog/popular-tags";
const CREATE_POST_PATH: &str = "/blog/create";
const UPLOAD_PATH: &str = "/upload";

fn post_endpoint(id: &str) -> String {
    format!("/blog/get-blog/{id}")
}

fn user_posts_endpoint(user_id: &str) -> String {
    format!("/blog/user-blog/{user_id}")
}

fn update_post_endpoint(id: &str) -> String {
    format!("/blog/update-blog/{id}")
}

fn delete_post_endpoint(id: &str) -> String {
    format!("/blog/delete-blog/{id}")
}

/// Pull a human-readable `message` (or `error`) out of an error body.
fn backend_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<String>,
        error: Option<String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .message
        .or(parsed.error)
        .map(|m| m.trim().to_owned())
        .filter(|m| !m.is_empty())
}

fn unwrap_envelope<T>(envelope: Envelope<T>, fallback: &str) -> Result<T, ApiError> {
    if envelope.success {
        Ok(envelope.data)
    } else {
        Err(ApiError::Backend {
            status: StatusCode::OK.as_u16(),
            message: envelope.message.unwrap_or_else(|| fallback.to_owned()),
        })
    }
}

/// [`unwrap_envelope`] for single-record responses, whose `data` is absent or
/// null when `success` is false.
fn unwrap_record<T>(envelope: Envelope<Option<T>>, fallback: &str) -> Result<T, ApiError> {
    unwrap_envelope(envelope, fallback)?.ok_or_else(|| ApiError::Decode("response carried no data".to_owned()))
}

fn attachment_part(field: &'static str, attachment: &Attachment) -> Result<Part, ApiError> {
    Part::bytes(attachment.bytes.clone())
        .file_name(attachment.file_name.clone())
        .mime_str(&attachment.content_type)
        .map_err(|e| {
            ApiError::Validation(ValidationErrors::from(vec![FieldError::new(
                field,
                format!("invalid content type: {e}"),
            )]))
        })
}

/// `/auth/me` answers with either `{ user }`, `{ data }`, or the bare record.
#[derive(Deserialize)]
#[serde(untagged)]
enum CurrentUserBody {
    Bare(User),
    Wrapped {
        #[serde(alias = "data")]
        user: Option<User>,
    },
}

/// `/blog/user-blog/{id}` answers with either a list or a page object.
#[derive(Deserialize)]
#[serde(untagged)]
enum UserPostsBody {
    List(Vec<PostSummary>),
    Page(PostPage),
}

impl Default for UserPostsBody {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

/// Production [`AuthApi`] + [`PostsApi`] over HTTP.
#[derive(Clone, Debug)]
pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    /// Build an HTTP client for `config.api_url` with the configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeouts.request())
            .connect_timeout(config.timeouts.connect())
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.api_url.trim_end_matches('/').to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send `request` and return the body of a 2xx response.
    async fn send(&self, request: RequestBuilder, fallback: &str) -> Result<String, ApiError> {
        let response = request.send().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        debug!(status = status.as_u16(), bytes = body.len(), "backend response");

        if !status.is_success() {
            return Err(ApiError::Backend {
                status: status.as_u16(),
                message: backend_message(&body).unwrap_or_else(|| fallback.to_owned()),
            });
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, fallback: &str) -> Result<T, ApiError> {
        let body = self.send(request, fallback).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpApi {
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        let request = self.http.post(self.url(LOGIN_PATH)).json(credentials);
        self.send_json(request, "failed to login").await
    }

    async fn signup(&self, registration: &Registration) -> Result<AuthResponse, ApiError> {
        let url = self.url(SIGNUP_PATH);
        let request = match &registration.avatar {
            Some(avatar) => {
                let form = Form::new()
                    .text("name", registration.name.clone())
                    .text("email", registration.email.clone())
                    .text("password", registration.password.clone())
                    .part("avatar", attachment_part("avatar", avatar)?);
                self.http.post(url).multipart(form)
            }
            None => self.http.post(url).json(registration),
        };
        self.send_json(request, "failed to sign up").await
    }

    async fn logout(&self, token: &str) -> Result<(), ApiError> {
        let request = self.http.post(self.url(LOGOUT_PATH)).bearer_auth(token);
        self.send(request, "failed to logout").await.map(|_| ())
    }

    async fn current_user(&self, token: &str) -> Result<Option<User>, ApiError> {
        let request = self.http.get(self.url(CURRENT_USER_PATH)).bearer_auth(token);
        let body = match self.send(request, "failed to fetch current user").await {
            Ok(body) => body,
            Err(ApiError::Backend { status: 401 | 403 | 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let parsed: CurrentUserBody = serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(match parsed {
            CurrentUserBody::Wrapped { user } => user,
            CurrentUserBody::Bare(user) => Some(user),
        })
    }
}

#[async_trait::async_trait]
impl PostsApi for HttpApi {
    async fn list_posts(&self, query: &ListPostsQuery) -> Result<ListPostsResponse, ApiError> {
        debug!(page = query.page, limit = query.limit, "listing posts");
        let request = self.http.get(self.url(LIST_POSTS_PATH)).query(query);
        self.send_json(request, "failed to fetch blogs").await
    }

    async fn popular_tags(&self) -> Result<PopularTagsResponse, ApiError> {
        let request = self.http.get(self.url(POPULAR_TAGS_PATH));
        self.send_json(request, "failed to fetch tags").await
    }

    async fn get_post(&self, id: &str) -> Result<PostSummary, ApiError> {
        let fallback = "failed to fetch blog";
        let request = self.http.get(self.url(&post_endpoint(id)));
        let envelope: Envelope<Option<PostSummary>> = self.send_json(request, fallback).await?;
        unwrap_record(envelope, fallback)
    }

    async fn list_posts_by_user(&self, user_id: &str) -> Result<Vec<PostSummary>, ApiError> {
        let fallback = "failed to fetch user blogs";
        let request = self.http.get(self.url(&user_posts_endpoint(user_id)));
        let envelope: Envelope<UserPostsBody> = self.send_json(request, fallback).await?;
        Ok(match unwrap_envelope(envelope, fallback)? {
            UserPostsBody::List(posts) => posts,
            UserPostsBody::Page(page) => page.posts,
        })
    }

    async fn create_post(&self, token: &str, payload: &PostPayload) -> Result<PostSummary, ApiError> {
        let fallback = "failed to create blog";
        let request = self.http.post(self.url(CREATE_POST_PATH)).bearer_auth(token).json(payload);
        let envelope: Envelope<Option<PostSummary>> = self.send_json(request, fallback).await?;
        unwrap_record(envelope, fallback)
    }

    async fn update_post(&self, token: &str, id: &str, payload: &PostPayload) -> Result<PostSummary, ApiError> {
        let fallback = "failed to update blog";
        let request = self
            .http
            .put(self.url(&update_post_endpoint(id)))
            .bearer_auth(token)
            .json(payload);
        let envelope: Envelope<Option<PostSummary>> = self.send_json(request, fallback).await?;
        unwrap_record(envelope, fallback)
    }

    async fn delete_post(&self, token: &str, id: &str) -> Result<(), ApiError> {
        let fallback = "failed to delete blog";
        let request = self.http.delete(self.url(&delete_post_endpoint(id))).bearer_auth(token);
        let body = self.send(request, fallback).await?;
        // EDGE: some deployments answer 204 with no body.
        if body.trim().is_empty() {
            return Ok(());
        }
        let envelope: Envelope<Option<serde_json::Value>> =
            serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
        unwrap_envelope(envelope, fallback).map(|_| ())
    }

    async fn upload_image(&self, token: &str, image: &Attachment) -> Result<UploadResponse, ApiError> {
        let form = Form::new().part("image", attachment_part("image", image)?);
        let request = self.http.post(self.url(UPLOAD_PATH)).bearer_auth(token).multipart(form);
        self.send_json(request, "failed to upload image").await
    }
}
