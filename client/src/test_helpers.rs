//! In-memory collaborators and fixtures shared by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use time::OffsetDateTime;
use time::macros::datetime;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::net::api::{AuthApi, PostsApi};
use crate::net::error::ApiError;
use crate::net::types::{
    Attachment, Author, AuthResponse, Credentials, Envelope, ListPostsQuery, ListPostsResponse, PopularTagsResponse,
    PostPage, PostPayload, PostSummary, Registration, TagList, UploadResponse, User,
};

pub const FIXED_TIME: OffsetDateTime = datetime!(2025-09-20 10:00 UTC);

// =============================================================================
// FIXTURES
// =============================================================================

#[must_use]
pub fn sample_user(id: &str) -> User {
    User {
        id: id.to_owned(),
        name: format!("User {id}"),
        email: format!("{id}@example.com"),
        avatar: None,
        created_at: FIXED_TIME,
        bio: None,
        location: None,
        website: None,
    }
}

#[must_use]
pub fn sample_post(id: &str) -> PostSummary {
    PostSummary {
        id: id.to_owned(),
        title: format!("Post {id}"),
        description: "description".to_owned(),
        image: None,
        content: None,
        tags: vec!["rust".to_owned()],
        author: Author { id: Some("u1".to_owned()), name: Some("Alice".to_owned()), avatar: None },
        created_at: FIXED_TIME,
        read_time: Some(3),
        likes: None,
    }
}

/// `count` posts with ids `{prefix}0..{prefix}{count-1}`.
#[must_use]
pub fn sample_posts(prefix: &str, count: usize) -> Vec<PostSummary> {
    (0..count).map(|i| sample_post(&format!("{prefix}{i}"))).collect()
}

#[must_use]
pub fn page(posts: Vec<PostSummary>, total: u64) -> ListPostsResponse {
    Envelope { success: true, data: PostPage { posts, total }, message: None }
}

#[must_use]
pub fn auth_response(user_id: &str, token: &str) -> AuthResponse {
    AuthResponse { user: sample_user(user_id), token: token.to_owned() }
}

// =============================================================================
// POSTS API
// =============================================================================

/// Scripted reply for one `list_posts` call.
pub enum ListReply {
    Ready(Result<ListPostsResponse, ApiError>),
    /// Resolves when the test sends on the paired sender.
    Gated(oneshot::Receiver<Result<ListPostsResponse, ApiError>>),
}

/// A recorded `list_posts` call.
#[derive(Clone, Debug)]
pub struct ListCall {
    pub query: ListPostsQuery,
    pub at: Instant,
}

#[derive(Default)]
pub struct MockPostsApi {
    pub list_calls: Mutex<Vec<ListCall>>,
    list_script: Mutex<VecDeque<ListReply>>,
    pub tags: Mutex<Option<Result<PopularTagsResponse, ApiError>>>,
    pub created: Mutex<Vec<(String, PostPayload)>>,
    pub updated: Mutex<Vec<(String, String, PostPayload)>>,
    pub deleted: Mutex<Vec<(String, String)>>,
    pub uploads: Mutex<Vec<(String, String)>>,
    pub user_posts: Mutex<Vec<PostSummary>>,
    pub fail_uploads: Mutex<bool>,
    pub fail_create: Mutex<bool>,
    pub fail_user_posts: Mutex<bool>,
}

impl MockPostsApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_list(&self, reply: ListReply) {
        self.list_script.lock().unwrap().push_back(reply);
    }

    pub fn push_page(&self, posts: Vec<PostSummary>, total: u64) {
        self.push_list(ListReply::Ready(Ok(page(posts, total))));
    }

    /// Queue a gated reply and return the sender that releases it.
    pub fn push_gate(&self) -> oneshot::Sender<Result<ListPostsResponse, ApiError>> {
        let (tx, rx) = oneshot::channel();
        self.push_list(ListReply::Gated(rx));
        tx
    }

    #[must_use]
    pub fn list_calls(&self) -> Vec<ListCall> {
        self.list_calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PostsApi for MockPostsApi {
    async fn list_posts(&self, query: &ListPostsQuery) -> Result<ListPostsResponse, ApiError> {
        self.list_calls.lock().unwrap().push(ListCall { query: query.clone(), at: Instant::now() });
        let reply = self.list_script.lock().unwrap().pop_front();
        match reply {
            Some(ListReply::Ready(result)) => result,
            Some(ListReply::Gated(rx)) => rx.await.unwrap_or_else(|_| Err(ApiError::Transport("gate dropped".into()))),
            None => Ok(page(Vec::new(), 0)),
        }
    }

    async fn popular_tags(&self) -> Result<PopularTagsResponse, ApiError> {
        self.tags
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(Envelope { success: true, data: TagList::default(), message: None }))
    }

    async fn get_post(&self, id: &str) -> Result<PostSummary, ApiError> {
        Ok(sample_post(id))
    }

    async fn list_posts_by_user(&self, user_id: &str) -> Result<Vec<PostSummary>, ApiError> {
        if *self.fail_user_posts.lock().unwrap() {
            return Err(ApiError::Transport(format!("no route to user {user_id}")));
        }
        Ok(self.user_posts.lock().unwrap().clone())
    }

    async fn create_post(&self, token: &str, payload: &PostPayload) -> Result<PostSummary, ApiError> {
        if *self.fail_create.lock().unwrap() {
            return Err(ApiError::Backend { status: 500, message: "failed to create blog".into() });
        }
        self.created.lock().unwrap().push((token.to_owned(), payload.clone()));
        let mut post = sample_post("new");
        post.title.clone_from(&payload.title);
        post.image.clone_from(&payload.image);
        post.tags.clone_from(&payload.tags);
        Ok(post)
    }

    async fn update_post(&self, token: &str, id: &str, payload: &PostPayload) -> Result<PostSummary, ApiError> {
        self.updated.lock().unwrap().push((token.to_owned(), id.to_owned(), payload.clone()));
        let mut post = sample_post(id);
        post.title.clone_from(&payload.title);
        Ok(post)
    }

    async fn delete_post(&self, token: &str, id: &str) -> Result<(), ApiError> {
        self.deleted.lock().unwrap().push((token.to_owned(), id.to_owned()));
        Ok(())
    }

    async fn upload_image(&self, token: &str, image: &Attachment) -> Result<UploadResponse, ApiError> {
        if *self.fail_uploads.lock().unwrap() {
            return Err(ApiError::Backend { status: 413, message: "file too large".into() });
        }
        self.uploads.lock().unwrap().push((token.to_owned(), image.file_name.clone()));
        Ok(UploadResponse { image_url: format!("uploads/{}", image.file_name) })
    }
}

// =============================================================================
// AUTH API
// =============================================================================

#[derive(Default)]
pub struct MockAuthApi {
    pub login_reply: Mutex<Option<Result<AuthResponse, ApiError>>>,
    pub signup_reply: Mutex<Option<Result<AuthResponse, ApiError>>>,
    pub current_user_reply: Mutex<Option<Result<Option<User>, ApiError>>>,
    /// When set, `current_user` waits for this before answering.
    pub current_user_gate: Mutex<Option<oneshot::Receiver<()>>>,
    pub logout_unreachable: Mutex<bool>,
    pub current_user_calls: AtomicUsize,
    pub logout_tokens: Mutex<Vec<String>>,
    pub signups: Mutex<Vec<Registration>>,
}

impl MockAuthApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the next `current_user` answer until the returned sender fires.
    pub fn gate_current_user(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.current_user_gate.lock().unwrap() = Some(rx);
        tx
    }

    #[must_use]
    pub fn current_user_calls(&self) -> usize {
        self.current_user_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AuthApi for MockAuthApi {
    async fn login(&self, _credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        self.login_reply
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(ApiError::Backend { status: 401, message: "Invalid credentials".into() }))
    }

    async fn signup(&self, registration: &Registration) -> Result<AuthResponse, ApiError> {
        self.signups.lock().unwrap().push(registration.clone());
        self.signup_reply
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(ApiError::Backend { status: 400, message: "User already exists".into() }))
    }

    async fn logout(&self, token: &str) -> Result<(), ApiError> {
        self.logout_tokens.lock().unwrap().push(token.to_owned());
        if *self.logout_unreachable.lock().unwrap() {
            return Err(ApiError::Transport("connection refused".into()));
        }
        Ok(())
    }

    async fn current_user(&self, _token: &str) -> Result<Option<User>, ApiError> {
        self.current_user_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.current_user_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        tokio::task::yield_now().await;
        self.current_user_reply.lock().unwrap().take().unwrap_or(Ok(None))
    }
}
