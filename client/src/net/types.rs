//! Wire DTOs for the blog backend REST API.
//!
//! DESIGN
//! ======
//! Field names follow the backend's JSON (`_id`, camelCase timestamps). Reads
//! are lenient where the backend is known to vary (`id` vs `_id`, populated vs
//! bare author references, `posts` vs `blogs`); writes emit one canonical shape.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

// =============================================================================
// USERS & AUTH
// =============================================================================

/// An authenticated user as returned by the auth endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Backend user identifier.
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Login email address.
    pub email: String,
    /// Avatar image reference (URL or backend-relative path).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Account creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// Login form payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Registration payload. Sent as multipart when `avatar` is present.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Confirmation typed by the user; checked client-side, never sent.
    #[serde(skip)]
    pub confirm_password: String,
    #[serde(skip)]
    pub avatar: Option<Attachment>,
}

/// Response to a successful login or signup.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

// =============================================================================
// ATTACHMENTS
// =============================================================================

/// A binary file selected for upload (avatar or post image).
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    #[must_use]
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { file_name: file_name.into(), content_type: content_type.into(), bytes }
    }

    /// Size of the attachment body in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Response to `POST /upload`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct UploadResponse {
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

// =============================================================================
// POSTS
// =============================================================================

/// Author reference attached to a post. The backend sends either a populated
/// object or a bare user id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// A blog post as listed or fetched. Never mutated client-side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_author")]
    pub author: Author,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Estimated reading time in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<u64>,
}

/// Create/update payload for a post.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPayload {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_time: Option<u32>,
}

// =============================================================================
// LISTING QUERY
// =============================================================================

/// Field a listing is ordered by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    CreatedAt,
    Title,
    ReadTime,
    Likes,
}

impl SortField {
    pub const ALL: [Self; 4] = [Self::CreatedAt, Self::Title, Self::ReadTime, Self::Likes];

    /// Label shown on the sort control.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::CreatedAt => "Date",
            Self::Title => "Title",
            Self::ReadTime => "Read Time",
            Self::Likes => "Most Liked",
        }
    }

    /// Direction applied when the user picks this field.
    #[must_use]
    pub fn default_direction(self) -> SortDirection {
        match self {
            Self::CreatedAt | Self::Likes => SortDirection::Desc,
            Self::Title | Self::ReadTime => SortDirection::Asc,
        }
    }

    /// Wire name, as sent in `sortBy`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "createdAt",
            Self::Title => "title",
            Self::ReadTime => "readTime",
            Self::Likes => "likes",
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" | "date" => Ok(Self::CreatedAt),
            "title" => Ok(Self::Title),
            "readTime" | "read-time" => Ok(Self::ReadTime),
            "likes" => Ok(Self::Likes),
            other => Err(format!("unknown sort field: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort direction: {other}")),
        }
    }
}

/// Query string for `GET /blog/all-blog`. Unset fields are omitted entirely.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPostsQuery {
    pub page: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortDirection>,
    /// `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_read_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_read_time: Option<u32>,
}

// =============================================================================
// RESPONSE ENVELOPES
// =============================================================================

/// The backend's `{ success, data, message }` wrapper.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Envelope<T> {
    /// Missing means success; only an explicit `false` is a failure.
    #[serde(default = "default_true")]
    pub success: bool,
    /// Rejections may omit `data` entirely.
    #[serde(default)]
    pub data: T,
    #[serde(default)]
    pub message: Option<String>,
}

/// One page of listing results.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct PostPage {
    #[serde(default, alias = "blogs")]
    pub posts: Vec<PostSummary>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct TagList {
    #[serde(default)]
    pub tags: Vec<String>,
}

pub type ListPostsResponse = Envelope<PostPage>;
pub type PopularTagsResponse = Envelope<TagList>;

fn default_true() -> bool {
    true
}

fn deserialize_author<'de, D>(deserializer: D) -> Result<Author, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AuthorRepr {
        Id(String),
        Populated(Author),
        Missing(()),
    }

    Ok(match AuthorRepr::deserialize(deserializer)? {
        AuthorRepr::Id(id) => Author { id: Some(id), ..Author::default() },
        AuthorRepr::Populated(author) => author,
        AuthorRepr::Missing(()) => Author::default(),
    })
}
