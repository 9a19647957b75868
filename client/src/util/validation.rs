//! Client-side form validation for login, signup, and post drafts.
//!
//! ERROR HANDLING
//! ==============
//! Every check runs and failures are collected per field, so a form can mark
//! all offending inputs at once. Nothing here touches the network.

#[cfg(test)]
#[path = "validation_test.rs"]
mod validation_test;

use std::collections::HashSet;

use crate::net::types::{Attachment, Credentials, Registration};

pub const MAX_TAGS: usize = 5;
pub const MAX_TAG_CHARS: usize = 30;
pub const MIN_TITLE_CHARS: usize = 3;
pub const MAX_TITLE_CHARS: usize = 120;
pub const MAX_DESCRIPTION_CHARS: usize = 500;
pub const MAX_NAME_CHARS: usize = 50;
pub const MIN_PASSWORD_CHARS: usize = 6;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// One failed check on one form field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}

/// All failed checks for a form. Never empty when returned as an error.
#[derive(Clone, Debug, Default, PartialEq, Eq, thiserror::Error)]
#[error("{}", render(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// First message recorded for `field`, if any.
    #[must_use]
    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.0.iter().find(|e| e.field == field).map(|e| e.message.as_str())
    }

    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    fn into_result(self) -> Result<(), Self> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<Vec<FieldError>> for ValidationErrors {
    fn from(errors: Vec<FieldError>) -> Self {
        Self(errors)
    }
}

fn render(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// POST DRAFT
// =============================================================================

/// The create-post form as typed by the user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub description: String,
    pub content: String,
    pub tags: Vec<String>,
    pub read_time: Option<u32>,
    pub image: Option<Attachment>,
}

/// Validate a post draft.
///
/// # Errors
///
/// Returns every failed check on title, description, tags, and image.
pub fn validate_post_draft(draft: &PostDraft) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let title = draft.title.trim();
    let title_chars = title.chars().count();
    if title.is_empty() {
        errors.push("title", "title is required");
    } else if title_chars < MIN_TITLE_CHARS {
        errors.push("title", format!("title must be at least {MIN_TITLE_CHARS} characters"));
    } else if title_chars > MAX_TITLE_CHARS {
        errors.push("title", format!("title must be at most {MAX_TITLE_CHARS} characters"));
    }

    let description = draft.description.trim();
    if description.is_empty() {
        errors.push("description", "description is required");
    } else if description.chars().count() > MAX_DESCRIPTION_CHARS {
        errors.push("description", format!("description must be at most {MAX_DESCRIPTION_CHARS} characters"));
    }

    check_tags(&draft.tags, &mut errors);

    if let Some(image) = &draft.image {
        check_image("image", image, &mut errors);
    }

    errors.into_result()
}

/// Trimmed tags in input order, as they will be sent.
#[must_use]
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter().map(|t| t.trim().to_owned()).collect()
}

fn check_tags(tags: &[String], errors: &mut ValidationErrors) {
    if tags.len() > MAX_TAGS {
        errors.push("tags", format!("at most {MAX_TAGS} tags are allowed"));
    }
    let mut seen = HashSet::new();
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            errors.push("tags", "tags cannot be empty");
        } else if tag.chars().count() > MAX_TAG_CHARS {
            errors.push("tags", format!("tag '{tag}' is longer than {MAX_TAG_CHARS} characters"));
        } else if !seen.insert(tag.to_lowercase()) {
            errors.push("tags", format!("duplicate tag '{tag}'"));
        }
    }
}

// =============================================================================
// AUTH FORMS
// =============================================================================

/// Validate the login form.
///
/// # Errors
///
/// Returns failed checks on email and password.
pub fn validate_credentials(credentials: &Credentials) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    check_email(&credentials.email, &mut errors);
    if credentials.password.is_empty() {
        errors.push("password", "password is required");
    }
    errors.into_result()
}

/// Validate the signup form, including password confirmation and avatar.
///
/// # Errors
///
/// Returns failed checks on name, email, password, confirmation, and avatar.
pub fn validate_registration(registration: &Registration) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let name = registration.name.trim();
    if name.is_empty() {
        errors.push("name", "name is required");
    } else if name.chars().count() > MAX_NAME_CHARS {
        errors.push("name", format!("name must be at most {MAX_NAME_CHARS} characters"));
    }

    check_email(&registration.email, &mut errors);

    if registration.password.chars().count() < MIN_PASSWORD_CHARS {
        errors.push("password", format!("password must be at least {MIN_PASSWORD_CHARS} characters"));
    }
    if registration.password != registration.confirm_password {
        errors.push("confirm_password", "passwords do not match");
    }

    if let Some(avatar) = &registration.avatar {
        check_image("avatar", avatar, &mut errors);
    }

    errors.into_result()
}

fn check_email(email: &str, errors: &mut ValidationErrors) {
    let email = email.trim();
    if email.is_empty() {
        errors.push("email", "email is required");
        return;
    }
    let well_formed = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
    });
    if !well_formed || email.contains(char::is_whitespace) {
        errors.push("email", "email address is invalid");
    }
}

// =============================================================================
// ATTACHMENTS
// =============================================================================

/// Validate a single image attachment on its own.
///
/// # Errors
///
/// Returns failed size and type checks.
pub fn validate_image(image: &Attachment) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    check_image("image", image, &mut errors);
    errors.into_result()
}

fn check_image(field: &'static str, image: &Attachment, errors: &mut ValidationErrors) {
    if image.is_empty() {
        errors.push(field, "file is empty");
    } else if image.len() > MAX_IMAGE_BYTES {
        errors.push(field, format!("file must be at most {} MB", MAX_IMAGE_BYTES / (1024 * 1024)));
    }
    if !ALLOWED_IMAGE_TYPES.contains(&image.content_type.as_str()) {
        errors.push(field, format!("unsupported image type '{}'", image.content_type));
    }
}
