//! Image reference helpers: URL resolution, fallbacks, and file loading.

#[cfg(test)]
#[path = "images_test.rs"]
mod images_test;

use std::path::Path;

use crate::net::types::Attachment;

/// Cover shown for posts without an image.
pub const DEFAULT_COVER: &str =
    "https://images.unsplash.com/photo-1574169208507-84376144848b?ixlib=rb-4.0.3&auto=format&fit=crop&w=1470&q=80";
/// Card placeholder for a missing post image.
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/300x200";
/// Avatar placeholder for authors without one.
pub const PLACEHOLDER_AVATAR: &str = "https://via.placeholder.com/32x32";

/// Resolve a backend image reference to an absolute URL.
///
/// Absolute `http(s)` references pass through. Relative paths are served from
/// the API host root, i.e. `api_base_url` with a trailing `/api` removed.
/// Returns `None` for an empty reference so callers can pick a fallback.
#[must_use]
pub fn resolve_image_url(api_base_url: &str, image: Option<&str>) -> Option<String> {
    let image = image.map(str::trim).filter(|s| !s.is_empty())?;
    if image.starts_with("http://") || image.starts_with("https://") {
        return Some(image.to_owned());
    }
    let base = api_base_url.trim_end_matches('/');
    let root = base.strip_suffix("/api").unwrap_or(base);
    Some(format!("{root}/{}", image.trim_start_matches('/')))
}

/// [`resolve_image_url`] with a fallback for missing references.
#[must_use]
pub fn image_url_or(api_base_url: &str, image: Option<&str>, fallback: &str) -> String {
    resolve_image_url(api_base_url, image).unwrap_or_else(|| fallback.to_owned())
}

/// MIME type inferred from a file extension, if it is a known image type.
#[must_use]
pub fn image_mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Read a file from disk into an [`Attachment`].
///
/// Unknown extensions get `application/octet-stream`, which validation then
/// rejects with a type error rather than failing here.
///
/// # Errors
///
/// Returns the I/O error if the file cannot be read.
pub fn load_attachment(path: &Path) -> std::io::Result<Attachment> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_owned();
    let content_type = image_mime_for(path).unwrap_or("application/octet-stream");
    Ok(Attachment::new(file_name, content_type, bytes))
}
