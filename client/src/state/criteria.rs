//! Listing criteria: the user-adjustable search, filter, and sort inputs.
//!
//! DESIGN
//! ======
//! `Criteria` is the full current state; `CriteriaUpdate` is a partial change
//! merged into it. Translation to the wire query lives here so the listing
//! controller never decides which fields are "empty".

#[cfg(test)]
#[path = "criteria_test.rs"]
mod criteria_test;

use time::Date;
use time::macros::format_description;
use tracing::warn;

use crate::net::api::PostsApi;
use crate::net::types::{ListPostsQuery, SortDirection, SortField};

/// Label of the catch-all tag filter.
pub const ALL_TAGS_LABEL: &str = "All";

/// Active tag filter on the listing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TagFilter {
    #[default]
    All,
    Tag(String),
}

impl TagFilter {
    /// Parse a tag chip label; `"All"` and blank labels select everything.
    #[must_use]
    pub fn parse(label: &str) -> Self {
        let label = label.trim();
        if label.is_empty() || label == ALL_TAGS_LABEL {
            Self::All
        } else {
            Self::Tag(label.to_owned())
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::All => ALL_TAGS_LABEL,
            Self::Tag(tag) => tag,
        }
    }
}

impl From<&str> for TagFilter {
    fn from(label: &str) -> Self {
        Self::parse(label)
    }
}

/// Full set of search/filter/sort parameters for a listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Criteria {
    pub search_text: String,
    pub tag: TagFilter,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    pub date_start: Option<Date>,
    pub date_end: Option<Date>,
    /// Minutes, inclusive.
    pub min_read_time: Option<u32>,
    /// Minutes, inclusive.
    pub max_read_time: Option<u32>,
}

impl Default for Criteria {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            tag: TagFilter::All,
            sort_field: SortField::CreatedAt,
            sort_direction: SortField::CreatedAt.default_direction(),
            date_start: None,
            date_end: None,
            min_read_time: None,
            max_read_time: None,
        }
    }
}

impl Criteria {
    /// Merge a partial update. Fields the update leaves as `None` are kept.
    pub fn apply(&mut self, update: CriteriaUpdate) {
        let CriteriaUpdate { search_text, tag, sort, date_start, date_end, min_read_time, max_read_time } = update;
        if let Some(text) = search_text {
            self.search_text = text;
        }
        if let Some(tag) = tag {
            self.tag = tag;
        }
        if let Some((field, direction)) = sort {
            self.sort_field = field;
            self.sort_direction = direction;
        }
        if let Some(start) = date_start {
            self.date_start = start;
        }
        if let Some(end) = date_end {
            self.date_end = end;
        }
        if let Some(min) = min_read_time {
            self.min_read_time = min;
        }
        if let Some(max) = max_read_time {
            self.max_read_time = max;
        }
    }

    /// Build the wire query for `page`. Blank search, the `All` tag, and unset
    /// bounds are omitted rather than sent empty.
    #[must_use]
    pub fn to_query(&self, page: u32, limit: u32) -> ListPostsQuery {
        let search = self.search_text.trim();
        ListPostsQuery {
            page,
            limit,
            search: (!search.is_empty()).then(|| search.to_owned()),
            tags: match &self.tag {
                TagFilter::All => None,
                TagFilter::Tag(tag) => Some(tag.clone()),
            },
            sort_by: Some(self.sort_field),
            sort_order: Some(self.sort_direction),
            start_date: self.date_start.and_then(format_date),
            end_date: self.date_end.and_then(format_date),
            min_read_time: self.min_read_time,
            max_read_time: self.max_read_time,
        }
    }
}

fn format_date(date: Date) -> Option<String> {
    date.format(format_description!("[year]-[month]-[day]")).ok()
}

/// Parse a `YYYY-MM-DD` date as typed into a date filter.
///
/// # Errors
///
/// Returns the parse error for malformed input.
pub fn parse_date(raw: &str) -> Result<Date, time::error::Parse> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
}

/// A partial change to [`Criteria`].
///
/// Nested `Option`s distinguish "leave unchanged" (`None`) from "clear the
/// bound" (`Some(None)`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CriteriaUpdate {
    pub search_text: Option<String>,
    pub tag: Option<TagFilter>,
    pub sort: Option<(SortField, SortDirection)>,
    pub date_start: Option<Option<Date>>,
    pub date_end: Option<Option<Date>>,
    pub min_read_time: Option<Option<u32>>,
    pub max_read_time: Option<Option<u32>>,
}

impl CriteriaUpdate {
    #[must_use]
    pub fn search(text: impl Into<String>) -> Self {
        Self { search_text: Some(text.into()), ..Self::default() }
    }

    #[must_use]
    pub fn tag(tag: impl Into<TagFilter>) -> Self {
        Self { tag: Some(tag.into()), ..Self::default() }
    }

    /// Sort by `field` in that field's default direction.
    #[must_use]
    pub fn sort_by(field: SortField) -> Self {
        Self::sort(field, field.default_direction())
    }

    #[must_use]
    pub fn sort(field: SortField, direction: SortDirection) -> Self {
        Self { sort: Some((field, direction)), ..Self::default() }
    }

    #[must_use]
    pub fn date_range(start: Option<Date>, end: Option<Date>) -> Self {
        Self { date_start: Some(start), date_end: Some(end), ..Self::default() }
    }

    #[must_use]
    pub fn read_time(min: Option<u32>, max: Option<u32>) -> Self {
        Self { min_read_time: Some(min), max_read_time: Some(max), ..Self::default() }
    }

    /// Whether this update changes only the free-text search, which is the one
    /// input whose refetch is debounced.
    #[must_use]
    pub fn is_search_only(&self) -> bool {
        self.search_text.is_some()
            && self.tag.is_none()
            && self.sort.is_none()
            && self.date_start.is_none()
            && self.date_end.is_none()
            && self.min_read_time.is_none()
            && self.max_read_time.is_none()
    }
}

/// Tag chips for the listing: `All` followed by the backend's popular tags.
///
/// Failures are logged and degrade to just `All`.
pub async fn popular_tag_filters(api: &dyn PostsApi) -> Vec<TagFilter> {
    let mut filters = vec![TagFilter::All];
    match api.popular_tags().await {
        Ok(resp) if resp.success => {
            for tag in resp.data.tags {
                let filter = TagFilter::parse(&tag);
                if !filters.contains(&filter) {
                    filters.push(filter);
                }
            }
        }
        Ok(resp) => {
            warn!(message = resp.message.as_deref().unwrap_or(""), "popular tags request rejected");
        }
        Err(e) => {
            warn!(error = %e, "failed to fetch popular tags");
        }
    }
    filters
}
