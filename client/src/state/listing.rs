//! Paginated, filterable post listing.
//!
//! SYSTEM CONTEXT
//! ==============
//! Backs the explore view. Criteria edits restart pagination, `load_more`
//! appends the next page, and observers follow [`ListingState`] snapshots
//! through a watch channel.
//!
//! DESIGN
//! ======
//! Every issued fetch takes the next value of a generation counter. A response
//! is applied only if its generation is still the latest when it resolves;
//! anything older is dropped. Criteria edits and `load_more` both advance the
//! counter, so at most one response applies per generation.
//!
//! Search-text edits arm a single debounce timer task. Re-arming aborts the
//! previous task, so a burst of keystrokes yields one fetch. Any other
//! criteria edit cancels the timer and fetches immediately with whatever
//! search text is current.
//!
//! Spawned tasks hold only a `Weak` handle. Dropping the last `ListingQuery`
//! aborts the timer and lets in-flight fetches resolve into nothing.
//!
//! ERROR HANDLING
//! ==============
//! Fetch failures land on the state as `error` with `FetchStatus::Failed` and
//! are never propagated. Items and `has_more` keep their previous values, but
//! `load_more` stays refused until page 1 of the current criteria applies.

#[cfg(test)]
#[path = "listing_test.rs"]
mod listing_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::ListingConfig;
use crate::net::api::PostsApi;
use crate::net::error::ApiError;
use crate::net::types::{ListPostsResponse, PostSummary};
use crate::state::criteria::{Criteria, CriteriaUpdate};

const FETCH_FAILED_MESSAGE: &str = "failed to fetch blogs";

// =============================================================================
// STATE
// =============================================================================

/// Where the listing is in its fetch lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FetchStatus {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// A search edit is waiting out the quiet period.
    Debouncing,
    Fetching,
    Loaded,
    Failed,
}

impl FetchStatus {
    /// Whether a fetch is pending or in flight.
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Debouncing | Self::Fetching)
    }
}

/// Observable listing snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct ListingState {
    pub criteria: Criteria,
    /// 1-based index of the last page requested for these criteria.
    pub page: u32,
    /// Every applied page concatenated in request order. Ids may repeat.
    pub items: Vec<PostSummary>,
    /// True iff the most recently applied page came back full.
    pub has_more: bool,
    pub total_count: u64,
    pub status: FetchStatus,
    pub error: Option<String>,
}

impl Default for ListingState {
    fn default() -> Self {
        Self {
            criteria: Criteria::default(),
            page: 1,
            items: Vec::new(),
            has_more: false,
            total_count: 0,
            status: FetchStatus::Idle,
            error: None,
        }
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

struct Control {
    state: ListingState,
    /// Generation of the most recently issued fetch or armed timer.
    seq: u64,
    /// Last page applied under the current criteria; 0 until page 1 lands.
    applied_page: u32,
    pending_timer: Option<JoinHandle<()>>,
}

impl Control {
    /// Start a new generation, cancelling any armed timer.
    fn advance(&mut self) -> u64 {
        self.seq += 1;
        if let Some(timer) = self.pending_timer.take() {
            timer.abort();
        }
        self.seq
    }
}

struct Shared {
    api: Arc<dyn PostsApi>,
    config: ListingConfig,
    control: Mutex<Control>,
    updates: watch::Sender<ListingState>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let control = self.control.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = control.pending_timer.take() {
            timer.abort();
        }
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, control: &Control) {
        self.updates.send_replace(control.state.clone());
    }

    fn arm_timer(self: &Arc<Self>, seq: u64) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let delay = self.config.search_debounce;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = weak.upgrade() {
                shared.fire_timer(seq);
            }
        })
    }

    fn fire_timer(self: &Arc<Self>, seq: u64) {
        let mut control = self.lock();
        if control.seq != seq {
            return;
        }
        control.pending_timer = None;
        self.issue(&mut control, seq);
        self.publish(&control);
    }

    fn issue(self: &Arc<Self>, control: &mut Control, seq: u64) {
        control.state.status = FetchStatus::Fetching;
        control.state.error = None;
        let page = control.state.page;
        let query = control.state.criteria.to_query(page, self.config.page_size);
        debug!(seq, page, search = query.search.as_deref().unwrap_or(""), "fetching posts");

        let weak = Arc::downgrade(self);
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            let result = api.list_posts(&query).await;
            if let Some(shared) = weak.upgrade() {
                shared.resolve(seq, page, result);
            }
        });
    }

    fn resolve(&self, seq: u64, page: u32, result: Result<ListPostsResponse, ApiError>) {
        let mut control = self.lock();
        if control.seq != seq {
            debug!(seq, latest = control.seq, "discarding stale listing response");
            return;
        }

        let control = &mut *control;
        let state = &mut control.state;
        match result {
            Ok(response) if response.success => {
                control.applied_page = page;
                let fetched = response.data.posts;
                state.has_more = usize::try_from(self.config.page_size).is_ok_and(|size| fetched.len() == size);
                if page <= 1 {
                    state.items = fetched;
                } else {
                    state.items.extend(fetched);
                }
                state.total_count = response.data.total;
                state.status = FetchStatus::Loaded;
                state.error = None;
            }
            Ok(response) => {
                let message = response.message.unwrap_or_else(|| FETCH_FAILED_MESSAGE.to_owned());
                warn!(page, %message, "listing request rejected");
                record_failure(state, page, message);
            }
            Err(e) => {
                warn!(page, error = %e, "listing request failed");
                record_failure(state, page, e.to_string());
            }
        }
        self.publish(control);
    }
}

/// A failed page is not counted as applied, so the next `load_more` retries it.
fn record_failure(state: &mut ListingState, page: u32, message: String) {
    state.status = FetchStatus::Failed;
    state.error = Some(message);
    if page > 1 {
        state.page = page - 1;
    }
}

/// Handle to one listing. Clones share the same state.
///
/// Mutating methods spawn onto the current Tokio runtime and must be called
/// from within one.
#[derive(Clone)]
pub struct ListingQuery {
    shared: Arc<Shared>,
}

impl ListingQuery {
    #[must_use]
    pub fn new(api: Arc<dyn PostsApi>, config: ListingConfig) -> Self {
        let (updates, _) = watch::channel(ListingState::default());
        let control = Control { state: ListingState::default(), seq: 0, applied_page: 0, pending_timer: None };
        Self { shared: Arc::new(Shared { api, config, control: Mutex::new(control), updates }) }
    }

    /// Merge `update` into the criteria and restart from page 1.
    ///
    /// A change to search text alone is debounced; any other change fetches
    /// immediately and cancels a pending debounce.
    pub fn set_criteria(&self, update: CriteriaUpdate) {
        let debounce = update.is_search_only() && !self.shared.config.search_debounce.is_zero();
        let mut control = self.shared.lock();
        control.state.criteria.apply(update);
        control.state.page = 1;
        control.state.items.clear();
        control.applied_page = 0;
        let seq = control.advance();
        if debounce {
            control.state.status = FetchStatus::Debouncing;
            control.pending_timer = Some(self.shared.arm_timer(seq));
        } else {
            self.shared.issue(&mut control, seq);
        }
        self.shared.publish(&control);
    }

    /// Request the next page for the current criteria.
    ///
    /// Returns `false` without fetching when the last page was short, a fetch
    /// is already pending, or page 1 of the current criteria has not landed.
    pub fn load_more(&self) -> bool {
        let mut control = self.shared.lock();
        let page_applied = control.applied_page == control.state.page;
        if control.state.status.is_busy() || !control.state.has_more || !page_applied {
            return false;
        }
        control.state.page += 1;
        let seq = control.advance();
        self.shared.issue(&mut control, seq);
        self.shared.publish(&control);
        true
    }

    /// Re-issue page 1 for the current criteria.
    pub fn refresh(&self) {
        self.set_criteria(CriteriaUpdate::default());
    }

    #[must_use]
    pub fn snapshot(&self) -> ListingState {
        self.shared.updates.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ListingState> {
        self.shared.updates.subscribe()
    }

    /// Wait until no fetch is pending or in flight, then return the state.
    pub async fn settled(&self) -> ListingState {
        let mut rx = self.subscribe();
        loop {
            {
                let state = rx.borrow_and_update();
                if !state.status.is_busy() {
                    return state.clone();
                }
            }
            if rx.changed().await.is_err() {
                return self.snapshot();
            }
        }
    }
}
