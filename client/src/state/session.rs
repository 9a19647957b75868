//! Authenticated-session state for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Route guards, the composer, and the CLI read identity from here. The token
//! and a cached user record live in durable storage so a session survives
//! restarts; the in-memory user is only set once the backend has vouched for
//! the token.
//!
//! DESIGN
//! ======
//! `bootstrap` runs at most once per store, behind a `OnceCell`. Concurrent
//! callers await the same validation. State changes are published through a
//! watch channel; no lock is ever held across an `.await`.
//!
//! Login, signup, and logout bump an epoch counter. A validation that started
//! under an older epoch only clears `loading`, so a slow `/auth/me` can never
//! overwrite a session established while it was in flight.
//!
//! ERROR HANDLING
//! ==============
//! Login and signup return their errors to the caller and leave the published
//! state untouched on failure. Bootstrap and logout never fail: problems
//! are logged and resolve to the signed-out state.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{OnceCell, watch};
use tracing::{debug, info, warn};

use crate::net::api::AuthApi;
use crate::net::error::ApiError;
use crate::net::types::{AuthResponse, Credentials, Registration, User};
use crate::storage::{DurableStorage, StorageError, TOKEN_KEY, USER_KEY};
use crate::util::validation::{validate_credentials, validate_registration};

/// Observable session snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    /// True until the first bootstrap completes.
    pub loading: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self { user: None, loading: true }
    }
}

pub struct SessionStore {
    api: Arc<dyn AuthApi>,
    storage: Arc<dyn DurableStorage>,
    bootstrapped: OnceCell<()>,
    /// Bumped by every login, signup, and logout.
    epoch: Mutex<u64>,
    updates: watch::Sender<SessionState>,
}

impl SessionStore {
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>, storage: Arc<dyn DurableStorage>) -> Self {
        let (updates, _) = watch::channel(SessionState::default());
        Self { api, storage, bootstrapped: OnceCell::new(), epoch: Mutex::new(0), updates }
    }

    // =========================================================================
    // BOOTSTRAP
    // =========================================================================

    /// Restore a persisted session by validating its token with the backend.
    ///
    /// Only the first call does any work; later and concurrent calls wait for
    /// that result. Always ends with `loading == false`.
    pub async fn bootstrap(&self) {
        self.bootstrapped.get_or_init(|| self.restore()).await;
    }

    async fn restore(&self) {
        let started = *self.lock_epoch();
        let outcome = match self.read_token() {
            Some(token) => Some(self.api.current_user(&token).await),
            None => None,
        };

        let epoch = self.lock_epoch();
        if *epoch != started {
            debug!("session changed during bootstrap; keeping it");
            self.updates.send_modify(|state| state.loading = false);
            return;
        }
        let user = self.apply_validation(outcome);
        match &user {
            Some(user) => info!(user_id = %user.id, "session restored"),
            None => debug!("no session to restore"),
        }
        self.updates.send_modify(|state| {
            state.user = user;
            state.loading = false;
        });
    }

    fn read_token(&self) -> Option<String> {
        match self.storage.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                warn!(error = %e, "failed to read session token");
                None
            }
        }
    }

    /// `None` means there was no token to validate.
    fn apply_validation(&self, outcome: Option<Result<Option<User>, ApiError>>) -> Option<User> {
        match outcome {
            Some(Ok(Some(user))) => {
                if let Err(e) = self.write_user(&user) {
                    warn!(error = %e, "failed to refresh cached user");
                }
                Some(user)
            }
            Some(Ok(None)) => {
                info!("persisted session rejected by backend");
                self.clear_persisted();
                None
            }
            Some(Err(e)) => {
                warn!(error = %e, "session validation failed");
                self.clear_persisted();
                None
            }
            None => {
                self.clear_persisted();
                None
            }
        }
    }

    fn lock_epoch(&self) -> MutexGuard<'_, u64> {
        self.epoch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // LOGIN / SIGNUP / LOGOUT
    // =========================================================================

    /// Validate `credentials`, sign in, and persist the new session.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] before any request if the form is
    /// invalid, the backend error if sign-in is rejected, or
    /// [`ApiError::Storage`] if the session cannot be persisted. State is left
    /// unchanged in every error case.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        validate_credentials(credentials)?;
        let response = self.api.login(credentials).await?;
        self.establish(response)
    }

    /// Validate `registration`, create the account, and sign in as it.
    ///
    /// # Errors
    ///
    /// Same contract as [`SessionStore::login`].
    pub async fn signup(&self, registration: &Registration) -> Result<User, ApiError> {
        validate_registration(registration)?;
        let response = self.api.signup(registration).await?;
        self.establish(response)
    }

    fn establish(&self, response: AuthResponse) -> Result<User, ApiError> {
        let AuthResponse { user, token } = response;
        let mut epoch = self.lock_epoch();
        *epoch += 1;
        if let Err(e) = self.persist(&token, &user) {
            self.clear_persisted();
            return Err(e.into());
        }
        info!(user_id = %user.id, "signed in");
        self.updates.send_modify(|state| state.user = Some(user.clone()));
        Ok(user)
    }

    /// Forget the session locally, then tell the backend on a best-effort
    /// basis. Local state is cleared even if the backend is unreachable.
    pub async fn logout(&self) {
        let token = {
            let mut epoch = self.lock_epoch();
            *epoch += 1;
            let token = self.read_token();
            self.clear_persisted();
            self.updates.send_modify(|state| state.user = None);
            token
        };
        info!("signed out");

        if let Some(token) = token {
            if let Err(e) = self.api.logout(&token).await {
                warn!(error = %e, "backend logout failed");
            }
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.updates.borrow().user.is_some()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.updates.borrow().user.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.updates.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.updates.subscribe()
    }

    /// The persisted session token, if any.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.read_token()
    }

    /// The token for an authenticated call.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthenticated`] when no session is active.
    pub fn require_token(&self) -> Result<String, ApiError> {
        if !self.is_authenticated() {
            return Err(ApiError::Unauthenticated);
        }
        self.read_token().ok_or(ApiError::Unauthenticated)
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    fn persist(&self, token: &str, user: &User) -> Result<(), StorageError> {
        self.storage.set(TOKEN_KEY, token)?;
        self.write_user(user)
    }

    fn write_user(&self, user: &User) -> Result<(), StorageError> {
        let raw = serde_json::to_string(user).map_err(StorageError::Encode)?;
        self.storage.set(USER_KEY, &raw)
    }

    fn clear_persisted(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "failed to clear session storage");
            }
        }
    }
}
