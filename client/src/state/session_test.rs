use super::*;
use crate::storage::MemoryStorage;
use crate::test_helpers::{MockAuthApi, auth_response, sample_user};

fn store(api: &Arc<MockAuthApi>, storage: &Arc<MemoryStorage>) -> SessionStore {
    SessionStore::new(api.clone(), storage.clone())
}

fn credentials() -> Credentials {
    Credentials { email: "alice@example.com".into(), password: "hunter22".into() }
}

fn registration() -> Registration {
    Registration {
        name: "Alice".into(),
        email: "alice@example.com".into(),
        password: "hunter22".into(),
        confirm_password: "hunter22".into(),
        avatar: None,
    }
}

/// Storage whose writes always fail.
struct ReadOnlyStorage;

impl DurableStorage for ReadOnlyStorage {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Poisoned)
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

// =============================================================
// Bootstrap
// =============================================================

#[tokio::test]
async fn new_store_is_loading_and_signed_out() {
    let store = store(&Arc::new(MockAuthApi::new()), &Arc::new(MemoryStorage::new()));
    let state = store.snapshot();
    assert!(state.loading);
    assert_eq!(state.user, None);
    assert!(!store.is_authenticated());
}

#[tokio::test]
async fn bootstrap_without_token_skips_backend_and_drops_stale_user() {
    let api = Arc::new(MockAuthApi::new());
    let storage = Arc::new(MemoryStorage::new());
    storage.set(USER_KEY, &serde_json::to_string(&sample_user("u1")).unwrap()).unwrap();
    let store = store(&api, &storage);

    store.bootstrap().await;

    assert_eq!(api.current_user_calls(), 0);
    assert!(!store.snapshot().loading);
    assert!(!store.is_authenticated());
    assert_eq!(storage.get(USER_KEY).unwrap(), None);
}

#[tokio::test]
async fn bootstrap_with_valid_token_restores_user() {
    let api = Arc::new(MockAuthApi::new());
    *api.current_user_reply.lock().unwrap() = Some(Ok(Some(sample_user("u1"))));
    let storage = Arc::new(MemoryStorage::new());
    storage.set(TOKEN_KEY, "t1").unwrap();
    let store = store(&api, &storage);

    store.bootstrap().await;

    assert!(store.is_authenticated());
    assert_eq!(store.current_user().map(|u| u.id), Some("u1".to_owned()));
    let cached: User = serde_json::from_str(&storage.get(USER_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(cached.id, "u1");
    assert_eq!(store.token().as_deref(), Some("t1"));
}

#[tokio::test]
async fn bootstrap_with_rejected_token_clears_storage() {
    let api = Arc::new(MockAuthApi::new());
    *api.current_user_reply.lock().unwrap() = Some(Ok(None));
    let storage = Arc::new(MemoryStorage::new());
    storage.set(TOKEN_KEY, "expired").unwrap();
    let store = store(&api, &storage);

    store.bootstrap().await;

    assert!(!store.is_authenticated());
    assert!(!store.snapshot().loading);
    assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn login_during_bootstrap_survives_stale_rejection() {
    let api = Arc::new(MockAuthApi::new());
    *api.current_user_reply.lock().unwrap() = Some(Ok(None));
    *api.login_reply.lock().unwrap() = Some(Ok(auth_response("u2", "fresh")));
    let release = api.gate_current_user();
    let storage = Arc::new(MemoryStorage::new());
    storage.set(TOKEN_KEY, "expired").unwrap();
    let store = store(&api, &storage);

    tokio::join!(biased; store.bootstrap(), async {
        store.login(&credentials()).await.unwrap();
        release.send(()).unwrap();
    });

    assert_eq!(api.current_user_calls(), 1);
    assert_eq!(store.current_user().map(|u| u.id), Some("u2".to_owned()));
    assert!(!store.snapshot().loading);
    assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn logout_during_bootstrap_is_not_undone_by_validation() {
    let api = Arc::new(MockAuthApi::new());
    *api.current_user_reply.lock().unwrap() = Some(Ok(Some(sample_user("u1"))));
    let release = api.gate_current_user();
    let storage = Arc::new(MemoryStorage::new());
    storage.set(TOKEN_KEY, "t1").unwrap();
    let store = store(&api, &storage);

    tokio::join!(biased; store.bootstrap(), async {
        store.logout().await;
        release.send(()).unwrap();
    });

    assert!(!store.is_authenticated());
    assert!(!store.snapshot().loading);
    assert_eq!(storage.get(USER_KEY).unwrap(), None);
}

#[tokio::test]
async fn bootstrap_with_unreachable_backend_clears_storage() {
    let api = Arc::new(MockAuthApi::new());
    *api.current_user_reply.lock().unwrap() = Some(Err(ApiError::Transport("timed out".into())));
    let storage = Arc::new(MemoryStorage::new());
    storage.set(TOKEN_KEY, "t1").unwrap();
    let store = store(&api, &storage);

    store.bootstrap().await;

    assert!(!store.is_authenticated());
    assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn concurrent_bootstraps_validate_once() {
    let api = Arc::new(MockAuthApi::new());
    *api.current_user_reply.lock().unwrap() = Some(Ok(Some(sample_user("u1"))));
    let storage = Arc::new(MemoryStorage::new());
    storage.set(TOKEN_KEY, "t1").unwrap();
    let store = store(&api, &storage);

    tokio::join!(store.bootstrap(), store.bootstrap(), store.bootstrap());
    store.bootstrap().await;

    assert_eq!(api.current_user_calls(), 1);
    assert!(store.is_authenticated());
}

#[tokio::test]
async fn subscribers_observe_bootstrap_completion() {
    let api = Arc::new(MockAuthApi::new());
    let store = store(&api, &Arc::new(MemoryStorage::new()));
    let mut rx = store.subscribe();
    assert!(rx.borrow_and_update().loading);

    store.bootstrap().await;

    assert!(rx.has_changed().unwrap());
    assert!(!rx.borrow_and_update().loading);
}

// =============================================================
// Login / signup
// =============================================================

#[tokio::test]
async fn login_success_persists_and_publishes() {
    let api = Arc::new(MockAuthApi::new());
    *api.login_reply.lock().unwrap() = Some(Ok(auth_response("u1", "t1")));
    let storage = Arc::new(MemoryStorage::new());
    let store = store(&api, &storage);

    let user = store.login(&credentials()).await.unwrap();

    assert_eq!(user.id, "u1");
    assert!(store.is_authenticated());
    assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("t1"));
    assert!(storage.get(USER_KEY).unwrap().is_some());
}

#[tokio::test]
async fn login_failure_changes_nothing() {
    let api = Arc::new(MockAuthApi::new());
    let storage = Arc::new(MemoryStorage::new());
    let store = store(&api, &storage);
    let before = store.snapshot();

    let err = store.login(&credentials()).await.unwrap_err();

    assert_eq!(err.to_string(), "Invalid credentials");
    assert_eq!(store.snapshot(), before);
    assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    assert_eq!(storage.get(USER_KEY).unwrap(), None);
}

#[tokio::test]
async fn invalid_login_form_never_reaches_backend() {
    let api = Arc::new(MockAuthApi::new());
    *api.login_reply.lock().unwrap() = Some(Ok(auth_response("u1", "t1")));
    let store = store(&api, &Arc::new(MemoryStorage::new()));

    let bad = Credentials { email: "not-an-email".into(), password: String::new() };
    let err = store.login(&bad).await.unwrap_err();

    assert_eq!(err.error_code(), "E_VALIDATION");
    assert!(api.login_reply.lock().unwrap().is_some());
    assert!(!store.is_authenticated());
}

#[tokio::test]
async fn login_with_unwritable_storage_reports_storage_error() {
    let api = Arc::new(MockAuthApi::new());
    *api.login_reply.lock().unwrap() = Some(Ok(auth_response("u1", "t1")));
    let store = SessionStore::new(api.clone(), Arc::new(ReadOnlyStorage));

    let err = store.login(&credentials()).await.unwrap_err();

    assert_eq!(err.error_code(), "E_STORAGE");
    assert!(!store.is_authenticated());
}

#[tokio::test]
async fn signup_signs_in_as_new_account() {
    let api = Arc::new(MockAuthApi::new());
    *api.signup_reply.lock().unwrap() = Some(Ok(auth_response("u9", "t9")));
    let storage = Arc::new(MemoryStorage::new());
    let store = store(&api, &storage);

    let user = store.signup(&registration()).await.unwrap();

    assert_eq!(user.id, "u9");
    assert!(store.is_authenticated());
    assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("t9"));
    assert_eq!(api.signups.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn signup_with_mismatched_passwords_is_rejected_locally() {
    let api = Arc::new(MockAuthApi::new());
    let store = store(&api, &Arc::new(MemoryStorage::new()));
    let mut form = registration();
    form.confirm_password = "different".into();

    let err = store.signup(&form).await.unwrap_err();

    match err {
        ApiError::Validation(errors) => {
            assert_eq!(errors.for_field("confirm_password"), Some("passwords do not match"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(api.signups.lock().unwrap().is_empty());
}

#[tokio::test]
async fn signup_rejected_by_backend_surfaces_message() {
    let api = Arc::new(MockAuthApi::new());
    let store = store(&api, &Arc::new(MemoryStorage::new()));

    let err = store.signup(&registration()).await.unwrap_err();

    assert_eq!(err.to_string(), "User already exists");
    assert!(!store.is_authenticated());
}

// =============================================================
// Logout and tokens
// =============================================================

#[tokio::test]
async fn logout_clears_session_even_when_backend_unreachable() {
    let api = Arc::new(MockAuthApi::new());
    *api.login_reply.lock().unwrap() = Some(Ok(auth_response("u1", "t1")));
    *api.logout_unreachable.lock().unwrap() = true;
    let storage = Arc::new(MemoryStorage::new());
    let store = store(&api, &storage);
    store.login(&credentials()).await.unwrap();

    store.logout().await;

    assert!(!store.is_authenticated());
    assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    assert_eq!(storage.get(USER_KEY).unwrap(), None);
    assert_eq!(*api.logout_tokens.lock().unwrap(), vec!["t1".to_owned()]);
}

#[tokio::test]
async fn logout_without_session_skips_backend() {
    let api = Arc::new(MockAuthApi::new());
    let store = store(&api, &Arc::new(MemoryStorage::new()));

    store.logout().await;

    assert!(api.logout_tokens.lock().unwrap().is_empty());
    assert!(!store.is_authenticated());
}

#[tokio::test]
async fn require_token_needs_an_active_session() {
    let api = Arc::new(MockAuthApi::new());
    *api.login_reply.lock().unwrap() = Some(Ok(auth_response("u1", "t1")));
    let store = store(&api, &Arc::new(MemoryStorage::new()));

    assert!(matches!(store.require_token(), Err(ApiError::Unauthenticated)));

    store.login(&credentials()).await.unwrap();
    assert_eq!(store.require_token().unwrap(), "t1");

    store.logout().await;
    assert!(matches!(store.require_token(), Err(ApiError::Unauthenticated)));
}
