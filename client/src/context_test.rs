use super::*;
use crate::storage::MemoryStorage;
use crate::test_helpers::{MockAuthApi, MockPostsApi, sample_posts};

fn context(posts: &Arc<MockPostsApi>) -> ClientContext {
    ClientContext::with_parts(
        "http://localhost:5000/api/",
        ListingConfig::default(),
        Arc::new(MockAuthApi::new()),
        posts.clone(),
        Arc::new(MemoryStorage::new()),
    )
}

#[test]
fn with_parts_trims_api_url() {
    let ctx = context(&Arc::new(MockPostsApi::new()));
    assert_eq!(ctx.api_url, "http://localhost:5000/api");
}

#[tokio::test]
async fn listings_share_posts_api_but_not_state() {
    let posts = Arc::new(MockPostsApi::new());
    posts.push_page(sample_posts("p", 3), 3);
    let ctx = context(&posts);

    let first = ctx.listing();
    let second = ctx.listing();
    first.refresh();
    first.settled().await;

    assert_eq!(first.snapshot().items.len(), 3);
    assert!(second.snapshot().items.is_empty());
    assert_eq!(posts.list_calls().len(), 1);
}

#[test]
fn from_config_builds_file_backed_context() {
    let dir = tempfile::tempdir().unwrap();
    let config = ClientConfig { state_dir: dir.path().to_path_buf(), ..ClientConfig::default() };

    let ctx = ClientContext::from_config(&config).unwrap();

    assert_eq!(ctx.api_url, config.api_url);
    assert!(!ctx.session.is_authenticated());
    assert_eq!(ctx.listing.page_size, 9);
}
