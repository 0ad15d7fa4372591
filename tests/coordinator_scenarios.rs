use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use pressroom::application::articles::{ArticleService, CreateArticleCommand};
use pressroom::application::error::ServiceError;
use pressroom::application::repos::{ArticleQuery, ArticlesRepo, TagFilter, TagQuery};
use pressroom::application::tags::{CreateTagCommand, TagService};
use pressroom::cache::{CacheAside, CacheStore, CacheStoreError, KeyDeriver, MemoryStore};
use pressroom::domain::entities::{ArticleRecord, TagRecord};
use pressroom::domain::patch::{ArticlePatch, TagPatch};
use pressroom::domain::types::RecordState;
use pressroom::infra::memory::InMemoryRepositories;

struct Harness {
    repos: InMemoryRepositories,
    articles: ArticleService,
    tags: TagService,
}

fn harness_with(store: Arc<dyn CacheStore>, ttl: Duration) -> Harness {
    let repos = InMemoryRepositories::new();
    let cache = CacheAside::new(store, KeyDeriver::new("test"), ttl);
    let shared = Arc::new(repos.clone());
    let articles = ArticleService::new(shared.clone(), shared.clone(), shared.clone(), cache.clone());
    let tags = TagService::new(shared.clone(), shared, cache);
    Harness {
        repos,
        articles,
        tags,
    }
}

fn memory_harness() -> Harness {
    let store = MemoryStore::new(NonZeroUsize::new(256).expect("non-zero"));
    harness_with(Arc::new(store), Duration::from_secs(60))
}

/// Every command fails as if the server were unreachable.
struct UnavailableStore;

#[async_trait]
impl CacheStore for UnavailableStore {
    fn backend(&self) -> &'static str {
        "unavailable"
    }

    async fn exists(&self, _key: &str) -> Result<bool, CacheStoreError> {
        Err(CacheStoreError::Unavailable("connection refused".to_string()))
    }

    async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheStoreError> {
        Err(CacheStoreError::Unavailable("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: Bytes, _ttl: Duration) -> Result<(), CacheStoreError> {
        Err(CacheStoreError::Timeout(Duration::from_millis(250)))
    }
}

/// Claims every key exists and returns bytes that do not decode.
struct CorruptStore;

#[async_trait]
impl CacheStore for CorruptStore {
    fn backend(&self) -> &'static str {
        "corrupt"
    }

    async fn exists(&self, _key: &str) -> Result<bool, CacheStoreError> {
        Ok(true)
    }

    async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheStoreError> {
        Ok(Some(Bytes::from_static(b"{\"id\":\"not-a-number\"")))
    }

    async fn set(&self, _key: &str, _value: Bytes, _ttl: Duration) -> Result<(), CacheStoreError> {
        Ok(())
    }
}

async fn add_tag(tags: &TagService, name: &str, state: RecordState) -> TagRecord {
    tags.add(CreateTagCommand {
        name: name.to_string(),
        state,
        created_by: "alice".to_string(),
    })
    .await
    .expect("add tag")
}

async fn add_article(articles: &ArticleService, tag_id: i64, title: &str) -> ArticleRecord {
    articles
        .add(CreateArticleCommand {
            tag_id,
            title: title.to_string(),
            description: "about".to_string(),
            content: "body".to_string(),
            cover_image_url: "https://img.example/c.png".to_string(),
            state: RecordState::Published,
            created_by: "alice".to_string(),
        })
        .await
        .expect("add article")
}

#[tokio::test]
async fn edited_article_is_served_stale_until_ttl_expires() {
    let store = MemoryStore::new(NonZeroUsize::new(64).expect("non-zero"));
    let h = harness_with(Arc::new(store), Duration::from_millis(150));
    let tag = add_tag(&h.tags, "go", RecordState::Published).await;
    for title in ["one", "two", "three", "four", "five", "six"] {
        add_article(&h.articles, tag.id, title).await;
    }
    let original = add_article(&h.articles, tag.id, "seven").await;
    assert_eq!(original.id, 7);

    let first = h.articles.get_by_id(7).await.expect("cold read");
    assert_eq!(first.title, "seven");

    let edited = h
        .articles
        .edit(7, ArticlePatch::default().title("new").modified_by("bob"))
        .await
        .expect("edit");
    assert_eq!(edited.title, "new");

    let stale = h.articles.get_by_id(7).await.expect("warm read");
    assert_eq!(stale.title, "seven");

    let stored = ArticlesRepo::find_by_id(&h.repos, 7)
        .await
        .expect("repo read")
        .expect("present");
    assert_eq!(stored.title, "new");

    tokio::time::sleep(Duration::from_millis(300)).await;
    let fresh = h.articles.get_by_id(7).await.expect("read after ttl");
    assert_eq!(fresh.title, "new");
}

#[tokio::test]
async fn added_tag_is_counted_and_listed() {
    let h = memory_harness();
    add_tag(&h.tags, "rust", RecordState::Published).await;
    add_tag(&h.tags, "draft", RecordState::Hidden).await;

    let published = TagFilter {
        state: Some(RecordState::Published),
        ..Default::default()
    };
    let before = h.tags.count(&published).await.expect("count");

    let tag = add_tag(&h.tags, "go", RecordState::Published).await;
    assert_eq!(tag.created_by, "alice");
    assert!(h.tags.exists_by_name("go").await.expect("exists"));
    assert_eq!(h.tags.count(&published).await.expect("count"), before + 1);

    let page = h
        .tags
        .get_collection(&TagQuery::new().state(RecordState::Published).page(1, 10))
        .await
        .expect("collection");
    assert!(page.iter().any(|listed| listed.name == "go"));
    assert!(page.iter().all(|listed| listed.state == RecordState::Published));
}

#[tokio::test]
async fn cached_collection_does_not_see_later_adds_but_count_does() {
    let h = memory_harness();
    add_tag(&h.tags, "a", RecordState::Published).await;

    let query = TagQuery::new().page(1, 10);
    let listing = h.tags.list(&query).await.expect("list");
    assert_eq!((listing.items.len(), listing.total), (1, 1));

    add_tag(&h.tags, "b", RecordState::Published).await;
    let listing = h.tags.list(&query).await.expect("list");
    assert_eq!(listing.items.len(), 1);
    assert_eq!(listing.total, 2);
}

#[tokio::test]
async fn warm_reads_match_cold_reads_without_touching_the_repository() {
    let h = memory_harness();
    let tag = add_tag(&h.tags, "go", RecordState::Published).await;
    add_article(&h.articles, tag.id, "hello").await;

    let query = ArticleQuery::new().tag_id(tag.id).page(1, 10);
    let cold_single = h.articles.get_by_id(1).await.expect("cold");
    let cold_list = h.articles.get_collection(&query).await.expect("cold list");
    let reads_after_cold = h.repos.record_reads();

    let warm_single = h.articles.get_by_id(1).await.expect("warm");
    let warm_list = h.articles.get_collection(&query).await.expect("warm list");

    assert_eq!(cold_single, warm_single);
    assert_eq!(cold_list, warm_list);
    assert_eq!(h.repos.record_reads(), reads_after_cold);
}

#[tokio::test]
async fn unset_state_and_hidden_state_use_separate_entries() {
    let h = memory_harness();
    add_tag(&h.tags, "shown", RecordState::Published).await;
    add_tag(&h.tags, "hidden", RecordState::Hidden).await;

    let all = h
        .tags
        .get_collection(&TagQuery::new().page(1, 10))
        .await
        .expect("all");
    let hidden = h
        .tags
        .get_collection(&TagQuery::new().state(RecordState::Hidden).page(1, 10))
        .await
        .expect("hidden");
    let second_page = h
        .tags
        .get_collection(&TagQuery::new().page(2, 1))
        .await
        .expect("page two");

    assert_eq!(all.len(), 2);
    assert_eq!(hidden.len(), 1);
    assert_eq!(hidden[0].name, "hidden");
    assert_eq!(second_page.len(), 1);
    assert_eq!(second_page[0].name, "hidden");

    let all_again = h
        .tags
        .get_collection(&TagQuery::new().page(1, 10))
        .await
        .expect("all again");
    assert_eq!(all, all_again);
}

#[tokio::test]
async fn edit_changes_only_supplied_fields() {
    let h = memory_harness();
    let tag = add_tag(&h.tags, "go", RecordState::Published).await;
    let before = add_article(&h.articles, tag.id, "old").await;

    let after = h
        .articles
        .edit(before.id, ArticlePatch::default().title("T").modified_by("bob"))
        .await
        .expect("edit");

    assert_eq!(after.title, "T");
    assert_eq!(after.modified_by, "bob");
    assert_eq!(after.id, before.id);
    assert_eq!(after.tag_id, before.tag_id);
    assert_eq!(after.description, before.description);
    assert_eq!(after.content, before.content);
    assert_eq!(after.cover_image_url, before.cover_image_url);
    assert_eq!(after.state, before.state);
    assert_eq!(after.created_by, before.created_by);
    assert_eq!(after.created_at, before.created_at);
}

#[tokio::test]
async fn deleted_record_is_not_found_even_when_cached() {
    let h = memory_harness();
    let tag = add_tag(&h.tags, "go", RecordState::Published).await;
    h.tags.get_by_id(tag.id).await.expect("populate");

    h.tags.delete(tag.id).await.expect("delete");
    let err = h.tags.get_by_id(tag.id).await.expect_err("deleted");
    assert!(err.is_not_found());
    assert!(h.tags.delete(tag.id).await.expect_err("absent").is_not_found());
}

#[tokio::test]
async fn repository_failure_is_storage_not_not_found() {
    let h = memory_harness();
    let tag = add_tag(&h.tags, "go", RecordState::Published).await;
    h.tags.get_by_id(tag.id).await.expect("populate");

    h.repos.set_unavailable(true);
    let err = h.tags.get_by_id(tag.id).await.expect_err("storage down");
    assert!(err.is_storage());
    assert!(!err.is_not_found());

    h.repos.set_unavailable(false);
    let err = h.tags.get_by_id(999).await.expect_err("absent");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn article_add_and_edit_require_existing_tag() {
    let h = memory_harness();
    let tag = add_tag(&h.tags, "go", RecordState::Published).await;
    let article = add_article(&h.articles, tag.id, "hello").await;

    let err = h
        .articles
        .add(CreateArticleCommand {
            tag_id: 42,
            title: "orphan".to_string(),
            description: String::new(),
            content: "body".to_string(),
            cover_image_url: "https://img.example/c.png".to_string(),
            state: RecordState::Published,
            created_by: "alice".to_string(),
        })
        .await
        .expect_err("missing tag");
    assert!(matches!(err, ServiceError::NotFound { entity: "tag" }));

    let err = h
        .articles
        .edit(article.id, ArticlePatch::default().tag_id(42).modified_by("bob"))
        .await
        .expect_err("missing tag");
    assert!(matches!(err, ServiceError::NotFound { entity: "tag" }));
}

#[tokio::test]
async fn duplicate_tag_name_is_rejected_and_rename_is_allowed() {
    let h = memory_harness();
    let tag = add_tag(&h.tags, "go", RecordState::Published).await;

    let err = h
        .tags
        .add(CreateTagCommand {
            name: "go".to_string(),
            state: RecordState::Hidden,
            created_by: "bob".to_string(),
        })
        .await
        .expect_err("duplicate");
    assert!(matches!(err, ServiceError::AlreadyExists { .. }));

    let renamed = h
        .tags
        .edit(tag.id, TagPatch::default().name("golang").modified_by("bob"))
        .await
        .expect("rename");
    assert_eq!(renamed.name, "golang");
    assert_eq!(renamed.state, RecordState::Published);
    assert!(!h.tags.exists_by_name("go").await.expect("exists"));
}

#[derive(Debug, PartialEq)]
struct Observed {
    singles: Vec<ArticleRecord>,
    tag_singles: Vec<TagRecord>,
    collections: Vec<Vec<ArticleRecord>>,
    tag_collections: Vec<Vec<TagRecord>>,
}

async fn read_scenario(h: &Harness) -> Observed {
    let mut observed = Observed {
        singles: Vec::new(),
        tag_singles: Vec::new(),
        collections: Vec::new(),
        tag_collections: Vec::new(),
    };
    let article_queries = [
        ArticleQuery::new().page(1, 2),
        ArticleQuery::new().page(2, 2),
        ArticleQuery::new().tag_id(1),
        ArticleQuery::new().state(RecordState::Hidden).page(1, 10),
    ];
    let tag_queries = [
        TagQuery::new().page(1, 10),
        TagQuery::new().name("go"),
        TagQuery::new().state(RecordState::Hidden),
    ];

    // Twice: the second pass is warm when a cache is available.
    for _ in 0..2 {
        for id in 1..=3 {
            observed
                .singles
                .push(h.articles.get_by_id(id).await.expect("article"));
        }
        for id in 1..=2 {
            observed
                .tag_singles
                .push(h.tags.get_by_id(id).await.expect("tag"));
        }
        for query in &article_queries {
            observed
                .collections
                .push(h.articles.get_collection(query).await.expect("articles"));
        }
        for query in &tag_queries {
            observed
                .tag_collections
                .push(h.tags.get_collection(query).await.expect("tags"));
        }
    }
    observed
}

async fn seed(h: &Harness) {
    let go = add_tag(&h.tags, "go", RecordState::Published).await;
    let rust = add_tag(&h.tags, "rust", RecordState::Hidden).await;
    add_article(&h.articles, go.id, "first").await;
    add_article(&h.articles, rust.id, "second").await;
    let third = add_article(&h.articles, go.id, "third").await;
    h.articles
        .edit(
            third.id,
            ArticlePatch::default()
                .state(RecordState::Hidden)
                .modified_by("bob"),
        )
        .await
        .expect("hide");
}

fn without_timestamps(mut observed: Observed) -> Observed {
    let epoch = time::OffsetDateTime::UNIX_EPOCH;
    let clear_article = |article: &mut ArticleRecord| {
        article.created_at = epoch;
        article.modified_at = epoch;
    };
    let clear_tag = |tag: &mut TagRecord| {
        tag.created_at = epoch;
        tag.modified_at = epoch;
    };
    observed.singles.iter_mut().for_each(clear_article);
    observed
        .collections
        .iter_mut()
        .flatten()
        .for_each(clear_article);
    observed.tag_singles.iter_mut().for_each(clear_tag);
    observed
        .tag_collections
        .iter_mut()
        .flatten()
        .for_each(clear_tag);
    observed
}

#[tokio::test]
async fn unavailable_store_returns_the_same_results_as_a_working_cache() {
    let cached = memory_harness();
    seed(&cached).await;
    let with_cache = read_scenario(&cached).await;

    let degraded = harness_with(Arc::new(UnavailableStore), Duration::from_secs(60));
    seed(&degraded).await;
    let reads_before = degraded.repos.record_reads();
    let without_cache = read_scenario(&degraded).await;

    assert_eq!(
        without_timestamps(with_cache),
        without_timestamps(without_cache)
    );
    // Every read fell through: 3 + 2 singles and 4 + 3 collections, twice.
    assert_eq!(degraded.repos.record_reads() - reads_before, 24);
}

#[tokio::test]
async fn corrupt_entries_fall_through_to_the_repository() {
    let h = harness_with(Arc::new(CorruptStore), Duration::from_secs(60));
    let tag = add_tag(&h.tags, "go", RecordState::Published).await;
    add_article(&h.articles, tag.id, "hello").await;

    let article = h.articles.get_by_id(1).await.expect("article");
    assert_eq!(article.title, "hello");
    let tags = h
        .tags
        .get_collection(&TagQuery::new())
        .await
        .expect("tags");
    assert_eq!(tags, vec![tag]);
}

#[tokio::test]
async fn longest_ttl_still_populates_and_serves_reads() {
    let store = MemoryStore::new(NonZeroUsize::new(16).expect("non-zero"));
    let h = harness_with(Arc::new(store), Duration::from_secs(u64::MAX));
    let tag = add_tag(&h.tags, "go", RecordState::Published).await;

    let cold = h
        .tags
        .get_collection(&TagQuery::new())
        .await
        .expect("cold read");
    let reads = h.repos.record_reads();
    let warm = h
        .tags
        .get_collection(&TagQuery::new())
        .await
        .expect("warm read");

    assert_eq!(cold, vec![tag]);
    assert_eq!(warm, cold);
    assert_eq!(h.repos.record_reads(), reads);
}

#[tokio::test]
async fn rename_trims_surrounding_whitespace() {
    let h = memory_harness();
    let tag = add_tag(&h.tags, "golang", RecordState::Published).await;

    let renamed = h
        .tags
        .edit(tag.id, TagPatch::default().name("  go ").modified_by("bob"))
        .await
        .expect("rename");

    assert_eq!(renamed.name, "go");
    assert!(h.tags.exists_by_name("go").await.expect("exists"));
}
