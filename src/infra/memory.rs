//! In-process repositories for articles and tags.
//!
//! Same contract as the Postgres adapters: ids are assigned from 1 upwards,
//! collections are ordered by id, edits stamp `modified_at`, and deletes of
//! absent ids report `RepoError::NotFound`. Used by the test suites and by
//! scenario runs that do not need a database.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::application::repos::{
    ArticleFilter, ArticleQuery, ArticlesRepo, ArticlesWriteRepo, CreateArticleParams,
    CreateTagParams, RepoError, TagFilter, TagQuery, TagsRepo, TagsWriteRepo,
};
use crate::domain::entities::{ArticleRecord, TagRecord};
use crate::domain::patch::{ArticlePatch, TagPatch};

#[derive(Default)]
struct Tables {
    tags: BTreeMap<i64, TagRecord>,
    articles: BTreeMap<i64, ArticleRecord>,
    next_tag_id: i64,
    next_article_id: i64,
}

#[derive(Clone, Default)]
pub struct InMemoryRepositories {
    tables: Arc<RwLock<Tables>>,
    record_reads: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `find_by_id` / list calls served so far. Existence probes and
    /// counts are not included.
    pub fn record_reads(&self) -> usize {
        self.record_reads.load(Ordering::SeqCst)
    }

    /// While set, every operation fails with `RepoError::Timeout`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), RepoError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepoError::Timeout);
        }
        Ok(())
    }

    fn note_read(&self) {
        self.record_reads.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TagsRepo for InMemoryRepositories {
    async fn exists_by_id(&self, id: i64) -> Result<bool, RepoError> {
        self.ensure_available()?;
        Ok(self.tables.read().await.tags.contains_key(&id))
    }

    async fn exists_by_name(&self, name: &str) -> Result<bool, RepoError> {
        self.ensure_available()?;
        let tables = self.tables.read().await;
        Ok(tables.tags.values().any(|tag| tag.name == name))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<TagRecord>, RepoError> {
        self.ensure_available()?;
        self.note_read();
        Ok(self.tables.read().await.tags.get(&id).cloned())
    }

    async fn list_tags(&self, query: &TagQuery) -> Result<Vec<TagRecord>, RepoError> {
        self.ensure_available()?;
        self.note_read();
        let tables = self.tables.read().await;
        let matching: Vec<TagRecord> = tables
            .tags
            .values()
            .filter(|tag| query.filter.matches(tag))
            .cloned()
            .collect();
        Ok(query.page.slice(&matching))
    }

    async fn count_tags(&self, filter: &TagFilter) -> Result<u64, RepoError> {
        self.ensure_available()?;
        let tables = self.tables.read().await;
        Ok(tables.tags.values().filter(|tag| filter.matches(tag)).count() as u64)
    }
}

#[async_trait]
impl TagsWriteRepo for InMemoryRepositories {
    async fn create_tag(&self, params: CreateTagParams) -> Result<TagRecord, RepoError> {
        self.ensure_available()?;
        let mut tables = self.tables.write().await;
        tables.next_tag_id += 1;
        let now = OffsetDateTime::now_utc();
        let tag = TagRecord {
            id: tables.next_tag_id,
            name: params.name,
            state: params.state,
            created_by: params.created_by,
            modified_by: String::new(),
            created_at: now,
            modified_at: now,
        };
        tables.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn update_tag(&self, id: i64, patch: &TagPatch) -> Result<TagRecord, RepoError> {
        self.ensure_available()?;
        let mut tables = self.tables.write().await;
        let tag = tables.tags.get_mut(&id).ok_or(RepoError::NotFound)?;
        patch.apply_to(tag);
        tag.modified_at = OffsetDateTime::now_utc();
        Ok(tag.clone())
    }

    async fn delete_tag(&self, id: i64) -> Result<(), RepoError> {
        self.ensure_available()?;
        let mut tables = self.tables.write().await;
        tables.tags.remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl ArticlesRepo for InMemoryRepositories {
    async fn exists_by_id(&self, id: i64) -> Result<bool, RepoError> {
        self.ensure_available()?;
        Ok(self.tables.read().await.articles.contains_key(&id))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError> {
        self.ensure_available()?;
        self.note_read();
        Ok(self.tables.read().await.articles.get(&id).cloned())
    }

    async fn list_articles(&self, query: &ArticleQuery) -> Result<Vec<ArticleRecord>, RepoError> {
        self.ensure_available()?;
        self.note_read();
        let tables = self.tables.read().await;
        let matching: Vec<ArticleRecord> = tables
            .articles
            .values()
            .filter(|article| query.filter.matches(article))
            .cloned()
            .collect();
        Ok(query.page.slice(&matching))
    }

    async fn count_articles(&self, filter: &ArticleFilter) -> Result<u64, RepoError> {
        self.ensure_available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .articles
            .values()
            .filter(|article| filter.matches(article))
            .count() as u64)
    }
}

#[async_trait]
impl ArticlesWriteRepo for InMemoryRepositories {
    async fn create_article(
        &self,
        params: CreateArticleParams,
    ) -> Result<ArticleRecord, RepoError> {
        self.ensure_available()?;
        let mut tables = self.tables.write().await;
        tables.next_article_id += 1;
        let now = OffsetDateTime::now_utc();
        let article = ArticleRecord {
            id: tables.next_article_id,
            tag_id: params.tag_id,
            title: params.title,
            description: params.description,
            content: params.content,
            cover_image_url: params.cover_image_url,
            state: params.state,
            created_by: params.created_by,
            modified_by: String::new(),
            created_at: now,
            modified_at: now,
        };
        tables.articles.insert(article.id, article.clone());
        Ok(article)
    }

    async fn update_article(
        &self,
        id: i64,
        patch: &ArticlePatch,
    ) -> Result<ArticleRecord, RepoError> {
        self.ensure_available()?;
        let mut tables = self.tables.write().await;
        let article = tables.articles.get_mut(&id).ok_or(RepoError::NotFound)?;
        patch.apply_to(article);
        article.modified_at = OffsetDateTime::now_utc();
        Ok(article.clone())
    }

    async fn delete_article(&self, id: i64) -> Result<(), RepoError> {
        self.ensure_available()?;
        let mut tables = self.tables.write().await;
        tables
            .articles
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}
