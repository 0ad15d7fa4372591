//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::application::pagination::PageWindow;
use crate::domain::entities::{ArticleRecord, TagRecord};
use crate::domain::patch::{ArticlePatch, TagPatch};
use crate::domain::types::RecordState;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Filter dimensions for article collections. `None` means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ArticleFilter {
    pub tag_id: Option<i64>,
    pub state: Option<RecordState>,
}

impl ArticleFilter {
    pub fn matches(&self, article: &ArticleRecord) -> bool {
        self.tag_id.is_none_or(|tag_id| article.tag_id == tag_id)
            && self.state.is_none_or(|state| article.state == state)
    }
}

/// Filter dimensions for tag collections. `name` is an exact match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TagFilter {
    pub name: Option<String>,
    pub state: Option<RecordState>,
}

impl TagFilter {
    pub fn matches(&self, tag: &TagRecord) -> bool {
        self.name.as_deref().is_none_or(|name| tag.name == name)
            && self.state.is_none_or(|state| tag.state == state)
    }
}

/// Collection fetch descriptor for articles: filters plus paging window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ArticleQuery {
    pub filter: ArticleFilter,
    pub page: PageWindow,
}

impl ArticleQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag_id(mut self, tag_id: i64) -> Self {
        self.filter.tag_id = Some(tag_id);
        self
    }

    pub fn state(mut self, state: RecordState) -> Self {
        self.filter.state = Some(state);
        self
    }

    pub fn page(mut self, page_num: u32, page_size: u32) -> Self {
        self.page = PageWindow::new(page_num, page_size);
        self
    }
}

/// Collection fetch descriptor for tags: filters plus paging window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TagQuery {
    pub filter: TagFilter,
    pub page: PageWindow,
}

impl TagQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.filter.name = Some(name.into());
        self
    }

    pub fn state(mut self, state: RecordState) -> Self {
        self.filter.state = Some(state);
        self
    }

    pub fn page(mut self, page_num: u32, page_size: u32) -> Self {
        self.page = PageWindow::new(page_num, page_size);
        self
    }
}

#[derive(Debug, Clone)]
pub struct CreateArticleParams {
    pub tag_id: i64,
    pub title: String,
    pub description: String,
    pub content: String,
    pub cover_image_url: String,
    pub state: RecordState,
    pub created_by: String,
}

#[derive(Debug, Clone)]
pub struct CreateTagParams {
    pub name: String,
    pub state: RecordState,
    pub created_by: String,
}

#[async_trait]
pub trait ArticlesRepo: Send + Sync {
    async fn exists_by_id(&self, id: i64) -> Result<bool, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError>;

    async fn list_articles(&self, query: &ArticleQuery) -> Result<Vec<ArticleRecord>, RepoError>;

    async fn count_articles(&self, filter: &ArticleFilter) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait ArticlesWriteRepo: Send + Sync {
    async fn create_article(&self, params: CreateArticleParams)
    -> Result<ArticleRecord, RepoError>;

    /// Merge the supplied patch fields; `RepoError::NotFound` when `id` is absent.
    async fn update_article(&self, id: i64, patch: &ArticlePatch)
    -> Result<ArticleRecord, RepoError>;

    /// Hard delete; `RepoError::NotFound` when `id` is absent.
    async fn delete_article(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait TagsRepo: Send + Sync {
    async fn exists_by_id(&self, id: i64) -> Result<bool, RepoError>;

    async fn exists_by_name(&self, name: &str) -> Result<bool, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<TagRecord>, RepoError>;

    async fn list_tags(&self, query: &TagQuery) -> Result<Vec<TagRecord>, RepoError>;

    async fn count_tags(&self, filter: &TagFilter) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait TagsWriteRepo: Send + Sync {
    async fn create_tag(&self, params: CreateTagParams) -> Result<TagRecord, RepoError>;

    async fn update_tag(&self, id: i64, patch: &TagPatch) -> Result<TagRecord, RepoError>;

    async fn delete_tag(&self, id: i64) -> Result<(), RepoError>;
}
