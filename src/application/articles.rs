//! Article service: cache-aside reads, and writes that check the referenced
//! tag first.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::application::error::ServiceError;
use crate::application::pagination::Listing;
use crate::application::repos::{
    ArticleFilter, ArticleQuery, ArticlesRepo, ArticlesWriteRepo, CreateArticleParams, TagsRepo,
};
use crate::cache::{CacheAside, EntityKind};
use crate::domain::entities::ArticleRecord;
use crate::domain::error::DomainError;
use crate::domain::patch::ArticlePatch;
use crate::domain::types::RecordState;
use crate::domain::validation::{
    ACTOR_MAX_CHARS, CONTENT_MAX_CHARS, COVER_URL_MAX_CHARS, DESCRIPTION_MAX_CHARS,
    TITLE_MAX_CHARS, ensure_bounded, ensure_max_chars, ensure_positive_id,
};

const ENTITY: &str = "article";
const TAG_ENTITY: &str = "tag";

#[derive(Debug, Clone)]
pub struct CreateArticleCommand {
    pub tag_id: i64,
    pub title: String,
    pub description: String,
    pub content: String,
    pub cover_image_url: String,
    pub state: RecordState,
    pub created_by: String,
}

impl CreateArticleCommand {
    fn validate(&self) -> Result<(), DomainError> {
        ensure_positive_id(self.tag_id, "tag_id")?;
        ensure_bounded(&self.title, TITLE_MAX_CHARS, "title")?;
        ensure_max_chars(&self.description, DESCRIPTION_MAX_CHARS, "description")?;
        ensure_bounded(&self.content, CONTENT_MAX_CHARS, "content")?;
        ensure_bounded(&self.cover_image_url, COVER_URL_MAX_CHARS, "cover_image_url")?;
        ensure_bounded(&self.created_by, ACTOR_MAX_CHARS, "created_by")
    }
}

fn validate_patch(patch: &ArticlePatch) -> Result<(), DomainError> {
    ensure_bounded(
        patch.modified_by.as_deref().unwrap_or_default(),
        ACTOR_MAX_CHARS,
        "modified_by",
    )?;
    if let Some(tag_id) = patch.tag_id {
        ensure_positive_id(tag_id, "tag_id")?;
    }
    if let Some(title) = patch.title.as_deref() {
        ensure_bounded(title, TITLE_MAX_CHARS, "title")?;
    }
    if let Some(description) = patch.description.as_deref() {
        ensure_max_chars(description, DESCRIPTION_MAX_CHARS, "description")?;
    }
    if let Some(content) = patch.content.as_deref() {
        ensure_bounded(content, CONTENT_MAX_CHARS, "content")?;
    }
    if let Some(url) = patch.cover_image_url.as_deref() {
        ensure_max_chars(url, COVER_URL_MAX_CHARS, "cover_image_url")?;
    }
    Ok(())
}

/// Article coordinator. Reads go through the cache; writes go to the
/// repository only, so cached singles and collections stay as they were
/// until their TTL runs out.
#[derive(Clone)]
pub struct ArticleService {
    reader: Arc<dyn ArticlesRepo>,
    writer: Arc<dyn ArticlesWriteRepo>,
    tags: Arc<dyn TagsRepo>,
    cache: CacheAside,
}

impl ArticleService {
    pub fn new(
        reader: Arc<dyn ArticlesRepo>,
        writer: Arc<dyn ArticlesWriteRepo>,
        tags: Arc<dyn TagsRepo>,
        cache: CacheAside,
    ) -> Self {
        Self {
            reader,
            writer,
            tags,
            cache,
        }
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: i64) -> Result<ArticleRecord, ServiceError> {
        ensure_positive_id(id, "id")?;
        if !self.exists_by_id(id).await? {
            return Err(ServiceError::not_found(ENTITY));
        }

        let key = self.cache.keys().article(id);
        let reader = &self.reader;
        self.cache
            .read_through(EntityKind::Article, &key, || async move {
                reader
                    .find_by_id(id)
                    .await
                    .map_err(|err| ServiceError::from_repo(ENTITY, err))?
                    .ok_or_else(|| ServiceError::not_found(ENTITY))
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_collection(
        &self,
        query: &ArticleQuery,
    ) -> Result<Vec<ArticleRecord>, ServiceError> {
        let key = self.cache.keys().article_list(query);
        let reader = &self.reader;
        self.cache
            .read_through(EntityKind::Article, &key, || async move {
                reader
                    .list_articles(query)
                    .await
                    .map_err(|err| ServiceError::from_repo(ENTITY, err))
            })
            .await
    }

    pub async fn list(&self, query: &ArticleQuery) -> Result<Listing<ArticleRecord>, ServiceError> {
        let items = self.get_collection(query).await?;
        let total = self.count(&query.filter).await?;
        Ok(Listing { items, total })
    }

    pub async fn add(&self, command: CreateArticleCommand) -> Result<ArticleRecord, ServiceError> {
        command.validate()?;
        self.ensure_tag_exists(command.tag_id).await?;

        let CreateArticleCommand {
            tag_id,
            title,
            description,
            content,
            cover_image_url,
            state,
            created_by,
        } = command;

        let article = self
            .writer
            .create_article(CreateArticleParams {
                tag_id,
                title,
                description,
                content,
                cover_image_url,
                state,
                created_by,
            })
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?;

        info!(
            article_id = article.id,
            tag_id = article.tag_id,
            actor = %article.created_by,
            "Article created"
        );
        Ok(article)
    }

    pub async fn edit(&self, id: i64, patch: ArticlePatch) -> Result<ArticleRecord, ServiceError> {
        ensure_positive_id(id, "id")?;
        validate_patch(&patch)?;
        if let Some(tag_id) = patch.tag_id {
            self.ensure_tag_exists(tag_id).await?;
        }

        let article = self
            .writer
            .update_article(id, &patch)
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?;

        info!(article_id = article.id, actor = %article.modified_by, "Article updated");
        Ok(article)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        ensure_positive_id(id, "id")?;
        self.writer
            .delete_article(id)
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?;

        info!(article_id = id, "Article deleted");
        Ok(())
    }

    pub async fn exists_by_id(&self, id: i64) -> Result<bool, ServiceError> {
        self.reader
            .exists_by_id(id)
            .await
            .map_err(ServiceError::Storage)
    }

    pub async fn count(&self, filter: &ArticleFilter) -> Result<u64, ServiceError> {
        self.reader
            .count_articles(filter)
            .await
            .map_err(ServiceError::Storage)
    }

    // Not atomic with the write that follows.
    async fn ensure_tag_exists(&self, tag_id: i64) -> Result<(), ServiceError> {
        let exists = self
            .tags
            .exists_by_id(tag_id)
            .await
            .map_err(ServiceError::Storage)?;
        if !exists {
            return Err(ServiceError::not_found(TAG_ENTITY));
        }
        Ok(())
    }
}
