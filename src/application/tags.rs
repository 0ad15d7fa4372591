//! Tag service: cache-aside reads and pass-through writes.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::application::error::ServiceError;
use crate::application::pagination::Listing;
use crate::application::repos::{CreateTagParams, TagFilter, TagQuery, TagsRepo, TagsWriteRepo};
use crate::cache::{CacheAside, EntityKind};
use crate::domain::entities::TagRecord;
use crate::domain::patch::TagPatch;
use crate::domain::types::RecordState;
use crate::domain::validation::{
    ACTOR_MAX_CHARS, TAG_NAME_MAX_CHARS, ensure_bounded, ensure_positive_id,
};

const ENTITY: &str = "tag";

#[derive(Debug, Clone)]
pub struct CreateTagCommand {
    pub name: String,
    pub state: RecordState,
    pub created_by: String,
}

#[derive(Clone)]
pub struct TagService {
    reader: Arc<dyn TagsRepo>,
    writer: Arc<dyn TagsWriteRepo>,
    cache: CacheAside,
}

impl TagService {
    pub fn new(reader: Arc<dyn TagsRepo>, writer: Arc<dyn TagsWriteRepo>, cache: CacheAside) -> Self {
        Self {
            reader,
            writer,
            cache,
        }
    }

    /// Confirm existence in the repository, then read through the cache.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: i64) -> Result<TagRecord, ServiceError> {
        ensure_positive_id(id, "id")?;
        if !self.exists_by_id(id).await? {
            return Err(ServiceError::not_found(ENTITY));
        }

        let key = self.cache.keys().tag(id);
        let reader = &self.reader;
        self.cache
            .read_through(EntityKind::Tag, &key, || async move {
                reader
                    .find_by_id(id)
                    .await
                    .map_err(|err| ServiceError::from_repo(ENTITY, err))?
                    .ok_or_else(|| ServiceError::not_found(ENTITY))
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_collection(&self, query: &TagQuery) -> Result<Vec<TagRecord>, ServiceError> {
        let key = self.cache.keys().tag_list(query);
        let reader = &self.reader;
        self.cache
            .read_through(EntityKind::Tag, &key, || async move {
                reader
                    .list_tags(query)
                    .await
                    .map_err(|err| ServiceError::from_repo(ENTITY, err))
            })
            .await
    }

    /// Collection plus an uncached total for the same filters.
    pub async fn list(&self, query: &TagQuery) -> Result<Listing<TagRecord>, ServiceError> {
        let items = self.get_collection(query).await?;
        let total = self.count(&query.filter).await?;
        Ok(Listing { items, total })
    }

    /// Create a tag. The name check and the insert are separate statements, so
    /// two concurrent adds of the same name can both succeed.
    pub async fn add(&self, command: CreateTagCommand) -> Result<TagRecord, ServiceError> {
        let CreateTagCommand {
            name,
            state,
            created_by,
        } = command;

        let name = name.trim().to_string();
        ensure_bounded(&name, TAG_NAME_MAX_CHARS, "name")?;
        ensure_bounded(&created_by, ACTOR_MAX_CHARS, "created_by")?;

        if self.exists_by_name(&name).await? {
            return Err(ServiceError::AlreadyExists {
                entity: ENTITY,
                name,
            });
        }

        let tag = self
            .writer
            .create_tag(CreateTagParams {
                name,
                state,
                created_by,
            })
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?;

        info!(tag_id = tag.id, name = %tag.name, actor = %tag.created_by, "Tag created");
        Ok(tag)
    }

    /// Merge the supplied fields. `modified_by` is required.
    pub async fn edit(&self, id: i64, mut patch: TagPatch) -> Result<TagRecord, ServiceError> {
        ensure_positive_id(id, "id")?;
        ensure_bounded(
            patch.modified_by.as_deref().unwrap_or_default(),
            ACTOR_MAX_CHARS,
            "modified_by",
        )?;
        if let Some(name) = patch.name.as_mut() {
            *name = name.trim().to_string();
            ensure_bounded(name, TAG_NAME_MAX_CHARS, "name")?;
        }

        let tag = self
            .writer
            .update_tag(id, &patch)
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?;

        info!(tag_id = tag.id, actor = %tag.modified_by, "Tag updated");
        Ok(tag)
    }

    /// Hard delete. Articles that still reference the tag keep their `tag_id`.
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        ensure_positive_id(id, "id")?;
        self.writer
            .delete_tag(id)
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?;

        info!(tag_id = id, "Tag deleted");
        Ok(())
    }

    pub async fn exists_by_id(&self, id: i64) -> Result<bool, ServiceError> {
        self.reader
            .exists_by_id(id)
            .await
            .map_err(ServiceError::Storage)
    }

    pub async fn exists_by_name(&self, name: &str) -> Result<bool, ServiceError> {
        self.reader
            .exists_by_name(name)
            .await
            .map_err(ServiceError::Storage)
    }

    pub async fn count(&self, filter: &TagFilter) -> Result<u64, ServiceError> {
        self.reader
            .count_tags(filter)
            .await
            .map_err(ServiceError::Storage)
    }
}
