use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::{
    application::repos::{
        CreateTagParams, RepoError, TagFilter, TagQuery, TagsRepo, TagsWriteRepo,
    },
    domain::{entities::TagRecord, patch::TagPatch},
};

use super::{PostgresRepositories, map_sqlx_error};

const TAG_COLUMNS: &str = "id, name, state, created_by, modified_by, created_at, modified_at";

#[derive(sqlx::FromRow)]
struct TagRow {
    id: i64,
    name: String,
    state: i16,
    created_by: String,
    modified_by: String,
    created_at: OffsetDateTime,
    modified_at: OffsetDateTime,
}

impl TryFrom<TagRow> for TagRecord {
    type Error = RepoError;

    fn try_from(row: TagRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            state: PostgresRepositories::convert_state(row.state)?,
            created_by: row.created_by,
            modified_by: row.modified_by,
            created_at: row.created_at,
            modified_at: row.modified_at,
        })
    }
}

impl PostgresRepositories {
    fn push_tag_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &TagFilter) {
        if let Some(name) = filter.name.as_ref() {
            qb.push(" AND name = ");
            qb.push_bind(name.clone());
        }
        Self::push_state_filter(qb, filter.state);
    }
}

#[async_trait]
impl TagsRepo for PostgresRepositories {
    async fn exists_by_id(&self, id: i64) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM tags WHERE id = $1)")
            .bind(id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn exists_by_name(&self, name: &str) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM tags WHERE name = $1)")
            .bind(name)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<TagRecord>, RepoError> {
        let row = sqlx::query_as::<_, TagRow>(&format!(
            "SELECT {TAG_COLUMNS} FROM tags WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(TagRecord::try_from).transpose()
    }

    async fn list_tags(&self, query: &TagQuery) -> Result<Vec<TagRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!("SELECT {TAG_COLUMNS} FROM tags WHERE 1=1"));
        Self::push_tag_filter(&mut qb, &query.filter);
        Self::push_ordering_and_window(&mut qb, query.page);

        let rows = qb
            .build_query_as::<TagRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(TagRecord::try_from).collect()
    }

    async fn count_tags(&self, filter: &TagFilter) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM tags WHERE 1=1");
        Self::push_tag_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }
}

#[async_trait]
impl TagsWriteRepo for PostgresRepositories {
    async fn create_tag(&self, params: CreateTagParams) -> Result<TagRecord, RepoError> {
        let row = sqlx::query_as::<_, TagRow>(&format!(
            "INSERT INTO tags (name, state, created_by) VALUES ($1, $2, $3) \
             RETURNING {TAG_COLUMNS}"
        ))
        .bind(params.name)
        .bind(params.state.as_i16())
        .bind(params.created_by)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        TagRecord::try_from(row)
    }

    async fn update_tag(&self, id: i64, patch: &TagPatch) -> Result<TagRecord, RepoError> {
        let row = sqlx::query_as::<_, TagRow>(&format!(
            "UPDATE tags SET \
                name = COALESCE($2, name), \
                state = COALESCE($3, state), \
                modified_by = COALESCE($4, modified_by), \
                modified_at = now() \
             WHERE id = $1 \
             RETURNING {TAG_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.state.map(|state| state.as_i16()))
        .bind(patch.modified_by.as_deref())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.ok_or(RepoError::NotFound).and_then(TagRecord::try_from)
    }

    async fn delete_tag(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
