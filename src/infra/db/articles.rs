use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::{
    application::repos::{
        ArticleFilter, ArticleQuery, ArticlesRepo, ArticlesWriteRepo, CreateArticleParams,
        RepoError,
    },
    domain::{entities::ArticleRecord, patch::ArticlePatch},
};

use super::{PostgresRepositories, map_sqlx_error};

const ARTICLE_COLUMNS: &str = "id, tag_id, title, description, content, cover_image_url, state, \
     created_by, modified_by, created_at, modified_at";

#[derive(sqlx::FromRow)]
struct ArticleRow {
    id: i64,
    tag_id: i64,
    title: String,
    description: String,
    content: String,
    cover_image_url: String,
    state: i16,
    created_by: String,
    modified_by: String,
    created_at: OffsetDateTime,
    modified_at: OffsetDateTime,
}

impl TryFrom<ArticleRow> for ArticleRecord {
    type Error = RepoError;

    fn try_from(row: ArticleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            tag_id: row.tag_id,
            title: row.title,
            description: row.description,
            content: row.content,
            cover_image_url: row.cover_image_url,
            state: PostgresRepositories::convert_state(row.state)?,
            created_by: row.created_by,
            modified_by: row.modified_by,
            created_at: row.created_at,
            modified_at: row.modified_at,
        })
    }
}

impl PostgresRepositories {
    fn push_article_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ArticleFilter) {
        if let Some(tag_id) = filter.tag_id {
            qb.push(" AND tag_id = ");
            qb.push_bind(tag_id);
        }
        Self::push_state_filter(qb, filter.state);
    }
}

#[async_trait]
impl ArticlesRepo for PostgresRepositories {
    async fn exists_by_id(&self, id: i64) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM articles WHERE id = $1)")
            .bind(id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(ArticleRecord::try_from).transpose()
    }

    async fn list_articles(&self, query: &ArticleQuery) -> Result<Vec<ArticleRecord>, RepoError> {
        let mut qb =
            QueryBuilder::new(format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE 1=1"));
        Self::push_article_filter(&mut qb, &query.filter);
        Self::push_ordering_and_window(&mut qb, query.page);

        let rows = qb
            .build_query_as::<ArticleRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(ArticleRecord::try_from).collect()
    }

    async fn count_articles(&self, filter: &ArticleFilter) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM articles WHERE 1=1");
        Self::push_article_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }
}

#[async_trait]
impl ArticlesWriteRepo for PostgresRepositories {
    async fn create_article(
        &self,
        params: CreateArticleParams,
    ) -> Result<ArticleRecord, RepoError> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "INSERT INTO articles \
                (tag_id, title, description, content, cover_image_url, state, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(params.tag_id)
        .bind(params.title)
        .bind(params.description)
        .bind(params.content)
        .bind(params.cover_image_url)
        .bind(params.state.as_i16())
        .bind(params.created_by)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        ArticleRecord::try_from(row)
    }

    async fn update_article(
        &self,
        id: i64,
        patch: &ArticlePatch,
    ) -> Result<ArticleRecord, RepoError> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "UPDATE articles SET \
                tag_id = COALESCE($2, tag_id), \
                title = COALESCE($3, title), \
                description = COALESCE($4, description), \
                content = COALESCE($5, content), \
                cover_image_url = COALESCE($6, cover_image_url), \
                state = COALESCE($7, state), \
                modified_by = COALESCE($8, modified_by), \
                modified_at = now() \
             WHERE id = $1 \
             RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.tag_id)
        .bind(patch.title.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.content.as_deref())
        .bind(patch.cover_image_url.as_deref())
        .bind(patch.state.map(|state| state.as_i16()))
        .bind(patch.modified_by.as_deref())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.ok_or(RepoError::NotFound)
            .and_then(ArticleRecord::try_from)
    }

    async fn delete_article(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
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
