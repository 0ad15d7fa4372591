//! Postgres-backed repository implementations.

mod articles;
mod tags;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;
use std::time::Duration;

use sqlx::{
    Postgres, QueryBuilder,
    postgres::{PgPool, PgPoolOptions},
};

use crate::application::pagination::PageWindow;
use crate::application::repos::RepoError;
use crate::domain::types::RecordState;

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// `acquire_timeout` bounds how long a query waits for a pooled
    /// connection; running out surfaces as `RepoError::Timeout`.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    fn push_state_filter(qb: &mut QueryBuilder<'_, Postgres>, state: Option<RecordState>) {
        if let Some(state) = state {
            qb.push(" AND state = ");
            qb.push_bind(state.as_i16());
        }
    }

    fn push_ordering_and_window(qb: &mut QueryBuilder<'_, Postgres>, page: PageWindow) {
        qb.push(" ORDER BY id ASC");
        if let Some((offset, limit)) = page.offset_limit() {
            qb.push(" LIMIT ");
            qb.push_bind(Self::convert_bound(limit));
            qb.push(" OFFSET ");
            qb.push_bind(Self::convert_bound(offset));
        }
    }

    fn convert_bound(value: u64) -> i64 {
        i64::try_from(value).unwrap_or(i64::MAX)
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }

    fn convert_state(value: i16) -> Result<RecordState, RepoError> {
        RecordState::try_from(value).map_err(|err| RepoError::Integrity {
            message: err.to_string(),
        })
    }
}
