//! Tag archive export/import.
//!
//! The archive is a TOML document with one `[[tags]]` table per tag. Import
//! goes through [`TagService::add`], so names already present are skipped
//! rather than overwritten.

use std::path::Path;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;

use crate::application::error::{AppError, ServiceError};
use crate::application::repos::TagQuery;
use crate::application::tags::{CreateTagCommand, TagService};
use crate::domain::entities::TagRecord;
use crate::domain::types::RecordState;
use crate::infra::error::InfraError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagArchive {
    #[serde(default)]
    pub tags: Vec<ArchivedTag>,
}

/// One tag in an archive. Only `name`, `state` and `created_by` are read back
/// on import; the rest records where the entry came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedTag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<RecordState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_by: Option<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub modified_at: Option<OffsetDateTime>,
}

impl From<&TagRecord> for ArchivedTag {
    fn from(tag: &TagRecord) -> Self {
        Self {
            id: Some(tag.id),
            name: tag.name.clone(),
            state: Some(tag.state),
            created_by: Some(tag.created_by.clone()),
            modified_by: (!tag.modified_by.is_empty()).then(|| tag.modified_by.clone()),
            created_at: Some(tag.created_at),
            modified_at: Some(tag.modified_at),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub created: usize,
    pub skipped: usize,
}

/// Write every tag matching `query` to `path`. Returns the number exported.
pub async fn export_tags(
    service: &TagService,
    query: &TagQuery,
    path: &Path,
) -> Result<usize, AppError> {
    let tags = service.get_collection(query).await?;
    let archive = TagArchive {
        tags: tags.iter().map(ArchivedTag::from).collect(),
    };
    let encoded = toml::to_string_pretty(&archive)
        .map_err(|err| AppError::unexpected(format!("failed to encode archive: {err}")))?;
    tokio::fs::write(path, encoded)
        .await
        .map_err(|err| AppError::from(InfraError::Io(err)))?;

    info!(path = %path.display(), count = archive.tags.len(), "Tag archive exported");
    Ok(archive.tags.len())
}

/// Add each archived tag whose name is not taken yet.
///
/// Entries without a state are published; entries without an author are
/// attributed to `actor`.
pub async fn import_tags(
    service: &TagService,
    path: &Path,
    actor: &str,
) -> Result<ImportReport, AppError> {
    let data = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| AppError::from(InfraError::Io(err)))?;
    let archive: TagArchive = toml::from_str(&data)
        .map_err(|err| AppError::from(InfraError::archive(format!("invalid archive: {err}"))))?;

    let mut report = ImportReport::default();
    for entry in archive.tags {
        let command = CreateTagCommand {
            name: entry.name,
            state: entry.state.unwrap_or(RecordState::Published),
            created_by: entry.created_by.unwrap_or_else(|| actor.to_string()),
        };
        match service.add(command).await {
            Ok(_) => report.created += 1,
            Err(ServiceError::AlreadyExists { .. }) => report.skipped += 1,
            Err(err) => return Err(err.into()),
        }
    }

    info!(
        path = %path.display(),
        created = report.created,
        skipped = report.skipped,
        "Tag archive imported"
    );
    Ok(report)
}
