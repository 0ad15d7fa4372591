use thiserror::Error;

use crate::{application::repos::RepoError, domain::error::DomainError, infra::error::InfraError};

/// Failures surfaced by the article and tag services.
///
/// `NotFound` and `Storage` are kept apart so callers can tell "does not
/// exist" from "could not determine". Cache store failures never appear here.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("{entity} `{name}` already exists")]
    AlreadyExists { entity: &'static str, name: String },
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("storage failure: {0}")]
    Storage(#[source] RepoError),
}

impl ServiceError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    /// Classify a repository error for `entity`.
    pub fn from_repo(entity: &'static str, err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::NotFound { entity },
            other => Self::Storage(other),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Service(ServiceError::NotFound { .. }) => 3,
            AppError::Service(ServiceError::AlreadyExists { .. }) => 4,
            AppError::Service(ServiceError::Validation(_)) | AppError::Validation(_) => 2,
            AppError::Service(ServiceError::Storage(_)) | AppError::Infra(InfraError::Database { .. }) => 5,
            AppError::Infra(_) | AppError::Unexpected(_) => 1,
        }
    }
}
