//! Field bounds for articles and tags.

use crate::domain::error::DomainError;

pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 255;
pub const CONTENT_MAX_CHARS: usize = 65_535;
pub const ACTOR_MAX_CHARS: usize = 100;
pub const COVER_URL_MAX_CHARS: usize = 255;
pub const TAG_NAME_MAX_CHARS: usize = 100;

pub fn ensure_positive_id(value: i64, field: &'static str) -> Result<(), DomainError> {
    if value < 1 {
        return Err(DomainError::validation(format!(
            "{field} must be a positive integer"
        )));
    }
    Ok(())
}

pub fn ensure_required(value: &str, field: &'static str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

pub fn ensure_max_chars(value: &str, max: usize, field: &'static str) -> Result<(), DomainError> {
    if value.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

pub fn ensure_bounded(value: &str, max: usize, field: &'static str) -> Result<(), DomainError> {
    ensure_required(value, field)?;
    ensure_max_chars(value, max, field)
}
