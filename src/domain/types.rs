//! Shared domain enumerations aligned with persisted column values.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Visibility of an article or tag. Persisted and serialized as `0` / `1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum RecordState {
    #[default]
    Hidden,
    Published,
}

impl RecordState {
    pub fn as_i16(self) -> i16 {
        match self {
            RecordState::Hidden => 0,
            RecordState::Published => 1,
        }
    }
}

impl TryFrom<i16> for RecordState {
    type Error = DomainError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RecordState::Hidden),
            1 => Ok(RecordState::Published),
            other => Err(DomainError::validation(format!(
                "state must be 0 or 1, got {other}"
            ))),
        }
    }
}

impl From<RecordState> for i16 {
    fn from(state: RecordState) -> Self {
        state.as_i16()
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i16())
    }
}
