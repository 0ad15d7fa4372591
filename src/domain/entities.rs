//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::types::RecordState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: i64,
    /// Weak reference to a tag; resolved by lookup, never owned.
    pub tag_id: i64,
    pub title: String,
    pub description: String,
    pub content: String,
    pub cover_image_url: String,
    pub state: RecordState,
    pub created_by: String,
    pub modified_by: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub modified_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: i64,
    pub name: String,
    pub state: RecordState,
    pub created_by: String,
    pub modified_by: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub modified_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn article_survives_json_interchange() {
        let article = ArticleRecord {
            id: 7,
            tag_id: 3,
            title: "Hello".to_string(),
            description: "".to_string(),
            content: "body".to_string(),
            cover_image_url: "https://img.example/cover.png".to_string(),
            state: RecordState::Published,
            created_by: "alice".to_string(),
            modified_by: "".to_string(),
            created_at: datetime!(2024-05-01 10:00:00.123456 UTC),
            modified_at: datetime!(2024-05-02 11:30:00 UTC),
        };

        let bytes = serde_json::to_vec(&article).expect("encode");
        let decoded: ArticleRecord = serde_json::from_slice(&bytes).expect("decode");
        assert_eq!(decoded, article);
    }
}
