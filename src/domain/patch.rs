//! Partial updates for articles and tags.
//!
//! A patch carries only the fields a caller explicitly supplied. `None` means
//! "leave unchanged"; `Some` is merged into the persisted record even when it
//! holds an empty or zero-like value. Callers that receive loosely typed input
//! (forms, CSV rows, CLI flags) translate the wire sentinels with the
//! `from_sentinel` helpers: `-1` for state, `""` for text, `<= 0` for ids.

use crate::domain::entities::{ArticleRecord, TagRecord};
use crate::domain::error::DomainError;
use crate::domain::types::RecordState;

/// Wire value that means "leave state unchanged".
pub const STATE_UNCHANGED: i16 = -1;

pub fn text_from_sentinel(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

pub fn state_from_sentinel(value: i16) -> Result<Option<RecordState>, DomainError> {
    if value == STATE_UNCHANGED {
        return Ok(None);
    }
    RecordState::try_from(value).map(Some)
}

pub fn id_from_sentinel(value: i64) -> Option<i64> {
    (value > 0).then_some(value)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticlePatch {
    pub tag_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub cover_image_url: Option<String>,
    pub state: Option<RecordState>,
    pub modified_by: Option<String>,
}

impl ArticlePatch {
    pub fn tag_id(mut self, tag_id: i64) -> Self {
        self.tag_id = Some(tag_id);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn cover_image_url(mut self, url: impl Into<String>) -> Self {
        self.cover_image_url = Some(url.into());
        self
    }

    pub fn state(mut self, state: RecordState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn modified_by(mut self, actor: impl Into<String>) -> Self {
        self.modified_by = Some(actor.into());
        self
    }

    /// Merge the supplied fields into `record`. Store-assigned fields are untouched.
    pub fn apply_to(&self, record: &mut ArticleRecord) {
        if let Some(tag_id) = self.tag_id {
            record.tag_id = tag_id;
        }
        if let Some(title) = &self.title {
            record.title = title.clone();
        }
        if let Some(description) = &self.description {
            record.description = description.clone();
        }
        if let Some(content) = &self.content {
            record.content = content.clone();
        }
        if let Some(url) = &self.cover_image_url {
            record.cover_image_url = url.clone();
        }
        if let Some(state) = self.state {
            record.state = state;
        }
        if let Some(actor) = &self.modified_by {
            record.modified_by = actor.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPatch {
    pub name: Option<String>,
    pub state: Option<RecordState>,
    pub modified_by: Option<String>,
}

impl TagPatch {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn state(mut self, state: RecordState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn modified_by(mut self, actor: impl Into<String>) -> Self {
        self.modified_by = Some(actor.into());
        self
    }

    pub fn apply_to(&self, record: &mut TagRecord) {
        if let Some(name) = &self.name {
            record.name = name.clone();
        }
        if let Some(state) = self.state {
            record.state = state;
        }
        if let Some(actor) = &self.modified_by {
            record.modified_by = actor.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    fn sample_article() -> ArticleRecord {
        let now = OffsetDateTime::now_utc();
        ArticleRecord {
            id: 7,
            tag_id: 2,
            title: "old".to_string(),
            description: "desc".to_string(),
            content: "content".to_string(),
            cover_image_url: "cover.png".to_string(),
            state: RecordState::Published,
            created_by: "alice".to_string(),
            modified_by: "".to_string(),
            created_at: now,
            modified_at: now,
        }
    }

    #[test]
    fn sentinels_mean_unchanged() {
        assert_eq!(state_from_sentinel(STATE_UNCHANGED).unwrap(), None);
        assert_eq!(
            state_from_sentinel(0).unwrap(),
            Some(RecordState::Hidden),
            "zero is a real state, not a sentinel"
        );
        assert!(state_from_sentinel(3).is_err());
        assert_eq!(text_from_sentinel(""), None);
        assert_eq!(text_from_sentinel("x"), Some("x".to_string()));
        assert_eq!(id_from_sentinel(0), None);
        assert_eq!(id_from_sentinel(-1), None);
        assert_eq!(id_from_sentinel(4), Some(4));
    }

    #[test]
    fn title_only_patch_leaves_other_fields_alone() {
        let before = sample_article();
        let mut after = before.clone();
        ArticlePatch::default().title("T").apply_to(&mut after);

        assert_eq!(after.title, "T");
        let mut expected = before;
        expected.title = "T".to_string();
        assert_eq!(after, expected);
    }

    #[test]
    fn hidden_state_is_applied() {
        let mut article = sample_article();
        ArticlePatch::default()
            .state(RecordState::Hidden)
            .apply_to(&mut article);
        assert_eq!(article.state, RecordState::Hidden);
    }
}
