//! Cache key derivation.
//!
//! Keys are plain strings so they can be shared by every store backend:
//!
//! ```text
//! <prefix>:article:7
//! <prefix>:article:list:tag_id=3:state=~:page_num=1:page_size=10
//! <prefix>:tag:list:name="go":state=1:page_num=1:page_size=10
//! ```
//!
//! Every dimension that can change a result set is encoded, in a fixed order,
//! so the key does not depend on the order in which a descriptor was built.
//! An unset dimension is written as [`ABSENT`], which no concrete value can
//! render to: integers render as decimal digits and text renders as a quoted
//! JSON string.

use std::fmt::Write as _;

use crate::application::repos::{ArticleQuery, TagQuery};

/// Marker for "dimension not supplied".
pub const ABSENT: &str = "~";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Article,
    Tag,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Article => "article",
            EntityKind::Tag => "tag",
        }
    }
}

/// One encoded dimension of a collection query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension<'a> {
    Int(Option<i64>),
    Text(Option<&'a str>),
}

/// Exposes every result-shaping dimension of a collection descriptor, in a
/// stable order.
pub trait KeyDimensions {
    fn key_dimensions(&self) -> Vec<(&'static str, Dimension<'_>)>;
}

impl KeyDimensions for ArticleQuery {
    fn key_dimensions(&self) -> Vec<(&'static str, Dimension<'_>)> {
        vec![
            ("tag_id", Dimension::Int(self.filter.tag_id)),
            (
                "state",
                Dimension::Int(self.filter.state.map(|state| i64::from(state.as_i16()))),
            ),
            ("page_num", Dimension::Int(Some(i64::from(self.page.page_num)))),
            ("page_size", Dimension::Int(Some(i64::from(self.page.page_size)))),
        ]
    }
}

impl KeyDimensions for TagQuery {
    fn key_dimensions(&self) -> Vec<(&'static str, Dimension<'_>)> {
        vec![
            ("name", Dimension::Text(self.filter.name.as_deref())),
            (
                "state",
                Dimension::Int(self.filter.state.map(|state| i64::from(state.as_i16()))),
            ),
            ("page_num", Dimension::Int(Some(i64::from(self.page.page_num)))),
            ("page_size", Dimension::Int(Some(i64::from(self.page.page_size)))),
        ]
    }
}

/// What a fetch selects: one record or a collection.
pub enum Selector<'a> {
    Id(i64),
    Collection(&'a dyn KeyDimensions),
}

/// Pure mapping from `(kind, selector)` to a canonical cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDeriver {
    prefix: String,
}

impl KeyDeriver {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn derive(&self, kind: EntityKind, selector: Selector<'_>) -> String {
        match selector {
            Selector::Id(id) => format!("{}:{}:{id}", self.prefix, kind.as_str()),
            Selector::Collection(query) => {
                let mut key = format!("{}:{}:list", self.prefix, kind.as_str());
                for (name, dimension) in query.key_dimensions() {
                    key.push(':');
                    key.push_str(name);
                    key.push('=');
                    push_dimension(&mut key, dimension);
                }
                key
            }
        }
    }

    pub fn article(&self, id: i64) -> String {
        self.derive(EntityKind::Article, Selector::Id(id))
    }

    pub fn article_list(&self, query: &ArticleQuery) -> String {
        self.derive(EntityKind::Article, Selector::Collection(query))
    }

    pub fn tag(&self, id: i64) -> String {
        self.derive(EntityKind::Tag, Selector::Id(id))
    }

    pub fn tag_list(&self, query: &TagQuery) -> String {
        self.derive(EntityKind::Tag, Selector::Collection(query))
    }
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self::new(super::config::DEFAULT_KEY_PREFIX)
    }
}

fn push_dimension(key: &mut String, dimension: Dimension<'_>) {
    match dimension {
        Dimension::Int(Some(value)) => {
            let _ = write!(key, "{value}");
        }
        Dimension::Text(Some(value)) => {
            // A JSON string always opens with `"`, and escapes any quote inside,
            // so the encoding is injective and never equals the absence marker.
            let encoded = serde_json::to_string(value)
                .unwrap_or_else(|_| format!("\"{}\"", value.escape_default()));
            key.push_str(&encoded);
        }
        Dimension::Int(None) | Dimension::Text(None) => key.push_str(ABSENT),
    }
}
