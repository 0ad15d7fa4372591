//! Offset pagination helpers.

use serde::Serialize;

/// 1-based page window. A zero page number or zero page size selects every
/// matching row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PageWindow {
    pub page_num: u32,
    pub page_size: u32,
}

impl PageWindow {
    pub fn new(page_num: u32, page_size: u32) -> Self {
        Self {
            page_num,
            page_size,
        }
    }

    /// Every matching row, no window applied.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_bounded(&self) -> bool {
        self.page_num > 0 && self.page_size > 0
    }

    /// `(offset, limit)` for the window, or `None` when unbounded.
    pub fn offset_limit(&self) -> Option<(u64, u64)> {
        self.is_bounded().then(|| {
            let limit = u64::from(self.page_size);
            let offset = u64::from(self.page_num - 1) * limit;
            (offset, limit)
        })
    }

    /// Slice an already ordered in-memory result set.
    pub fn slice<T: Clone>(&self, rows: &[T]) -> Vec<T> {
        match self.offset_limit() {
            Some((offset, limit)) => rows
                .iter()
                .skip(usize::try_from(offset).unwrap_or(usize::MAX))
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .cloned()
                .collect(),
            None => rows.to_vec(),
        }
    }
}

/// A page of records together with the total matching count.
///
/// `items` and `total` come from separate reads and are not a snapshot of the
/// same instant.
#[derive(Debug, Clone, Serialize)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total: u64,
}
