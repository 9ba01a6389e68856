//! Per-source publication watermarks.
//!
//! A watermark is the `endTimeMillis` boundary last reported by a feed.
//! Records published at or before it were already seen and are dropped by
//! the fetcher. Watermarks live in memory only and restart at zero.

use std::collections::HashMap;

/// Key-value store of watermarks, one per source identifier.
#[derive(Debug, Clone, Default)]
pub struct WatermarkStore {
    marks: HashMap<String, i64>,
}

impl WatermarkStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with every given source registered at zero.
    pub fn seeded<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            marks: sources.into_iter().map(|s| (s.into(), 0)).collect(),
        }
    }

    /// Current watermark for `source`, 0 when the source is unknown.
    pub fn get(&self, source: &str) -> i64 {
        self.marks.get(source).copied().unwrap_or(0)
    }

    /// Overwrite the watermark for `source`.
    ///
    /// The value is stored as-is, even when lower than the current one:
    /// feeds report their own window and the latest report wins.
    pub fn set(&mut self, source: &str, value: i64) {
        match self.marks.get_mut(source) {
            Some(mark) => *mark = value,
            None => {
                self.marks.insert(source.to_string(), value);
            }
        }
    }

    /// Number of tracked sources.
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Iterate over `(source, watermark)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.marks.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
