//! Byte-offset source ranges.

use serde::{Deserialize, Serialize};

/// Half-open byte range into the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: u32,
    pub end: u32,
}

impl SourceRange {
    pub const STUB: SourceRange = SourceRange { start: 0, end: 0 };

    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start as u32,
            end: end as u32,
        }
    }

    /// Shift both endpoints by a fixed byte offset (used when leading
    /// whitespace was trimmed from the input before scanning).
    pub fn offset(self, by: u32) -> Self {
        Self {
            start: self.start + by,
            end: self.end + by,
        }
    }
}
