//! Source positions for expression nodes

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::ast::ExprId;

/// Line and column of a node, both 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    /// Byte offset into the source text
    pub offset: usize,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
}

/// Maps node ids to positions in the original expression text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Name shown in diagnostics, e.g. `<input>`
    pub description: String,
    /// Offsets at which each line after the first begins
    #[serde(default)]
    pub line_offsets: Vec<usize>,
    /// Byte offset of each node
    #[serde(default)]
    pub positions: FxHashMap<ExprId, usize>,
}

impl SourceInfo {
    /// Source info for `text`, with line offsets computed from its newlines
    pub fn new(description: impl Into<String>, text: &str) -> Self {
        let line_offsets = text
            .char_indices()
            .filter(|(_, c)| *c == '\n')
            .map(|(i, _)| i + 1)
            .collect();
        SourceInfo {
            description: description.into(),
            line_offsets,
            positions: FxHashMap::default(),
        }
    }

    /// Record the offset of a node
    pub fn set_position(&mut self, id: ExprId, offset: usize) {
        self.positions.insert(id, offset);
    }

    /// Location of the node; unknown nodes map to offset 0
    pub fn location(&self, id: ExprId) -> Location {
        let offset = self.positions.get(&id).copied().unwrap_or(0);
        self.location_of_offset(offset)
    }

    /// Line and column for a byte offset
    pub fn location_of_offset(&self, offset: usize) -> Location {
        let mut line = 1;
        let mut line_start = 0;
        for &start in &self.line_offsets {
            if start > offset {
                break;
            }
            line += 1;
            line_start = start;
        }
        Location {
            offset,
            line,
            column: offset - line_start + 1,
        }
    }
}
