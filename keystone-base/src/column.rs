use crate::{err, Result};
use std::fmt;

// Surrogate keys start at 1; 0 is never assigned and stands for "no value".
pub type SurrogateKey = u32;
pub const NO_SURROGATE_KEY: SurrogateKey = 0;
pub const FIRST_SURROGATE_KEY: SurrogateKey = 1;

/// Stable identity of a column, as handed out by the catalog. Nested
/// primitive columns get their own ids, derived from the parent's.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ColumnId(String);

impl ColumnId {
    pub fn new(id: impl Into<String>) -> Self {
        ColumnId(id.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
    pub fn array_item(&self) -> Self {
        ColumnId(format!("{}.item", self.0))
    }
    pub fn struct_field(&self, i: usize) -> Self {
        ColumnId(format!("{}.{}", self.0, i))
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum ColumnKind {
    Primitive { dictionary: bool },
    Array(Box<ColumnDescriptor>),
    Struct(Vec<ColumnDescriptor>),
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ColumnDescriptor {
    pub id: ColumnId,
    pub kind: ColumnKind,
}

impl ColumnDescriptor {
    /// A dictionary-encoded primitive column.
    pub fn dictionary(id: impl Into<String>) -> Self {
        ColumnDescriptor {
            id: ColumnId::new(id),
            kind: ColumnKind::Primitive { dictionary: true },
        }
    }

    /// A primitive column stored without a dictionary.
    pub fn plain(id: impl Into<String>) -> Self {
        ColumnDescriptor {
            id: ColumnId::new(id),
            kind: ColumnKind::Primitive { dictionary: false },
        }
    }

    pub fn array(id: impl Into<String>, item: ColumnDescriptor) -> Self {
        ColumnDescriptor {
            id: ColumnId::new(id),
            kind: ColumnKind::Array(Box::new(item)),
        }
    }

    pub fn structure(id: impl Into<String>, fields: Vec<ColumnDescriptor>) -> Self {
        ColumnDescriptor {
            id: ColumnId::new(id),
            kind: ColumnKind::Struct(fields),
        }
    }

    pub fn is_dictionary_primitive(&self) -> bool {
        matches!(self.kind, ColumnKind::Primitive { dictionary: true })
    }

    // Depth-first, children in declaration order. This order defines the
    // primitive column index used to route collector output.
    fn push_dictionary_leaves<'a>(&'a self, out: &mut Vec<&'a ColumnDescriptor>) {
        match &self.kind {
            ColumnKind::Primitive { dictionary } => {
                if *dictionary {
                    out.push(self);
                }
            }
            ColumnKind::Array(item) => item.push_dictionary_leaves(out),
            ColumnKind::Struct(fields) => {
                for f in fields {
                    f.push_dictionary_leaves(out);
                }
            }
        }
    }
}

/// The columns of one table in row order: a column's index here is its
/// position in every row handed to the collector.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Schema {
    columns: Vec<ColumnDescriptor>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Schema { columns }
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Every dictionary-encoded primitive column, nested ones included,
    /// indexed by their primitive column index.
    pub fn dictionary_columns(&self) -> Vec<&ColumnDescriptor> {
        let mut out = Vec::new();
        for c in self.columns.iter() {
            c.push_dictionary_leaves(&mut out);
        }
        out
    }

    /// Ids of the dictionary-encoded primitive columns, each once, in first
    /// occurrence order. A column's position here is its primitive column
    /// index: the slot the collector fills and the column a batch writes.
    pub fn dictionary_column_ids(&self) -> Vec<&ColumnId> {
        let mut ids: Vec<&ColumnId> = Vec::new();
        for c in self.dictionary_columns() {
            if !ids.contains(&&c.id) {
                ids.push(&c.id);
            }
        }
        ids
    }

    pub fn primitive_index_of(&self, id: &ColumnId) -> Option<usize> {
        self.dictionary_column_ids().iter().position(|c| *c == id)
    }
}

/// Per-batch delimiters, one per nesting depth. Depths past the end of the
/// table reuse the last (deepest) delimiter.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DelimiterTable {
    delims: Vec<String>,
}

impl DelimiterTable {
    pub fn new(delims: Vec<String>) -> Result<Self> {
        if delims.is_empty() {
            return Err(err("delimiter table is empty"));
        }
        if delims.iter().any(|d| d.is_empty()) {
            return Err(err("delimiter table contains an empty delimiter"));
        }
        Ok(DelimiterTable { delims })
    }

    pub fn max_depth(&self) -> usize {
        self.delims.len()
    }

    pub fn get(&self, depth: usize) -> &str {
        &self.delims[self.clamp(depth)]
    }

    /// The index one level below `depth`, clamped to the last entry.
    pub fn deeper(&self, depth: usize) -> usize {
        self.clamp(depth.saturating_add(1))
    }

    fn clamp(&self, depth: usize) -> usize {
        depth.min(self.delims.len() - 1)
    }
}

impl Default for DelimiterTable {
    fn default() -> Self {
        DelimiterTable {
            delims: vec!["$".to_string(), ":".to_string()],
        }
    }
}
