// A column's nested type, mirrored as a tree of parsers. A raw cell is fed
// to the root; Array and Struct nodes split it with the delimiter for their
// depth and hand the tokens down, Primitive leaves drop the token's bytes
// into their column's distinct set.
//
// Leaves don't own their sets. They hold a slot number into DistinctSets,
// which the collector owns, so every leaf for one column id feeds one set.

use keystone_base::{ColumnDescriptor, ColumnId, ColumnKind, DelimiterTable, Schema};
use memchr::memmem;
use rapidhash::{RapidHashMap, RapidHashSet};

/// Splits `input` on every occurrence of `delim`. Empty tokens are kept,
/// trailing ones included: `"a,b,"` on `","` is `["a", "b", ""]`. An empty
/// `delim` matches nowhere, so `input` comes back as the only token.
pub fn split_tokens<'a>(input: &'a str, delim: &str) -> Vec<&'a str> {
    if delim.is_empty() {
        return vec![input];
    }
    let mut tokens = Vec::new();
    let mut start = 0;
    for pos in memmem::find_iter(input.as_bytes(), delim.as_bytes()) {
        tokens.push(&input[start..pos]);
        start = pos + delim.len();
    }
    tokens.push(&input[start..]);
    tokens
}

/// Maps each dictionary-encoded primitive column id to its slot, which is
/// also its primitive column index in the schema.
#[derive(Clone, Debug, Default)]
pub struct ColumnSlots {
    slots: RapidHashMap<ColumnId, usize>,
    ids: Vec<ColumnId>,
}

impl ColumnSlots {
    pub fn new(schema: &Schema) -> Self {
        let ids: Vec<ColumnId> = schema
            .dictionary_column_ids()
            .into_iter()
            .cloned()
            .collect();
        let slots = ids
            .iter()
            .enumerate()
            .map(|(slot, id)| (id.clone(), slot))
            .collect();
        ColumnSlots { slots, ids }
    }

    pub fn ids(&self) -> &[ColumnId] {
        &self.ids
    }

    pub fn slot_of(&self, id: &ColumnId) -> Option<usize> {
        self.slots.get(id).copied()
    }

    pub fn id_of(&self, slot: usize) -> Option<&ColumnId> {
        self.ids.get(slot)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// One distinct-value set per slot.
#[derive(Clone, Debug, Default)]
pub struct DistinctSets {
    sets: Vec<RapidHashSet<Vec<u8>>>,
}

impl DistinctSets {
    pub fn new(slots: usize) -> Self {
        DistinctSets {
            sets: (0..slots).map(|_| RapidHashSet::default()).collect(),
        }
    }

    pub fn insert(&mut self, slot: usize, value: &[u8]) {
        if let Some(set) = self.sets.get_mut(slot) {
            if !set.contains(value) {
                set.insert(value.to_vec());
            }
        }
    }

    pub fn get(&self, slot: usize) -> Option<&RapidHashSet<Vec<u8>>> {
        self.sets.get(slot)
    }

    pub fn into_sets(self) -> Vec<RapidHashSet<Vec<u8>>> {
        self.sets
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ValueParser {
    /// `slot` is `None` for a column stored without a dictionary.
    Primitive { slot: Option<usize> },
    Array { depth: usize, item: Box<ValueParser> },
    Struct { depth: usize, fields: Vec<ValueParser> },
}

impl ValueParser {
    /// Builds the parser tree for a top-level column, whose delimiter is
    /// the first in the table.
    pub fn for_column(column: &ColumnDescriptor, delims: &DelimiterTable, slots: &ColumnSlots) -> Self {
        Self::build(column, 0, delims, slots)
    }

    fn build(
        column: &ColumnDescriptor,
        depth: usize,
        delims: &DelimiterTable,
        slots: &ColumnSlots,
    ) -> Self {
        match &column.kind {
            ColumnKind::Primitive { dictionary } => ValueParser::Primitive {
                slot: if *dictionary {
                    slots.slot_of(&column.id)
                } else {
                    None
                },
            },
            ColumnKind::Array(item) => ValueParser::Array {
                depth,
                item: Box::new(Self::build(item, delims.deeper(depth), delims, slots)),
            },
            ColumnKind::Struct(fields) => ValueParser::Struct {
                depth,
                fields: fields
                    .iter()
                    .map(|f| Self::build(f, delims.deeper(depth), delims, slots))
                    .collect(),
            },
        }
    }

    /// True if any leaf below feeds a distinct set.
    pub fn collects(&self) -> bool {
        match self {
            ValueParser::Primitive { slot } => slot.is_some(),
            ValueParser::Array { item, .. } => item.collects(),
            ValueParser::Struct { fields, .. } => fields.iter().any(|f| f.collects()),
        }
    }

    pub fn parse(&self, input: &str, delims: &DelimiterTable, sets: &mut DistinctSets) {
        match self {
            ValueParser::Primitive { slot: Some(slot) } => sets.insert(*slot, input.as_bytes()),
            ValueParser::Primitive { slot: None } => {}
            ValueParser::Array { depth, item } => {
                if input.is_empty() {
                    return;
                }
                for token in split_tokens(input, delims.get(*depth)) {
                    item.parse(token, delims, sets);
                }
            }
            ValueParser::Struct { depth, fields } => {
                if input.is_empty() {
                    return;
                }
                // Extra tokens or extra fields are dropped.
                for (field, token) in fields.iter().zip(split_tokens(input, delims.get(*depth))) {
                    field.parse(token, delims, sets);
                }
            }
        }
    }
}
