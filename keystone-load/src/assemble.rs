// Merges every partition's sorted distinct values for one column, drops
// what the existing dictionary already has, and numbers the rest from the
// dictionary's max key upward in byte order. The result depends only on
// the set of values seen, never on which partition saw them or when.

use crate::{
    order::{compare_bytes, is_strictly_ascending, sort_distinct},
    PartitionDistinct,
};
use keystone_base::{err, Result, SurrogateKey, FIRST_SURROGATE_KEY};
use keystone_dict::ColumnDictionary;
use std::{cmp::Ordering, collections::BinaryHeap};
use tracing::debug;

/// A column's genuinely new values, in key order. The value at index `i`
/// gets key `previous_max + 1 + i`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NewValues {
    pub previous_max: SurrogateKey,
    pub values: Vec<Vec<u8>>,
}

impl NewValues {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Equal to `previous_max` when there is nothing new.
    pub fn min_key(&self) -> SurrogateKey {
        if self.values.is_empty() {
            self.previous_max
        } else {
            self.previous_max + FIRST_SURROGATE_KEY
        }
    }

    pub fn max_key(&self) -> SurrogateKey {
        self.previous_max + self.values.len() as SurrogateKey
    }

    pub fn keyed(&self) -> impl Iterator<Item = (SurrogateKey, &[u8])> + '_ {
        (self.previous_max + FIRST_SURROGATE_KEY..)
            .zip(self.values.iter().map(|v| v.as_slice()))
    }
}

/// Regroups partition output by column: entry `i` holds every partition's
/// array for primitive column `i`, in partition order.
pub fn group_by_column(partitions: Vec<PartitionDistinct>, columns: usize) -> Vec<Vec<Vec<Vec<u8>>>> {
    let mut grouped: Vec<Vec<Vec<Vec<u8>>>> = (0..columns).map(|_| Vec::new()).collect();
    for p in partitions {
        for (col, values) in p.columns {
            if let Some(g) = grouped.get_mut(col) {
                g.push(values);
            }
        }
    }
    grouped
}

struct Head<'a> {
    value: &'a [u8],
    run: usize,
    idx: usize,
}

// BinaryHeap is a max-heap; invert so the smallest value pops first.
impl Ord for Head<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_bytes(other.value, self.value).then_with(|| other.run.cmp(&self.run))
    }
}

impl PartialOrd for Head<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Head<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Head<'_> {}

/// K-way merge of ascending runs into one ascending run without
/// duplicates.
pub fn merge_sorted(runs: &[Vec<Vec<u8>>]) -> Vec<&[u8]> {
    let mut heap = BinaryHeap::with_capacity(runs.len());
    for (run, values) in runs.iter().enumerate() {
        if let Some(v) = values.first() {
            heap.push(Head {
                value: v.as_slice(),
                run,
                idx: 0,
            });
        }
    }
    let mut out: Vec<&[u8]> = Vec::new();
    while let Some(Head { value, run, idx }) = heap.pop() {
        if out.last() != Some(&value) {
            out.push(value);
        }
        if let Some(next) = runs[run].get(idx + 1) {
            heap.push(Head {
                value: next.as_slice(),
                run,
                idx: idx + 1,
            });
        }
    }
    out
}

/// Works out one column's new values and their keys.
pub fn assemble_column(
    existing: &ColumnDictionary,
    mut runs: Vec<Vec<Vec<u8>>>,
) -> Result<NewValues> {
    for run in runs.iter_mut() {
        if !is_strictly_ascending(run) {
            sort_distinct(run);
            run.dedup();
        }
    }
    let merged = merge_sorted(&runs);
    let seen = merged.len();
    let values: Vec<Vec<u8>> = merged
        .into_iter()
        .filter(|v| !existing.contains(v))
        .map(|v| v.to_vec())
        .collect();
    let previous_max = existing.max_key();
    let added = SurrogateKey::try_from(values.len())
        .map_err(|_| err("surrogate key space exhausted"))?;
    previous_max
        .checked_add(added)
        .ok_or_else(|| err("surrogate key space exhausted"))?;
    debug!(
        runs = runs.len(),
        distinct = seen,
        new = values.len(),
        previous_max,
        "column dictionary assembled"
    );
    Ok(NewValues {
        previous_max,
        values,
    })
}
