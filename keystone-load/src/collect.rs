use crate::{
    order::sort_distinct,
    parser::{ColumnSlots, DistinctSets, ValueParser},
};
use keystone_admin::CollectFailurePolicy;
use keystone_base::{err, DelimiterTable, Result, Schema};
use tracing::{debug, error};

/// One row as the execution engine hands it over: indexed access to
/// string-or-null cells, one per top-level column of the schema.
pub trait Row {
    fn width(&self) -> usize;
    /// `None` for a null cell.
    fn cell(&self, position: usize) -> Option<&str>;
}

impl Row for [Option<String>] {
    fn width(&self) -> usize {
        self.len()
    }
    fn cell(&self, position: usize) -> Option<&str> {
        self.get(position).and_then(|c| c.as_deref())
    }
}

impl Row for Vec<Option<String>> {
    fn width(&self) -> usize {
        self.len()
    }
    fn cell(&self, position: usize) -> Option<&str> {
        self.as_slice().cell(position)
    }
}

impl<'a> Row for Vec<Option<&'a str>> {
    fn width(&self) -> usize {
        self.len()
    }
    fn cell(&self, position: usize) -> Option<&str> {
        self.get(position).copied().flatten()
    }
}

/// What one partition found: for every dictionary-encoded primitive column,
/// its index and its distinct values in ascending byte order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PartitionDistinct {
    pub partition: usize,
    pub columns: Vec<(usize, Vec<Vec<u8>>)>,
}

impl PartitionDistinct {
    fn empty(partition: usize, slots: usize) -> Self {
        PartitionDistinct {
            partition,
            columns: (0..slots).map(|i| (i, Vec::new())).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.iter().all(|(_, v)| v.is_empty())
    }
}

/// Collects one partition's distinct values. Owns its parser trees and sets
/// outright, so any number of collectors can run side by side.
pub struct PartitionCollector<'a> {
    delims: &'a DelimiterTable,
    policy: CollectFailurePolicy,
    width: usize,
    // (row position, parser) for every top-level column that has a
    // dictionary-encoded leaf somewhere below it.
    roots: Vec<(usize, ValueParser)>,
    slots: usize,
}

impl<'a> PartitionCollector<'a> {
    pub fn new(schema: &Schema, delims: &'a DelimiterTable, policy: CollectFailurePolicy) -> Self {
        let slots = ColumnSlots::new(schema);
        let roots = schema
            .columns()
            .iter()
            .enumerate()
            .map(|(pos, col)| (pos, ValueParser::for_column(col, delims, &slots)))
            .filter(|(_, p)| p.collects())
            .collect();
        PartitionCollector {
            delims,
            policy,
            width: schema.columns().len(),
            roots,
            slots: slots.len(),
        }
    }

    /// Scans every row of the partition. How a failure part way through
    /// is reported depends on the collector's failure policy.
    pub fn collect<R, I>(&self, partition: usize, rows: I) -> Result<PartitionDistinct>
    where
        R: Row,
        I: IntoIterator<Item = Result<R>>,
    {
        let mut sets = DistinctSets::new(self.slots);
        match self.scan(rows, &mut sets) {
            Ok(n) => {
                let columns = sets
                    .into_sets()
                    .into_iter()
                    .enumerate()
                    .map(|(slot, set)| {
                        let mut values: Vec<Vec<u8>> = set.into_iter().collect();
                        sort_distinct(&mut values);
                        (slot, values)
                    })
                    .collect();
                debug!(partition, rows = n, "partition distinct values collected");
                Ok(PartitionDistinct { partition, columns })
            }
            Err(e) => match self.policy {
                CollectFailurePolicy::EmptyResult => {
                    error!(
                        partition,
                        error = %e,
                        "partition collection failed, reporting no distinct values"
                    );
                    Ok(PartitionDistinct::empty(partition, self.slots))
                }
                CollectFailurePolicy::FailBatch => Err(err(format!(
                    "collecting partition {}: {}",
                    partition, e
                ))),
            },
        }
    }

    fn scan<R, I>(&self, rows: I, sets: &mut DistinctSets) -> Result<usize>
    where
        R: Row,
        I: IntoIterator<Item = Result<R>>,
    {
        let mut n = 0;
        for row in rows {
            let row = row?;
            if row.width() < self.width {
                return Err(err(format!(
                    "row {} has {} cells, expected {}",
                    n,
                    row.width(),
                    self.width
                )));
            }
            for (pos, parser) in self.roots.iter() {
                if let Some(cell) = row.cell(*pos) {
                    parser.parse(cell, self.delims, sets);
                }
            }
            n += 1;
        }
        Ok(n)
    }
}
