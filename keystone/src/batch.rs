// One load batch, start to finish:
//
//   partitions --(parallel collect)--> per-partition sorted distinct arrays
//              --(group by primitive column index)--> per-column runs
//              --(parallel, one task per column)--> load existing
//                 dictionary, assemble new values, write one session
//
// A column that fails is reported as failed and never stops the others.

use keystone_admin::DictionaryConfig;
use keystone_base::{err, ColumnId, DelimiterTable, Result, Schema};
use keystone_dict::{
    check_consistency, ColumnMetaEntry, DictionaryReader, DictionaryWriter, Store, TablePath,
};
use keystone_load::{assemble_column, group_by_column, ColumnSlots, PartitionCollector, Row};
use rayon::prelude::*;
use std::fmt;
use tracing::{error, info};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ColumnOutcome {
    Written {
        entry: ColumnMetaEntry,
        new_values: usize,
    },
    Failed {
        reason: String,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnStatus {
    pub column_id: ColumnId,
    pub outcome: ColumnOutcome,
}

impl ColumnStatus {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ColumnOutcome::Written { .. })
    }
}

impl fmt::Display for ColumnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            ColumnOutcome::Written { entry, new_values } => write!(
                f,
                "{}: ok, {} new values, keys {}..={}",
                self.column_id, new_values, entry.min_key, entry.max_key
            ),
            ColumnOutcome::Failed { reason } => write!(f, "{}: failed, {}", self.column_id, reason),
        }
    }
}

/// Per-column results in primitive column order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BatchReport {
    pub statuses: Vec<ColumnStatus>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.statuses.iter().all(|s| s.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ColumnStatus> {
        self.statuses.iter().filter(|s| !s.is_success())
    }

    pub fn status_of(&self, id: &ColumnId) -> Option<&ColumnStatus> {
        self.statuses.iter().find(|s| s.column_id == *id)
    }
}

pub struct LoadBatch<S: Store> {
    store: S,
    table_path: TablePath,
    schema: Schema,
    delimiters: DelimiterTable,
    config: DictionaryConfig,
}

impl<S: Store> LoadBatch<S> {
    pub fn new(
        store: S,
        table_path: TablePath,
        schema: Schema,
        delimiters: DelimiterTable,
        config: DictionaryConfig,
    ) -> Self {
        LoadBatch {
            store,
            table_path,
            schema,
            delimiters,
            config,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Runs the batch over `partitions`, each an iterator of rows. At most
    /// one batch may run against a table at a time.
    pub fn run<P, R>(&self, partitions: Vec<P>) -> BatchReport
    where
        P: IntoIterator<Item = Result<R>> + Send,
        R: Row,
    {
        // Same index space as the collector's output, one writer per id.
        let columns: Vec<ColumnId> = ColumnSlots::new(&self.schema).ids().to_vec();
        let policy = self.config.collect_failure_policy;

        let collected = partitions
            .into_par_iter()
            .enumerate()
            .map(|(i, rows)| {
                PartitionCollector::new(&self.schema, &self.delimiters, policy).collect(i, rows)
            })
            .collect::<Result<Vec<_>>>();

        let partitions = match collected {
            Ok(p) => p,
            Err(e) => {
                let reason = e.to_string();
                let statuses = columns
                    .into_iter()
                    .map(|column_id| {
                        error!(column = %column_id, reason = %reason, "column dictionary update failed");
                        ColumnStatus {
                            column_id,
                            outcome: ColumnOutcome::Failed {
                                reason: reason.clone(),
                            },
                        }
                    })
                    .collect();
                return BatchReport { statuses };
            }
        };

        let runs = group_by_column(partitions, columns.len());
        let statuses = columns
            .into_par_iter()
            .zip(runs)
            .map(|(column_id, runs)| {
                let outcome = match self.update_column(&column_id, runs) {
                    Ok((entry, new_values)) => ColumnOutcome::Written { entry, new_values },
                    Err(e) => {
                        error!(column = %column_id, reason = %e, "column dictionary update failed");
                        ColumnOutcome::Failed {
                            reason: e.to_string(),
                        }
                    }
                };
                ColumnStatus { column_id, outcome }
            })
            .collect();
        BatchReport { statuses }
    }

    fn update_column(
        &self,
        column: &ColumnId,
        runs: Vec<Vec<Vec<u8>>>,
    ) -> Result<(ColumnMetaEntry, usize)> {
        // The writer checks this again when it opens; checking here first
        // keeps a shrunk dictionary from being read at all.
        let files = self.table_path.column_files(column)?;
        let state = check_consistency(&self.store, &files)?;
        if !state.is_repairable() {
            return Err(err(format!("dictionary for column {} is {}", column, state)));
        }

        let reader = DictionaryReader::new(self.store.clone(), &self.table_path, column.clone())?;
        let existing = reader.load()?;
        let new = assemble_column(&existing, runs)?;

        let mut writer = DictionaryWriter::new(
            self.store.clone(),
            &self.table_path,
            column.clone(),
            self.config,
        )?;
        for value in new.values.iter() {
            writer.write(value)?;
        }
        let entry = writer.close()?;
        if (entry.min_key, entry.max_key) != (new.min_key(), new.max_key()) {
            return Err(err(format!(
                "column {} was assigned keys {}..={} but the session recorded {}..={}",
                column,
                new.min_key(),
                new.max_key(),
                entry.min_key,
                entry.max_key
            )));
        }
        info!(
            column = %column,
            new_values = new.len(),
            min_key = entry.min_key,
            max_key = entry.max_key,
            "column dictionary updated"
        );
        Ok((entry, new.len()))
    }
}
