// What the `keystone` subcommands do, minus argument parsing. Each writes
// its report to `out` so tests can read it back.

use crate::{
    batch::LoadBatch,
    schema::parse_schema,
    text::{TextFormat, TextPartition},
};
use keystone_admin::{DictionaryConfig, Properties};
use keystone_base::{ColumnId, DelimiterTable, Result};
use keystone_dict::{
    check_consistency, Annotations, DictionaryReader, FileStore, Store, TableIdentifier, TablePath,
};
use std::{
    io::Write,
    path::{Path, PathBuf},
};

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    /// `NAME=TYPE` declarations, in row order.
    pub columns: Vec<String>,
    /// One per nesting depth; empty means the default table.
    pub delimiters: Vec<String>,
    pub format: TextFormat,
    pub config: Option<PathBuf>,
    /// One partition per file.
    pub files: Vec<PathBuf>,
}

/// Loads `files` into the table's dictionaries. Returns whether every
/// column succeeded.
pub fn load(
    store_root: &Path,
    table: TableIdentifier,
    opts: LoadOptions,
    out: &mut impl Write,
) -> Result<bool> {
    let props = match &opts.config {
        Some(path) => Properties::load(path)?,
        None => Properties::new(),
    }
    .with_env_overrides();
    let config = DictionaryConfig::from_properties(&props);
    opts.format.check()?;
    let schema = parse_schema(&opts.columns)?;
    let delimiters = if opts.delimiters.is_empty() {
        DelimiterTable::default()
    } else {
        DelimiterTable::new(opts.delimiters)?
    };
    let table_path = TablePath::new(store_root, table)?;
    let partitions: Vec<TextPartition> = opts
        .files
        .into_iter()
        .map(|f| TextPartition::new(f, opts.format.clone()))
        .collect();
    let batch = LoadBatch::new(FileStore::new(), table_path, schema, delimiters, config);
    let report = batch.run(partitions);
    for status in report.statuses.iter() {
        writeln!(out, "{}", status)?;
    }
    Ok(report.is_success())
}

/// Prints a column's ledger and its values by key, optionally followed by
/// annotated hexdumps of both files.
pub fn inspect(
    store_root: &Path,
    table: TableIdentifier,
    column: &str,
    hexdump: bool,
    out: &mut impl Write,
) -> Result<()> {
    let store = FileStore::new();
    let table_path = TablePath::new(store_root, table)?;
    let reader = DictionaryReader::new(store.clone(), &table_path, ColumnId::new(column))?;
    let files = reader.files().clone();

    writeln!(out, "column {} of {}", column, table_path.table())?;
    writeln!(out, "state: {}", check_consistency(&store, &files)?)?;
    for (i, e) in reader.entries()?.iter().enumerate() {
        writeln!(
            out,
            "session {}: keys {}..={}, bytes {}..{}, chunks {}",
            i, e.min_key, e.max_key, e.start_offset, e.end_offset, e.chunk_count
        )?;
    }
    let dict = reader.load()?;
    writeln!(out, "{} values", dict.len())?;
    for (key, value) in dict.iter() {
        writeln!(out, "{}\t{}", key, value.escape_ascii())?;
    }

    if hexdump {
        for (kind, path) in [("chunk", &files.dictionary), ("entry", &files.meta)] {
            if !store.exists(path) {
                continue;
            }
            let buf = store.read_all(path)?;
            writeln!(out, "{}:", path.display())?;
            write!(out, "{}", Annotations::for_records(kind, &buf).render_hexdump(&buf)?)?;
        }
    }
    Ok(())
}

/// Reports whether a column's dictionary file agrees with its ledger,
/// without touching either. Returns false for a state a writer can't
/// repair.
pub fn verify(
    store_root: &Path,
    table: TableIdentifier,
    column: &str,
    out: &mut impl Write,
) -> Result<bool> {
    let store = FileStore::new();
    let table_path = TablePath::new(store_root, table)?;
    let files = table_path.column_files(&ColumnId::new(column))?;
    let state = check_consistency(&store, &files)?;
    writeln!(out, "{}: {}", column, state)?;
    Ok(state.is_repairable())
}
