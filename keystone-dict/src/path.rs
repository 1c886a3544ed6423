use keystone_base::{err, ColumnId, Result};
use std::{
    fmt,
    path::{Path, PathBuf},
};

const METADATA_DIR: &str = "Metadata";
const DICTIONARY_EXT: &str = "dict";
const DICTIONARY_META_EXT: &str = "dictmeta";

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TableIdentifier {
    pub database: String,
    pub table: String,
}

impl TableIdentifier {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        TableIdentifier {
            database: database.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

/// Where a table's files live under the store root:
/// `<root>/<database>/<table>/Metadata/<column>.dict` and `.dictmeta`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TablePath {
    root: PathBuf,
    table: TableIdentifier,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ColumnFiles {
    pub dictionary: PathBuf,
    pub meta: PathBuf,
}

// Path components come from catalog names; refuse anything that would step
// outside the table directory.
fn check_component(kind: &str, name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(err(format!("invalid {} name for a path: {:?}", kind, name)));
    }
    Ok(())
}

impl TablePath {
    pub fn new(root: impl Into<PathBuf>, table: TableIdentifier) -> Result<Self> {
        check_component("database", &table.database)?;
        check_component("table", &table.table)?;
        Ok(TablePath {
            root: root.into(),
            table,
        })
    }

    pub fn table(&self) -> &TableIdentifier {
        &self.table
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.root
            .join(&self.table.database)
            .join(&self.table.table)
            .join(METADATA_DIR)
    }

    pub fn column_files(&self, column: &ColumnId) -> Result<ColumnFiles> {
        check_component("column", column.as_str())?;
        let dir = self.metadata_dir();
        Ok(ColumnFiles {
            dictionary: dir.join(format!("{}.{}", column, DICTIONARY_EXT)),
            meta: dir.join(format!("{}.{}", column, DICTIONARY_META_EXT)),
        })
    }
}

impl ColumnFiles {
    pub fn dir(&self) -> Option<&Path> {
        self.dictionary.parent()
    }
}
