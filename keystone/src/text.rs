// Delimited text partitions: one row per line, cells split on the field
// delimiter, a cell equal to the null marker is null.

use keystone_base::{err, Error, Result};
use keystone_load::split_tokens;
use std::{
    fs::File,
    io::{BufRead, BufReader, Lines},
    path::PathBuf,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TextFormat {
    pub field_delimiter: String,
    pub null_marker: String,
}

impl Default for TextFormat {
    fn default() -> Self {
        TextFormat {
            field_delimiter: ",".to_string(),
            null_marker: "\\N".to_string(),
        }
    }
}

impl TextFormat {
    pub fn new(field_delimiter: impl Into<String>, null_marker: impl Into<String>) -> Result<Self> {
        let format = TextFormat {
            field_delimiter: field_delimiter.into(),
            null_marker: null_marker.into(),
        };
        format.check()?;
        Ok(format)
    }

    /// Rejects an empty field delimiter, which would read every line as a
    /// single cell.
    pub fn check(&self) -> Result<()> {
        if self.field_delimiter.is_empty() {
            return Err(err("field delimiter is empty"));
        }
        Ok(())
    }

    pub fn split_row(&self, line: &str) -> Vec<Option<String>> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        split_tokens(line, &self.field_delimiter)
            .into_iter()
            .map(|cell| (cell != self.null_marker).then(|| cell.to_string()))
            .collect()
    }
}

/// A file read as one partition. It isn't opened until iterated, so a file
/// that can't be read fails the way any other partition scan does.
#[derive(Clone, Debug)]
pub struct TextPartition {
    path: PathBuf,
    format: TextFormat,
}

impl TextPartition {
    pub fn new(path: impl Into<PathBuf>, format: TextFormat) -> Self {
        TextPartition {
            path: path.into(),
            format,
        }
    }
}

enum RowsState {
    Open(Lines<BufReader<File>>),
    Failed(Option<Error>),
}

pub struct TextRows {
    state: RowsState,
    format: TextFormat,
}

impl IntoIterator for TextPartition {
    type Item = Result<Vec<Option<String>>>;
    type IntoIter = TextRows;

    fn into_iter(self) -> TextRows {
        let state = match File::open(&self.path) {
            Ok(f) => RowsState::Open(BufReader::new(f).lines()),
            Err(e) => RowsState::Failed(Some(Error::from(e))),
        };
        TextRows {
            state,
            format: self.format,
        }
    }
}

impl Iterator for TextRows {
    type Item = Result<Vec<Option<String>>>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.state {
            RowsState::Open(lines) => {
                let line = lines.next()?;
                Some(line.map(|l| self.format.split_row(&l)).map_err(Error::from))
            }
            RowsState::Failed(e) => e.take().map(Err),
        }
    }
}
