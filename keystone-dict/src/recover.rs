// A dictionary file is consistent when its length equals the end offset of
// the last meta entry. Longer means a session crashed after writing chunks
// but before committing its entry; those bytes belong to nobody and are cut
// off. Shorter means bytes that a committed entry points at are gone, which
// no amount of truncating can fix.

use crate::{ioutil::Store, meta::Ledger, path::ColumnFiles};
use keystone_base::Result;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Consistency {
    /// No dictionary file and no committed data.
    Fresh,
    Consistent { end_offset: u64 },
    TornTail { end_offset: u64, actual_len: u64 },
    Shrunk { end_offset: u64, actual_len: u64 },
}

impl Consistency {
    pub fn is_repairable(&self) -> bool {
        !matches!(self, Consistency::Shrunk { .. })
    }
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Consistency::Fresh => write!(f, "fresh (no dictionary yet)"),
            Consistency::Consistent { end_offset } => {
                write!(f, "consistent at {} bytes", end_offset)
            }
            Consistency::TornTail {
                end_offset,
                actual_len,
            } => write!(
                f,
                "torn tail: {} bytes past recorded end offset {}",
                actual_len - end_offset,
                end_offset
            ),
            Consistency::Shrunk {
                end_offset,
                actual_len,
            } => write!(
                f,
                "shrunk: file is {} bytes but recorded end offset is {}",
                actual_len, end_offset
            ),
        }
    }
}

/// Compares the dictionary file against an already-read ledger. A missing
/// ledger counts as a recorded end offset of 0.
pub fn check_against_ledger<S: Store>(
    store: &S,
    files: &ColumnFiles,
    ledger: &Ledger,
) -> Result<Consistency> {
    let end_offset = ledger.last().map_or(0, |e| e.end_offset);
    let actual_len = if store.exists(&files.dictionary) {
        store.len(&files.dictionary)?
    } else if end_offset == 0 {
        return Ok(Consistency::Fresh);
    } else {
        0
    };
    Ok(if actual_len == end_offset {
        Consistency::Consistent { end_offset }
    } else if actual_len > end_offset {
        Consistency::TornTail {
            end_offset,
            actual_len,
        }
    } else {
        Consistency::Shrunk {
            end_offset,
            actual_len,
        }
    })
}

pub fn check_consistency<S: Store>(store: &S, files: &ColumnFiles) -> Result<Consistency> {
    let ledger = crate::meta::read_ledger(store, &files.meta)?;
    check_against_ledger(store, files, &ledger)
}
