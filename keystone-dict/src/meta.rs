// The metadata file is a ledger of ColumnMetaEntry records, one appended per
// write session and never rewritten. The last entry says where the
// dictionary file ends and what the highest surrogate key in use is.

use crate::{
    ioutil::{Store, Writer},
    record::{decode_payload, split_frames, write_record},
};
use keystone_base::{err, Result, SurrogateKey, FIRST_SURROGATE_KEY, NO_SURROGATE_KEY};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub struct ColumnMetaEntry {
    pub min_key: SurrogateKey,
    pub max_key: SurrogateKey,
    pub start_offset: u64,
    pub end_offset: u64,
    // Cumulative over every session of the column.
    pub chunk_count: u32,
}

impl ColumnMetaEntry {
    /// The entry recording a session that wrote `new_values` values into
    /// `start_offset..end_offset` as `chunks` chunks, following `prev`.
    ///
    /// With no new values the key range collapses to the previous max (0 for
    /// a column's first session).
    pub fn next_session(
        prev: Option<&ColumnMetaEntry>,
        new_values: u64,
        start_offset: u64,
        end_offset: u64,
        chunks: u32,
    ) -> Result<Self> {
        let prev_max = prev.map_or(NO_SURROGATE_KEY, |p| p.max_key);
        let prev_chunks = prev.map_or(0, |p| p.chunk_count);
        let added = SurrogateKey::try_from(new_values)
            .map_err(|_| err("surrogate key space exhausted"))?;
        let max_key = prev_max
            .checked_add(added)
            .ok_or_else(|| err("surrogate key space exhausted"))?;
        let min_key = if added == 0 {
            prev_max
        } else {
            prev_max + FIRST_SURROGATE_KEY
        };
        let chunk_count = prev_chunks
            .checked_add(chunks)
            .ok_or_else(|| err("chunk count overflow"))?;
        if end_offset < start_offset {
            return Err(err("session end offset precedes its start offset"));
        }
        Ok(ColumnMetaEntry {
            min_key,
            max_key,
            start_offset,
            end_offset,
            chunk_count,
        })
    }
}

/// What's on disk in a metadata file: its decodable entries, the byte length
/// they span, and the file's actual length. A gap between the last two is
/// the tail of an append that never completed.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct Ledger {
    pub entries: Vec<ColumnMetaEntry>,
    pub valid_len: u64,
    pub actual_len: u64,
}

impl Ledger {
    pub fn last(&self) -> Option<&ColumnMetaEntry> {
        self.entries.last()
    }

    pub fn has_torn_tail(&self) -> bool {
        self.actual_len > self.valid_len
    }
}

pub fn read_ledger<S: Store>(store: &S, path: &Path) -> Result<Ledger> {
    if !store.exists(path) {
        return Ok(Ledger::default());
    }
    let buf = store.read_all(path)?;
    let (frames, valid_len) = split_frames(&buf);
    let entries = frames
        .into_iter()
        .map(decode_payload::<ColumnMetaEntry>)
        .collect::<Result<Vec<_>>>()?;
    Ok(Ledger {
        entries,
        valid_len: valid_len as u64,
        actual_len: buf.len() as u64,
    })
}

pub fn read_entries<S: Store>(store: &S, path: &Path) -> Result<Vec<ColumnMetaEntry>> {
    Ok(read_ledger(store, path)?.entries)
}

pub fn read_last_entry<S: Store>(store: &S, path: &Path) -> Result<Option<ColumnMetaEntry>> {
    Ok(read_ledger(store, path)?.entries.pop())
}

pub fn append_entry<S: Store>(store: &S, path: &Path, entry: &ColumnMetaEntry) -> Result<()> {
    let mut wr = store.open_append(path)?;
    write_record(&mut wr, entry)?;
    wr.sync()?;
    Ok(())
}
