// One DictionaryWriter is one write session for one column:
//
//   Uninitialized -> Opened -> (accumulate, flush chunk)* -> closed
//
// Opening happens on the first write (or on close, if nothing was written)
// and is where crash recovery runs. Closing flushes the partial chunk,
// syncs, and appends exactly one ColumnMetaEntry. Callers must not run two
// sessions for the same column at once; nothing here locks.

use crate::{
    chunk::ChunkBuffer,
    ioutil::{Store, Writer},
    meta::{append_entry, read_ledger, ColumnMetaEntry, Ledger},
    path::{ColumnFiles, TablePath},
    record::write_record,
    recover::{check_against_ledger, Consistency},
};
use keystone_admin::DictionaryConfig;
use keystone_base::{err, ColumnId, Result};
use std::io::Write;
use tracing::{debug, error, info, warn};

struct Session<W: Writer> {
    out: W,
    buffer: ChunkBuffer,
    previous: Option<ColumnMetaEntry>,
    start_offset: u64,
    chunks_written: u32,
    values_written: u64,
}

enum SessionState<W: Writer> {
    Uninitialized,
    Opened(Session<W>),
    // A flush failed part way; offsets can no longer be trusted.
    Failed,
}

pub struct DictionaryWriter<S: Store> {
    store: S,
    column: ColumnId,
    files: ColumnFiles,
    config: DictionaryConfig,
    state: SessionState<S::Writer>,
}

impl<S: Store> DictionaryWriter<S> {
    pub fn new(
        store: S,
        table_path: &TablePath,
        column: ColumnId,
        config: DictionaryConfig,
    ) -> Result<Self> {
        let files = table_path.column_files(&column)?;
        Ok(DictionaryWriter {
            store,
            column,
            files,
            config,
            state: SessionState::Uninitialized,
        })
    }

    pub fn column(&self) -> &ColumnId {
        &self.column
    }

    pub fn files(&self) -> &ColumnFiles {
        &self.files
    }

    /// Appends the next value. Its surrogate key is one more than the
    /// previous value's.
    pub fn write(&mut self, value: &[u8]) -> Result<()> {
        self.with_session(|session| {
            session.buffer.push(value.to_vec());
            session.values_written += 1;
            if session.buffer.is_full() {
                session.flush_chunk()?;
            }
            Ok(())
        })
    }

    pub fn write_str(&mut self, value: &str) -> Result<()> {
        self.write(value.as_bytes())
    }

    /// Appends a run of values to the current chunk without checking the
    /// threshold in between, so they land in one chunk unless a later
    /// `write` pushes the buffer over.
    pub fn write_batch<I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        self.with_session(|session| {
            for v in values {
                session.buffer.push(v);
                session.values_written += 1;
            }
            Ok(())
        })
    }

    /// Ends the session: flushes any partial chunk, syncs the dictionary
    /// file, and appends the session's meta entry, which is returned.
    pub fn close(mut self) -> Result<ColumnMetaEntry> {
        self.ensure_open()?;
        let state = std::mem::replace(&mut self.state, SessionState::Failed);
        let SessionState::Opened(mut session) = state else {
            return Err(err(format!(
                "dictionary writer for column {} failed earlier in the session",
                self.column
            )));
        };
        if !session.buffer.is_empty() {
            session.flush_chunk()?;
        }
        session.out.flush()?;
        session.out.sync()?;
        drop(session.out);
        let end_offset = self.store.len(&self.files.dictionary)?;
        let entry = ColumnMetaEntry::next_session(
            session.previous.as_ref(),
            session.values_written,
            session.start_offset,
            end_offset,
            session.chunks_written,
        )?;
        append_entry(&self.store, &self.files.meta, &entry)?;
        info!(
            column = %self.column,
            path = %self.files.meta.display(),
            min_key = entry.min_key,
            max_key = entry.max_key,
            start_offset = entry.start_offset,
            end_offset = entry.end_offset,
            chunk_count = entry.chunk_count,
            "dictionary metadata entry written"
        );
        Ok(entry)
    }

    fn with_session<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Session<S::Writer>) -> Result<()>,
    {
        self.ensure_open()?;
        let SessionState::Opened(session) = &mut self.state else {
            return Err(err(format!(
                "dictionary writer for column {} failed earlier in the session",
                self.column
            )));
        };
        let res = f(session);
        if res.is_err() {
            self.state = SessionState::Failed;
        }
        res
    }

    fn ensure_open(&mut self) -> Result<()> {
        if let SessionState::Uninitialized = self.state {
            match self.open() {
                Ok(session) => self.state = SessionState::Opened(session),
                Err(e) => {
                    self.state = SessionState::Failed;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn open(&self) -> Result<Session<S::Writer>> {
        let chunk_size = self.config.effective_chunk_size();
        if let Some(dir) = self.files.dir() {
            self.store.create_dir_all(dir)?;
        }
        let ledger = self.read_and_repair_ledger()?;
        let start_offset = self.repair_dictionary(&ledger)?;
        let out = self.store.open_append(&self.files.dictionary)?;
        if out.pos() != start_offset {
            return Err(err(format!(
                "dictionary file for column {} is {} bytes, expected {}",
                self.column,
                out.pos(),
                start_offset
            )));
        }
        debug!(
            column = %self.column,
            path = %self.files.dictionary.display(),
            start_offset,
            chunk_size,
            "dictionary write session opened"
        );
        Ok(Session {
            out,
            buffer: ChunkBuffer::new(chunk_size),
            previous: ledger.last().copied(),
            start_offset,
            chunks_written: 0,
            values_written: 0,
        })
    }

    // An incomplete entry at the end of the metadata file would corrupt
    // every entry appended after it, so it has to go before anything else.
    fn read_and_repair_ledger(&self) -> Result<Ledger> {
        let mut ledger = read_ledger(&self.store, &self.files.meta)?;
        if ledger.has_torn_tail() {
            warn!(
                column = %self.column,
                path = %self.files.meta.display(),
                valid_len = ledger.valid_len,
                actual_len = ledger.actual_len,
                "incomplete entry in dictionary metadata file, truncating"
            );
            self.store.truncate(&self.files.meta, ledger.valid_len)?;
            ledger.actual_len = ledger.valid_len;
        }
        Ok(ledger)
    }

    // Returns the offset this session's chunks start at.
    fn repair_dictionary(&self, ledger: &Ledger) -> Result<u64> {
        match check_against_ledger(&self.store, &self.files, ledger)? {
            Consistency::Fresh => Ok(0),
            Consistency::Consistent { end_offset } => Ok(end_offset),
            Consistency::TornTail {
                end_offset,
                actual_len,
            } => {
                info!(
                    column = %self.column,
                    end_offset,
                    actual_len,
                    "inconsistency in dictionary file, truncating to last recorded end offset"
                );
                match self.store.truncate(&self.files.dictionary, end_offset) {
                    Ok(()) => Ok(end_offset),
                    Err(e) => {
                        // The stale bytes stay as an unreferenced gap; no
                        // entry's offset range covers them.
                        warn!(
                            column = %self.column,
                            error = %e,
                            "dictionary file not truncated, appending after stale tail"
                        );
                        Ok(actual_len)
                    }
                }
            }
            Consistency::Shrunk {
                end_offset,
                actual_len,
            } => {
                error!(
                    column = %self.column,
                    end_offset,
                    actual_len,
                    "dictionary file is shorter than its metadata records"
                );
                Err(err(format!(
                    "dictionary file for column {} is {} bytes but metadata records {}",
                    self.column, actual_len, end_offset
                )))
            }
        }
    }
}

impl<W: Writer> Session<W> {
    fn flush_chunk(&mut self) -> Result<()> {
        let n = self.buffer.len();
        let chunk = self.buffer.take();
        let bytes = write_record(&mut self.out, &chunk)?;
        self.chunks_written = self
            .chunks_written
            .checked_add(1)
            .ok_or_else(|| err("chunk count overflow"))?;
        debug!(values = n, bytes, "dictionary chunk flushed");
        Ok(())
    }
}
