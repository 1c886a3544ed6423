// Per-column dictionary storage. Each dictionary-encoded column owns two
// append-only files under its table's Metadata directory:
//
// - `<column>.dict`: a sequence of chunk records, each one a list of raw
//   values in ascending surrogate-key order. The value with key k is the
//   k-th value across all chunks.
//
// - `<column>.dictmeta`: a ledger of ColumnMetaEntry records, one per write
//   session, giving that session's key range and the byte range its chunks
//   occupy in the `.dict` file.
//
// The `.dict` file is always written and synced before the session's
// ledger entry is appended, so the last entry's end offset is the length of
// everything that has been committed. Any bytes beyond it were written by a
// session that didn't finish, and the next session cuts them off.

mod chunk;
mod dump;
mod ioutil;
mod meta;
mod path;
mod reader;
mod record;
mod recover;
mod writer;


pub use chunk::{DictValue, DictionaryChunk};
pub use dump::Annotations;
pub use ioutil::{FileStore, FileWriter, MemStore, MemWriter, Store, Writer};
pub use meta::{append_entry, read_entries, read_last_entry, read_ledger, ColumnMetaEntry, Ledger};
pub use path::{ColumnFiles, TableIdentifier, TablePath};
pub use reader::{ColumnDictionary, DictionaryReader};
pub use record::{decode_records, encode_record, write_record, RECORD_HEADER_LEN};
pub use recover::{check_consistency, Consistency};
pub use writer::DictionaryWriter;
