use super::{config, table_path};
use crate::{
    append_entry, check_consistency, read_entries, ColumnMetaEntry, Consistency, DictionaryReader,
    DictionaryWriter, MemStore, Store,
};
use keystone_base::{ColumnId, Result};
use test_log::test;

fn column() -> ColumnId {
    ColumnId::new("city")
}

fn seed(store: &MemStore, vals: &[&str]) -> Result<ColumnMetaEntry> {
    let mut wr = DictionaryWriter::new(store.clone(), &table_path(), column(), config(2))?;
    for v in vals {
        wr.write_str(v)?;
    }
    wr.close()
}

fn files() -> crate::ColumnFiles {
    table_path().column_files(&column()).unwrap()
}

#[test]
fn test_torn_tail_is_truncated_before_appending() -> Result<()> {
    let store = MemStore::new();
    let first = seed(&store, &["berlin", "cairo", "delhi"])?;
    store.append_raw(&files().dictionary, b"garbage from a crashed session")?;
    assert_eq!(
        check_consistency(&store, &files())?,
        Consistency::TornTail {
            end_offset: first.end_offset,
            actual_len: first.end_offset + 30,
        }
    );

    let second = seed(&store, &["lima"])?;
    assert_eq!(second.start_offset, first.end_offset);
    assert_eq!(second.min_key, 4);
    assert_eq!(store.len(&files().dictionary)?, second.end_offset);
    assert_eq!(
        check_consistency(&store, &files())?,
        Consistency::Consistent {
            end_offset: second.end_offset
        }
    );
    let dict = DictionaryReader::new(store.clone(), &table_path(), column())?.load()?;
    assert_eq!(dict.key_of(b"lima"), Some(4));
    Ok(())
}

#[test]
fn test_opening_alone_truncates_to_recorded_end() -> Result<()> {
    let store = MemStore::new();
    let first = seed(&store, &["berlin"])?;
    store.append_raw(&files().dictionary, &[0xff; 64])?;
    let empty = seed(&store, &[])?;
    assert_eq!(store.len(&files().dictionary)?, first.end_offset);
    assert_eq!(empty.start_offset, first.end_offset);
    assert_eq!(empty.end_offset, first.end_offset);
    Ok(())
}

#[test]
fn test_failed_truncate_appends_after_stale_tail() -> Result<()> {
    let store = MemStore::new();
    let first = seed(&store, &["berlin", "cairo"])?;
    store.append_raw(&files().dictionary, &[0xab; 10])?;
    store.fail_truncate(true)?;

    let second = seed(&store, &["delhi"])?;
    assert_eq!(second.start_offset, first.end_offset + 10);
    assert_eq!((second.min_key, second.max_key), (3, 3));

    // The reader only decodes committed ranges, so the gap is never read.
    let dict = DictionaryReader::new(store.clone(), &table_path(), column())?.load()?;
    assert_eq!(dict.key_of(b"delhi"), Some(3));
    Ok(())
}

#[test]
fn test_shrunk_dictionary_fails_fast() -> Result<()> {
    let store = MemStore::new();
    let first = seed(&store, &["berlin", "cairo", "delhi"])?;
    let mut data = store.read_all(&files().dictionary)?;
    data.truncate(3);
    store.put(&files().dictionary, data)?;
    assert_eq!(
        check_consistency(&store, &files())?,
        Consistency::Shrunk {
            end_offset: first.end_offset,
            actual_len: 3,
        }
    );
    assert!(!check_consistency(&store, &files())?.is_repairable());

    let mut wr = DictionaryWriter::new(store.clone(), &table_path(), column(), config(2))?;
    assert!(wr.write_str("lima").is_err());
    // Once failed, the session stays failed.
    assert!(wr.write_str("oslo").is_err());
    assert!(wr.close().is_err());
    assert_eq!(read_entries(&store, &files().meta)?, vec![first]);
    assert_eq!(store.len(&files().dictionary)?, 3);
    Ok(())
}

#[test]
fn test_missing_dictionary_with_ledger_is_shrunk() -> Result<()> {
    let store = MemStore::new();
    let entry = ColumnMetaEntry::next_session(None, 2, 0, 40, 1)?;
    append_entry(&store, &files().meta, &entry)?;
    assert_eq!(
        check_consistency(&store, &files())?,
        Consistency::Shrunk {
            end_offset: 40,
            actual_len: 0,
        }
    );
    Ok(())
}

#[test]
fn test_dictionary_without_ledger_is_all_torn() -> Result<()> {
    let store = MemStore::new();
    assert_eq!(check_consistency(&store, &files())?, Consistency::Fresh);
    store.put(&files().dictionary, vec![1, 2, 3, 4, 5])?;
    assert_eq!(
        check_consistency(&store, &files())?,
        Consistency::TornTail {
            end_offset: 0,
            actual_len: 5,
        }
    );
    let entry = seed(&store, &["berlin"])?;
    assert_eq!((entry.start_offset, entry.min_key), (0, 1));
    Ok(())
}

#[test]
fn test_incomplete_meta_entry_is_dropped() -> Result<()> {
    let store = MemStore::new();
    let first = seed(&store, &["berlin"])?;
    // Dictionary bytes of a session that died while appending its entry.
    store.append_raw(&files().dictionary, &[0x11; 8])?;
    store.append_raw(&files().meta, &[0x09, 0x00])?;

    let second = seed(&store, &["cairo"])?;
    assert_eq!(second.start_offset, first.end_offset);
    assert_eq!(read_entries(&store, &files().meta)?, vec![first, second]);
    Ok(())
}
