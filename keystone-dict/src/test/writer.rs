use super::{config, table_path};
use crate::{DictionaryReader, DictionaryWriter, FileStore, MemStore, Store, TableIdentifier, TablePath};
use keystone_base::{ColumnId, Result};
use test_log::test;

fn write_session(store: &MemStore, chunk_size: usize, vals: &[&str]) -> Result<crate::ColumnMetaEntry> {
    let mut wr = DictionaryWriter::new(store.clone(), &table_path(), ColumnId::new("city"), config(chunk_size))?;
    for v in vals {
        wr.write_str(v)?;
    }
    wr.close()
}

fn reader(store: &MemStore) -> Result<DictionaryReader<MemStore>> {
    DictionaryReader::new(store.clone(), &table_path(), ColumnId::new("city"))
}

#[test]
fn test_first_session_splits_chunks_at_threshold() -> Result<()> {
    let store = MemStore::new();
    let entry = write_session(&store, 2, &["berlin", "cairo", "delhi"])?;
    assert_eq!(entry.min_key, 1);
    assert_eq!(entry.max_key, 3);
    assert_eq!(entry.start_offset, 0);
    assert_eq!(entry.chunk_count, 2);

    let rd = reader(&store)?;
    assert_eq!(entry.end_offset, store.len(&rd.files().dictionary)?);
    let chunks = rd.read_entry_chunks(&entry)?;
    assert_eq!(chunks.iter().map(|c| c.values.len()).collect::<Vec<_>>(), vec![2, 1]);
    assert_eq!(rd.entries()?, vec![entry]);
    Ok(())
}

#[test]
fn test_later_session_continues_keys_and_offsets() -> Result<()> {
    let store = MemStore::new();
    let first = write_session(&store, 2, &["berlin", "cairo", "delhi"])?;
    let second = write_session(&store, 2, &["lima", "oslo"])?;
    assert_eq!((second.min_key, second.max_key), (4, 5));
    assert_eq!(second.start_offset, first.end_offset);
    assert!(second.end_offset > second.start_offset);
    assert_eq!(second.chunk_count, 3);

    let dict = reader(&store)?.load()?;
    let vals = dict.iter().map(|(_, v)| v.to_vec()).collect::<Vec<_>>();
    let expected = ["berlin", "cairo", "delhi", "lima", "oslo"]
        .iter()
        .map(|s| s.as_bytes().to_vec())
        .collect::<Vec<_>>();
    assert_eq!(vals, expected);
    assert_eq!(dict.key_of(b"lima"), Some(4));
    Ok(())
}

#[test]
fn test_session_without_values_still_records_entry() -> Result<()> {
    let store = MemStore::new();
    let first = write_session(&store, 10, &["berlin", "cairo", "delhi"])?;
    let empty = write_session(&store, 10, &[])?;
    assert_eq!((empty.min_key, empty.max_key), (3, 3));
    assert_eq!(empty.start_offset, first.end_offset);
    assert_eq!(empty.end_offset, first.end_offset);
    assert_eq!(empty.chunk_count, first.chunk_count);

    let rd = reader(&store)?;
    assert_eq!(store.len(&rd.files().dictionary)?, first.end_offset);
    assert_eq!(rd.entries()?.len(), 2);
    assert_eq!(rd.load()?.max_key(), 3);
    Ok(())
}

#[test]
fn test_first_session_without_values() -> Result<()> {
    let store = MemStore::new();
    let entry = write_session(&store, 10, &[])?;
    assert_eq!((entry.min_key, entry.max_key), (0, 0));
    assert_eq!((entry.start_offset, entry.end_offset, entry.chunk_count), (0, 0, 0));
    assert!(reader(&store)?.load()?.is_empty());
    Ok(())
}

#[test]
fn test_write_batch_lands_in_one_chunk() -> Result<()> {
    let store = MemStore::new();
    let mut wr = DictionaryWriter::new(store.clone(), &table_path(), ColumnId::new("city"), config(2))?;
    wr.write_batch((0..5).map(|i| format!("v{}", i).into_bytes()))?;
    let entry = wr.close()?;
    assert_eq!((entry.min_key, entry.max_key, entry.chunk_count), (1, 5, 1));
    let chunks = reader(&store)?.read_entry_chunks(&entry)?;
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].values.len(), 5);
    Ok(())
}

#[test]
fn test_empty_and_binary_values_survive() -> Result<()> {
    let store = MemStore::new();
    let mut wr = DictionaryWriter::new(store.clone(), &table_path(), ColumnId::new("city"), config(3))?;
    wr.write(b"")?;
    wr.write(&[0x00, 0xff, 0x80])?;
    wr.write_str("zürich")?;
    wr.close()?;
    let dict = reader(&store)?.load()?;
    assert_eq!(dict.value_of(1), Some(&b""[..]));
    assert_eq!(dict.value_of(2), Some(&[0x00, 0xff, 0x80][..]));
    assert_eq!(dict.value_of(3), Some("zürich".as_bytes()));
    Ok(())
}

#[test]
fn test_file_store_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = TablePath::new(dir.path(), TableIdentifier::new("retail", "sales"))?;
    let column = ColumnId::new("city");
    for batch in [vec!["berlin", "cairo"], vec![], vec!["delhi"]] {
        let mut wr = DictionaryWriter::new(FileStore::new(), &path, column.clone(), config(1))?;
        for v in batch {
            wr.write_str(v)?;
        }
        wr.close()?;
    }
    let rd = DictionaryReader::new(FileStore::new(), &path, column)?;
    let entries = rd.entries()?;
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].end_offset, std::fs::metadata(&rd.files().dictionary)?.len());
    assert_eq!(entries[2].chunk_count, 3);
    let dict = rd.load()?;
    assert_eq!(dict.key_of(b"delhi"), Some(3));
    Ok(())
}
