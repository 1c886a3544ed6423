use crate::{
    chunk::DictionaryChunk,
    ioutil::Store,
    meta::{read_ledger, ColumnMetaEntry},
    path::{ColumnFiles, TablePath},
    record::decode_records,
};
use keystone_base::{err, ColumnId, Result, SurrogateKey, FIRST_SURROGATE_KEY, NO_SURROGATE_KEY};
use rapidhash::RapidHashMap;

/// Reads back what DictionaryWriter sessions committed. Only byte ranges
/// covered by meta entries are decoded, so a torn tail or a gap left by a
/// failed truncation is never looked at.
pub struct DictionaryReader<S: Store> {
    store: S,
    column: ColumnId,
    files: ColumnFiles,
}

impl<S: Store> DictionaryReader<S> {
    pub fn new(store: S, table_path: &TablePath, column: ColumnId) -> Result<Self> {
        let files = table_path.column_files(&column)?;
        Ok(DictionaryReader {
            store,
            column,
            files,
        })
    }

    pub fn files(&self) -> &ColumnFiles {
        &self.files
    }

    pub fn entries(&self) -> Result<Vec<ColumnMetaEntry>> {
        Ok(read_ledger(&self.store, &self.files.meta)?.entries)
    }

    pub fn read_entry_chunks(&self, entry: &ColumnMetaEntry) -> Result<Vec<DictionaryChunk>> {
        if entry.start_offset == entry.end_offset {
            return Ok(Vec::new());
        }
        let buf = self
            .store
            .read_range(&self.files.dictionary, entry.start_offset..entry.end_offset)?;
        decode_records(&buf)
    }

    pub fn read_entry_values(&self, entry: &ColumnMetaEntry) -> Result<Vec<Vec<u8>>> {
        Ok(self
            .read_entry_chunks(entry)?
            .into_iter()
            .flat_map(|c| c.values)
            .map(|v| v.0)
            .collect())
    }

    /// Every committed value in key order. A column with no ledger loads
    /// as an empty dictionary.
    pub fn load(&self) -> Result<ColumnDictionary> {
        let mut values = Vec::new();
        let mut prev_max = NO_SURROGATE_KEY;
        for entry in self.entries()? {
            let expected = entry.max_key.checked_sub(prev_max).ok_or_else(|| {
                err(format!(
                    "dictionary metadata for column {} goes backwards: max key {} after {}",
                    self.column, entry.max_key, prev_max
                ))
            })?;
            let session_values = self.read_entry_values(&entry)?;
            if session_values.len() as u64 != u64::from(expected) {
                return Err(err(format!(
                    "dictionary for column {} has {} values in keys {}..={}, expected {}",
                    self.column,
                    session_values.len(),
                    entry.min_key,
                    entry.max_key,
                    expected
                )));
            }
            values.extend(session_values);
            prev_max = entry.max_key;
        }
        ColumnDictionary::from_values(values)
    }
}

/// A column's full dictionary in memory: the value with key `k` is at
/// index `k - 1`.
#[derive(Clone, Debug, Default)]
pub struct ColumnDictionary {
    values: Vec<Vec<u8>>,
    keys: RapidHashMap<Vec<u8>, SurrogateKey>,
}

impl ColumnDictionary {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_values(values: Vec<Vec<u8>>) -> Result<Self> {
        let mut keys = RapidHashMap::default();
        keys.reserve(values.len());
        for (i, v) in values.iter().enumerate() {
            let key = SurrogateKey::try_from(i + 1)
                .map_err(|_| err("surrogate key space exhausted"))?;
            if keys.insert(v.clone(), key).is_some() {
                return Err(err(format!(
                    "duplicate dictionary value at key {}",
                    key
                )));
            }
        }
        Ok(ColumnDictionary { values, keys })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn max_key(&self) -> SurrogateKey {
        self.values.len() as SurrogateKey
    }

    pub fn contains(&self, value: &[u8]) -> bool {
        self.keys.contains_key(value)
    }

    pub fn key_of(&self, value: &[u8]) -> Option<SurrogateKey> {
        self.keys.get(value).copied()
    }

    pub fn value_of(&self, key: SurrogateKey) -> Option<&[u8]> {
        let i = key.checked_sub(FIRST_SURROGATE_KEY)? as usize;
        self.values.get(i).map(|v| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (SurrogateKey, &[u8])> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| ((i + 1) as SurrogateKey, v.as_slice()))
    }
}
