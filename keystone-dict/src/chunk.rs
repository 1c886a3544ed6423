use serde::{
    de::{self, SeqAccess, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::fmt;

/// One raw dictionary value. Serialized as a MessagePack `bin`, so inside a
/// chunk every value is individually length-prefixed.
#[derive(Clone, Default, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub struct DictValue(pub Vec<u8>);

impl Serialize for DictValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

struct DictValueVisitor;

impl<'de> Visitor<'de> for DictValueVisitor {
    type Value = DictValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a byte string")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<DictValue, E> {
        Ok(DictValue(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<DictValue, E> {
        Ok(DictValue(v))
    }

    // Tolerate encoders that wrote the bytes as an array of small ints.
    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<DictValue, A::Error> {
        let mut v = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(b) = seq.next_element::<u8>()? {
            v.push(b);
        }
        Ok(DictValue(v))
    }
}

impl<'de> Deserialize<'de> for DictValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<DictValue, D::Error> {
        deserializer.deserialize_bytes(DictValueVisitor)
    }
}

/// One chunk record of the dictionary file: values in ascending key order.
#[derive(Clone, Default, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct DictionaryChunk {
    pub values: Vec<DictValue>,
}

// Values accumulated for the chunk currently being built.
#[derive(Debug)]
pub(crate) struct ChunkBuffer {
    values: Vec<DictValue>,
    threshold: usize,
}

impl ChunkBuffer {
    pub(crate) fn new(threshold: usize) -> Self {
        ChunkBuffer {
            values: Vec::new(),
            threshold,
        }
    }

    pub(crate) fn push(&mut self, value: Vec<u8>) {
        self.values.push(DictValue(value));
    }

    pub(crate) fn is_full(&self) -> bool {
        self.values.len() >= self.threshold
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn take(&mut self) -> DictionaryChunk {
        DictionaryChunk {
            values: std::mem::take(&mut self.values),
        }
    }
}
