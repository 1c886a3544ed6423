// Records are framed as a 4-byte little-endian payload length followed by a
// MessagePack payload. Both the dictionary file and the metadata file are
// plain sequences of these frames.

use keystone_base::{err, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::io::Write;

pub const RECORD_HEADER_LEN: usize = 4;

pub fn encode_record<T: Serialize>(val: &T) -> Result<Vec<u8>> {
    let payload = rmp_serde::to_vec(val)?;
    let len = u32::try_from(payload.len()).map_err(|_| err("record payload exceeds 4GiB"))?;
    let mut buf = Vec::with_capacity(RECORD_HEADER_LEN + payload.len());
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Writes one framed record, returning the number of bytes written.
pub fn write_record<T: Serialize>(wr: &mut impl Write, val: &T) -> Result<u64> {
    let buf = encode_record(val)?;
    wr.write_all(&buf)?;
    Ok(buf.len() as u64)
}

/// The complete frames at the front of `buf`, plus the number of bytes they
/// span. Anything past that is an incomplete frame: a header or payload cut
/// short.
pub(crate) fn split_frames(buf: &[u8]) -> (Vec<&[u8]>, usize) {
    let mut frames = Vec::new();
    let mut pos = 0;
    while let Some(header) = buf.get(pos..pos + RECORD_HEADER_LEN) {
        let mut len = [0_u8; RECORD_HEADER_LEN];
        len.copy_from_slice(header);
        let len = u32::from_le_bytes(len) as usize;
        let start = pos + RECORD_HEADER_LEN;
        match buf.get(start..start + len) {
            Some(payload) => {
                frames.push(payload);
                pos = start + len;
            }
            None => break,
        }
    }
    (frames, pos)
}

pub fn decode_payload<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    Ok(rmp_serde::from_slice(payload)?)
}

/// Decodes every record in `buf`, which must end exactly on a frame boundary.
pub fn decode_records<T: DeserializeOwned>(buf: &[u8]) -> Result<Vec<T>> {
    let (frames, valid_len) = split_frames(buf);
    if valid_len != buf.len() {
        return Err(err(format!(
            "truncated record at offset {} ({} trailing bytes)",
            valid_len,
            buf.len() - valid_len
        )));
    }
    frames.into_iter().map(decode_payload::<T>).collect()
}
