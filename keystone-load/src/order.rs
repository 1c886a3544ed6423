// Unsigned byte-lexicographic order: compare byte by byte as 0..=255, and a
// strict prefix sorts before anything it prefixes. Distinct sequences never
// compare equal, so sorting a set of distinct values is deterministic.
//
// Compares 8 bytes at a time by reading each word big-endian, which orders
// the same as comparing its bytes one by one.

use std::cmp::Ordering;

fn be_word(bytes: &[u8]) -> u64 {
    let mut buf = [0_u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_be_bytes(buf)
}

pub fn compare_bytes(a: &[u8], b: &[u8]) -> Ordering {
    let common = a.len().min(b.len());
    let words = common / 8;
    for i in 0..words {
        let r = i * 8..i * 8 + 8;
        match be_word(&a[r.clone()]).cmp(&be_word(&b[r])) {
            Ordering::Equal => {}
            ord => return ord,
        }
    }
    for i in words * 8..common {
        match a[i].cmp(&b[i]) {
            Ordering::Equal => {}
            ord => return ord,
        }
    }
    a.len().cmp(&b.len())
}

pub fn sort_distinct(values: &mut [Vec<u8>]) {
    values.sort_unstable_by(|a, b| compare_bytes(a, b));
}

pub fn is_strictly_ascending(values: &[Vec<u8>]) -> bool {
    values
        .windows(2)
        .all(|w| compare_bytes(&w[0], &w[1]) == Ordering::Less)
}
