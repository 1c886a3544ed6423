// Annotated hexdumps of dictionary and metadata files, for the `inspect`
// command and for eyeballing test failures.

use crate::record::{split_frames, RECORD_HEADER_LEN};
use keystone_base::Result;
use std::{fmt::Write, ops::Range};

pub struct Annotations {
    context: Vec<String>,
    annotations: Vec<(Range<usize>, Vec<String>)>,
}

impl Annotations {
    pub fn new() -> Self {
        Annotations {
            context: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Labels every record frame of `buf` as `<kind>.<n>.len` and
    /// `<kind>.<n>.payload`, and whatever follows the last complete frame
    /// as `torn_tail`.
    pub fn for_records(kind: &str, buf: &[u8]) -> Self {
        let mut ann = Annotations::new();
        ann.push_context(kind);
        let (frames, valid_len) = split_frames(buf);
        let mut pos = 0;
        for (n, frame) in frames.iter().enumerate() {
            ann.push_context(n);
            ann.annotate(pos..pos + RECORD_HEADER_LEN, "len");
            pos += RECORD_HEADER_LEN;
            ann.annotate(pos..pos + frame.len(), "payload");
            pos += frame.len();
            ann.pop_context();
        }
        ann.pop_context();
        if valid_len < buf.len() {
            ann.annotate(valid_len..buf.len(), "torn_tail");
        }
        ann
    }

    pub fn push_context<T: ToString>(&mut self, context: T) {
        self.context.push(context.to_string());
    }

    pub fn pop_context(&mut self) {
        self.context.pop();
    }

    pub fn annotate<T: ToString>(&mut self, range: Range<usize>, name: T) {
        let mut ctx = self.context.clone();
        ctx.push(name.to_string());
        self.annotations.push((range, ctx));
    }

    pub fn render_hexdump(&self, buf: &[u8]) -> Result<String> {
        let mut s = String::new();
        let mut pos = 0;
        for (r, name) in self.annotations.iter() {
            if r.is_empty() {
                continue;
            }
            let name = name.join(".");
            if r.start < pos {
                writeln!(s, "- ERROR: overlapping range for {}", name)?;
            }
            if r.start > pos {
                writeln!(s, "- ERROR: unannotated ({} bytes)", r.start - pos)?;
            }
            pos = r.end;
            writeln!(s, "- {} ({} bytes):", name, r.len())?;
            let Some(bytes) = buf.get(r.clone()) else {
                writeln!(s, "- ERROR: range {:?} past end of buffer", r)?;
                continue;
            };
            let mut prev: Option<&[u8]> = None;
            let mut repeated = 0;
            for (n, line) in bytes.chunks(16).enumerate() {
                if line.len() == 16 && prev == Some(line) {
                    repeated += 1;
                    continue;
                }
                if repeated > 0 {
                    writeln!(s, "\t ... previous line repeated {} times", repeated)?;
                    repeated = 0;
                }
                prev = Some(line);
                write_line(&mut s, r.start + n * 16, line)?;
            }
            if repeated > 0 {
                writeln!(s, "\t ... previous line repeated {} times", repeated)?;
            }
        }
        Ok(s)
    }
}

impl Default for Annotations {
    fn default() -> Self {
        Self::new()
    }
}

fn write_line(s: &mut String, offset: usize, line: &[u8]) -> std::fmt::Result {
    write!(s, "\t {:08.8x} |", offset)?;
    for group in line.chunks(4) {
        s.push_str("  ");
        for byte in group {
            write!(s, " {:02.2x}", byte)?;
        }
    }
    for pad in 0..(16 - line.len()) {
        s.push_str("   ");
        if pad & 3 == 3 {
            s.push_str("  ");
        }
    }
    s.push_str("   | ");
    for ch in line {
        if ch.is_ascii_graphic() {
            s.push(*ch as char);
        } else {
            s.push('.');
        }
    }
    s.push('\n');
    Ok(())
}
