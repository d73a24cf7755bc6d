use crate::config::READ_BUFFER_SIZE;
use anyhow::{Context, Result};
use bzip2::read::BzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// One physical line of a dump, without its terminator.
///
/// Kept as bytes so a line with broken UTF-8 fails on its own instead of
/// poisoning the whole stream.
#[derive(Debug, Clone)]
pub struct DumpLine {
    pub number: u64,
    pub bytes: Vec<u8>,
}

/// Streams a dump file one line at a time. Files ending in `.bz2` are
/// decompressed on the fly.
pub struct DumpReader {
    reader: Box<dyn BufRead + Send>,
    line_number: u64,
    failed: bool,
}

impl DumpReader {
    pub fn open(path: &str) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open dump at: {}", path))?;

        if is_bzip2(path) {
            Ok(Self::from_reader(BzDecoder::new(file)))
        } else {
            Ok(Self::from_reader(file))
        }
    }

    pub fn from_reader<R>(inner: R) -> Self
    where
        R: Read + Send + 'static,
    {
        Self {
            reader: Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, inner)),
            line_number: 0,
            failed: false,
        }
    }
}

fn is_bzip2(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("bz2"))
}

impl Iterator for DumpReader {
    type Item = io::Result<DumpLine>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let mut buf = Vec::new();
            match self.reader.read_until(b'\n', &mut buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_number += 1;
                    if buf.last() == Some(&b'\n') {
                        buf.pop();
                    }
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                    // blank lines carry no record
                    if buf.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    return Some(Ok(DumpLine {
                        number: self.line_number,
                        bytes: buf,
                    }));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
