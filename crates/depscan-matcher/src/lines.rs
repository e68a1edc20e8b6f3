//! Line reader tolerant of non-UTF-8 content.
//!
//! Source trees contain images, archives and files in legacy encodings.
//! Lines are split on `\n` (a trailing `\r` is dropped) and decoded lossily,
//! so only real I/O failures surface as errors.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

pub struct LossyLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl LossyLines<BufReader<File>> {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> LossyLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
