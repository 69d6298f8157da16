//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::io::{self, Read, Write};

/// Generates `rows` data rows lazily so the input never exists in memory.
pub struct SyntheticTable {
    rows: u64,
    next: u64,
    pending: Vec<u8>,
    offset: usize,
}

impl SyntheticTable {
    pub fn new(rows: u64) -> Self {
        Self {
            rows,
            next: 0,
            pending: b"id,site,t1,t2,t3\n".to_vec(),
            offset: 0,
        }
    }
}

impl Read for SyntheticTable {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.offset == self.pending.len() {
            if self.next == self.rows {
                return Ok(0);
            }
            self.next += 1;
            self.pending.clear();
            self.offset = 0;
            let n = self.next;
            writeln!(self.pending, "{n},north,1.{n},2.{n},3.{n}")?;
        }
        let n = buf.len().min(self.pending.len() - self.offset);
        buf[..n].copy_from_slice(&self.pending[self.offset..self.offset + n]);
        self.offset += n;
        Ok(n)
    }
}

/// Counts output lines and bytes, keeping nothing.
#[derive(Default)]
pub struct CountingSink {
    pub bytes: usize,
    pub newlines: usize,
}

impl Write for CountingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes += buf.len();
        self.newlines += buf.iter().filter(|&&b| b == b'\n').count();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
