use anyhow::{anyhow, Result};
use std::io::BufRead;

use super::SeqRecord;

pub struct FastqReader<R: BufRead> {
    reader: R,
    buf: String,
    done: bool,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buf: String::new(), done: false }
    }

    fn line(&mut self) -> Result<bool> {
        self.buf.clear();
        Ok(self.reader.read_line(&mut self.buf)? > 0)
    }

    pub fn next_record(&mut self) -> Result<Option<SeqRecord>> {
        if self.done { return Ok(None); }

        // header line starting with '@', blank lines between records are tolerated
        loop {
            if !self.line()? { self.done = true; return Ok(None); }
            if !self.buf.trim().is_empty() { break; }
        }
        let id = match self.buf.strip_prefix('@') {
            Some(h) => h.split_whitespace().next().unwrap_or("").to_string(),
            None => return Err(anyhow!("FASTQ header not starting with '@'")),
        };

        if !self.line()? { return Err(anyhow!("unexpected EOF after header of '{}'", id)); }
        let seq = self.buf.trim_end().as_bytes().to_ascii_uppercase();

        if !self.line()? || !self.buf.starts_with('+') {
            return Err(anyhow!("missing '+' line in record '{}'", id));
        }

        if !self.line()? { return Err(anyhow!("missing quality line in record '{}'", id)); }
        // line-wrapped FASTQ is not supported
        if self.buf.trim_end().len() != seq.len() {
            return Err(anyhow!("seq/qual length mismatch in record '{}'", id));
        }

        Ok(Some(SeqRecord { id, seq }))
    }
}
