pub mod fasta;
pub mod fastq;

use anyhow::{Context, Result};
use std::io::BufRead;

/// 一条输入 read（FASTA 或 FASTQ，质量值不参与纠错）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqRecord {
    pub id: String,
    pub seq: Vec<u8>,
}

impl SeqRecord {
    pub fn new(id: impl Into<String>, seq: impl Into<Vec<u8>>) -> Self {
        Self { id: id.into(), seq: seq.into() }
    }
}

/// 按首个非空字符自动识别格式的 read 来源
pub enum ReadSource<R: BufRead> {
    Fasta(fasta::FastaReader<R>),
    Fastq(fastq::FastqReader<R>),
}

impl<R: BufRead> ReadSource<R> {
    pub fn detect(mut reader: R) -> Result<Self> {
        let first = loop {
            let buf = reader.fill_buf()?;
            match buf.iter().position(|b| !b.is_ascii_whitespace()) {
                Some(i) => break Some(buf[i]),
                None if buf.is_empty() => break None,
                None => {
                    let n = buf.len();
                    reader.consume(n);
                }
            }
        };
        match first {
            Some(b'@') => Ok(ReadSource::Fastq(fastq::FastqReader::new(reader))),
            // 空文件按 FASTA 处理，直接读到 EOF
            Some(b'>') | None => Ok(ReadSource::Fasta(fasta::FastaReader::new(reader))),
            Some(c) => anyhow::bail!("unrecognised read format (first byte '{}')", c as char),
        }
    }

    pub fn next_record(&mut self) -> Result<Option<SeqRecord>> {
        match self {
            ReadSource::Fasta(r) => r.next_record(),
            ReadSource::Fastq(r) => r.next_record(),
        }
    }
}

pub fn open_reads(path: &str) -> Result<ReadSource<std::io::BufReader<std::fs::File>>> {
    let fh = std::fs::File::open(path).with_context(|| format!("cannot open reads '{}'", path))?;
    ReadSource::detect(std::io::BufReader::new(fh))
}

/// 读取全部记录
pub fn read_all(path: &str) -> Result<Vec<SeqRecord>> {
    let mut src = open_reads(path)?;
    let mut out = Vec::new();
    while let Some(rec) = src.next_record()? {
        out.push(rec);
    }
    Ok(out)
}
