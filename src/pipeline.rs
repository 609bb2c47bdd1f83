//! 批处理驱动：读取输入，线程池中并行纠错，再由单个聚合器按输入顺序归并。

use std::fs::File;
use std::io::BufWriter;

use anyhow::{bail, Context, Result};
use rayon::prelude::*;

use crate::aggregate::{Aggregator, RunTotals};
use crate::index::{IndexMeta, KmerIndex, ReadIndex};
use crate::io::{self, SeqRecord};
use crate::walk::{BoundedSearch, IntervalSearch, Mode, WalkParams, Walker, WorkItem};

/// 每批并行处理的工作项数
pub const CHUNK_SIZE: usize = 1024;

/// 从 FASTA/FASTQ 读段构建索引并写入 `<prefix>.fmw`，返回索引路径。
pub fn build_index(reads_path: &str, output_prefix: &str) -> Result<String> {
    let records = io::read_all(reads_path)?;
    if records.is_empty() {
        bail!("'{}' contains no reads", reads_path);
    }
    let seqs: Vec<&[u8]> = records.iter().map(|r| r.seq.as_slice()).collect();
    let mut index = ReadIndex::build(&seqs);
    index.set_meta(IndexMeta {
        source_file: Some(reads_path.to_string()),
        build_args: Some(std::env::args().collect::<Vec<_>>().join(" ")),
        build_timestamp: Some(chrono::Utc::now().to_rfc3339()),
    });

    let out_path = format!("{}.fmw", output_prefix);
    index.save_to_file(&out_path)?;
    log::info!("indexed {} reads ({} bp) into {}", index.n_reads, index.total_len, out_path);
    Ok(out_path)
}

/// 一次 `walk` 运行的全部输入
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub index_path: String,
    pub reads_path: String,
    /// 双端模式下的第二个文件；缺省时按相邻记录成对读取
    pub mates_path: Option<String>,
    pub output_prefix: String,
    pub mode: Mode,
    pub params: WalkParams,
    pub threads: usize,
}

impl RunConfig {
    pub fn output_paths(&self) -> [String; 3] {
        ["corrected", "discard", "failed"].map(|kind| format!("{}.{}.fa", self.output_prefix, kind))
    }
}

/// 读入工作项。双端模式下两个文件必须记录数一致，交错文件记录数必须为偶数。
pub fn load_items(reads_path: &str, mates_path: Option<&str>, paired: bool) -> Result<Vec<WorkItem>> {
    let first = io::read_all(reads_path)?;
    if !paired {
        if mates_path.is_some() {
            log::warn!("second reads file ignored in single-read mode");
        }
        return Ok(first.into_iter().map(WorkItem::Single).collect());
    }

    let pairs: Vec<(SeqRecord, SeqRecord)> = match mates_path {
        Some(path) => {
            let second = io::read_all(path)?;
            if first.len() != second.len() {
                bail!("'{}' has {} reads but '{}' has {}", reads_path, first.len(), path, second.len());
            }
            first.into_iter().zip(second).collect()
        }
        None => {
            if first.len() % 2 != 0 {
                bail!("interleaved file '{}' has an odd number of reads ({})", reads_path, first.len());
            }
            let mut it = first.into_iter();
            let mut pairs = Vec::new();
            while let (Some(a), Some(b)) = (it.next(), it.next()) {
                pairs.push((a, b));
            }
            pairs
        }
    };
    Ok(pairs.into_iter().map(|(a, b)| WorkItem::Pair(a, b)).collect())
}

/// 分批并行处理，结果按输入顺序交给聚合器。
pub fn process_items<I, S, W>(
    walker: Walker<'_, I, S>,
    mode: Mode,
    items: &[WorkItem],
    pool: &rayon::ThreadPool,
    agg: &mut Aggregator<W>,
) -> Result<()>
where
    I: KmerIndex + ?Sized,
    S: BoundedSearch + ?Sized,
    W: std::io::Write,
{
    for (n, chunk) in items.chunks(CHUNK_SIZE).enumerate() {
        let results: Vec<_> = pool.install(|| {
            chunk.par_iter().map(|item| walker.run(mode, item)).collect::<Result<Vec<_>>>()
        })?;
        for (item, res) in chunk.iter().zip(results) {
            agg.process(item, res)?;
        }
        log::debug!("processed {} items", n * CHUNK_SIZE + chunk.len());
    }
    Ok(())
}

pub fn run(cfg: &RunConfig) -> Result<RunTotals> {
    let mut params = cfg.params.clone();
    params.validate()?;

    let index = ReadIndex::load_from_file(&cfg.index_path)?;
    log::info!("loaded index {} ({} reads, {} bp)", cfg.index_path, index.n_reads, index.total_len);
    if params.median_kmer_freq == 0 {
        params.median_kmer_freq = index.median_kmer_freq(params.kmer_length);
        log::info!("median {}-mer frequency: {}", params.kmer_length, params.median_kmer_freq);
    }

    let items = load_items(&cfg.reads_path, cfg.mates_path.as_deref(), cfg.mode.is_paired())?;
    log::info!("{} work items, mode {:?}", items.len(), cfg.mode);

    let [corrected, discard, failed] = cfg.output_paths();
    let create = |path: &str| -> Result<BufWriter<File>> {
        let f = File::create(path).with_context(|| format!("cannot create output '{}'", path))?;
        Ok(BufWriter::new(f))
    };
    let mut agg = Aggregator::new(cfg.mode, create(&corrected)?, create(&discard)?, create(&failed)?);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cfg.threads)
        .build()
        .context("cannot build worker thread pool")?;
    let search = IntervalSearch::new(&index);
    let walker = Walker::new(&index, &search, &params);
    process_items(walker, cfg.mode, &items, &pool, &mut agg)?;

    let (totals, _) = agg.finish()?;
    log::info!("run finished\n{}", totals);
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::testutil::{corpus, genome};
    use crate::io::fasta::FastaWriter;

    fn write_fasta(path: &std::path::Path, seqs: &[(&str, &[u8])]) {
        let mut w = FastaWriter::new(File::create(path).unwrap());
        for (id, seq) in seqs {
            w.write(id, seq).unwrap();
        }
        w.flush().unwrap();
    }

    #[test]
    fn index_then_kmerize_run() {
        let dir = tempfile::tempdir().unwrap();
        let reads = dir.path().join("reads.fa");
        let corpus = corpus();
        let named: Vec<(String, &[u8])> =
            corpus.iter().enumerate().map(|(i, s)| (format!("c{}", i), s.as_slice())).collect();
        let refs: Vec<(&str, &[u8])> = named.iter().map(|(id, s)| (id.as_str(), *s)).collect();
        write_fasta(&reads, &refs);

        let prefix = dir.path().join("idx").to_string_lossy().into_owned();
        let index_path = build_index(reads.to_str().unwrap(), &prefix).unwrap();
        let loaded = ReadIndex::load_from_file(&index_path).unwrap();
        assert_eq!(loaded.n_reads, corpus.len());
        assert!(loaded.meta.build_timestamp.is_some());

        let query = dir.path().join("query.fa");
        let g = genome();
        write_fasta(&query, &[("q1", &g[300..400]), ("q2", &g[800..900])]);

        let cfg = RunConfig {
            index_path,
            reads_path: query.to_string_lossy().into_owned(),
            mates_path: None,
            output_prefix: dir.path().join("out").to_string_lossy().into_owned(),
            mode: Mode::Kmerize,
            params: WalkParams { kmer_length: 21, ..WalkParams::default() },
            threads: 2,
        };
        let totals = run(&cfg).unwrap();
        assert_eq!((totals.kmerized, totals.merged, totals.failed), (2, 0, 0));

        let out = io::read_all(&cfg.output_paths()[0]).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "q1");
        assert_eq!(out[0].seq, g[300..400].to_vec());
        assert_eq!(out[1].seq, g[800..900].to_vec());
    }

    #[test]
    fn pairs_from_two_files_or_interleaved() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.fa");
        let b = dir.path().join("b.fa");
        write_fasta(&a, &[("p/1", b"ACGT"), ("q/1", b"GGCC")]);
        write_fasta(&b, &[("p/2", b"TTTT"), ("q/2", b"CCAA")]);
        let (a, b) = (a.to_str().unwrap(), b.to_str().unwrap());

        let items = load_items(a, Some(b), true).unwrap();
        assert_eq!(items.len(), 2);
        match &items[1] {
            WorkItem::Pair(x, y) => assert_eq!((x.id.as_str(), y.id.as_str()), ("q/1", "q/2")),
            other => panic!("expected pair, got {:?}", other),
        }

        let interleaved = load_items(a, None, true).unwrap();
        assert_eq!(interleaved.len(), 1);
        assert_eq!(interleaved[0].id(), "p/1");

        assert_eq!(load_items(a, None, false).unwrap().len(), 2);
    }

    #[test]
    fn uneven_pairs_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.fa");
        let b = dir.path().join("b.fa");
        write_fasta(&a, &[("p/1", b"ACGT"), ("q/1", b"GGCC"), ("r/1", b"AAAC")]);
        write_fasta(&b, &[("p/2", b"TTTT")]);
        let (a, b) = (a.to_str().unwrap(), b.to_str().unwrap());
        assert!(load_items(a, Some(b), true).is_err());
        assert!(load_items(a, None, true).is_err());
    }

    #[test]
    fn missing_index_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RunConfig {
            index_path: dir.path().join("none.fmw").to_string_lossy().into_owned(),
            reads_path: "unused".into(),
            mates_path: None,
            output_prefix: dir.path().join("out").to_string_lossy().into_owned(),
            mode: Mode::Kmerize,
            params: WalkParams::default(),
            threads: 1,
        };
        assert!(run(&cfg).is_err());
    }
}
