//! 结果聚合：每个工作项的结果恰好处理一次，统计量只在这里累加。

use std::fmt;
use std::io::Write;

use anyhow::Result;

use crate::io::fasta::FastaWriter;
use crate::walk::{CorrectionResult, Mode, WalkStats, WorkItem};

/// 整个运行的汇总
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTotals {
    pub long_read: bool,
    pub merged: usize,
    pub kmerized: usize,
    pub failed: usize,
    pub stats: WalkStats,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl fmt::Display for RunTotals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.long_read {
            writeln!(f, "reads kmerized: {}", self.kmerized)?;
            writeln!(f, "reads merged: {}", self.merged)?;
            return writeln!(f, "reads failed to kmerize or merge: {}", self.failed);
        }
        let s = &self.stats;
        let pct = |n: usize| 100.0 * ratio(n, s.total_walks);
        writeln!(f, "reads corrected: {}, failed: {}", self.merged, self.failed)?;
        writeln!(
            f,
            "total read length: {}, corrected length: {} ({:.3})",
            s.total_read_len,
            s.corrected_len,
            ratio(s.corrected_len, s.total_read_len)
        )?;
        writeln!(f, "seeds: {}, walks: {}", s.total_seeds, s.total_walks)?;
        writeln!(f, "corrected walks: {} ({:.2}%)", s.corrected_walks, pct(s.corrected_walks))?;
        writeln!(f, "high error: {} ({:.2}%)", s.high_error, pct(s.high_error))?;
        writeln!(f, "exceed depth: {} ({:.2}%)", s.exceed_depth, pct(s.exceed_depth))?;
        writeln!(f, "exceed leaves: {} ({:.2}%)", s.exceed_leaves, pct(s.exceed_leaves))?;
        writeln!(f, "asymmetric: {} ({:.2}%)", s.asymmetric, pct(s.asymmetric))?;
        writeln!(f, "mean distance between seeds: {:.1}", s.mean_seed_distance())
    }
}

/// 去掉 `name/1` 形式的配对后缀
fn pair_name(id: &str) -> &str {
    id.split('/').next().unwrap_or(id)
}

/// 单写者聚合器：纠正结果、切分出的片段与失败读段分别写入三个 FASTA 输出
pub struct Aggregator<W: Write> {
    mode: Mode,
    corrected: FastaWriter<W>,
    discard: FastaWriter<W>,
    failed: FastaWriter<W>,
    totals: RunTotals,
}

impl<W: Write> Aggregator<W> {
    pub fn new(mode: Mode, corrected: W, discard: W, failed: W) -> Self {
        Self {
            mode,
            corrected: FastaWriter::new(corrected),
            discard: FastaWriter::new(discard),
            failed: FastaWriter::new(failed),
            totals: RunTotals { long_read: mode.is_long_read(), ..RunTotals::default() },
        }
    }

    pub fn totals(&self) -> &RunTotals {
        &self.totals
    }

    pub fn process(&mut self, item: &WorkItem, result: CorrectionResult) -> Result<()> {
        match item {
            WorkItem::Single(rec) if self.mode.is_long_read() => {
                if result.merge {
                    self.totals.merged += 1;
                    self.totals.stats += result.stats;
                    for (i, frag) in result.long_read_fragments.iter().enumerate() {
                        self.corrected.write(&format!("{}_{}_{}", rec.id, i, frag.len()), frag)?;
                    }
                } else {
                    self.totals.failed += 1;
                    self.failed.write(&rec.id, &rec.seq)?;
                }
            }
            WorkItem::Single(rec) => {
                if result.merge {
                    self.totals.merged += 1;
                    self.corrected.write(&rec.id, &result.corrected)?;
                } else if result.kmerize {
                    self.totals.kmerized += 1;
                    self.write_kmerized(&rec.id, &result.corrected, &result.fragments)?;
                } else {
                    self.totals.failed += 1;
                    let seq = if result.corrected.is_empty() { &rec.seq } else { &result.corrected };
                    self.failed.write(&rec.id, seq)?;
                }
            }
            WorkItem::Pair(a, b) => {
                if result.merge {
                    self.totals.merged += 1;
                    self.corrected.write(pair_name(&a.id), &result.corrected)?;
                    return Ok(());
                }
                let ends = [
                    (a, result.kmerize, &result.corrected, &result.fragments),
                    (b, result.kmerize2, &result.corrected2, &result.fragments2),
                ];
                for (rec, kmerized, main, frags) in ends {
                    if kmerized {
                        self.totals.kmerized += 1;
                        self.write_kmerized(&rec.id, main, frags)?;
                    } else {
                        self.totals.failed += 1;
                        self.failed.write(&rec.id, &rec.seq)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn write_kmerized(&mut self, id: &str, main: &[u8], fragments: &[Vec<u8>]) -> Result<()> {
        if !main.is_empty() {
            self.corrected.write(id, main)?;
        }
        for (i, frag) in fragments.iter().enumerate() {
            self.discard.write(&format!("{}_{}", id, i), frag)?;
        }
        Ok(())
    }

    /// 刷新输出并返回汇总与三个底层 writer（纠正、丢弃、失败）
    pub fn finish(mut self) -> Result<(RunTotals, [W; 3])> {
        self.corrected.flush()?;
        self.discard.flush()?;
        self.failed.flush()?;
        log::debug!(
            "wrote {} corrected, {} discarded, {} failed records",
            self.corrected.written(),
            self.discard.written(),
            self.failed.written()
        );
        Ok((
            self.totals,
            [self.corrected.into_inner(), self.discard.into_inner(), self.failed.into_inner()],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::SeqRecord;

    fn text(buf: &[u8]) -> String {
        String::from_utf8(buf.to_vec()).unwrap()
    }

    #[test]
    fn routes_single_reads() {
        let mut agg = Aggregator::new(Mode::Validate, Vec::new(), Vec::new(), Vec::new());
        let r = WorkItem::Single(SeqRecord::new("r1", b"ACGTA".to_vec()));
        agg.process(&r, CorrectionResult::merged(b"ACGTT".to_vec())).unwrap();
        let k = CorrectionResult {
            kmerize: true,
            corrected: b"CCC".to_vec(),
            fragments: vec![b"GG".to_vec(), b"TT".to_vec()],
            ..CorrectionResult::default()
        };
        agg.process(&WorkItem::Single(SeqRecord::new("r2", b"CCCGG".to_vec())), k).unwrap();
        agg.process(&WorkItem::Single(SeqRecord::new("r3", b"AAAA".to_vec())), CorrectionResult::default())
            .unwrap();

        let (totals, [corrected, discard, failed]) = agg.finish().unwrap();
        assert_eq!((totals.merged, totals.kmerized, totals.failed), (1, 1, 1));
        assert_eq!(text(&corrected), ">r1\nACGTT\n>r2\nCCC\n");
        assert_eq!(text(&discard), ">r2_0\nGG\n>r2_1\nTT\n");
        assert_eq!(text(&failed), ">r3\nAAAA\n");
    }

    #[test]
    fn routes_pairs() {
        let mut agg = Aggregator::new(Mode::MergeAndKmerize, Vec::new(), Vec::new(), Vec::new());
        let pair = WorkItem::Pair(SeqRecord::new("p/1", b"AC".to_vec()), SeqRecord::new("p/2", b"GT".to_vec()));
        agg.process(&pair, CorrectionResult::merged(b"ACGT".to_vec())).unwrap();
        let half = CorrectionResult { kmerize: true, corrected: b"AC".to_vec(), ..CorrectionResult::default() };
        agg.process(&pair, half).unwrap();

        let (totals, [corrected, _, failed]) = agg.finish().unwrap();
        assert_eq!((totals.merged, totals.kmerized, totals.failed), (1, 1, 1));
        assert_eq!(text(&corrected), ">p\nACGT\n>p/1\nAC\n");
        assert_eq!(text(&failed), ">p/2\nGT\n");
    }

    #[test]
    fn long_read_fragments_and_stats() {
        let mut agg = Aggregator::new(Mode::SelfCorrect, Vec::new(), Vec::new(), Vec::new());
        let read = WorkItem::Single(SeqRecord::new("lr", b"ACGTACGT".to_vec()));
        let res = CorrectionResult {
            merge: true,
            long_read_fragments: vec![b"ACG".to_vec(), b"TACGT".to_vec()],
            stats: WalkStats { total_walks: 4, corrected_walks: 3, high_error: 1, ..WalkStats::default() },
            ..CorrectionResult::default()
        };
        agg.process(&read, res).unwrap();
        // statistics of failed reads are not reported
        let failed = CorrectionResult {
            stats: WalkStats { total_seeds: 1, total_read_len: 8, ..WalkStats::default() },
            ..CorrectionResult::default()
        };
        agg.process(&read, failed).unwrap();

        let (totals, [corrected, _, failed]) = agg.finish().unwrap();
        assert_eq!(text(&corrected), ">lr_0_3\nACG\n>lr_1_5\nTACGT\n");
        assert_eq!(text(&failed), ">lr\nACGTACGT\n");
        assert_eq!(totals.stats.total_walks, 4);
        assert_eq!(totals.stats.total_seeds, 0);
        assert_eq!(totals.stats.total_read_len, 0);
        let report = totals.to_string();
        assert!(report.contains("corrected walks: 3 (75.00%)"));
        assert!(report.contains("high error: 1 (25.00%)"));
    }

    #[test]
    fn empty_run_report_has_no_nan() {
        let totals = RunTotals { long_read: true, ..RunTotals::default() };
        assert!(!totals.to_string().contains("NaN"));
        assert!(RunTotals::default().to_string().contains("reads merged: 0"));
    }
}
