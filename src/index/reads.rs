use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::fm::FMIndex;
use super::{Extend, KmerIndex, SaInterval};
use crate::util::dna;

/// 用于估计语料 k-mer 频率中位数而保留的 read 数上限
const MAX_SAMPLED_READS: usize = 2000;
const OCC_BLOCK: usize = 64;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub source_file: Option<String>,
    pub build_args: Option<String>,
    pub build_timestamp: Option<String>,
}

/// 读段集合的双向 FM 索引：
/// - `fwd`：read 依次拼接（以 $ 分隔）后的 BWT，用于左端扩展；
/// - `rev`：每条 read 反转后拼接的 BWT，用于右端扩展。
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadIndex {
    pub fwd: FMIndex,
    pub rev: FMIndex,
    pub n_reads: usize,
    pub total_len: usize,
    /// 均匀抽样的 read，用于 k-mer 频率分布统计
    samples: Vec<Vec<u8>>,
    #[serde(default)]
    pub meta: IndexMeta,
}

impl ReadIndex {
    pub fn build<S: AsRef<[u8]>>(reads: &[S]) -> Self {
        let mut text: Vec<u8> = Vec::new();
        let mut rtext: Vec<u8> = Vec::new();
        let mut total_len = 0usize;
        for r in reads {
            let norm = dna::normalize_seq(r.as_ref());
            total_len += norm.len();
            text.extend(norm.iter().map(|&b| dna::to_alphabet(b)));
            text.push(0);
            rtext.extend(norm.iter().rev().map(|&b| dna::to_alphabet(b)));
            rtext.push(0);
        }

        let stride = (reads.len() / MAX_SAMPLED_READS).max(1);
        let samples = reads
            .iter()
            .step_by(stride)
            .take(MAX_SAMPLED_READS)
            .map(|r| dna::normalize_seq(r.as_ref()))
            .collect();

        let fwd = FMIndex::from_text(&text, dna::SIGMA as u8, OCC_BLOCK);
        let rev = FMIndex::from_text(&rtext, dna::SIGMA as u8, OCC_BLOCK);
        log::debug!("indexed {} reads ({} bp), bwt length {}", reads.len(), total_len, fwd.len());

        Self { fwd, rev, n_reads: reads.len(), total_len, samples, meta: IndexMeta::default() }
    }

    pub fn set_meta(&mut self, meta: IndexMeta) {
        self.meta = meta;
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let f = std::fs::File::create(path).with_context(|| format!("cannot create '{}'", path))?;
        let mut w = std::io::BufWriter::new(f);
        bincode::serialize_into(&mut w, self)?;
        Ok(())
    }

    pub fn load_from_file(path: &str) -> Result<Self> {
        let f = std::fs::File::open(path).with_context(|| format!("cannot open index '{}'", path))?;
        let idx: Self = bincode::deserialize_from(std::io::BufReader::new(f))
            .with_context(|| format!("'{}' is not a valid read index", path))?;
        Ok(idx)
    }

    /// 抽样 read 上所有 k-mer 的双链频率中位数（语料重复判定的基准）。
    pub fn median_kmer_freq(&self, k: usize) -> usize {
        if k == 0 {
            return 0;
        }
        let mut freqs: Vec<usize> = self
            .samples
            .iter()
            .flat_map(|r| r.windows(k))
            .filter(|w| !w.contains(&b'N'))
            .map(|w| self.count(w))
            .collect();
        if freqs.is_empty() {
            return 0;
        }
        let mid = freqs.len() / 2;
        *freqs.select_nth_unstable(mid).1
    }
}

impl KmerIndex for ReadIndex {
    fn count_single_strand(&self, kmer: &[u8]) -> usize {
        if kmer.is_empty() {
            return 0;
        }
        self.fwd.count(&dna::encode(kmer))
    }

    fn find_interval(&self, pattern: &[u8], dir: Extend) -> Option<SaInterval> {
        if pattern.is_empty() {
            return None;
        }
        let found = match dir {
            Extend::Append => {
                let rp: Vec<u8> = pattern.iter().rev().map(|&b| dna::to_alphabet(b)).collect();
                self.rev.backward_search(&rp)
            }
            Extend::Prepend => self.fwd.backward_search(&dna::encode(pattern)),
        };
        found.map(|(lower, upper)| SaInterval { lower, upper, dir })
    }

    fn extend_interval(&self, interval: SaInterval, base: u8) -> Option<SaInterval> {
        let code = dna::to_alphabet(base);
        if !(1..=4).contains(&code) {
            return None;
        }
        let fm = match interval.dir {
            Extend::Append => &self.rev,
            Extend::Prepend => &self.fwd,
        };
        let (lower, upper) = fm.rank_range(code, interval.lower, interval.upper);
        (lower < upper).then_some(SaInterval { lower, upper, dir: interval.dir })
    }
}
