use crate::index::KmerIndex;
use crate::util::dna;
use crate::walk::params::WalkParams;

/// 长读段上的锚点：一段连续的高频 k-mer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seed {
    pub pos: usize,
    pub seq: Vec<u8>,
}

impl Seed {
    pub fn new(pos: usize, seq: &[u8]) -> Self {
        Self { pos, seq: seq.to_vec() }
    }

    /// 种子之后第一个碱基的位置
    pub fn end(&self) -> usize {
        self.pos + self.seq.len()
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

/// 固定 k 的种子扫描。
///
/// 位置 i 的 k-mer 双链总频数达到 `seed_kmer_threshold`（且每条链至少
/// `min_strand_support`）即开始一个种子，向右吸收连续的合格位置。
/// 种子内最大频数达到 `contaminated_cutoff` 的视为污染，丢弃。
pub fn fixed_seeds<I: KmerIndex + ?Sized>(read: &[u8], params: &WalkParams, index: &I) -> Vec<Seed> {
    let k = params.kmer_length;
    let mut seeds = Vec::new();
    if k == 0 || read.len() < k {
        return seeds;
    }
    let freq = |i: usize| {
        let kmer = &read[i..i + k];
        let fwd = index.count_single_strand(kmer);
        let rvc = index.count_single_strand(&dna::revcomp(kmer));
        let solid = fwd + rvc >= params.seed_kmer_threshold
            && fwd >= params.min_strand_support
            && rvc >= params.min_strand_support;
        (solid, fwd + rvc)
    };

    let last = read.len() - k;
    let mut i = 0;
    while i <= last {
        let (solid, total) = freq(i);
        if !solid {
            i += 1;
            continue;
        }
        let start = i;
        let mut max_freq = total;
        let mut j = i + 1;
        while j <= last {
            let (solid, total) = freq(j);
            max_freq = max_freq.max(total);
            if !solid {
                break;
            }
            j += 1;
        }
        if max_freq < params.contaminated_cutoff {
            seeds.push(Seed::new(start, &read[start..j - 1 + k]));
            i = j - 1 + k;
        } else {
            log::trace!("skip contaminated seed at {} (max freq {})", start, max_freq);
            i = j + 1;
        }
    }
    seeds
}

/// 可变 k 的种子扫描。
///
/// 当前 k 下走出 `seed_walk_distance(k)` 仍未找到种子时，k 减 2 并从上一个
/// 停顿点重新扫描；k 已到下限时放弃当前位置，恢复初始 k 继续。找到种子后 k 复位。
pub fn adaptive_seeds<I: KmerIndex + ?Sized>(read: &[u8], params: &WalkParams, index: &I) -> Vec<Seed> {
    let init_k = params.kmer_length;
    let min_k = params.min_kmer_length;
    let solid = |i: usize, k: usize| index.count(&read[i..i + k]) >= params.seed_kmer_threshold;

    let mut seeds = Vec::new();
    if init_k == 0 || read.len() < init_k {
        return seeds;
    }
    let mut k = init_k;
    let mut walked = 0;
    // next position to examine when the scan restarts
    let mut resume = 0;
    let mut i = 0;
    while i + k <= read.len() {
        walked += 1;
        if solid(i, k) {
            let start = i;
            let mut j = i + 1;
            while j + k <= read.len() && solid(j, k) {
                j += 1;
            }
            let seed = Seed::new(start, &read[start..j - 1 + k]);
            log::trace!("seed at {} len {} (k={})", seed.pos, seed.len(), k);
            resume = seed.end();
            i = resume;
            seeds.push(seed);
            k = init_k;
            walked = 0;
        } else if walked >= params.seed_walk_distance(k) {
            walked = 0;
            if k <= min_k {
                resume = i + 1;
                k = init_k;
            } else {
                k = k.saturating_sub(2).max(min_k);
            }
            i = resume;
        } else {
            i += 1;
        }
    }
    seeds
}
