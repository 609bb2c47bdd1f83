//! 长读段纠错：在有序种子之间反复桥接缺口。

use crate::index::KmerIndex;
use crate::util::dna;
use crate::walk::result::{CorrectionResult, WalkFailure, WalkStats};
use crate::walk::search::{BoundedSearch, HashSearchRequest, SearchRequest};
use crate::walk::seed::{adaptive_seeds, fixed_seeds, Seed};
use crate::walk::Walker;

/// 缺口估计的长度区间：下限、上限与期望值（都含 source 与末端小 k-mer）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapBounds {
    pub min: usize,
    pub max: usize,
    pub expected: usize,
}

impl GapBounds {
    /// 长读段以插入错误为主，下限收紧 20%，上限放宽 20%
    pub fn estimate(gap: usize, source_len: usize, small_k: usize) -> Self {
        let g = gap as f64;
        let lower = (0.8 * (g - 20.0)).max(0.0) as usize;
        let upper = (1.2 * (g + 20.0)) as usize;
        Self {
            min: lower + source_len + small_k,
            max: upper + source_len + small_k,
            expected: gap + source_len + small_k,
        }
    }
}

impl<'a, I, S> Walker<'a, I, S>
where
    I: KmerIndex + ?Sized,
    S: BoundedSearch + ?Sized,
{
    /// 自纠错：固定 k 的种子，以已纠正前缀为 source 依次桥接后续种子
    pub fn self_correct(&self, read: &[u8]) -> CorrectionResult {
        let p = self.params;
        let seeds = fixed_seeds(read, p, self.index);
        let mut stats = WalkStats { total_seeds: seeds.len(), ..WalkStats::default() };
        // a lone seed has nothing to bridge to
        if seeds.len() < 2 {
            return CorrectionResult { stats, ..CorrectionResult::default() };
        }
        let first = &seeds[0];

        let small_k = p.min_kmer_length;
        let mut frags: Vec<Vec<u8>> = vec![first.seq.clone()];
        stats.corrected_len = first.len();

        let mut t = 1;
        while t < seeds.len() {
            let prev = &seeds[t - 1];
            // None: every lookahead target was beyond the gap ceiling
            let mut outcome: Option<Result<usize, WalkFailure>> = None;
            let mut last_failure: Option<WalkFailure> = None;

            for next in 0..p.downward {
                let cur = t + next;
                if cur >= seeds.len() {
                    break;
                }
                let gap = seeds[cur].pos.saturating_sub(prev.end());
                if gap >= p.max_seed_gap {
                    break;
                }
                let source = &frags[frags.len() - 1];
                let bounds = GapBounds::estimate(gap, source.len(), small_k);
                let req = HashSearchRequest {
                    source,
                    targets: seeds[cur..].iter().take(p.collected_seeds).map(|s| &s.seq[..]).collect(),
                    kmer_len: small_k,
                    max_leaves: p.max_leaves,
                    min_length: bounds.min,
                    max_length: bounds.max,
                    expected_length: bounds.expected,
                    threshold: p.search_kmer_threshold,
                };
                match self.search.search_with_hash_targets(&req) {
                    Ok(hit) => {
                        let reached = cur + hit.target;
                        let gain = hit.merged.get(source.len()..).unwrap_or_default().to_vec();
                        log::trace!("bridged seed {} -> {} (+{} bp)", t - 1, reached, gain.len());
                        stats.corrected_len += gain.len();
                        stats.corrected_walks += 1;
                        stats.seed_distance += seeds[reached].pos.saturating_sub(prev.end());
                        let last = frags.len() - 1;
                        frags[last].extend_from_slice(&gain);
                        outcome = Some(Ok(reached));
                        break;
                    }
                    Err(f) => {
                        outcome = Some(Err(f));
                        // a contaminated source fails the same way against every target
                        if p.stop_on_repeated_asymmetric
                            && f == WalkFailure::Asymmetric
                            && last_failure == Some(WalkFailure::Asymmetric)
                        {
                            break;
                        }
                        last_failure = Some(f);
                    }
                }
            }

            match outcome {
                Some(Ok(reached)) => t = reached,
                failed => {
                    let target = &seeds[t];
                    stats.seed_distance += target.pos.saturating_sub(prev.end());
                    stats.corrected_len += target.len();
                    if p.split_on_failure {
                        frags.push(target.seq.clone());
                    } else {
                        let last = frags.len() - 1;
                        frags[last].extend_from_slice(&read[prev.end()..target.end()]);
                    }
                    if let Some(Err(f)) = failed {
                        log::trace!("seed {} -> {} failed: {}", t - 1, t, f);
                        stats.record_failure(f);
                    }
                }
            }
            stats.total_walks += 1;
            t += 1;
        }

        stats.total_read_len = read.len();
        CorrectionResult {
            merge: true,
            long_read_fragments: frags,
            stats,
            ..CorrectionResult::default()
        }
    }

    /// 正向 `source → target` 与反向 `rc(target) → rc(source)` 各搜一次，
    /// 两者长度一致才算成功
    pub fn double_walk(&self, source: &[u8], target: &[u8], overlap: usize, gap: usize) -> Result<Vec<u8>, WalkFailure> {
        let p = self.params;
        let max_overlap = p.hybrid_max_overlap().max(overlap);
        let request = |s: &[u8], t: &[u8]| {
            let budget = GapBounds::estimate(gap, s.len(), overlap).max;
            self.search.search(&SearchRequest {
                source: s,
                target: t,
                min_overlap: overlap,
                max_overlap,
                min_length: 0,
                max_length: budget,
                max_leaves: p.max_leaves,
                threshold: p.search_kmer_threshold,
            })
        };
        let merged = request(source, target).outcome?.merged;
        let back = request(&dna::revcomp(target), &dna::revcomp(source)).outcome?;
        if back.merged.len() == merged.len() {
            Ok(merged)
        } else {
            Err(WalkFailure::Asymmetric)
        }
    }

    /// 失败后把最小重叠缩为 2/3 重试，直到成功或低于最小 k-mer 长度
    pub fn solve_high_error(&self, source: &[u8], target: &[u8], min_overlap: usize, gap: usize) -> Result<Vec<u8>, WalkFailure> {
        let mut overlap = min_overlap;
        loop {
            let res = self.double_walk(source, target, overlap, gap);
            overlap = overlap * 2 / 3;
            if res.is_ok() || overlap == 0 || overlap < self.params.min_kmer_length {
                return res;
            }
        }
    }

    fn bridge_overlap(&self, source: &Seed, target: &Seed) -> usize {
        let max_overlap = self.params.hybrid_max_overlap();
        if source.len() >= max_overlap && target.len() >= max_overlap {
            max_overlap.saturating_sub(2)
        } else {
            source.len().min(target.len())
        }
    }

    /// 混合纠错：三轮，每轮在上一轮输出上用可变 k 重新找种子。
    /// 第 3、2 轮失败时原样拷贝缺口，第 1 轮失败时切断。统计取自第 3 轮。
    pub fn hybrid_correct(&self, read: &[u8]) -> CorrectionResult {
        let mut stats = WalkStats::default();
        let mut input = read.to_vec();
        let mut frags: Vec<Vec<u8>> = Vec::new();

        for round in (1..=3).rev() {
            let seeds = adaptive_seeds(&input, self.params, self.index);
            let Some(first) = seeds.first() else {
                log::debug!("no seed in round {}", round);
                return CorrectionResult { stats, ..CorrectionResult::default() };
            };
            frags = vec![first.seq.clone()];

            for pair in seeds.windows(2) {
                let (source, target) = (&pair[0], &pair[1]);
                let gap = target.pos.saturating_sub(source.end());
                let overlap = self.bridge_overlap(source, target);
                let res = self.solve_high_error(&source.seq, &target.seq, overlap, gap);
                let last = frags.len() - 1;
                match &res {
                    Ok(merged) => {
                        if merged.len() > source.len() {
                            frags[last].extend_from_slice(&merged[source.len()..]);
                        }
                    }
                    Err(_) if round != 1 => frags[last].extend_from_slice(&input[source.end()..target.end()]),
                    Err(_) => frags.push(target.seq.clone()),
                }
                if round == 3 {
                    stats.total_walks += 1;
                    stats.seed_distance += gap;
                    match res {
                        Ok(_) => stats.corrected_walks += 1,
                        Err(f) => stats.record_failure(f),
                    }
                }
            }
            if round == 3 {
                stats.total_seeds = seeds.len();
            }
            input = frags.last().cloned().unwrap_or_default();
        }

        stats.corrected_len = frags.iter().map(Vec::len).sum();
        stats.total_read_len = read.len();
        CorrectionResult {
            merge: true,
            long_read_fragments: frags,
            stats,
            ..CorrectionResult::default()
        }
    }
}
