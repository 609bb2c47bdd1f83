//! 有界的 BWT 区间搜索。
//!
//! [`BoundedSearch`] 是纠错流程对搜索树的全部依赖；[`IntervalSearch`] 在任意
//! [`KmerIndex`] 上实现它：按层（BFS）扩展叶子，每个叶子维护一个滑动窗口在两条链上的
//! SA 区间，支持数低于阈值的分支被剪掉，叶子数与长度都有上限，因此每次搜索必然终止。

use std::collections::HashMap;

use crate::index::{KmerIndex, StrandIntervals};
use crate::util::dna::BASES;
use crate::walk::result::WalkFailure;

/// 从 `source` 走向 `target` 前缀的搜索请求
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub source: &'a [u8],
    pub target: &'a [u8],
    pub min_overlap: usize,
    pub max_overlap: usize,
    /// 命中时合并序列（不含 target 剩余部分）的最小长度
    pub min_length: usize,
    /// 路径长度上限，即搜索深度
    pub max_length: usize,
    pub max_leaves: usize,
    pub threshold: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub merged: Vec<u8>,
    pub coverage: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchReport {
    pub outcome: Result<SearchHit, WalkFailure>,
    /// 搜索过程中同时存活的最大叶子数
    pub leaves_used: usize,
}

/// 以多个候选目标的 k-mer 哈希为终点的搜索请求
#[derive(Debug, Clone)]
pub struct HashSearchRequest<'a> {
    pub source: &'a [u8],
    pub targets: Vec<&'a [u8]>,
    pub kmer_len: usize,
    pub max_leaves: usize,
    pub min_length: usize,
    pub max_length: usize,
    pub expected_length: usize,
    pub threshold: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashHit {
    pub merged: Vec<u8>,
    /// 命中的目标在 `targets` 中的下标
    pub target: usize,
}

pub trait BoundedSearch: Sync {
    fn search(&self, req: &SearchRequest<'_>) -> SearchReport;

    fn search_with_hash_targets(&self, req: &HashSearchRequest<'_>) -> Result<HashHit, WalkFailure>;
}

#[derive(Debug, Clone)]
struct Leaf {
    /// 接在 source 之后的碱基
    ext: Vec<u8>,
    iv: StrandIntervals,
    window: usize,
    coverage: usize,
}

/// `source ++ ext` 的最后 `n` 个碱基
fn label_tail(source: &[u8], ext: &[u8], n: usize) -> Vec<u8> {
    let n = n.min(source.len() + ext.len());
    let from_ext = n.min(ext.len());
    let from_src = n - from_ext;
    let mut out = Vec::with_capacity(n);
    out.extend_from_slice(&source[source.len() - from_src..]);
    out.extend_from_slice(&ext[ext.len() - from_ext..]);
    out
}

fn label(source: &[u8], ext: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(source.len() + ext.len());
    out.extend_from_slice(source);
    out.extend_from_slice(ext);
    out
}

pub struct IntervalSearch<'a, I: ?Sized> {
    index: &'a I,
}

impl<'a, I: KmerIndex + ?Sized> IntervalSearch<'a, I> {
    pub fn new(index: &'a I) -> Self {
        Self { index }
    }

    fn root(&self, source: &[u8], window: usize) -> Leaf {
        let seq = label_tail(source, &[], window);
        Leaf {
            ext: Vec::new(),
            iv: StrandIntervals::find(self.index, &seq),
            window: seq.len(),
            coverage: 0,
        }
    }

    /// 每个叶子尝试四种碱基。窗口超过 `max_window`，或支持不足且窗口长于 `reseed`
    /// 时，用路径末尾 `reseed` 个碱基重新定位区间。
    fn expand(&self, leaves: &[Leaf], source: &[u8], reseed: usize, max_window: usize, threshold: usize) -> Vec<Leaf> {
        let mut children = Vec::with_capacity(leaves.len() * 2);
        for leaf in leaves {
            for &b in &BASES {
                let mut iv = leaf.iv.extend(self.index, b);
                let mut window = leaf.window + 1;
                if window > max_window || (iv.support() < threshold && window > reseed) {
                    let mut seq = label_tail(source, &leaf.ext, reseed.saturating_sub(1));
                    seq.push(b);
                    iv = StrandIntervals::find(self.index, &seq);
                    window = seq.len();
                }
                let support = iv.support();
                if support >= threshold && support > 0 {
                    let mut ext = Vec::with_capacity(leaf.ext.len() + 1);
                    ext.extend_from_slice(&leaf.ext);
                    ext.push(b);
                    children.push(Leaf { ext, iv, window, coverage: leaf.coverage + support });
                }
            }
        }
        children
    }
}

impl<'a, I: KmerIndex + ?Sized> BoundedSearch for IntervalSearch<'a, I> {
    fn search(&self, req: &SearchRequest<'_>) -> SearchReport {
        let fail = |f: WalkFailure, leaves_used: usize| SearchReport { outcome: Err(f), leaves_used };
        let overlap = req.min_overlap.min(req.source.len());
        if overlap == 0 || req.target.is_empty() {
            return fail(WalkFailure::HighError, 0);
        }
        let anchor = &req.target[..req.min_overlap.min(req.target.len())];
        let max_window = req.max_overlap.max(overlap);

        let mut leaves = vec![self.root(req.source, overlap)];
        let mut leaves_used = 1;
        loop {
            let depth = req.source.len() + leaves[0].ext.len();
            if depth >= req.max_length {
                return fail(WalkFailure::ExceedDepth, leaves_used);
            }
            leaves = self.expand(&leaves, req.source, overlap, max_window, req.threshold);
            leaves_used = leaves_used.max(leaves.len());
            if leaves.is_empty() {
                return fail(WalkFailure::HighError, leaves_used);
            }
            if leaves.len() > req.max_leaves {
                return fail(WalkFailure::ExceedLeaves, leaves_used);
            }
            if depth + 1 < req.min_length {
                continue;
            }
            let best = leaves
                .iter()
                .filter(|l| label_tail(req.source, &l.ext, anchor.len()) == anchor)
                .fold(None::<&Leaf>, |best, l| match best {
                    Some(b) if b.coverage >= l.coverage => Some(b),
                    _ => Some(l),
                });
            if let Some(hit) = best {
                let mut merged = label(req.source, &hit.ext);
                merged.extend_from_slice(&req.target[anchor.len()..]);
                log::trace!("walk reached target at {} bp with {} leaves", depth + 1, leaves_used);
                return SearchReport {
                    outcome: Ok(SearchHit { merged, coverage: hit.coverage }),
                    leaves_used,
                };
            }
        }
    }

    fn search_with_hash_targets(&self, req: &HashSearchRequest<'_>) -> Result<HashHit, WalkFailure> {
        let k = req.kmer_len;
        if k == 0 || req.source.len() < k {
            return Err(WalkFailure::HighError);
        }
        // first occurrence of each k-mer wins
        let mut hash: HashMap<&[u8], (usize, usize)> = HashMap::new();
        for (t, target) in req.targets.iter().enumerate() {
            if target.len() < k {
                continue;
            }
            for (off, kmer) in target.windows(k).enumerate() {
                hash.entry(kmer).or_insert((t, off));
            }
        }
        if hash.is_empty() {
            return Err(WalkFailure::HighError);
        }

        // a target reached before the minimum length turns any later failure into Asymmetric
        let mut early_hit = false;
        let fail = |f: WalkFailure, early: bool| if early { WalkFailure::Asymmetric } else { f };

        let mut leaves = vec![self.root(req.source, k)];
        loop {
            let depth = req.source.len() + leaves[0].ext.len();
            if depth >= req.max_length {
                return Err(fail(WalkFailure::ExceedDepth, early_hit));
            }
            leaves = self.expand(&leaves, req.source, k, usize::MAX, req.threshold);
            if leaves.is_empty() {
                return Err(fail(WalkFailure::HighError, early_hit));
            }
            if leaves.len() > req.max_leaves {
                return Err(fail(WalkFailure::ExceedLeaves, early_hit));
            }

            let len = depth + 1;
            let mut best: Option<(usize, usize, &Leaf, usize, usize)> = None;
            for leaf in &leaves {
                let tail = label_tail(req.source, &leaf.ext, k);
                let Some(&(t, off)) = hash.get(&tail[..]) else { continue };
                if len < req.min_length {
                    early_hit = true;
                    continue;
                }
                let dist = len.abs_diff(req.expected_length);
                let better = match best {
                    None => true,
                    Some((d, cov, ..)) => dist < d || (dist == d && leaf.coverage > cov),
                };
                if better {
                    best = Some((dist, leaf.coverage, leaf, t, off));
                }
            }
            if let Some((_, _, leaf, t, off)) = best {
                let mut merged = label(req.source, &leaf.ext);
                merged.extend_from_slice(&req.targets[t][off + k..]);
                return Ok(HashHit { merged, target: t });
            }
        }
    }
}
