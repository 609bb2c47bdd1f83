//! 在低置信度边界上切分 read。
//!
//! 两种切分器给出同一契约：[`segment_profile`] 基于预先计算的 [`FrequencyProfile`]，
//! 以双链都合格（计数 2）为强位置；[`segment_streaming`] 沿读段增量扩展 BWT 区间，
//! 只要延伸后的双链总支持达到阈值即视为合格（计数 1）。两者的合格规则不同，分别保留。

use crate::index::{KmerIndex, StrandIntervals};
use crate::walk::profile::FrequencyProfile;
use crate::walk::trim::is_simple;

/// k-mer 起点区间 `[start, end]`（闭区间）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

impl Interval {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn span(&self) -> usize {
        self.end - self.start + 1
    }
}

/// 切分结果：区间划分 `[0, numKmer-1]`，`main` 为最可靠的区间
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segmentation {
    pub intervals: Vec<Interval>,
    pub main: Option<usize>,
    pub kmer_len: usize,
}

impl Segmentation {
    fn empty(kmer_len: usize) -> Self {
        Self { intervals: Vec::new(), main: None, kmer_len }
    }

    /// 区间对应的碱基子串 `seq[start .. end + k]`
    pub fn fragment<'s>(&self, seq: &'s [u8], i: usize) -> &'s [u8] {
        let iv = self.intervals[i];
        &seq[iv.start..iv.end + self.kmer_len]
    }
}

pub fn exists_strong_kmer(interval: Interval, qualified: &[u8]) -> bool {
    qualified[interval.start..=interval.end].iter().any(|&q| q == 2)
}

/// 两个强区间之间的位置都至少在一条链上合格时，认为两者可靠相连
pub fn is_path_reliable(x: Interval, y: Interval, qualified: &[u8]) -> bool {
    if x.end + 1 >= y.start {
        return true;
    }
    qualified[x.end + 1..y.start].iter().all(|&q| q != 0)
}

/// 合并一对可靠相连的强区间：删去两者之间的区间，并把前者延伸到后者末端。
/// 发生合并时返回 `true`。
pub fn try_merge_adjacent_strong_intervals(intervals: &mut Vec<Interval>, qualified: &[u8]) -> bool {
    let strong: Vec<bool> = intervals.iter().map(|&iv| exists_strong_kmer(iv, qualified)).collect();
    if strong.iter().filter(|&&s| s).count() < 2 {
        return false;
    }
    let mut first: Option<usize> = None;
    for e in 0..intervals.len() {
        if !strong[e] {
            continue;
        }
        match first {
            None => first = Some(e),
            Some(s) => {
                if is_path_reliable(intervals[s], intervals[e], qualified) {
                    intervals[s].end = intervals[e].end;
                    intervals.drain(s + 1..=e);
                    return true;
                }
                first = Some(e);
            }
        }
    }
    false
}

pub fn merge_strong_intervals(intervals: &mut Vec<Interval>, qualified: &[u8]) {
    while try_merge_adjacent_strong_intervals(intervals, qualified) {}
}

/// 跨度最大、且满足 `eligible` 的区间；只含一个 k-mer 的区间不参选，并列时取靠前者
fn pick_main(intervals: &[Interval], eligible: impl Fn(Interval) -> bool) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (i, &iv) in intervals.iter().enumerate() {
        if iv.span() < 2 || !eligible(iv) {
            continue;
        }
        if best.map_or(true, |(_, span)| iv.span() > span) {
            best = Some((i, iv.span()));
        }
    }
    best.map(|(i, _)| i)
}

/// 在 `cut(p)` 为真的位置 p 处（p-1 与 p 之间）切开
fn partition(num_kmers: usize, mut cut: impl FnMut(usize) -> bool) -> Vec<Interval> {
    let mut intervals = Vec::new();
    let mut start = 0;
    for p in 1..num_kmers {
        if cut(p) {
            intervals.push(Interval::new(start, p - 1));
            start = p;
        }
    }
    intervals.push(Interval::new(start, num_kmers - 1));
    intervals
}

/// 基于频数谱的切分
pub fn segment_profile<I: KmerIndex + ?Sized>(
    profile: &FrequencyProfile,
    threshold: usize,
    index: &I,
    merge_strong: bool,
) -> Segmentation {
    let k = profile.kmer_len();
    if profile.is_empty() {
        return Segmentation::empty(k);
    }
    let qualified = profile.qualified(threshold);
    let mut intervals = partition(profile.num_kmers(), |p| {
        if qualified[p - 1] == 2 && qualified[p] == 2 {
            return false;
        }
        !is_simple(profile.kmer(p - 1), profile.kmer(p), index, 1)
    });
    if merge_strong {
        merge_strong_intervals(&mut intervals, &qualified);
    }
    let main = pick_main(&intervals, |iv| exists_strong_kmer(iv, &qualified));
    Segmentation { intervals, main, kmer_len: k }
}

/// 只在重复区（双链频数都高于语料中位数）与唯一区的交界处切分
pub fn split_repeat(profile: &FrequencyProfile, median_kmer_freq: usize) -> Segmentation {
    let k = profile.kmer_len();
    if profile.is_empty() {
        return Segmentation::empty(k);
    }
    let repeat = profile.above(median_kmer_freq);
    let intervals = partition(profile.num_kmers(), |p| (repeat[p - 1] == 2) != (repeat[p] == 2));
    let main = pick_main(&intervals, |iv| exists_strong_kmer(iv, &repeat));
    Segmentation { intervals, main, kmer_len: k }
}

/// 流式扫描游标的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    /// 当前（可能已延长的）区间支持足够：位置合格，再向右延伸一个碱基
    Extending,
    /// 延长后的区间支持不足：在同一位置按 k 长度重新求区间
    Recomputing,
    /// k 长度下支持不足：位置不合格，换下一个 k-mer
    Advancing,
}

/// 基于 BWT 区间增量扩展的切分，避免为每个位置重新计数
pub fn segment_streaming<I: KmerIndex + ?Sized>(
    seq: &[u8],
    k: usize,
    threshold: usize,
    index: &I,
) -> Segmentation {
    if k == 0 || seq.len() < k {
        return Segmentation::empty(k);
    }
    let n = seq.len() - k + 1;
    let mut qualified = vec![0u8; n];
    let mut iv = StrandIntervals::find(index, &seq[..k]);
    let mut width = k;
    let mut i = 0;
    while i < n {
        let state = if iv.support() >= threshold {
            Cursor::Extending
        } else if width > k {
            Cursor::Recomputing
        } else {
            Cursor::Advancing
        };
        match state {
            Cursor::Extending => {
                qualified[i] = 1;
                if i + 1 < n {
                    iv = iv.extend(index, seq[i + k]);
                    width += 1;
                }
                i += 1;
            }
            Cursor::Recomputing => {
                iv = StrandIntervals::find(index, &seq[i..i + k]);
                width = k;
            }
            Cursor::Advancing => {
                if i + 1 < n {
                    iv = StrandIntervals::find(index, &seq[i + 1..i + 1 + k]);
                }
                i += 1;
            }
        }
    }

    let intervals = partition(n, |p| {
        if qualified[p - 1] == 1 && qualified[p] == 1 {
            return false;
        }
        !is_simple(&seq[p - 1..p - 1 + k], &seq[p..p + k], index, 1)
    });
    let main = pick_main(&intervals, |_| true);
    Segmentation { intervals, main, kmer_len: k }
}
