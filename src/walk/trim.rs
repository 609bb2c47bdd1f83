use crate::index::KmerIndex;
use crate::util::dna::BASES;

/// 相邻 k-mer 的方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextKmer {
    /// 在左端补一个碱基：`b + kmer[..k-1]`
    Start,
    /// 在右端补一个碱基：`kmer[1..] + b`
    End,
}

/// 双链频数 ≥ `threshold` 的相邻 k-mer 个数（0..=4）
pub fn next_kmer_count<I: KmerIndex + ?Sized>(
    kmer: &[u8],
    dir: NextKmer,
    index: &I,
    threshold: usize,
) -> usize {
    let k = kmer.len();
    if k == 0 {
        return 0;
    }
    let mut next = Vec::with_capacity(k);
    BASES
        .iter()
        .filter(|&&b| {
            next.clear();
            match dir {
                NextKmer::Start => {
                    next.push(b);
                    next.extend_from_slice(&kmer[..k - 1]);
                }
                NextKmer::End => {
                    next.extend_from_slice(&kmer[1..]);
                    next.push(b);
                }
            }
            index.count(&next) >= threshold
        })
        .count()
}

/// 左右 k-mer 之间的路径是否唯一（两侧各只有一个延伸）
pub fn is_simple<I: KmerIndex + ?Sized>(left: &[u8], right: &[u8], index: &I, threshold: usize) -> bool {
    next_kmer_count(left, NextKmer::End, index, threshold) == 1
        && next_kmer_count(right, NextKmer::Start, index, threshold) == 1
}

/// 去掉没有索引支持的首尾死端。
///
/// 首个 k-mer 左侧没有任何延伸时，头指针右移到第一个出现 ≥2 条延伸（真实分叉）的位置；
/// 尾端对称处理。头尾交错说明整条 read 都不可用，返回空序列。
pub fn trim<I: KmerIndex + ?Sized>(seq: &[u8], k: usize, index: &I) -> Vec<u8> {
    if k == 0 || seq.len() < k {
        return seq.to_vec();
    }
    let kmer = |i: usize| &seq[i..i + k];
    let mut head = 0usize;
    // signed so the tail scan can step past the head
    let mut tail = (seq.len() - k) as isize;

    if next_kmer_count(kmer(head), NextKmer::Start, index, 1) == 0 {
        head += 1;
        while head as isize <= tail {
            if next_kmer_count(kmer(head), NextKmer::Start, index, 1) >= 2 {
                break;
            }
            head += 1;
        }
    }

    if tail >= 0 && next_kmer_count(kmer(tail as usize), NextKmer::End, index, 1) == 0 {
        tail -= 1;
        while tail >= head as isize {
            if next_kmer_count(kmer(tail as usize), NextKmer::End, index, 1) >= 2 {
                break;
            }
            tail -= 1;
        }
    }

    if head as isize > tail {
        log::trace!("read fully trimmed ({} bp, k={})", seq.len(), k);
        Vec::new()
    } else {
        seq[head..tail as usize + k].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::testutil::{genome, shared_index, with_errors, VARIANT_POS};
    use proptest::prelude::*;

    #[test]
    fn solid_read_is_untouched() {
        let read = &genome()[700..800];
        assert_eq!(trim(read, 21, shared_index()), read.to_vec());
    }

    #[test]
    fn head_errors_trimmed_to_branch() {
        // the variant read makes a two-way branch right before VARIANT_POS + 1
        let start = VARIANT_POS - 1;
        let read = with_errors(&genome()[start..start + 100], &[0, 1]);
        let out = trim(&read, 21, shared_index());
        assert_eq!(out, read[2..].to_vec());
    }

    #[test]
    fn unsupported_read_is_emptied() {
        let read = b"ACGTACGTACGTACGTACGTACGTACGTACGT";
        assert!(trim(read, 21, shared_index()).is_empty());
    }

    #[test]
    fn branch_counts() {
        let g = genome();
        let idx = shared_index();
        assert_eq!(next_kmer_count(&g[800..821], NextKmer::End, idx, 1), 1);
        assert_eq!(next_kmer_count(&g[VARIANT_POS + 1..VARIANT_POS + 22], NextKmer::Start, idx, 1), 2);
        assert!(is_simple(&g[800..821], &g[801..822], idx, 1));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]
        #[test]
        fn trim_returns_idempotent_substring(
            start in 0usize..1800,
            len in 20usize..160,
            errs in proptest::collection::vec(0usize..160, 0..4),
        ) {
            let g = genome();
            let end = (start + len).min(g.len());
            let errs: Vec<usize> = errs.into_iter().filter(|&e| e < end - start).collect();
            let read = with_errors(&g[start..end], &errs);
            let out = trim(&read, 21, shared_index());
            prop_assert!(out.len() <= read.len());
            prop_assert!(out.is_empty() || read.windows(out.len()).any(|w| w == &out[..]));
            let again = trim(&out, 21, shared_index());
            prop_assert_eq!(again, out);
        }
    }
}
