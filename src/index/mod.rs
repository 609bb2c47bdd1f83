//! 读段集合上的全文索引。
//!
//! [`KmerIndex`] 是纠错引擎依赖的全部索引能力：单链/双链计数、
//! SA 区间查找与单步扩展。[`reads::ReadIndex`] 是基于双向 FM 索引的实现。

pub mod bwt;
pub mod fm;
pub mod reads;
pub mod sa;

pub use reads::{IndexMeta, ReadIndex};

use crate::util::dna;

/// 区间可扩展的方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extend {
    /// 在模式右端追加碱基（反向文本的 BWT 上做后向搜索）
    Append,
    /// 在模式左端前置碱基（正向 BWT 上做后向搜索）
    Prepend,
}

/// 非空 SA 区间 [lower, upper)，携带其可扩展方向。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaInterval {
    pub lower: usize,
    pub upper: usize,
    pub dir: Extend,
}

impl SaInterval {
    #[inline]
    pub fn size(&self) -> usize {
        self.upper - self.lower
    }
}

/// 纠错引擎对索引的只读依赖，必须支持多线程并发读取。
pub trait KmerIndex: Sync {
    /// `kmer` 在读段文本中的出现次数（仅本链）
    fn count_single_strand(&self, kmer: &[u8]) -> usize;

    /// 双链出现次数：本链 + 反向互补链
    fn count(&self, kmer: &[u8]) -> usize {
        self.count_single_strand(kmer) + self.count_single_strand(&dna::revcomp(kmer))
    }

    fn find_interval(&self, pattern: &[u8], dir: Extend) -> Option<SaInterval>;

    /// 沿区间自身方向扩展一个碱基；结果为空时返回 `None`。
    fn extend_interval(&self, interval: SaInterval, base: u8) -> Option<SaInterval>;
}

/// 一个序列在两条链上的区间：`fwd` 可向右扩展，`rvc` 是其反向互补的区间，
/// 向右扩展 `b` 等价于在反向互补左端前置 `complement(b)`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrandIntervals {
    pub fwd: Option<SaInterval>,
    pub rvc: Option<SaInterval>,
}

impl StrandIntervals {
    pub fn find<I: KmerIndex + ?Sized>(index: &I, seq: &[u8]) -> Self {
        Self {
            fwd: index.find_interval(seq, Extend::Append),
            rvc: index.find_interval(&dna::revcomp(seq), Extend::Prepend),
        }
    }

    pub fn extend<I: KmerIndex + ?Sized>(&self, index: &I, base: u8) -> Self {
        Self {
            fwd: self.fwd.and_then(|iv| index.extend_interval(iv, base)),
            rvc: self.rvc.and_then(|iv| index.extend_interval(iv, dna::complement(base))),
        }
    }

    /// 双链支持数
    pub fn support(&self) -> usize {
        self.fwd.map_or(0, |iv| iv.size()) + self.rvc.map_or(0, |iv| iv.size())
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    //! 合成基因组与平铺读段，供各模块测试共享。

    use std::sync::OnceLock;

    use super::ReadIndex;
    use crate::util::dna;

    pub const GENOME_LEN: usize = 2000;
    pub const READ_LEN: usize = 100;
    pub const READ_STEP: usize = 5;
    /// 语料中唯一一条带变异的 read 覆盖此位置，制造一个 k-mer 分叉
    pub const VARIANT_POS: usize = 1501;

    pub fn genome() -> &'static [u8] {
        static GENOME: OnceLock<Vec<u8>> = OnceLock::new();
        GENOME.get_or_init(|| {
            let bases = [b'A', b'C', b'G', b'T'];
            let mut x: u32 = 42;
            (0..GENOME_LEN)
                .map(|_| {
                    x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                    bases[(x >> 30) as usize]
                })
                .collect()
        })
    }

    /// 与 `base` 和 `avoid` 都不同的碱基
    pub fn other_base(base: u8, avoid: u8) -> u8 {
        *[b'A', b'C', b'G', b'T']
            .iter()
            .find(|&&b| b != base && b != avoid)
            .unwrap()
    }

    pub fn variant_base() -> u8 {
        other_base(genome()[VARIANT_POS], b'N')
    }

    /// 双链平铺读段 + 一条变异 read
    pub fn corpus() -> Vec<Vec<u8>> {
        let g = genome();
        let mut reads = Vec::new();
        let mut start = 0;
        while start + READ_LEN <= g.len() {
            let r = &g[start..start + READ_LEN];
            reads.push(r.to_vec());
            reads.push(dna::revcomp(r));
            start += READ_STEP;
        }
        let mut variant = g[VARIANT_POS - 51..VARIANT_POS + 49].to_vec();
        variant[51] = variant_base();
        reads.push(variant);
        reads
    }

    pub fn shared_index() -> &'static ReadIndex {
        static INDEX: OnceLock<ReadIndex> = OnceLock::new();
        INDEX.get_or_init(|| ReadIndex::build(&corpus()))
    }

    /// 在给定位置引入替换错误
    pub fn with_errors(seq: &[u8], positions: &[usize]) -> Vec<u8> {
        let mut out = seq.to_vec();
        for &p in positions {
            out[p] = other_base(out[p], b'N');
        }
        out
    }
}
