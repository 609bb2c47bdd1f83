use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// 处理模式：每种模式对应一个纯函数 `(WorkItem, WalkParams) -> CorrectionResult`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum Mode {
    /// 双端合并，失败时切分为 k-mer 片段
    MergeAndKmerize,
    /// 仅双端合并
    MergeOnly,
    /// 单端切分
    Kmerize,
    /// 单端正反向自校验
    Validate,
    /// 长读段自纠错
    SelfCorrect,
    /// 长读段多轮混合纠错
    HybridCorrect,
}

impl Mode {
    pub fn is_paired(self) -> bool {
        matches!(self, Mode::MergeAndKmerize | Mode::MergeOnly)
    }

    pub fn is_long_read(self) -> bool {
        matches!(self, Mode::SelfCorrect | Mode::HybridCorrect)
    }
}

/// 纠错引擎的全部参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkParams {
    pub kmer_length: usize,
    pub min_kmer_length: usize,
    pub min_overlap: usize,
    /// `None` 时按模式从读长推导
    pub max_overlap: Option<usize>,
    pub max_insert_size: usize,
    pub max_leaves: usize,
    /// 种子 k-mer 的双链频数阈值
    pub seed_kmer_threshold: usize,
    /// 切分/修剪时单链合格阈值
    pub kmer_threshold: usize,
    /// 搜索树中保留分支所需的支持数
    pub search_kmer_threshold: usize,
    pub downward: usize,
    pub collected_seeds: usize,
    pub split_on_failure: bool,
    pub max_seed_gap: usize,
    pub merge_strong_intervals: bool,
    /// 自校验失败且切分未能分开 read 时，改在重复区与唯一区交界处切分
    pub split_repeats: bool,
    /// 语料 k-mer 频数中位数（由索引填充）
    pub median_kmer_freq: usize,
    pub seed_error_rate: f64,
    pub min_strand_support: usize,
    pub contaminated_cutoff: usize,
    pub stop_on_repeated_asymmetric: bool,
}

impl Default for WalkParams {
    fn default() -> Self {
        Self {
            kmer_length: 31,
            min_kmer_length: 15,
            min_overlap: 41,
            max_overlap: None,
            max_insert_size: 400,
            max_leaves: 32,
            seed_kmer_threshold: 10,
            kmer_threshold: 2,
            search_kmer_threshold: 2,
            downward: 3,
            collected_seeds: 5,
            split_on_failure: false,
            max_seed_gap: 500,
            merge_strong_intervals: false,
            split_repeats: false,
            median_kmer_freq: 0,
            seed_error_rate: 0.15,
            min_strand_support: 0,
            contaminated_cutoff: usize::MAX,
            stop_on_repeated_asymmetric: true,
        }
    }
}

impl WalkParams {
    pub fn validate(&self) -> Result<()> {
        if self.kmer_length < 2 {
            bail!("k-mer length must be at least 2, got {}", self.kmer_length);
        }
        if self.min_kmer_length == 0 || self.min_kmer_length > self.kmer_length {
            bail!(
                "minimum k-mer length {} must be in 1..={}",
                self.min_kmer_length,
                self.kmer_length
            );
        }
        if self.min_overlap == 0 {
            bail!("minimum overlap must be positive");
        }
        if let Some(max) = self.max_overlap {
            if max < self.min_overlap {
                bail!("max overlap {} is below min overlap {}", max, self.min_overlap);
            }
        }
        if self.max_leaves == 0 {
            bail!("max leaves must be positive");
        }
        if self.downward == 0 || self.collected_seeds == 0 {
            bail!("downward and collected-seeds must be positive");
        }
        if !(0.0..1.0).contains(&self.seed_error_rate) {
            bail!("seed error rate must be in [0, 1), got {}", self.seed_error_rate);
        }
        Ok(())
    }

    /// 自适应种子在长度 `k` 下放弃前最多走的位置数：`ceil(3 / (1-e)^k)`
    pub fn seed_walk_distance(&self, k: usize) -> usize {
        let p = (1.0 - self.seed_error_rate).powi(k as i32);
        (3.0 / p).ceil() as usize
    }

    /// 混合纠错的最大重叠，未设置时退回 k-mer 长度
    pub fn hybrid_max_overlap(&self) -> usize {
        self.max_overlap.unwrap_or(self.kmer_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(WalkParams::default().validate().is_ok());
    }

    #[test]
    fn rejects_inconsistent_lengths() {
        let p = WalkParams { min_kmer_length: 40, ..WalkParams::default() };
        assert!(p.validate().is_err());
        let p = WalkParams { max_overlap: Some(10), ..WalkParams::default() };
        assert!(p.validate().is_err());
        let p = WalkParams { seed_error_rate: 1.0, ..WalkParams::default() };
        assert!(p.validate().is_err());
    }

    #[test]
    fn walk_distance_grows_with_k() {
        let p = WalkParams::default();
        assert_eq!(p.seed_walk_distance(0), 3);
        assert!(p.seed_walk_distance(15) < p.seed_walk_distance(31));
        // 0.85^31 ~= 0.00649
        assert_eq!(p.seed_walk_distance(31), 463);
    }

    #[test]
    fn params_roundtrip_through_bincode() {
        let p = WalkParams { max_overlap: Some(60), split_on_failure: true, ..WalkParams::default() };
        let bytes = bincode::serialize(&p).unwrap();
        let back: WalkParams = bincode::deserialize(&bytes).unwrap();
        assert_eq!(p, back);
    }
}
