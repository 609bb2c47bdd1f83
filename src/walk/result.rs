use std::fmt;
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

/// 一次有界搜索的失败类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalkFailure {
    /// 所有分支都失去支持
    HighError,
    /// 长度预算耗尽
    ExceedDepth,
    /// 分支数超过上限
    ExceedLeaves,
    /// 正反向搜索结果不一致
    Asymmetric,
}

impl fmt::Display for WalkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WalkFailure::HighError => "high error",
            WalkFailure::ExceedDepth => "exceed depth",
            WalkFailure::ExceedLeaves => "exceed leaves",
            WalkFailure::Asymmetric => "asymmetric",
        };
        f.write_str(s)
    }
}

/// 一次合并尝试的结论
#[derive(Debug, Clone, PartialEq)]
pub enum WalkOutcome {
    Merged { seq: Vec<u8>, coverage: usize },
    Failed(WalkFailure),
    /// 未尝试搜索，或搜索结果被调和规则拒绝
    NoPath,
}

impl WalkOutcome {
    pub fn merged(&self) -> Option<&[u8]> {
        match self {
            WalkOutcome::Merged { seq, .. } => Some(seq),
            _ => None,
        }
    }
}

/// 长读段纠错统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkStats {
    pub total_seeds: usize,
    pub total_walks: usize,
    pub corrected_walks: usize,
    pub corrected_len: usize,
    pub total_read_len: usize,
    pub high_error: usize,
    pub exceed_depth: usize,
    pub exceed_leaves: usize,
    pub asymmetric: usize,
    /// 相邻种子间距之和
    pub seed_distance: usize,
}

impl WalkStats {
    pub fn record_failure(&mut self, failure: WalkFailure) {
        match failure {
            WalkFailure::HighError => self.high_error += 1,
            WalkFailure::ExceedDepth => self.exceed_depth += 1,
            WalkFailure::ExceedLeaves => self.exceed_leaves += 1,
            WalkFailure::Asymmetric => self.asymmetric += 1,
        }
    }

    pub fn mean_seed_distance(&self) -> f64 {
        if self.total_walks == 0 {
            0.0
        } else {
            self.seed_distance as f64 / self.total_walks as f64
        }
    }
}

impl AddAssign for WalkStats {
    fn add_assign(&mut self, o: Self) {
        self.total_seeds += o.total_seeds;
        self.total_walks += o.total_walks;
        self.corrected_walks += o.corrected_walks;
        self.corrected_len += o.corrected_len;
        self.total_read_len += o.total_read_len;
        self.high_error += o.high_error;
        self.exceed_depth += o.exceed_depth;
        self.exceed_leaves += o.exceed_leaves;
        self.asymmetric += o.asymmetric;
        self.seed_distance += o.seed_distance;
    }
}

/// 单条 read（或一对 read）的处理结果，交由聚合器恰好消费一次
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrectionResult {
    pub merge: bool,
    pub kmerize: bool,
    pub kmerize2: bool,
    /// 合并结果，或第一端的主片段
    pub corrected: Vec<u8>,
    /// 第二端的主片段
    pub corrected2: Vec<u8>,
    pub fragments: Vec<Vec<u8>>,
    pub fragments2: Vec<Vec<u8>>,
    /// 长读段纠错后的片段
    pub long_read_fragments: Vec<Vec<u8>>,
    pub stats: WalkStats,
}

impl CorrectionResult {
    pub fn merged(seq: Vec<u8>) -> Self {
        Self { merge: true, corrected: seq, ..Self::default() }
    }
}
