//! FM 索引引导的读段调和与纠错引擎。
//!
//! 数据流：read(s) → 修剪 → 切分 / 种子 → 有界搜索（合并或桥接）→ [`CorrectionResult`]。
//! 每个工作项独立处理，只共享只读索引，因此可以在线程池中并行执行。

pub mod correct;
pub mod filter;
pub mod merge;
pub mod params;
pub mod profile;
pub mod result;
pub mod search;
pub mod seed;
pub mod segment;
pub mod trim;

pub use params::{Mode, WalkParams};
pub use result::{CorrectionResult, WalkFailure, WalkOutcome, WalkStats};
pub use search::{BoundedSearch, IntervalSearch};

use anyhow::{bail, Result};

use crate::index::KmerIndex;
use crate::io::SeqRecord;

/// 一个输入工作项：单条 read 或一对 read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    Single(SeqRecord),
    Pair(SeqRecord, SeqRecord),
}

impl WorkItem {
    pub fn id(&self) -> &str {
        match self {
            WorkItem::Single(r) | WorkItem::Pair(r, _) => &r.id,
        }
    }
}

/// 纠错引擎：只读引用索引、搜索实现与参数
pub struct Walker<'a, I: ?Sized, S: ?Sized> {
    pub index: &'a I,
    pub search: &'a S,
    pub params: &'a WalkParams,
}

impl<'a, I: ?Sized, S: ?Sized> Clone for Walker<'a, I, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, I: ?Sized, S: ?Sized> Copy for Walker<'a, I, S> {}

impl<'a, I, S> Walker<'a, I, S>
where
    I: KmerIndex + ?Sized,
    S: BoundedSearch + ?Sized,
{
    pub fn new(index: &'a I, search: &'a S, params: &'a WalkParams) -> Self {
        Self { index, search, params }
    }

    /// 按模式处理一个工作项。模式与工作项类型不匹配是配置错误。
    pub fn run(&self, mode: Mode, item: &WorkItem) -> Result<CorrectionResult> {
        let res = match (mode, item) {
            (Mode::MergeAndKmerize, WorkItem::Pair(a, b)) => self.merge_and_kmerize(&a.seq, &b.seq),
            (Mode::MergeOnly, WorkItem::Pair(a, b)) => self.merge_only(&a.seq, &b.seq),
            (Mode::Kmerize, WorkItem::Single(r)) => self.kmerize(&r.seq),
            (Mode::Validate, WorkItem::Single(r)) => self.validate(&r.seq),
            (Mode::SelfCorrect, WorkItem::Single(r)) => self.self_correct(&r.seq),
            (Mode::HybridCorrect, WorkItem::Single(r)) => self.hybrid_correct(&r.seq),
            (m, WorkItem::Single(r)) => bail!("mode {:?} needs read pairs, got single read '{}'", m, r.id),
            (m, WorkItem::Pair(a, _)) => bail!("mode {:?} takes single reads, got pair '{}'", m, a.id),
        };
        Ok(res)
    }
}
