//! # fmwalk
//!
//! 基于读段集合 FM 索引的读段调和与纠错工具。
//!
//! 本 crate 提供：
//!
//! - **索引构建**：对全部读段构建双向 FM 索引（正向 + 反向文本）
//! - **双端合并**：在索引中从一端搜索到另一端，重建插入片段
//! - **k-mer 切分**：按 k-mer 支持度把读段切成可靠片段
//! - **长读段纠错**：提取高频种子，在种子之间做有界搜索桥接
//!
//! ## 快速示例
//!
//! ```rust,no_run
//! use fmwalk::index::ReadIndex;
//! use fmwalk::walk::{IntervalSearch, Mode, WalkParams, Walker, WorkItem};
//! use fmwalk::io::SeqRecord;
//!
//! let reads = vec![b"ACGTACGTAGCTGATCGTAGGCTAGCTAGGATCGATCG".to_vec()];
//! let index = ReadIndex::build(&reads);
//! let search = IntervalSearch::new(&index);
//! let params = WalkParams { kmer_length: 15, min_kmer_length: 11, ..WalkParams::default() };
//! let walker = Walker::new(&index, &search, &params);
//!
//! let item = WorkItem::Single(SeqRecord::new("r1", reads[0].clone()));
//! let res = walker.run(Mode::Kmerize, &item).unwrap();
//! println!("{} fragments", res.fragments.len());
//! ```
//!
//! ## 模块说明
//!
//! - [`io`] — FASTA / FASTQ 解析与 FASTA 输出
//! - [`index`] — 后缀数组、BWT、FM 索引与读段集合索引
//! - [`walk`] — 修剪、切分、种子、有界搜索与各处理模式
//! - [`aggregate`] — 结果路由与运行统计
//! - [`pipeline`] — 批处理驱动
//! - [`util`] — DNA 编码 / 反向互补等工具函数

pub mod aggregate;
pub mod index;
pub mod io;
pub mod pipeline;
pub mod util;
pub mod walk;
