use crate::index::KmerIndex;
use crate::util::dna;
use crate::walk::filter::{accept_fragment, is_low_complexity};
use crate::walk::profile::FrequencyProfile;
use crate::walk::result::{CorrectionResult, WalkFailure, WalkOutcome};
use crate::walk::search::{BoundedSearch, SearchReport, SearchRequest};
use crate::walk::segment::{segment_profile, segment_streaming, split_repeat, Segmentation};
use crate::walk::trim::trim;
use crate::walk::Walker;

/// 两个方向搜索结果的调和规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairRule {
    /// 单向成功时要求两次搜索都至多使用一个叶子；双向成功时要求互为反向互补
    LeafGuarded,
    /// 单向成功直接接受；双向成功时要求长度相同
    EqualLength,
}

/// 两端都失败时报告的失败：分支或预算耗尽比失去支持更能说明问题
fn dominant(f1: WalkFailure, f2: WalkFailure) -> WalkFailure {
    let rank = |f: WalkFailure| match f {
        WalkFailure::HighError => 0,
        WalkFailure::ExceedDepth => 1,
        WalkFailure::ExceedLeaves => 2,
        WalkFailure::Asymmetric => 3,
    };
    if rank(f2) > rank(f1) {
        f2
    } else {
        f1
    }
}

/// 调和从第一端与第二端出发的两次搜索。覆盖度相同时取第二端的结果。
pub fn reconcile_pair(first: SearchReport, second: SearchReport, rule: PairRule) -> WalkOutcome {
    let guarded = first.leaves_used <= 1 && second.leaves_used <= 1;
    let single_ok = match rule {
        PairRule::LeafGuarded => guarded,
        PairRule::EqualLength => true,
    };
    match (first.outcome, second.outcome) {
        (Ok(h), Err(_)) | (Err(_), Ok(h)) if single_ok => WalkOutcome::Merged { seq: h.merged, coverage: h.coverage },
        (Ok(h1), Ok(h2)) => {
            let agree = match rule {
                PairRule::LeafGuarded => h1.merged == dna::revcomp(&h2.merged),
                PairRule::EqualLength => h1.merged.len() == h2.merged.len(),
            };
            if !agree {
                return WalkOutcome::Failed(WalkFailure::Asymmetric);
            }
            let h = if h1.coverage > h2.coverage { h1 } else { h2 };
            WalkOutcome::Merged { seq: h.merged, coverage: h.coverage }
        }
        (Err(f1), Err(f2)) => WalkOutcome::Failed(dominant(f1, f2)),
        // a lone success on a branching walk
        _ => WalkOutcome::NoPath,
    }
}

/// 一端的切分结果：主片段与其余片段
#[derive(Debug, Default)]
struct EndFragments {
    main: Vec<u8>,
    others: Vec<Vec<u8>>,
    kmerized: bool,
}

impl EndFragments {
    fn collect(seq: &[u8], seg: &Segmentation, filter: impl Fn(&[u8]) -> bool) -> Self {
        let mut out = EndFragments { kmerized: !seg.intervals.is_empty(), ..Self::default() };
        for i in 0..seg.intervals.len() {
            let frag = seg.fragment(seq, i);
            if !filter(frag) {
                continue;
            }
            if seg.main == Some(i) {
                out.main = frag.to_vec();
            } else {
                out.others.push(frag.to_vec());
            }
        }
        out
    }
}

fn fraction(len: usize, f: f64) -> usize {
    (len as f64 * f) as usize
}

impl<'a, I, S> Walker<'a, I, S>
where
    I: KmerIndex + ?Sized,
    S: BoundedSearch + ?Sized,
{
    /// 两端前缀都不是明显重复（频数低于中位数的 1.3 倍）时才值得搜索
    pub fn is_suitable_for_walk(&self, first: &[u8], second: &[u8]) -> bool {
        let p = self.params;
        if first.len() < p.min_overlap || second.len() < p.min_overlap {
            return false;
        }
        let cutoff = p.median_kmer_freq as f64 * 1.3;
        (self.index.count(first) as f64) < cutoff && (self.index.count(second) as f64) < cutoff
    }

    fn pair_request<'r>(&self, source: &'r [u8], target: &'r [u8], max_overlap: usize) -> SearchRequest<'r> {
        let p = self.params;
        SearchRequest {
            source,
            target,
            min_overlap: p.min_overlap,
            max_overlap,
            min_length: 0,
            max_length: p.max_insert_size,
            max_leaves: p.max_leaves,
            threshold: p.search_kmer_threshold,
        }
    }

    /// 从第一端走向第二端的反向互补，以及反方向各一次
    fn walk_both_ends(&self, first: &[u8], second: &[u8], max_overlap: usize) -> (SearchReport, SearchReport) {
        let rc_second = dna::revcomp(second);
        let rc_first = dna::revcomp(first);
        let r1 = self.search.search(&self.pair_request(first, &rc_second, max_overlap));
        let r2 = self.search.search(&self.pair_request(second, &rc_first, max_overlap));
        (r1, r2)
    }

    fn kmerize_end(&self, seq: &[u8], filtered: bool) -> EndFragments {
        let p = self.params;
        if seq.len() < p.kmer_length {
            return EndFragments::default();
        }
        let profile = FrequencyProfile::build(seq, p.kmer_length, self.index);
        let seg = segment_profile(&profile, p.kmer_threshold, self.index, p.merge_strong_intervals);
        EndFragments::collect(seq, &seg, |f| !filtered || accept_fragment(f))
    }

    /// 双端合并；无法可靠合并时把两端切分为 k-mer 片段
    pub fn merge_and_kmerize(&self, first: &[u8], second: &[u8]) -> CorrectionResult {
        let p = self.params;
        let k = p.kmer_length;
        let a = trim(first, k, self.index);
        let b = trim(second, k, self.index);

        let short = |s: &[u8]| s.len() >= k && s.len() < p.min_overlap;
        let any_short = short(&a) || short(&b);
        if !any_short && (a.len() < k || b.len() < k) {
            return CorrectionResult::default();
        }

        if !any_short {
            let pa = &a[..p.min_overlap];
            let pb = &b[..p.min_overlap];
            if self.is_suitable_for_walk(pa, pb) {
                let max_overlap = p
                    .max_overlap
                    .unwrap_or_else(|| fraction((first.len() + second.len()) / 2, 0.95));
                let (r1, r2) = self.walk_both_ends(pa, pb, max_overlap);
                match reconcile_pair(r1, r2, PairRule::LeafGuarded) {
                    WalkOutcome::Merged { seq, .. } => return CorrectionResult::merged(seq),
                    WalkOutcome::Failed(f) => log::trace!("pair walk failed: {}", f),
                    WalkOutcome::NoPath => log::trace!("pair walk rejected by leaf guard"),
                }
            }
        }

        let fa = self.kmerize_end(&a, true);
        let fb = self.kmerize_end(&b, true);
        CorrectionResult {
            kmerize: fa.kmerized,
            kmerize2: fb.kmerized,
            corrected: fa.main,
            corrected2: fb.main,
            fragments: fa.others,
            fragments2: fb.others,
            ..CorrectionResult::default()
        }
    }

    /// 仅合并：不做切分，失败时返回空结果
    pub fn merge_only(&self, first: &[u8], second: &[u8]) -> CorrectionResult {
        let p = self.params;
        let a = trim(first, p.kmer_length, self.index);
        let b = trim(second, p.kmer_length, self.index);
        if a.len() < p.min_overlap || b.len() < p.min_overlap {
            return CorrectionResult::default();
        }
        let max_overlap = p
            .max_overlap
            .unwrap_or_else(|| fraction((first.len() + second.len()) / 2, 0.9));
        let (r1, r2) = self.walk_both_ends(&a[..p.min_overlap], &b[..p.min_overlap], max_overlap);
        match reconcile_pair(r1, r2, PairRule::EqualLength) {
            WalkOutcome::Merged { seq, .. } => CorrectionResult::merged(seq),
            _ => CorrectionResult::default(),
        }
    }

    /// 单端切分，不修剪也不过滤
    pub fn kmerize(&self, read: &[u8]) -> CorrectionResult {
        let f = self.kmerize_end(read, false);
        CorrectionResult {
            kmerize: f.kmerized,
            corrected: f.main,
            fragments: f.others,
            ..CorrectionResult::default()
        }
    }

    /// 自校验失败后的切分。整条 read 仍是一个主片段时，可选地按重复区边界再切一次。
    fn validate_segments(&self, read: &[u8]) -> Segmentation {
        let p = self.params;
        let seg = segment_streaming(read, p.kmer_length, p.kmer_threshold, self.index);
        let unsplit = seg.main.map(|m| seg.fragment(read, m).len()) == Some(read.len());
        if !(p.split_repeats && unsplit) {
            return seg;
        }
        let profile = FrequencyProfile::build(read, p.kmer_length, self.index);
        split_repeat(&profile, p.median_kmer_freq)
    }

    /// 单端自校验：从 read 前缀走到自身后缀，并在反向互补上重复一次
    pub fn validate(&self, read: &[u8]) -> CorrectionResult {
        let p = self.params;
        let len = read.len();
        if len <= p.min_overlap {
            return CorrectionResult {
                kmerize: !is_low_complexity(read).0,
                corrected: read.to_vec(),
                ..CorrectionResult::default()
            };
        }

        let max_overlap = p.max_overlap.unwrap_or_else(|| fraction(len, 0.9));
        let request = |seq: &[u8]| -> SearchReport {
            self.search.search(&SearchRequest {
                source: &seq[..p.min_overlap],
                target: &seq[len - p.min_overlap..],
                min_overlap: p.min_overlap,
                max_overlap,
                min_length: 0,
                max_length: fraction(len, 1.1),
                max_leaves: p.max_leaves,
                threshold: p.search_kmer_threshold,
            })
        };
        let fwd = request(read).outcome.map(|h| h.merged);
        let rvc = request(&dna::revcomp(read)).outcome.map(|h| dna::revcomp(&h.merged));

        // a longer walk usually means the other side collapsed a repeat
        let prefer = |m: Vec<u8>| if m.len() >= len { m } else { read.to_vec() };
        let chosen = match (fwd, rvc) {
            (Ok(m1), Err(f2)) if f2 != WalkFailure::ExceedDepth => Some(prefer(m1)),
            (Err(f1), Ok(m2)) if f1 != WalkFailure::ExceedDepth => Some(prefer(m2)),
            (Ok(m1), Ok(m2)) => Some(if m1.len() >= len {
                m1
            } else if m2.len() >= len {
                m2
            } else {
                read.to_vec()
            }),
            _ => None,
        };
        if let Some(seq) = chosen {
            return CorrectionResult::merged(seq);
        }

        let seg = self.validate_segments(read);
        let f = EndFragments::collect(read, &seg, |s| !is_low_complexity(s).0);
        CorrectionResult {
            kmerize: f.kmerized,
            corrected: f.main,
            fragments: f.others,
            ..CorrectionResult::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::testutil::{genome, shared_index, with_errors};
    use crate::walk::search::{IntervalSearch, SearchHit};
    use crate::walk::WalkParams;

    fn params() -> WalkParams {
        WalkParams {
            kmer_length: 21,
            min_overlap: 31,
            // interior 21-mers are covered by 16 reads per strand
            median_kmer_freq: 32,
            ..WalkParams::default()
        }
    }

    fn hit(seq: &[u8], coverage: usize, leaves: usize) -> SearchReport {
        SearchReport { outcome: Ok(SearchHit { merged: seq.to_vec(), coverage }), leaves_used: leaves }
    }

    fn miss(f: WalkFailure, leaves: usize) -> SearchReport {
        SearchReport { outcome: Err(f), leaves_used: leaves }
    }

    #[test]
    fn reconcile_leaf_guard() {
        let one_way = reconcile_pair(hit(b"ACGTT", 5, 1), miss(WalkFailure::HighError, 1), PairRule::LeafGuarded);
        assert_eq!(one_way.merged(), Some(&b"ACGTT"[..]));
        let branched = reconcile_pair(hit(b"ACGTT", 5, 1), miss(WalkFailure::HighError, 3), PairRule::LeafGuarded);
        assert_eq!(branched, WalkOutcome::NoPath);
        let loose = reconcile_pair(hit(b"ACGTT", 5, 4), miss(WalkFailure::HighError, 3), PairRule::EqualLength);
        assert_eq!(loose.merged(), Some(&b"ACGTT"[..]));
    }

    #[test]
    fn reconcile_two_successes() {
        // AACGG is the reverse complement of CCGTT
        let agree = reconcile_pair(hit(b"AACGG", 5, 1), hit(b"CCGTT", 9, 1), PairRule::LeafGuarded);
        assert_eq!(agree, WalkOutcome::Merged { seq: b"CCGTT".to_vec(), coverage: 9 });
        let first_wins = reconcile_pair(hit(b"AACGG", 9, 1), hit(b"CCGTT", 5, 1), PairRule::LeafGuarded);
        assert_eq!(first_wins.merged(), Some(&b"AACGG"[..]));
        let tie = reconcile_pair(hit(b"AACGG", 7, 1), hit(b"CCGTT", 7, 1), PairRule::LeafGuarded);
        assert_eq!(tie.merged(), Some(&b"CCGTT"[..]));
        let disagree = reconcile_pair(hit(b"AACGG", 5, 1), hit(b"AACGG", 9, 1), PairRule::LeafGuarded);
        assert_eq!(disagree, WalkOutcome::Failed(WalkFailure::Asymmetric));
        let same_len = reconcile_pair(hit(b"AACGG", 5, 1), hit(b"TTTTT", 2, 1), PairRule::EqualLength);
        assert_eq!(same_len.merged(), Some(&b"AACGG"[..]));
        let diff_len = reconcile_pair(hit(b"AACGG", 5, 1), hit(b"TTTT", 2, 1), PairRule::EqualLength);
        assert_eq!(diff_len, WalkOutcome::Failed(WalkFailure::Asymmetric));
    }

    #[test]
    fn reconcile_two_failures() {
        let out = reconcile_pair(
            miss(WalkFailure::HighError, 1),
            miss(WalkFailure::ExceedLeaves, 40),
            PairRule::LeafGuarded,
        );
        assert_eq!(out, WalkOutcome::Failed(WalkFailure::ExceedLeaves));
        let out = reconcile_pair(
            miss(WalkFailure::ExceedDepth, 1),
            miss(WalkFailure::HighError, 1),
            PairRule::EqualLength,
        );
        assert_eq!(out, WalkOutcome::Failed(WalkFailure::ExceedDepth));
        assert_eq!(out.merged(), None);
    }

    #[test]
    fn end_of_exactly_min_overlap_is_walked() {
        let g = genome();
        let idx = shared_index();
        let search = IntervalSearch::new(idx);
        let p = params();
        let walker = Walker::new(idx, &search, &p);
        let read1 = &g[700..700 + p.min_overlap];
        assert_eq!(trim(read1, p.kmer_length, idx), read1.to_vec());

        let res = walker.merge_and_kmerize(read1, &dna::revcomp(&g[900..1000]));
        assert!(res.merge);
        let fragment = &g[700..1000];
        assert!(res.corrected == fragment || res.corrected == dna::revcomp(fragment));
    }

    #[test]
    fn pair_merges_into_fragment() {
        let g = genome();
        let fragment = &g[700..1000];
        let read1 = fragment[..100].to_vec();
        let read2 = dna::revcomp(&fragment[200..]);
        let idx = shared_index();
        let search = IntervalSearch::new(idx);
        let p = params();
        let walker = Walker::new(idx, &search, &p);

        let res = walker.merge_and_kmerize(&read1, &read2);
        assert!(res.merge);
        assert!(res.corrected == fragment || res.corrected == dna::revcomp(fragment));

        let res = walker.merge_only(&read1, &read2);
        assert!(res.merge);
        assert!(res.corrected == fragment || res.corrected == dna::revcomp(fragment));
    }

    #[test]
    fn distant_pair_is_kmerized() {
        let g = genome();
        let read1 = g[100..200].to_vec();
        let read2 = dna::revcomp(&g[1000..1100]);
        let idx = shared_index();
        let search = IntervalSearch::new(idx);
        let p = params();
        let walker = Walker::new(idx, &search, &p);

        let res = walker.merge_and_kmerize(&read1, &read2);
        assert!(!res.merge);
        assert!(res.kmerize && res.kmerize2);
        assert_eq!(res.corrected, read1);
        assert_eq!(res.corrected2, read2);
        assert!(res.fragments.is_empty() && res.fragments2.is_empty());

        assert_eq!(walker.merge_only(&read1, &read2), CorrectionResult::default());
    }

    #[test]
    fn repetitive_prefix_skips_walk() {
        let g = genome();
        let idx = shared_index();
        let search = IntervalSearch::new(idx);
        let p = WalkParams { median_kmer_freq: 10, ..params() };
        let walker = Walker::new(idx, &search, &p);
        assert!(!walker.is_suitable_for_walk(&g[700..731], &g[900..931]));
        let res = walker.merge_and_kmerize(&g[700..800], &dna::revcomp(&g[900..1000]));
        assert!(!res.merge);
        assert!(res.kmerize);
    }

    #[test]
    fn unusable_ends_give_empty_result() {
        let idx = shared_index();
        let search = IntervalSearch::new(idx);
        let p = params();
        let walker = Walker::new(idx, &search, &p);
        let junk = b"ACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTACGT";
        let res = walker.merge_and_kmerize(junk, &genome()[100..200]);
        assert_eq!(res, CorrectionResult::default());
    }

    #[test]
    fn short_end_goes_to_kmerize() {
        let g = genome();
        let idx = shared_index();
        let search = IntervalSearch::new(idx);
        let p = params();
        let walker = Walker::new(idx, &search, &p);
        let res = walker.merge_and_kmerize(&g[100..200], &g[500..530]);
        assert!(!res.merge);
        assert_eq!(res.corrected, g[100..200].to_vec());
        assert_eq!(res.corrected2, g[500..530].to_vec());
    }

    #[test]
    fn kmerize_keeps_all_fragments() {
        let idx = shared_index();
        let search = IntervalSearch::new(idx);
        let p = params();
        let walker = Walker::new(idx, &search, &p);
        let read = with_errors(&genome()[300..400], &[70]);
        let res = walker.kmerize(&read);
        assert!(res.kmerize);
        assert_eq!(res.corrected, read[..71].to_vec());
        // one fragment per single-kmer interval plus the tail run
        assert_eq!(res.fragments.len(), 20);
    }

    #[test]
    fn validate_repairs_middle_error() {
        let g = genome();
        let idx = shared_index();
        let search = IntervalSearch::new(idx);
        let p = WalkParams { min_overlap: 41, ..params() };
        let walker = Walker::new(idx, &search, &p);
        let read = with_errors(&g[300..400], &[50]);
        let res = walker.validate(&read);
        assert!(res.merge);
        assert_eq!(res.corrected, g[300..400].to_vec());

        let short = walker.validate(&g[300..330]);
        assert!(!short.merge && short.kmerize);
        assert_eq!(short.corrected, g[300..330].to_vec());
    }

    #[test]
    fn validate_falls_back_to_streaming_segments() {
        let idx = shared_index();
        let search = IntervalSearch::new(idx);
        let p = WalkParams { min_overlap: 41, ..params() };
        let walker = Walker::new(idx, &search, &p);
        // error inside the source prefix: neither walk can start
        let read = with_errors(&genome()[300..400], &[10, 95]);
        let res = walker.validate(&read);
        assert!(!res.merge);
        assert!(res.kmerize);
        assert!(!res.corrected.is_empty());
    }

    #[test]
    fn unsplit_validate_read_can_split_at_repeat_boundary() {
        let g = genome();
        let idx = shared_index();
        let search = IntervalSearch::new(idx);
        // 21-mers at the genome start occur floor(p/5)+1 times per strand
        let read = &g[..100];

        let p = WalkParams { median_kmer_freq: 10, ..params() };
        let seg = Walker::new(idx, &search, &p).validate_segments(read);
        assert_eq!(seg.intervals.len(), 1);

        let p = WalkParams { median_kmer_freq: 10, split_repeats: true, ..params() };
        let seg = Walker::new(idx, &search, &p).validate_segments(read);
        assert_eq!(seg.intervals.len(), 2);
        let main = seg.main.unwrap();
        assert_eq!(seg.fragment(read, main), &g[50..100]);
    }
}
