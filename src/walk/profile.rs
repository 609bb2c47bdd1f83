use crate::index::KmerIndex;
use crate::util::dna;

/// 序列每个 k-mer 起点在两条链上的出现次数
#[derive(Debug, Clone)]
pub struct FrequencyProfile {
    seq: Vec<u8>,
    k: usize,
    pub same: Vec<usize>,
    pub revcomp: Vec<usize>,
}

impl FrequencyProfile {
    pub fn build<I: KmerIndex + ?Sized>(seq: &[u8], k: usize, index: &I) -> Self {
        let n = if k == 0 || seq.len() < k { 0 } else { seq.len() - k + 1 };
        let mut same = Vec::with_capacity(n);
        let mut revcomp = Vec::with_capacity(n);
        for kmer in seq.windows(k.max(1)).take(n) {
            same.push(index.count_single_strand(kmer));
            revcomp.push(index.count_single_strand(&dna::revcomp(kmer)));
        }
        Self { seq: seq.to_vec(), k, same, revcomp }
    }

    pub fn kmer_len(&self) -> usize {
        self.k
    }

    pub fn num_kmers(&self) -> usize {
        self.same.len()
    }

    pub fn is_empty(&self) -> bool {
        self.same.is_empty()
    }

    pub fn kmer(&self, i: usize) -> &[u8] {
        &self.seq[i..i + self.k]
    }

    /// 每个位置上频数 ≥ `threshold` 的链数（0..=2）
    pub fn qualified(&self, threshold: usize) -> Vec<u8> {
        self.same
            .iter()
            .zip(&self.revcomp)
            .map(|(&s, &r)| (s >= threshold) as u8 + (r >= threshold) as u8)
            .collect()
    }

    /// 双链频数严格大于 `cutoff` 的链数
    pub fn above(&self, cutoff: usize) -> Vec<u8> {
        self.same
            .iter()
            .zip(&self.revcomp)
            .map(|(&s, &r)| (s > cutoff) as u8 + (r > cutoff) as u8)
            .collect()
    }
}
