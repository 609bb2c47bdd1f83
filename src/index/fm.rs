use serde::{Deserialize, Serialize};

use super::{bwt, sa};

/// 朴素 FM 索引实现：
/// - 字母以 [0..sigma) 编码（0 预留为 $，作为 read 之间的分隔符）。
/// - 采用定长分块的 Occ 采样（块内顺扫补偿）。
/// - 只回答计数与区间问题，构建完成后不保留 SA。
#[derive(Debug, Serialize, Deserialize)]
pub struct FMIndex {
    pub sigma: u8,
    pub block: u32,
    /// C[i] = 文本中字母 < i 的累计数量
    pub c: Vec<u32>,
    /// BWT 序列
    pub bwt: Vec<u8>,
    /// Occ 采样（按块存储，行优先展平）：occ_samples[block_id * sigma + c]
    pub occ_samples: Vec<u32>,
}

impl FMIndex {
    /// 从数值化文本直接构建（SA -> BWT -> Occ），SA 用完即丢弃。
    pub fn from_text(text: &[u8], sigma: u8, block: usize) -> Self {
        let sa_arr = sa::build_sa(text);
        let bwt_arr = bwt::build_bwt(text, &sa_arr);
        Self::build(bwt_arr, sigma, block)
    }

    pub fn build(bwt: Vec<u8>, sigma: u8, block: usize) -> Self {
        let n = bwt.len();
        let sigma_us = sigma as usize;
        let block = block.max(1);
        // 计算 C 表
        let mut freq = vec![0u32; sigma_us];
        for &ch in &bwt {
            let ci = ch as usize;
            if ci < sigma_us { freq[ci] += 1; }
        }
        let mut c = vec![0u32; sigma_us];
        let mut acc = 0u32;
        for i in 0..sigma_us {
            c[i] = acc;
            acc += freq[i];
        }

        // 采样 Occ：记录每块起始处的累计计数
        let num_blocks = (n + block - 1) / block;
        let mut occ_samples = vec![0u32; num_blocks * sigma_us];
        let mut running = vec![0u32; sigma_us];
        for (bi, chunk) in bwt.chunks(block).enumerate() {
            occ_samples[bi * sigma_us..(bi + 1) * sigma_us].copy_from_slice(&running);
            for &ch in chunk {
                let ci = ch as usize;
                if ci < sigma_us { running[ci] += 1; }
            }
        }

        Self { sigma, block: block as u32, c, bwt, occ_samples }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bwt.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bwt.is_empty()
    }

    #[inline]
    pub fn occ(&self, c: u8, pos: usize) -> u32 {
        // 返回 BWT[0..pos) 中 c 的出现次数
        if pos == 0 { return 0; }
        let sigma_us = self.sigma as usize;
        let block = self.block as usize;
        let bi = (pos - 1) / block;
        let base = self.occ_samples[bi * sigma_us + c as usize];
        let start = bi * block;
        let add = self.bwt[start..pos].iter().filter(|&&ch| ch == c).count() as u32;
        base + add
    }

    /// 在区间 [l, r) 前端扩展字符 c，返回新区间（可能为空）。
    #[inline]
    pub fn rank_range(&self, c: u8, l: usize, r: usize) -> (usize, usize) {
        if c as usize >= self.sigma as usize {
            return (0, 0);
        }
        let c0 = self.c[c as usize] as usize;
        let nl = c0 + self.occ(c, l) as usize;
        let nr = c0 + self.occ(c, r) as usize;
        (nl, nr)
    }

    /// 反向搜索精确匹配，pat 已经是编码后的字母表（不应包含 0）
    pub fn backward_search(&self, pat: &[u8]) -> Option<(usize, usize)> {
        if self.bwt.is_empty() { return None; }
        let mut l = 0usize;
        let mut r = self.bwt.len();
        for &a in pat.iter().rev() {
            if a == 0 { return None; }
            let (nl, nr) = self.rank_range(a, l, r);
            if nl >= nr { return None; }
            l = nl; r = nr;
        }
        Some((l, r))
    }

    /// 模式出现次数
    pub fn count(&self, pat: &[u8]) -> usize {
        self.backward_search(pat).map_or(0, |(l, r)| r - l)
    }
}
