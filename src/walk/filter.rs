//! 候选片段的质量过滤

/// 任一碱基占比 ≥ 90% 即为低复杂度；同时返回 GC 比例。
pub fn is_low_complexity(seq: &[u8]) -> (bool, f32) {
    if seq.is_empty() {
        return (false, 0.0);
    }
    let mut counts = [0usize; 4];
    for &b in seq {
        match b {
            b'A' => counts[0] += 1,
            b'C' => counts[1] += 1,
            b'G' => counts[2] += 1,
            b'T' => counts[3] += 1,
            _ => {}
        }
    }
    let gc = (counts[1] + counts[2]) as f32 / seq.len() as f32;
    // count / len >= 0.9 without float rounding at the boundary
    let low = counts.iter().any(|&c| c * 10 >= seq.len() * 9);
    (low, gc)
}

/// 最长单碱基连续段长度；N 被跳过，不打断连续段
pub fn max_run(seq: &[u8]) -> usize {
    let mut best = 0;
    let mut run = 0;
    let mut prev: Option<u8> = None;
    for &b in seq {
        if b == b'N' {
            continue;
        }
        if prev == Some(b) {
            run += 1;
        } else {
            run = 1;
            prev = Some(b);
        }
        best = best.max(run);
    }
    best
}

/// 切分片段的接收条件
pub fn accept_fragment(seq: &[u8]) -> bool {
    !is_low_complexity(seq).0 && max_run(seq) * 3 <= seq.len()
}
