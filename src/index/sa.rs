/// 构建后缀数组（前缀倍增法，每轮按 (rank[i], rank[i+k]) 排序）。
/// 输入为数值化的读段集合文本（0:$,1:A,2:C,3:G,4:T,5:N），
/// 每条 read 以 0 结尾；多个 0 的相对顺序由其后续文本决定。
pub fn build_sa(text: &[u8]) -> Vec<u32> {
    let n = text.len();
    if n == 0 {
        return Vec::new();
    }
    let mut sa: Vec<usize> = (0..n).collect();
    let mut rank: Vec<i64> = text.iter().map(|&b| b as i64).collect();
    let mut next_rank: Vec<i64> = vec![0; n];

    let mut k = 1usize;
    loop {
        let key = |i: usize| (rank[i], if i + k < n { rank[i + k] } else { -1 });
        sa.sort_unstable_by_key(|&i| key(i));

        next_rank[sa[0]] = 0;
        for w in 1..n {
            let bump = if key(sa[w]) != key(sa[w - 1]) { 1 } else { 0 };
            next_rank[sa[w]] = next_rank[sa[w - 1]] + bump;
        }
        std::mem::swap(&mut rank, &mut next_rank);

        // 所有秩互不相同即排序完成
        if rank[sa[n - 1]] as usize == n - 1 || k >= n {
            break;
        }
        k <<= 1;
    }

    sa.into_iter().map(|x| x as u32).collect()
}
