/// 由后缀数组得到 BWT：bwt[i] = text[sa[i] - 1]（循环）。
/// 读段集合中 read 的首字符前驱为上一条 read 的 `$`。
pub fn build_bwt(text: &[u8], sa: &[u32]) -> Vec<u8> {
    let n = text.len();
    sa.iter()
        .map(|&p| match p as usize {
            0 => text[n - 1],
            i => text[i - 1],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::sa::build_sa;

    #[test]
    fn bwt_of_two_reads() {
        // AC$G$ -> 1 2 0 3 0
        let text = [1u8, 2, 0, 3, 0];
        let sa = build_sa(&text);
        let bwt = build_bwt(&text, &sa);
        assert_eq!(bwt.len(), text.len());
        // BWT 是文本的一个排列
        let mut a = bwt.clone();
        let mut b = text.to_vec();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }
}
