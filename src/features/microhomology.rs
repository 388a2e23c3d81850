/// Bases `[start, end)` of `seq`, or `None` when the range leaves the sequence.
fn window(seq: &[u8], start: i64, end: i64) -> Option<&[u8]> {
    if start < 0 || end > seq.len() as i64 || start > end {
        return None;
    }
    Some(&seq[start as usize..end as usize])
}

/// Microhomology of exactly `mh_len` bases (allowing `mismatches`) ending at the
/// left edge of a deletion: the bases up to `left` repeat the bases up to
/// `right - 1`, and the repeat does not extend one further base to the left.
pub fn has_left_mh(left: i64, right: i64, seq: &[u8], mh_len: usize, mismatches: usize) -> bool {
    let mh = mh_len as i64;
    let (Some(l), Some(r)) = (
        window(seq, left - mh, left + 1),
        window(seq, right - mh - 1, right),
    ) else {
        return false;
    };
    if l.len() != r.len() || l.len() < 2 {
        return false;
    }
    let last = l.len() - 1;
    if l[0] == r[0] || l[last] != r[last] || l[1] != r[1] {
        return false;
    }
    let matches = l[1..].iter().zip(&r[1..]).filter(|(a, b)| a == b).count();
    matches + mismatches == mh_len
}

/// Microhomology of exactly `mh_len` bases starting at the right edge of a
/// deletion: the bases from `left + 1` repeat the bases from `right`, and the
/// repeat does not extend one further base to the right.
pub fn has_right_mh(left: i64, right: i64, seq: &[u8], mh_len: usize, mismatches: usize) -> bool {
    let mh = mh_len as i64;
    let (Some(l), Some(r)) = (
        window(seq, left + 1, left + mh + 2),
        window(seq, right, right + mh + 1),
    ) else {
        return false;
    };
    if l.len() != r.len() || l.len() < 2 {
        return false;
    }
    let last = l.len() - 1;
    if l[last] == r[last] || l[last - 1] != r[last - 1] || l[0] != r[0] {
        return false;
    }
    let matches = l[..last].iter().zip(&r[..last]).filter(|(a, b)| a == b).count();
    matches + mismatches == mh_len
}
