//! Binary features describing an indel event at a cut site.
//!
//! Every group yields a fixed list of labelled 0/1 values. The full vector is
//! the pairwise products of selected group pairs followed by every group in
//! declaration order, so the label list never depends on the event.

use super::microhomology::{has_left_mh, has_right_mh};
use once_cell::sync::Lazy;

const NTS: [u8; 4] = *b"ATGC";

/// An indel placed on an uncut reference. `left` is the last retained base
/// before the deleted span and `right` the first retained base after it, both
/// absolute positions; insertions have `right == left + 1`.
#[derive(Debug, Clone, Copy)]
pub struct IndelEvent<'a> {
    pub uncut: &'a [u8],
    pub cut_site: i64,
    pub left: i64,
    pub right: i64,
    pub inserted: &'a [u8],
}

impl IndelEvent<'_> {
    fn base(&self, pos: i64) -> Option<u8> {
        usize::try_from(pos).ok().and_then(|p| self.uncut.get(p).copied())
    }

    fn is_insertion(&self) -> bool {
        !self.inserted.is_empty()
    }

    fn deletion_size(&self) -> i64 {
        self.right - self.left - 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    InsSize,
    DelSize,
    DelLoc,
    InsLoc,
    I1or2Rpt,
    InsSeq,
    LocalCutSiteSequence,
    LocalCutSiteSeqMatches,
    LocalRelativeSequence,
    SeqMatches,
    Microhomology,
}

impl Group {
    pub const ALL: [Group; 11] = [
        Group::InsSize,
        Group::DelSize,
        Group::DelLoc,
        Group::InsLoc,
        Group::I1or2Rpt,
        Group::InsSeq,
        Group::LocalCutSiteSequence,
        Group::LocalCutSiteSeqMatches,
        Group::LocalRelativeSequence,
        Group::SeqMatches,
        Group::Microhomology,
    ];

    fn compute(self, event: &IndelEvent, out: &mut GroupValues) {
        match self {
            Group::InsSize => ins_size(event, out),
            Group::DelSize => del_size(event, out),
            Group::DelLoc => del_loc(event, out),
            Group::InsLoc => ins_loc(event, out),
            Group::I1or2Rpt => i1_or_2_rpt(event, out),
            Group::InsSeq => ins_seq(event, out),
            Group::LocalCutSiteSequence => local_cut_site_sequence(event, out),
            Group::LocalCutSiteSeqMatches => local_cut_site_seq_matches(event, out),
            Group::LocalRelativeSequence => local_relative_sequence(event, out),
            Group::SeqMatches => seq_matches(event, out),
            Group::Microhomology => microhomology(event, out),
        }
    }
}

/// Group pairs whose elementwise products are included as `PW_<a>_vs_<b>`.
pub const PAIRWISE: [(Group, Group); 12] = [
    (Group::DelSize, Group::DelLoc),
    (Group::InsSeq, Group::I1or2Rpt),
    (Group::Microhomology, Group::DelSize),
    (Group::Microhomology, Group::DelLoc),
    (Group::LocalRelativeSequence, Group::DelSize),
    (Group::LocalCutSiteSequence, Group::InsSize),
    (Group::SeqMatches, Group::DelSize),
    (Group::LocalRelativeSequence, Group::DelLoc),
    (Group::LocalCutSiteSequence, Group::DelSize),
    (Group::LocalCutSiteSeqMatches, Group::DelSize),
    (Group::LocalCutSiteSequence, Group::I1or2Rpt),
    (Group::LocalCutSiteSeqMatches, Group::I1or2Rpt),
];

/// Values of one group, with labels recorded only when requested.
struct GroupValues {
    values: Vec<bool>,
    labels: Option<Vec<String>>,
}

impl GroupValues {
    fn new(with_labels: bool) -> Self {
        GroupValues {
            values: Vec::new(),
            labels: with_labels.then(Vec::new),
        }
    }

    fn push(&mut self, value: bool, label: impl FnOnce() -> String) {
        self.values.push(value);
        if let Some(labels) = self.labels.as_mut() {
            labels.push(label());
        }
    }

    fn clear_values(&mut self) {
        self.values.iter_mut().for_each(|v| *v = false);
    }
}

fn ins_size(e: &IndelEvent, out: &mut GroupValues) {
    let len = e.inserted.len();
    out.push(len > 0, || "Any Insertion".into());
    out.push(len == 1, || "I1".into());
    out.push(len == 2, || "I2".into());
}

fn del_size(e: &IndelEvent, out: &mut GroupValues) {
    let is_del = !e.is_insertion();
    let dsize = e.deletion_size();
    out.push(is_del, || "Any Deletion".into());
    out.push(is_del && dsize == 1, || "D1".into());
    out.push(is_del && (2..=3).contains(&dsize), || "D2-3".into());
    out.push(is_del && (4..=7).contains(&dsize), || "D4-7".into());
    out.push(is_del && (8..=12).contains(&dsize), || "D8-12".into());
    out.push(is_del && dsize > 12, || "D>12".into());
}

fn del_loc(e: &IndelEvent, out: &mut GroupValues) {
    let l = e.left - e.cut_site;
    let r = e.right - e.cut_site;
    for (lmin, lmax) in [(-1, -1), (-2, -2), (-3, -3), (-4, -6), (-7, -10), (-11, -15), (-16, -30)] {
        out.push(l <= lmin && l >= lmax, || format!("DL{}-{}", lmin, lmax));
    }
    out.push(l < -30, || "DL<-30".into());
    out.push(l >= 0, || "DL>=0".into());
    for (rmin, rmax) in [(0, 0), (1, 1), (2, 2), (3, 5), (6, 9), (10, 14), (15, 29)] {
        out.push((rmin..=rmax).contains(&r), || format!("DR{}-{}", rmin, rmax));
    }
    out.push(r < 0, || "DR<0".into());
    out.push(r >= 30, || "DR=>30".into());
    if e.is_insertion() {
        out.clear_values();
    }
}

fn ins_loc(e: &IndelEvent, out: &mut GroupValues) {
    let l = e.left - e.cut_site;
    for offset in [-1, -2, -3] {
        out.push(l == offset, || format!("IL{}-{}", offset, offset));
    }
    out.push(l < -3, || "IL<-3".into());
    out.push(l >= 0, || "IL>=0".into());
    if !e.is_insertion() {
        out.clear_values();
    }
}

fn i1_or_2_rpt(e: &IndelEvent, out: &mut GroupValues) {
    let at_cut = e.left - e.cut_site == -1;
    let prev = e.base(e.cut_site - 1);
    let repeat_of = |n: usize| prev.is_some_and(|b| e.inserted.len() == n && e.inserted.iter().all(|&x| x == b));
    let len = e.inserted.len();
    out.push(at_cut && repeat_of(1), || "I1Rpt".into());
    out.push(at_cut && len == 1 && !repeat_of(1), || "I1NonRpt".into());
    out.push(at_cut && repeat_of(2), || "I2Rpt".into());
    out.push(at_cut && len == 2 && !repeat_of(2), || "I2NonRpt".into());
    if !e.is_insertion() {
        out.clear_values();
    }
}

fn ins_seq(e: &IndelEvent, out: &mut GroupValues) {
    for nt in NTS {
        out.push(e.inserted == [nt], || format!("I1_{}", nt as char));
        for nt2 in NTS {
            out.push(e.inserted == [nt, nt2], || {
                format!("I2_{}{}", nt as char, nt2 as char)
            });
        }
    }
}

fn local_cut_site_sequence(e: &IndelEvent, out: &mut GroupValues) {
    for offset in -5..=3 {
        let base = e.base(e.cut_site + offset);
        for nt in NTS {
            out.push(base == Some(nt), || format!("CS{}_NT={}", offset, nt as char));
        }
    }
}

fn local_cut_site_seq_matches(e: &IndelEvent, out: &mut GroupValues) {
    for offset1 in -3..=1 {
        for offset2 in -3..offset1 {
            let b1 = e.base(e.cut_site + offset1);
            let b2 = e.base(e.cut_site + offset2);
            for nt in NTS {
                out.push(b1.is_some() && b1 == b2 && b1 == Some(nt), || {
                    format!("M_CS{}_{}_NT={}", offset1, offset2, nt as char)
                });
            }
        }
    }
}

fn local_relative_sequence(e: &IndelEvent, out: &mut GroupValues) {
    for offset in -3..=2 {
        let left_base = e.base(e.left + 1 + offset);
        let right_base = e.base(e.right + offset);
        for nt in NTS {
            out.push(left_base == Some(nt), || format!("L{}_NT={}", offset, nt as char));
            out.push(right_base == Some(nt), || format!("R{}_NT={}", offset, nt as char));
        }
    }
    if e.is_insertion() {
        out.clear_values();
    }
}

fn seq_matches(e: &IndelEvent, out: &mut GroupValues) {
    let len = e.uncut.len() as i64;
    for loffset in -3..=2 {
        for roffset in -3..=2 {
            let pair = if e.left + loffset > 0 && e.right + roffset < len {
                e.base(e.left + loffset + 1).zip(e.base(e.right + roffset))
            } else {
                None
            };
            out.push(pair.is_some_and(|(a, b)| a == b), || {
                format!("M_L{}_R{}", loffset, roffset)
            });
            out.push(pair.is_some_and(|(a, b)| a != b), || {
                format!("X_L{}_R{}", loffset, roffset)
            });
        }
    }
    if e.is_insertion() {
        out.clear_values();
    }
}

fn microhomology(e: &IndelEvent, out: &mut GroupValues) {
    let any_mh = |min: usize, max: usize, mismatches: usize, left_side: bool| {
        (min..=max).any(|mh_len| {
            if left_side {
                has_left_mh(e.left, e.right, e.uncut, mh_len, mismatches)
            } else {
                has_right_mh(e.left, e.right, e.uncut, mh_len, mismatches)
            }
        })
    };
    for (min, max) in [(1, 1), (2, 2), (3, 3), (4, 6), (7, 10), (11, 15)] {
        out.push(any_mh(min, max, 0, true), || format!("L_MH{}-{}", min, max));
        out.push(any_mh(min, max, 0, false), || format!("R_MH{}-{}", min, max));
        if max > 2 {
            out.push(any_mh(min, max, 1, true), || format!("L_MM1_MH{}-{}", min, max));
            out.push(any_mh(min, max, 1, false), || format!("R_MM1_MH{}-{}", min, max));
        }
    }
    let none = !out.values.iter().any(|&v| v);
    out.push(none, || "No MH".into());
    if e.is_insertion() {
        out.clear_values();
    }
}

fn compute_groups(event: &IndelEvent, with_labels: bool) -> Vec<GroupValues> {
    Group::ALL
        .iter()
        .map(|group| {
            let mut values = GroupValues::new(with_labels);
            group.compute(event, &mut values);
            values
        })
        .collect()
}

fn group_index(group: Group) -> usize {
    Group::ALL.iter().position(|&g| g == group).unwrap_or_default()
}

/// Ordered feature labels, identical for every event.
pub static FEATURE_LABELS: Lazy<Vec<String>> = Lazy::new(|| {
    let reference = [b'A'; 40];
    let event = IndelEvent {
        uncut: &reference,
        cut_site: 20,
        left: 18,
        right: 21,
        inserted: b"",
    };
    let groups = compute_groups(&event, true);
    let labels_of = |group: Group| groups[group_index(group)].labels.as_deref().unwrap_or(&[]);
    let mut labels = Vec::new();
    for (a, b) in PAIRWISE {
        for la in labels_of(a) {
            for lb in labels_of(b) {
                labels.push(format!("PW_{}_vs_{}", la, lb));
            }
        }
    }
    for group in Group::ALL {
        labels.extend(labels_of(group).iter().cloned());
    }
    labels
});

/// Feature values of an event, aligned with [`FEATURE_LABELS`].
pub fn feature_values(event: &IndelEvent) -> Vec<bool> {
    let groups = compute_groups(event, false);
    let mut values = Vec::with_capacity(FEATURE_LABELS.len());
    for (a, b) in PAIRWISE {
        let (va, vb) = (&groups[group_index(a)].values, &groups[group_index(b)].values);
        for &x in va {
            values.extend(vb.iter().map(|&y| x && y));
        }
    }
    for group in &groups {
        values.extend_from_slice(&group.values);
    }
    values
}

/// Features of an event as 0/1 values with their labels.
pub fn calculate_features(event: &IndelEvent) -> (Vec<u8>, Vec<String>) {
    let values = feature_values(event).into_iter().map(u8::from).collect();
    (values, FEATURE_LABELS.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const REF: &[u8] = b"CTGAGTAGCTATGCGGCCAGCAGCGAGACGCTCAGCGTGAAGCGGCAGTATCCCTCTTTCCTGCGCACCATCCCCAATC";
    const CUT: i64 = 39;

    fn deletion(left: i64, right: i64) -> IndelEvent<'static> {
        IndelEvent {
            uncut: REF,
            cut_site: CUT,
            left,
            right,
            inserted: b"",
        }
    }

    fn insertion(seq: &'static [u8]) -> IndelEvent<'static> {
        IndelEvent {
            uncut: REF,
            cut_site: CUT,
            left: CUT - 1,
            right: CUT,
            inserted: seq,
        }
    }

    fn group_values(event: &IndelEvent, group: Group) -> Vec<bool> {
        let mut out = GroupValues::new(true);
        group.compute(event, &mut out);
        assert_eq!(out.values.len(), out.labels.as_ref().unwrap().len());
        out.values
    }

    fn active(event: &IndelEvent) -> HashSet<&'static str> {
        feature_values(event)
            .iter()
            .zip(FEATURE_LABELS.iter())
            .filter(|(v, _)| **v)
            .map(|(_, l)| l.as_str())
            .collect()
    }

    #[test]
    fn values_and_labels_have_equal_length() {
        for event in [deletion(36, 40), insertion(b"A"), insertion(b"GT"), deletion(5, 70)] {
            let (values, labels) = calculate_features(&event);
            assert_eq!(values.len(), labels.len());
        }
    }

    #[test]
    fn labels_are_unique() {
        let unique: HashSet<&String> = FEATURE_LABELS.iter().collect();
        assert_eq!(unique.len(), FEATURE_LABELS.len());
    }

    #[test]
    fn group_sizes() {
        let event = deletion(36, 40);
        let sizes: Vec<usize> = Group::ALL
            .iter()
            .map(|&g| group_values(&event, g).len())
            .collect();
        assert_eq!(sizes, vec![3, 6, 18, 5, 4, 20, 36, 40, 48, 72, 21]);
    }

    #[test]
    fn insertion_zeroes_deletion_groups() {
        let event = insertion(b"A");
        for group in [
            Group::DelSize,
            Group::DelLoc,
            Group::LocalRelativeSequence,
            Group::SeqMatches,
            Group::Microhomology,
        ] {
            assert!(group_values(&event, group).iter().all(|v| !v), "{:?}", group);
        }
        let features = active(&event);
        assert!(features.contains("Any Insertion"));
        assert!(features.contains("I1"));
        assert!(features.contains("I1_A"));
        assert!(features.contains("IL-1--1"));
        assert!(!features.iter().any(|l| l.starts_with("PW_D") || l.starts_with("DL")));
    }

    #[test]
    fn deletion_zeroes_insertion_groups() {
        let event = deletion(36, 40);
        for group in [Group::InsSize, Group::InsLoc, Group::I1or2Rpt, Group::InsSeq] {
            assert!(group_values(&event, group).iter().all(|v| !v), "{:?}", group);
        }
        let features = active(&event);
        assert!(features.contains("Any Deletion"));
        assert!(features.contains("D2-3"));
        assert!(features.contains("DL-3--3"));
        assert!(features.contains("DR1-1"));
        assert!(features.contains("PW_D2-3_vs_DL-3--3"));
    }

    #[test]
    fn deletion_size_buckets() {
        let size_label = |left, right| {
            let values = group_values(&deletion(left, right), Group::DelSize);
            ["Any Deletion", "D1", "D2-3", "D4-7", "D8-12", "D>12"]
                .iter()
                .zip(values)
                .filter(|(_, v)| *v)
                .map(|(l, _)| *l)
                .collect::<Vec<_>>()
        };
        assert_eq!(size_label(38, 40), vec!["Any Deletion", "D1"]);
        assert_eq!(size_label(30, 38), vec!["Any Deletion", "D4-7"]);
        assert_eq!(size_label(30, 39), vec!["Any Deletion", "D8-12"]);
        assert_eq!(size_label(20, 40), vec!["Any Deletion", "D>12"]);
    }

    #[test]
    fn repeat_insertions() {
        // base before the cut is REF[38] = 'G'
        assert!(active(&insertion(b"G")).contains("I1Rpt"));
        assert!(active(&insertion(b"T")).contains("I1NonRpt"));
        assert!(active(&insertion(b"GG")).contains("I2Rpt"));
        assert!(active(&insertion(b"GA")).contains("I2NonRpt"));
    }

    #[test]
    fn local_cut_site_sequence_reads_reference() {
        let features = active(&deletion(36, 40));
        // REF[34..43] = "GCGTGAAGC"
        for label in ["CS-5_NT=G", "CS-4_NT=C", "CS0_NT=A", "CS3_NT=C"] {
            assert!(features.contains(label), "{}", label);
        }
        assert!(features.contains("M_CS-1_-3_NT=G"));
        assert!(features.contains("M_CS1_0_NT=A"));
        assert!(!features.contains("M_CS0_-1_NT=A"));
    }

    #[test]
    fn no_mh_flag_for_deletion_without_microhomology() {
        let event = deletion(38, 40);
        let values = group_values(&event, Group::Microhomology);
        assert_eq!(*values.last().unwrap(), values[..values.len() - 1].iter().all(|v| !v));
    }
}
