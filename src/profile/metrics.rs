//! Distances and summary statistics over indel profiles.

use super::counts::{rank_order, Profile};
use crate::indel::{Indel, NULL_INDEL};
use std::collections::{HashMap, HashSet};

/// Pseudo-read count given to an indel missing from one of the two profiles.
pub const MISSING_COUNT: f64 = 0.5;

type Counts<'a> = HashMap<&'a str, f64>;

fn counts_of(profile: &Profile) -> Counts<'_> {
    profile.iter().map(|(indel, count)| (indel.as_str(), count)).collect()
}

/// Counts per indel class (`D2`, `I1`, ...), excluding the null indel.
fn class_counts(profile: &Profile) -> Counts<'_> {
    let mut classes = Counts::new();
    for (indel, count) in profile.iter().filter(|(indel, _)| !indel.is_null()) {
        *classes.entry(indel.class_label()).or_insert(0.0) += count;
    }
    classes
}

fn observed_keys<'a>(counts: &Counts<'a>, ignore_null: bool) -> HashSet<&'a str> {
    counts
        .iter()
        .filter(|&(key, &count)| count > 0.0 && !(ignore_null && *key == NULL_INDEL))
        .map(|(key, _)| *key)
        .collect()
}

fn kl_counts(p1: &Counts, p2: &Counts, ignore_null: bool, missing: f64) -> f64 {
    let p1_keys = observed_keys(p1, ignore_null);
    let p2_keys = observed_keys(p2, ignore_null);
    let p1_only = p1_keys.difference(&p2_keys).count() as f64;
    let p2_only = p2_keys.difference(&p1_keys).count() as f64;

    let p1_total: f64 = p1_keys.iter().map(|k| p1[k]).sum::<f64>() + missing * p2_only;
    let p2_total: f64 = p2_keys.iter().map(|k| p2[k]).sum::<f64>() + missing * p1_only;
    if p1_total <= 0.0 || p2_total <= 0.0 {
        return f64::NAN;
    }
    let (norm1, norm2) = (1.0 / p1_total, 1.0 / p2_total);
    let term = |a: f64, b: f64| a * norm1 * (a * norm1 / (b * norm2)).log2();

    p1_keys
        .union(&p2_keys)
        .map(|key| {
            let a = if p1_keys.contains(key) { p1[key] } else { missing };
            let b = if p2_keys.contains(key) { p2[key] } else { missing };
            term(a, b)
        })
        .sum()
}

/// Kullback-Leibler divergence (log base 2) of `p2` from `p1`.
///
/// Indels seen in only one profile receive `missing` pseudo-reads in the
/// other. With `ignore_null` the null indel takes no part in either the sum
/// or the normalisation. Returns NaN when either total is zero.
pub fn kl(p1: &Profile, p2: &Profile, ignore_null: bool, missing: f64) -> f64 {
    kl_counts(&counts_of(p1), &counts_of(p2), ignore_null, missing)
}

pub fn symmetric_kl(p1: &Profile, p2: &Profile, ignore_null: bool) -> f64 {
    0.5 * kl(p1, p2, ignore_null, MISSING_COUNT) + 0.5 * kl(p2, p1, ignore_null, MISSING_COUNT)
}

/// Symmetric KL between the profiles collapsed to indel classes.
pub fn class_symmetric_kl(p1: &Profile, p2: &Profile) -> f64 {
    let (c1, c2) = (class_counts(p1), class_counts(p2));
    0.5 * kl_counts(&c1, &c2, true, MISSING_COUNT) + 0.5 * kl_counts(&c2, &c1, true, MISSING_COUNT)
}

/// The `n` most frequent non-null indels of a profile.
pub fn limit_profile(profile: &Profile, n: usize) -> Profile {
    profile
        .ranked()
        .into_iter()
        .filter(|(indel, _)| !indel.is_null())
        .take(n)
        .map(|(indel, count)| (indel.clone(), count))
        .collect()
}

pub fn symmetric_class_kl_top_n(p1: &Profile, p2: &Profile, n: usize) -> f64 {
    class_symmetric_kl(&limit_profile(p1, n), &limit_profile(p2, n))
}

fn normaliser(profile: &Profile, ignore_null: bool) -> f64 {
    let total = if ignore_null {
        profile.mutated_total()
    } else {
        profile.total()
    };
    if total > 0.0 {
        1.0 / total
    } else {
        0.0
    }
}

/// Shannon entropy (bits) of the profile's indel distribution.
pub fn entropy(profile: &Profile, ignore_null: bool) -> f64 {
    let norm = normaliser(profile, ignore_null);
    profile
        .iter()
        .filter(|(indel, count)| *count > 0.0 && !(ignore_null && indel.is_null()))
        .map(|(_, count)| {
            let p = count * norm;
            -p * p.log2()
        })
        .sum()
}

/// Percentage of reads shared by the two profiles: the sum over common
/// indels of the smaller of their two frequencies.
pub fn percent_overlap(p1: &Profile, p2: &Profile, ignore_null: bool) -> f64 {
    let norm1 = 100.0 * normaliser(p1, ignore_null);
    let norm2 = 100.0 * normaliser(p2, ignore_null);
    p1.iter()
        .filter(|(indel, _)| !(ignore_null && indel.is_null()))
        .filter(|(indel, _)| p2.contains(indel))
        .map(|(indel, count)| (count * norm1).min(p2.get(indel) * norm2))
        .sum()
}

/// In-frame and frame-shifting mutated read totals.
pub fn frame_counts(profile: &Profile) -> (f64, f64) {
    profile
        .iter()
        .filter(|(indel, _)| !indel.is_null())
        .fold((0.0, 0.0), |(inframe, outframe), (indel, count)| {
            if indel.is_in_frame() {
                (inframe + count, outframe)
            } else {
                (inframe, outframe + count)
            }
        })
}

/// In-frame share of mutated reads, in percent.
pub fn in_frame_percent(profile: &Profile) -> f64 {
    let (inframe, outframe) = frame_counts(profile);
    if inframe + outframe == 0.0 {
        return 0.0;
    }
    inframe * 100.0 / (inframe + outframe)
}

/// One-based rank of the first position at which the non-null indels of the
/// two profiles, each ordered by count, differ. Zero when the shorter ranking
/// is a prefix of the longer.
pub fn first_mismatch_rank(p1: &Profile, p2: &Profile) -> usize {
    let order = |p: &Profile| -> Vec<Indel> {
        let mut ranked: Vec<(&Indel, f64)> = p.iter().filter(|(i, _)| !i.is_null()).collect();
        ranked.sort_by(|a, b| rank_order(a.0, a.1, b.0, b.1));
        ranked.into_iter().map(|(indel, _)| indel.clone()).collect()
    };
    order(p1)
        .iter()
        .zip(order(p2).iter())
        .position(|(a, b)| a != b)
        .map_or(0, |idx| idx + 1)
}
