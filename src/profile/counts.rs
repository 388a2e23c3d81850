use crate::indel::Indel;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Read counts per indel for a single oligo. Counts are floating point so that
/// measured and predicted profiles share one representation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    counts: HashMap<Indel, f64>,
    representatives: HashMap<Indel, String>,
}

/// One row of a ranked profile: count, indel, percentage of all reads and
/// percentage of mutated reads.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileCount {
    pub count: f64,
    pub indel: Indel,
    pub percent_total: f64,
    pub percent_mutated: f64,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, indel: Indel, count: f64) {
        *self.counts.entry(indel).or_insert(0.0) += count;
    }

    pub fn set(&mut self, indel: Indel, count: f64) {
        self.counts.insert(indel, count);
    }

    pub fn get(&self, indel: &Indel) -> f64 {
        self.counts.get(indel).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, indel: &Indel) -> bool {
        self.counts.contains_key(indel)
    }

    pub fn remove(&mut self, indel: &Indel) -> Option<f64> {
        self.representatives.remove(indel);
        self.counts.remove(indel)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Indel, f64)> {
        self.counts.iter().map(|(indel, &count)| (indel, count))
    }

    pub fn total(&self) -> f64 {
        self.counts.values().sum()
    }

    pub fn null_count(&self) -> f64 {
        self.get(&Indel::null())
    }

    pub fn mutated_total(&self) -> f64 {
        self.iter()
            .filter(|(indel, _)| !indel.is_null())
            .map(|(_, count)| count)
            .sum()
    }

    pub fn set_representative(&mut self, indel: Indel, read: String) {
        self.representatives.insert(indel, read);
    }

    pub fn representative(&self, indel: &Indel) -> Option<&str> {
        self.representatives.get(indel).map(String::as_str)
    }

    /// Indels in emission order: the null indel first, then descending count
    /// with ties broken by descriptor text.
    pub fn ranked(&self) -> Vec<(&Indel, f64)> {
        let mut ranked: Vec<(&Indel, f64)> = self.iter().collect();
        ranked.sort_by(|a, b| rank_order(a.0, a.1, b.0, b.1));
        ranked
    }

    /// Ranked counts with their share of all reads and of mutated reads.
    pub fn profile_counts(&self) -> Vec<ProfileCount> {
        let total = self.total();
        if total == 0.0 {
            return Vec::new();
        }
        let mutated = total - self.null_count();
        self.ranked()
            .into_iter()
            .map(|(indel, count)| {
                let percent_mutated = if mutated != 0.0 {
                    count * 100.0 / mutated
                } else {
                    100.0
                };
                ProfileCount {
                    count,
                    indel: indel.clone(),
                    percent_total: count * 100.0 / total,
                    percent_mutated,
                }
            })
            .collect()
    }

    /// Most frequent non-null indel, or the null indel for an unedited profile.
    pub fn highest_indel(&self) -> Indel {
        self.ranked()
            .into_iter()
            .find(|(indel, _)| !indel.is_null())
            .map(|(indel, _)| indel.clone())
            .unwrap_or_else(Indel::null)
    }
}

pub(crate) fn rank_order(a: &Indel, a_count: f64, b: &Indel, b_count: f64) -> Ordering {
    b.is_null()
        .cmp(&a.is_null())
        .then_with(|| b_count.partial_cmp(&a_count).unwrap_or(Ordering::Equal))
        .then_with(|| a.cmp(b))
}

impl FromIterator<(Indel, f64)> for Profile {
    fn from_iter<I: IntoIterator<Item = (Indel, f64)>>(iter: I) -> Self {
        let mut profile = Profile::new();
        for (indel, count) in iter {
            profile.add(indel, count);
        }
        profile
    }
}

#[cfg(test)]
pub(crate) fn profile_of(entries: &[(&str, f64)]) -> Profile {
    entries
        .iter()
        .map(|(text, count)| (Indel::parse(text).unwrap(), *count))
        .collect()
}
