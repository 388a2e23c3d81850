//! Assignment of mapped reads to a single indel per read.
//!
//! The external mapper reports, for every read, each background template the
//! read is consistent with together with the indel the read carries relative
//! to that template. Reads consistent with several templates are resolved by
//! preferring an unedited explanation, then by a weighted draw over the
//! templates' library frequencies.

use super::background::BackgroundCatalog;
use super::counts::{rank_order, Profile};
use crate::indel::Indel;
use crate::utils::{oligo_id_from_read_id, split_tabs, Result};
use rand::distr::{weighted::WeightedIndex, Distribution};
use rand::Rng;
use std::collections::HashMap;
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub locus_indel: Indel,
    pub background_indel: Indel,
    pub background_percent: f64,
    pub mutations: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateMapping {
    pub read_id: String,
    pub candidates: Vec<Candidate>,
}

impl CandidateMapping {
    /// Parses one mapper line. Two layouts are accepted:
    ///
    /// * `readId \t bg:locus:percent,... [\t mutations,...]`
    /// * `readId \t template:bg:percent,... \t locus,... \t mutations,... [\t ...]`
    ///   as written by the indel mapper, where trailing columns are ignored.
    ///
    /// Header (`@@@`) and blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        if line.trim().is_empty() || line.starts_with("@@@") {
            return Ok(None);
        }
        let fields = split_tabs(line);
        let read_id = fields[0].to_string();
        let candidate_field = fields.get(1).copied().unwrap_or("");
        if candidate_field.is_empty() {
            return Ok(Some(CandidateMapping {
                read_id,
                candidates: Vec::new(),
            }));
        }

        let entries: Vec<Vec<&str>> = candidate_field
            .split(',')
            .map(|entry| entry.split(':').collect())
            .collect();
        if let Some(bad) = entries.iter().find(|parts| parts.len() != 3) {
            return Err(format!(
                "Read {}: expected three ':'-separated values, found '{}'",
                read_id,
                bad.join(":")
            )
            .into());
        }

        let mapper_layout = fields.len() >= 4;
        let (locus_indels, mutation_field): (Vec<&str>, Option<&str>) = if mapper_layout {
            (fields[2].split(',').collect(), Some(fields[3]))
        } else {
            (
                entries.iter().map(|parts| parts[1]).collect(),
                fields.get(2).copied(),
            )
        };
        let mutations: Vec<&str> = match mutation_field {
            Some(field) if !field.is_empty() => field.split(',').collect(),
            _ => vec!["-"; entries.len()],
        };
        if locus_indels.len() != entries.len() || mutations.len() != entries.len() {
            return Err(format!(
                "Read {}: {} candidates but {} indels and {} mutation entries",
                read_id,
                entries.len(),
                locus_indels.len(),
                mutations.len()
            )
            .into());
        }

        let mut candidates = Vec::with_capacity(entries.len());
        for ((parts, locus), muts) in entries.iter().zip(&locus_indels).zip(&mutations) {
            let background = if mapper_layout { parts[1] } else { parts[0] };
            let background_percent: f64 = parts[2].parse().map_err(|e| {
                format!("Read {}: invalid percentage '{}': {}", read_id, parts[2], e)
            })?;
            candidates.push(Candidate {
                locus_indel: Indel::parse(locus)?,
                background_indel: Indel::parse(background)?,
                background_percent,
                mutations: muts.to_string(),
            });
        }
        Ok(Some(CandidateMapping {
            read_id,
            candidates,
        }))
    }

    pub fn oligo_id(&self) -> &str {
        oligo_id_from_read_id(&self.read_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignedRead {
    pub read_id: String,
    pub mutations: String,
}

/// Reads assigned to one oligo, grouped by indel and then by background template.
#[derive(Debug, Clone)]
pub struct OligoReads {
    oligo_id: String,
    reads: HashMap<Indel, HashMap<Indel, Vec<AssignedRead>>>,
    total: usize,
}

impl OligoReads {
    pub fn new(oligo_id: &str) -> Self {
        OligoReads {
            oligo_id: oligo_id.to_string(),
            reads: HashMap::new(),
            total: 0,
        }
    }

    pub fn oligo_id(&self) -> &str {
        &self.oligo_id
    }

    pub fn add(&mut self, indel: Indel, background: Indel, read: AssignedRead) {
        self.reads
            .entry(indel)
            .or_default()
            .entry(background)
            .or_default()
            .push(read);
        self.total += 1;
    }

    pub fn count(&self, indel: &Indel) -> usize {
        self.reads
            .get(indel)
            .map_or(0, |by_bg| by_bg.values().map(Vec::len).sum())
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Indels in emission order with their read counts.
    pub fn ranked_indels(&self) -> Vec<(&Indel, usize)> {
        let mut ranked: Vec<(&Indel, usize)> =
            self.reads.keys().map(|indel| (indel, self.count(indel))).collect();
        ranked.sort_by(|a, b| rank_order(a.0, a.1 as f64, b.0, b.1 as f64));
        ranked
    }

    /// Supporting reads of an indel grouped by background template, largest group first.
    pub fn by_background(&self, indel: &Indel) -> Vec<(&Indel, &[AssignedRead])> {
        let mut groups: Vec<(&Indel, &[AssignedRead])> = self
            .reads
            .get(indel)
            .map(|by_bg| by_bg.iter().map(|(bg, reads)| (bg, reads.as_slice())).collect())
            .unwrap_or_default();
        groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(b.0)));
        groups
    }

    /// Count profile with one representative read per indel, preferring reads
    /// from an unmutated background template.
    pub fn to_profile(&self) -> Profile {
        let mut profile = Profile::new();
        for (indel, count) in self.ranked_indels() {
            profile.add(indel.clone(), count as f64);
            let groups = self.by_background(indel);
            let clean = groups
                .iter()
                .filter(|(bg, _)| bg.is_null())
                .flat_map(|(_, reads)| reads.iter())
                .find(|read| read.mutations == "-");
            let representative = clean
                .or_else(|| groups.iter().find(|(bg, _)| bg.is_null()).map(|(_, r)| &r[0]))
                .or_else(|| groups.first().map(|(_, r)| &r[0]));
            if let Some(read) = representative {
                profile.set_representative(indel.clone(), read.read_id.clone());
            }
        }
        profile
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    pub reads: usize,
    pub assigned: usize,
    /// Reads with no candidate at all.
    pub unmapped: usize,
    /// Reads whose candidates all reference templates missing from the catalog.
    pub unknown_background: usize,
    /// Ambiguous reads without a usable weight.
    pub zero_weight: usize,
}

impl ReconcileStats {
    pub fn dropped(&self) -> usize {
        self.unmapped + self.unknown_background + self.zero_weight
    }
}

#[derive(Debug)]
pub struct Reconciliation {
    pub oligos: Vec<OligoReads>,
    pub stats: ReconcileStats,
}

pub struct Reconciler<'a, R: Rng> {
    rng: R,
    catalog: Option<&'a BackgroundCatalog>,
    oligos: Vec<OligoReads>,
    index: HashMap<String, usize>,
    stats: ReconcileStats,
}

impl<'a, R: Rng> Reconciler<'a, R> {
    pub fn new(rng: R, catalog: Option<&'a BackgroundCatalog>) -> Self {
        Reconciler {
            rng,
            catalog,
            oligos: Vec::new(),
            index: HashMap::new(),
            stats: ReconcileStats::default(),
        }
    }

    pub fn stats(&self) -> ReconcileStats {
        self.stats
    }

    /// Assigns every read of a mapper output stream.
    pub fn ingest<B: BufRead>(&mut self, reader: B) -> Result<()> {
        for (line_number, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| format!("Failed to read mapping line: {}", e))?;
            let mapping = CandidateMapping::parse(&line)
                .map_err(|e| format!("Mapping line {}: {}", line_number + 1, e))?;
            if let Some(mapping) = mapping {
                self.assign(mapping);
            }
        }
        Ok(())
    }

    /// Assigns a read to one of its candidate indels, returning the chosen
    /// indel or `None` when the read is dropped.
    pub fn assign(&mut self, mapping: CandidateMapping) -> Option<Indel> {
        self.stats.reads += 1;
        let oligo_id = mapping.oligo_id().to_string();
        self.oligo_entry(&oligo_id);
        let mut candidates = mapping.candidates;
        if candidates.is_empty() {
            self.stats.unmapped += 1;
            return None;
        }
        if let Some(catalog) = self.catalog {
            candidates.retain(|c| catalog.contains(&oligo_id, &c.background_indel));
            if candidates.is_empty() {
                log::debug!("{}: no candidate matches a known template", mapping.read_id);
                self.stats.unknown_background += 1;
                return None;
            }
        }

        let Some(chosen) = self.select(&candidates) else {
            log::debug!(
                "{}: ambiguous read without usable template weights, skipping",
                mapping.read_id
            );
            self.stats.zero_weight += 1;
            return None;
        };
        let candidate = candidates.swap_remove(chosen);
        let indel = candidate.locus_indel.clone();
        self.oligo_entry(&oligo_id).add(
            candidate.locus_indel,
            candidate.background_indel,
            AssignedRead {
                read_id: mapping.read_id,
                mutations: candidate.mutations,
            },
        );
        self.stats.assigned += 1;
        Some(indel)
    }

    fn select(&mut self, candidates: &[Candidate]) -> Option<usize> {
        if candidates.len() == 1 {
            return Some(0);
        }
        if let Some(idx) = candidates.iter().position(|c| c.locus_indel.is_null()) {
            return Some(idx);
        }
        let mut eligible: Vec<usize> = (0..candidates.len())
            .filter(|&i| candidates[i].background_indel.is_out_of_guide_seed_pam())
            .collect();
        if eligible.is_empty() {
            eligible = (0..candidates.len()).collect();
        }
        let weights = eligible.iter().map(|&i| candidates[i].background_percent);
        let dist = WeightedIndex::new(weights).ok()?;
        Some(eligible[dist.sample(&mut self.rng)])
    }

    fn oligo_entry(&mut self, oligo_id: &str) -> &mut OligoReads {
        let idx = match self.index.get(oligo_id) {
            Some(&idx) => idx,
            None => {
                self.oligos.push(OligoReads::new(oligo_id));
                self.index.insert(oligo_id.to_string(), self.oligos.len() - 1);
                self.oligos.len() - 1
            }
        };
        &mut self.oligos[idx]
    }

    /// Oligos in order of first appearance.
    pub fn finish(self) -> Reconciliation {
        Reconciliation {
            oligos: self.oligos,
            stats: self.stats,
        }
    }
}
