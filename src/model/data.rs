use crate::features::{FeatureTable, ReadsTable};
use crate::indel::Indel;
use crate::utils::{open_reader, per_oligo_path, Result};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

pub const FEATURES_SUFFIX: &str = "_gen_indel_features.txt";
pub const READS_SUFFIX: &str = "_gen_indel_reads.txt";

/// Features and observed outcome frequencies of the indels of one oligo.
#[derive(Debug, Clone, PartialEq)]
pub struct OligoData {
    pub oligo_id: String,
    pub indels: Vec<Indel>,
    /// Active feature indices per indel, in model column order.
    pub active: Vec<Vec<u32>>,
    /// Observed fraction of mutated reads per indel.
    pub y: Vec<f64>,
}

impl OligoData {
    /// Joins a feature table with read fractions, keeping indels present in both.
    pub fn merge(oligo_id: &str, table: &FeatureTable, fractions: &[(Indel, f64)]) -> Self {
        let by_indel: HashMap<&Indel, f64> = fractions.iter().map(|(i, y)| (i, *y)).collect();
        let mut data = OligoData {
            oligo_id: oligo_id.to_string(),
            indels: Vec::new(),
            active: Vec::new(),
            y: Vec::new(),
        };
        for (indel, active) in table.indels.iter().zip(&table.active) {
            if let Some(&y) = by_indel.get(indel) {
                data.indels.push(indel.clone());
                data.active.push(active.clone());
                data.y.push(y);
            }
        }
        data
    }

    pub fn len(&self) -> usize {
        self.indels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indels.is_empty()
    }
}

/// Where per-oligo feature and reads tables live, and which samples to fit.
#[derive(Debug, Clone)]
pub struct DataSource {
    pub features_dir: PathBuf,
    pub reads_dir: PathBuf,
    pub samples: Vec<String>,
}

impl DataSource {
    pub fn features_path(&self, oligo_id: &str) -> Result<PathBuf> {
        per_oligo_path(&self.features_dir, oligo_id, FEATURES_SUFFIX)
    }

    pub fn reads_path(&self, oligo_id: &str) -> Result<PathBuf> {
        per_oligo_path(&self.reads_dir, oligo_id, READS_SUFFIX)
    }

    /// Feature names of an oligo's feature table.
    pub fn feature_columns(&self, oligo_id: &str) -> Result<Vec<String>> {
        Ok(FeatureTable::from_path(&self.features_path(oligo_id)?)?.columns)
    }

    pub fn load_features(&self, oligo_id: &str, columns: &[String]) -> Result<FeatureTable> {
        FeatureTable::from_path(&self.features_path(oligo_id)?)?.project(columns)
    }

    pub fn load(&self, oligo_id: &str, columns: &[String]) -> Result<OligoData> {
        let table = self.load_features(oligo_id, columns)?;
        let reads_path = self.reads_path(oligo_id)?;
        let fractions = ReadsTable::from_path(&reads_path)?
            .sample_fractions(&self.samples)
            .map_err(|e| format!("{}: {}", reads_path.display(), e))?;
        let data = OligoData::merge(oligo_id, &table, &fractions);
        if data.is_empty() {
            log::warn!("{}: no indels shared by features and reads tables", oligo_id);
        }
        Ok(data)
    }
}

/// Reads oligo ids, one per line.
pub fn read_oligo_ids(path: &Path) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    for line in open_reader(path)?.lines() {
        let line = line.map_err(|e| format!("{}: {}", path.display(), e))?;
        let id = line.trim();
        if !id.is_empty() {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::PamOrientation;

    #[test]
    fn merge_keeps_shared_indels_in_table_order() {
        let indel = |s: &str| Indel::parse(s).unwrap();
        let table = FeatureTable {
            uncut: "ACGT".into(),
            cut_site: 2,
            orientation: PamOrientation::Forward,
            columns: vec!["a".into(), "b".into()],
            indels: vec![indel("D1_L-1R1"), indel("D2_L-2R1"), indel("I1_L-1R0")],
            active: vec![vec![0], vec![1], vec![0, 1]],
        };
        let fractions = vec![(indel("I1_L-1R0"), 0.75), (indel("D1_L-1R1"), 0.25), (indel("D9_L-9R1"), 0.0)];
        let data = OligoData::merge("Oligo1", &table, &fractions);
        assert_eq!(data.indels, vec![indel("D1_L-1R1"), indel("I1_L-1R0")]);
        assert_eq!(data.active, vec![vec![0], vec![0, 1]]);
        assert_eq!(data.y, vec![0.25, 0.75]);
    }

    #[test]
    fn oligo_ids_skip_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.txt");
        std::fs::write(&path, "Oligo1\n\nOligo2\r\n").unwrap();
        assert_eq!(read_oligo_ids(&path).unwrap(), vec!["Oligo1", "Oligo2"]);
    }
}
