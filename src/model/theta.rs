use crate::utils::{open_reader, open_writer, split_tabs, Error, Result};
use itertools::Itertools;
use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::path::Path;

/// Trained weights, one per named feature, plus the oligos they were fit on.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub columns: Vec<String>,
    pub theta: Vec<f64>,
    pub train_set: Vec<String>,
}

impl Model {
    pub fn new(columns: Vec<String>, theta: Vec<f64>, train_set: Vec<String>) -> Result<Self> {
        if columns.len() != theta.len() {
            return Err(format!(
                "Model has {} feature names but {} weights",
                columns.len(),
                theta.len()
            )
            .into());
        }
        Ok(Model {
            columns,
            theta,
            train_set,
        })
    }

    /// Reads a model file: comma-separated training ids, then `name \t weight` lines.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut lines = open_reader(path)?.lines();
        let first = match lines.next() {
            Some(line) => line.map_err(|e| format!("{}: {}", path.display(), e))?,
            None => return Err(format!("{}: empty model file", path.display()).into()),
        };
        let train_set = first
            .trim_end_matches(['\r', '\n'])
            .split(',')
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        let (mut columns, mut theta) = (Vec::new(), Vec::new());
        for (line_number, line) in lines.enumerate() {
            let line = line.map_err(|e| format!("{}: {}", path.display(), e))?;
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_tabs(&line);
            let weight = match fields.as_slice() {
                [_, weight] => weight.parse::<f64>().ok(),
                _ => None,
            }
            .ok_or_else(|| {
                format!(
                    "{}:{}: expected 'feature<TAB>weight', found '{}'",
                    path.display(),
                    line_number + 2,
                    line
                )
            })?;
            columns.push(fields[0].to_string());
            theta.push(weight);
        }
        log::debug!(
            "Loaded {} weights trained on {} oligos from {}",
            theta.len(),
            first.split(',').count(),
            path.display()
        );
        Model::new(columns, theta, train_set)
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        let io_err = |e: std::io::Error| format!("Failed to write model: {}", e);
        writeln!(writer, "{}", self.train_set.iter().join(",")).map_err(io_err)?;
        for (name, weight) in self.columns.iter().zip(&self.theta) {
            writeln!(writer, "{}\t{}", name, weight).map_err(io_err)?;
        }
        writer.flush().map_err(io_err)?;
        Ok(())
    }

    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        self.write(open_writer(path)?)
    }

    /// Fails if any of `oligo_ids` was used for training.
    pub fn check_no_leakage<'a>(&self, oligo_ids: impl IntoIterator<Item = &'a String>) -> Result<()> {
        let trained: HashSet<&str> = self.train_set.iter().map(String::as_str).collect();
        match oligo_ids.into_iter().find(|id| trained.contains(id.as_str())) {
            Some(id) => Err(Error::TrainTestLeakage(id.clone())),
            None => Ok(()),
        }
    }
}

/// Squared-weight penalty per feature: `i1_reg` for names containing `I`,
/// `reg` otherwise.
pub fn penalties(columns: &[String], reg: f64, i1_reg: f64) -> Vec<f64> {
    columns
        .iter()
        .map(|name| if name.contains('I') { i1_reg } else { reg })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> Model {
        Model::new(
            vec!["Any Deletion".into(), "I1_A".into()],
            vec![0.25, -1.5],
            vec!["Oligo1".into(), "Oligo2".into()],
        )
        .unwrap()
    }

    #[test]
    fn model_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.txt");
        model().write_to_path(&path).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Oligo1,Oligo2\nAny Deletion\t0.25\nI1_A\t-1.5\n"
        );
        assert_eq!(Model::from_path(&path).unwrap(), model());
    }

    #[test]
    fn malformed_weight_err() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.txt");
        std::fs::write(&path, "Oligo1\nAny Deletion\tabc\n").unwrap();
        assert!(Model::from_path(&path).is_err());
    }

    #[test]
    fn mismatched_lengths_err() {
        assert!(Model::new(vec!["a".into()], vec![], vec![]).is_err());
    }

    #[test]
    fn leakage_is_detected() {
        let model = model();
        let test_set = vec!["Oligo3".to_string(), "Oligo2".to_string()];
        assert_eq!(
            model.check_no_leakage(&test_set),
            Err(Error::TrainTestLeakage("Oligo2".into()))
        );
        assert!(model.check_no_leakage(&vec!["Oligo9".to_string()]).is_ok());
    }

    #[test]
    fn insertion_features_use_their_own_penalty() {
        let columns = vec!["Any Deletion".to_string(), "I1_A".to_string(), "PW_D1_vs_DL-1--1".to_string()];
        assert_eq!(penalties(&columns, 0.1, 0.01), vec![0.1, 0.01, 0.1]);
    }
}
