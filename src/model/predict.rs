use super::theta::Model;
use crate::features::{encode_catalog, FeatureTable, GenIndelCatalog, FEATURE_LABELS};
use crate::indel::Indel;
use crate::profile::{metrics::in_frame_percent, Profile};
use crate::utils::math::{softmax, sparse_dot};
use crate::utils::{open_reader, open_writer, split_tabs, Error, PamOrientation, Result};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Pseudo-reads a predicted profile is scaled to.
pub const PREDICTED_READS: f64 = 1000.0;
/// Predicted counts below this are not written out.
const MIN_WRITTEN_COUNT: f64 = 0.5;

/// Checks that `target` is an A/C/G/T sequence with an NGG PAM at `pam_idx`
/// leaving enough sequence on both sides of the cut site.
pub fn validate_target(target: &str, pam_idx: usize) -> Result<()> {
    let invalid = |msg: &str| Err(Error::InvalidTarget(msg.to_string()));
    if pam_idx + 3 >= target.len() {
        return invalid("PAM idx out of range");
    }
    if let Some(c) = target.chars().find(|c| !matches!(c, 'A' | 'C' | 'G' | 'T')) {
        return Err(Error::InvalidTarget(format!(
            "sequence must be composed of A, C, G or T only (found '{}')",
            c
        )));
    }
    if target.len() < 20 || pam_idx < 13 || pam_idx > target.len() - 7 {
        return invalid(
            "sequence too short or PAM too close to edge of sequence (must have at least 10nt either side of cut site)",
        );
    }
    if &target[pam_idx + 1..pam_idx + 3] != "GG" {
        return invalid("non NGG PAM (check correct index of PAM)");
    }
    Ok(())
}

/// Scores every indel of `table` and scales the resulting distribution to
/// [`PREDICTED_READS`]. The table must be projected onto the model's columns.
pub fn predicted_profile(table: &FeatureTable, theta: &[f64]) -> Profile {
    let scores: Vec<f64> = table.active.iter().map(|a| sparse_dot(theta, a)).collect();
    table
        .indels
        .iter()
        .cloned()
        .zip(softmax(&scores).into_iter().map(|p| p * PREDICTED_READS))
        .collect()
}

/// Predicted outcome profile of one target.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub id: String,
    pub profile: Profile,
    pub in_frame: f64,
}

/// Predicts the profile of `target` from the catalog of indels generated for it.
pub fn predict_target(
    model: &Model,
    id: &str,
    target: &str,
    pam_idx: usize,
    catalog: &GenIndelCatalog,
    add_null: bool,
) -> Result<Prediction> {
    validate_target(target, pam_idx)?;
    let cut_site = pam_idx as i64 - 3;
    let rows = encode_catalog(catalog, target, cut_site, PamOrientation::Forward);
    let table = FeatureTable::from_rows(
        target,
        cut_site,
        PamOrientation::Forward,
        FEATURE_LABELS.clone(),
        &rows,
    )
    .project(&model.columns)?;

    let mut profile = predicted_profile(&table, &model.theta);
    let in_frame = in_frame_percent(&profile);
    for entry in &catalog.entries {
        if let Some(read) = &entry.representative_read {
            profile.set_representative(entry.indel.clone(), read.clone());
        }
    }
    if add_null {
        let left_trim = match catalog.smallest_indel() {
            Some(entry) if entry.indel.size() > 0 => entry
                .representative_read
                .as_deref()
                .and_then(|read| read.get(..read.len().min(10)))
                .and_then(|prefix| target.find(prefix))
                .unwrap_or(0),
            _ => 0,
        };
        profile.set(Indel::null(), PREDICTED_READS);
        profile.set_representative(Indel::null(), target[left_trim..].to_string());
    }
    log::debug!(
        "{}: predicted {} indels, {:.1}% in frame",
        id,
        profile.len(),
        in_frame
    );
    Ok(Prediction {
        id: id.to_string(),
        profile,
        in_frame,
    })
}

/// Writes `indel \t - \t count` rows for predicted counts of at least one half.
pub fn write_predicted_summary<W: Write>(profile: &Profile, writer: &mut W) -> std::io::Result<()> {
    for row in profile.profile_counts() {
        if row.count < MIN_WRITTEN_COUNT {
            continue;
        }
        writeln!(writer, "{}\t-\t{}", row.indel, row.count.round() as i64)?;
    }
    Ok(())
}

/// Writes `rank \t representative read \t indel` rows in summary order.
pub fn write_predicted_reads<W: Write>(profile: &Profile, writer: &mut W) -> std::io::Result<()> {
    let written = profile
        .profile_counts()
        .into_iter()
        .filter(|row| row.count >= MIN_WRITTEN_COUNT);
    for (idx, row) in written.enumerate() {
        let read = profile.representative(&row.indel).unwrap_or("");
        writeln!(writer, "{}\t{}\t{}", idx, read, row.indel)?;
    }
    Ok(())
}

/// Writes `<prefix>_predictedindelsummary.txt` and `<prefix>_predictedreads.txt`.
/// With more than one prediction each is introduced by `@@@<id>\t<in-frame %>`.
pub fn write_predictions(prefix: &str, predictions: &[Prediction]) -> Result<(PathBuf, PathBuf)> {
    let summary_path = PathBuf::from(format!("{}_predictedindelsummary.txt", prefix));
    let reads_path = PathBuf::from(format!("{}_predictedreads.txt", prefix));
    let mut summary = open_writer(&summary_path)?;
    let mut reads = open_writer(&reads_path)?;
    let io_err = |e: std::io::Error| format!("Failed to write predictions for {}: {}", prefix, e);
    for prediction in predictions {
        if predictions.len() > 1 {
            let header = format!("@@@{}\t{:.3}", prediction.id, prediction.in_frame);
            writeln!(summary, "{}", header).map_err(io_err)?;
            writeln!(reads, "{}", header).map_err(io_err)?;
        }
        write_predicted_summary(&prediction.profile, &mut summary).map_err(io_err)?;
        write_predicted_reads(&prediction.profile, &mut reads).map_err(io_err)?;
    }
    summary.flush().map_err(io_err)?;
    reads.flush().map_err(io_err)?;
    Ok((summary_path, reads_path))
}

/// One row of a batch prediction table.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionTarget {
    pub id: String,
    pub target: String,
    pub pam_idx: usize,
    pub catalog: PathBuf,
}

/// Reads a tab-delimited table with `ID`, `Target`, `PAM Index` and `Catalog`
/// columns. Relative catalog paths are resolved against the table's directory.
pub fn load_prediction_targets(path: &Path) -> Result<Vec<PredictionTarget>> {
    let mut lines = open_reader(path)?.lines();
    let header = match lines.next() {
        Some(line) => line.map_err(|e| format!("{}: {}", path.display(), e))?,
        None => return Err(format!("{}: empty target table", path.display()).into()),
    };
    let header = split_tabs(&header);
    let column = |name: &str| {
        header
            .iter()
            .position(|h| *h == name)
            .ok_or_else(|| format!("{}: missing column '{}'", path.display(), name))
    };
    let (id_col, target_col, pam_col, catalog_col) =
        (column("ID")?, column("Target")?, column("PAM Index")?, column("Catalog")?);
    let base = path.parent().unwrap_or_else(|| Path::new(""));

    let mut targets = Vec::new();
    for (line_number, line) in lines.enumerate() {
        let line = line.map_err(|e| format!("{}: {}", path.display(), e))?;
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_tabs(&line);
        let field = |col: usize| {
            fields.get(col).copied().ok_or_else(|| {
                format!("{}:{}: missing column {}", path.display(), line_number + 2, col + 1)
            })
        };
        let pam_idx = field(pam_col)?.parse().map_err(|_| {
            format!("{}:{}: could not parse PAM index", path.display(), line_number + 2)
        })?;
        targets.push(PredictionTarget {
            id: field(id_col)?.to_string(),
            target: field(target_col)?.to_string(),
            pam_idx,
            catalog: base.join(field(catalog_col)?),
        });
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::metrics::symmetric_kl;
    use approx::assert_abs_diff_eq;
    use std::io::Cursor;

    const TARGET: &str = "CTGAGTAGCTATGCGGCCAGCAGCGAGACGCTCAGCGTGAAGCGGCAGTATCCCTCTTTCCTGCGCACCATCCCCAATC";
    const PAM: usize = 42;

    fn catalog() -> GenIndelCatalog {
        let text = "@@@Git Commit: abc\n\
                    D2_L-3R0\t2\t[(36,39,),(37,40,)]\tTAGCTATGCGGCCAGCAGCG\n\
                    I1_L-1R0\t1\t[(38,39,G)]\tGAGTAGCTATGCGGCCAG\n\
                    D1_L-1R1\t1\t[(38,40,)]\tCTGAGTAGCT\n";
        GenIndelCatalog::from_reader(Cursor::new(text)).unwrap()
    }

    fn model_for(columns: &[&str], weights: &[f64]) -> Model {
        Model::new(
            columns.iter().map(|c| c.to_string()).collect(),
            weights.to_vec(),
            vec!["Oligo1".into()],
        )
        .unwrap()
    }

    #[test]
    fn target_validation() {
        assert!(validate_target(TARGET, PAM).is_ok());
        let invalid = |target: &str, pam| matches!(validate_target(target, pam), Err(Error::InvalidTarget(_)));
        assert!(invalid(TARGET, 77));
        assert!(invalid(TARGET, 200));
        assert!(invalid(&TARGET.replace('A', "N"), PAM));
        assert!(invalid(TARGET, 10));
        assert!(invalid(TARGET, 75));
        assert!(invalid(TARGET, 40));
        assert!(invalid("ACGTACGTACGTACGTAGG", 15));
    }

    #[test]
    fn predicted_profile_sums_to_predicted_reads() {
        let model = model_for(&["Any Deletion", "D1", "I1"], &[0.5, 1.0, -0.5]);
        let prediction = predict_target(&model, "guide", TARGET, PAM, &catalog(), false).unwrap();
        assert_abs_diff_eq!(prediction.profile.total(), PREDICTED_READS, epsilon = 1e-9);
        let d1 = Indel::parse("D1_L-1R1").unwrap();
        let d2 = Indel::parse("D2_L-3R0").unwrap();
        let i1 = Indel::parse("I1_L-1R0").unwrap();
        // D1 scores 1.5, D2 0.5, I1 -0.5
        let norm = 1.5f64.exp() + 0.5f64.exp() + (-0.5f64).exp();
        assert_abs_diff_eq!(prediction.profile.get(&d1), 1000.0 * 1.5f64.exp() / norm, epsilon = 1e-9);
        assert_abs_diff_eq!(prediction.profile.get(&d2), 1000.0 * 0.5f64.exp() / norm, epsilon = 1e-9);
        assert_abs_diff_eq!(prediction.in_frame, 0.0, epsilon = 1e-12);
        assert!(prediction.profile.get(&i1) > 0.0);
        assert!(!prediction.profile.contains(&Indel::null()));
        assert_abs_diff_eq!(
            symmetric_kl(&prediction.profile, &prediction.profile, false),
            0.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn null_outcome_is_added_with_trimmed_read() {
        let model = model_for(&["Any Deletion"], &[0.0]);
        let prediction = predict_target(&model, "guide", TARGET, PAM, &catalog(), true).unwrap();
        assert_eq!(prediction.profile.null_count(), PREDICTED_READS);
        // smallest indel is D1_L-1R1, whose read starts at the beginning of the target
        assert_eq!(prediction.profile.representative(&Indel::null()), Some(TARGET));
    }

    #[test]
    fn null_outcome_ignores_unusable_read_prefix() {
        let text = "@@@Git Commit: abc\n\
                    D2_L-3R0\t2\t[(36,39,),(37,40,)]\tTAGCTATGCGGCCAGCAGCG\n\
                    D1_L-1R1\t1\t[(38,40,)]\tCTGAGTAGC\u{c5}TATG\n";
        let catalog = GenIndelCatalog::from_reader(Cursor::new(text)).unwrap();
        let model = model_for(&["Any Deletion"], &[0.0]);
        let prediction = predict_target(&model, "guide", TARGET, PAM, &catalog, true).unwrap();
        assert_eq!(prediction.profile.representative(&Indel::null()), Some(TARGET));
    }

    #[test]
    fn unknown_model_feature_err() {
        let model = model_for(&["Any Deletion", "Not A Feature"], &[0.0, 1.0]);
        assert!(matches!(
            predict_target(&model, "guide", TARGET, PAM, &catalog(), true),
            Err(Error::FeatureMismatch { missing: 1, .. })
        ));
    }

    #[test]
    fn summary_rows_are_rounded_and_thresholded() {
        let mut profile: Profile = [
            (Indel::parse("D1_L-1R1").unwrap(), 10.6),
            (Indel::parse("I1_L-1R0").unwrap(), 0.4),
            (Indel::null(), 1000.0),
        ]
        .into_iter()
        .collect();
        profile.set_representative(Indel::parse("D1_L-1R1").unwrap(), "ACGT".into());
        let mut summary = Vec::new();
        write_predicted_summary(&profile, &mut summary).unwrap();
        assert_eq!(String::from_utf8(summary).unwrap(), "-\t-\t1000\nD1_L-1R1\t-\t11\n");
        let mut reads = Vec::new();
        write_predicted_reads(&profile, &mut reads).unwrap();
        assert_eq!(String::from_utf8(reads).unwrap(), "0\t\t-\n1\tACGT\tD1_L-1R1\n");
    }

    #[test]
    fn batch_outputs_carry_section_headers() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("out").to_string_lossy().to_string();
        let profile: Profile = [(Indel::parse("D1_L-1R1").unwrap(), 5.0)].into_iter().collect();
        let predictions = vec![
            Prediction { id: "g1".into(), profile: profile.clone(), in_frame: 12.5 },
            Prediction { id: "g2".into(), profile, in_frame: 0.0 },
        ];
        let (summary, _) = write_predictions(&prefix, &predictions).unwrap();
        let text = std::fs::read_to_string(summary).unwrap();
        assert_eq!(text, "@@@g1\t12.500\nD1_L-1R1\t-\t5\n@@@g2\t0.000\nD1_L-1R1\t-\t5\n");
    }

    #[test]
    fn prediction_targets_resolve_catalog_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targets.txt");
        std::fs::write(&path, "ID\tTarget\tPAM Index\tCatalog\ng1\tACGT\t42\tg1_genindels.txt\n").unwrap();
        let targets = load_prediction_targets(&path).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].pam_idx, 42);
        assert_eq!(targets[0].catalog, dir.path().join("g1_genindels.txt"));
    }
}
