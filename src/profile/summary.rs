use super::counts::Profile;
use super::reconcile::OligoReads;
use crate::indel::Indel;
use crate::utils::{open_reader, split_tabs, Result};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Reads longer than this are removed when long indels are excluded.
const MAX_INDEL_SIZE: u32 = 30;
/// Edits must touch the cut site within this many bases on either side.
const CUT_SPAN_LIMIT: i32 = 5;
/// A wild-type control accepting fewer reads than this (percent) disqualifies the oligo.
const MIN_WILD_TYPE_ACCEPTED_PERCENT: f64 = 10.0;

/// Read filters applied when loading a summary file into a profile.
#[derive(Debug, Clone)]
pub struct SummaryFilter {
    /// Keep every read regardless of background or cut-site span.
    pub no_exclude: bool,
    pub remove_long_indels: bool,
    /// Matching summary file of a wild-type (uncut) control sample.
    pub wild_type: Option<PathBuf>,
    /// Fold-enrichment over the wild-type level required to keep a shared indel.
    pub wt_thresh: f64,
}

impl Default for SummaryFilter {
    fn default() -> Self {
        SummaryFilter {
            no_exclude: false,
            remove_long_indels: false,
            wild_type: None,
            wt_thresh: 3.0,
        }
    }
}

impl SummaryFilter {
    pub fn unfiltered() -> Self {
        SummaryFilter {
            no_exclude: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SummaryCounts {
    pub accepted: f64,
    pub percent_accepted: f64,
    pub null_reads: f64,
}

impl SummaryCounts {
    pub fn mutated_reads(&self) -> f64 {
        self.accepted - self.null_reads
    }
}

/// Writes `@@@<oligo>` sections of `indel \t background \t count` rows.
pub fn write_summary<W: Write>(oligos: &[OligoReads], mut writer: W) -> Result<()> {
    let io_err = |e: std::io::Error| format!("Failed to write summary: {}", e);
    for oligo in oligos {
        writeln!(writer, "@@@{}", oligo.oligo_id()).map_err(io_err)?;
        for (indel, _) in oligo.ranked_indels() {
            for (background, reads) in oligo.by_background(indel) {
                writeln!(writer, "{}\t{}\t{}", indel, background, reads.len()).map_err(io_err)?;
            }
        }
    }
    writer.flush().map_err(io_err)?;
    Ok(())
}

/// Writes `@@@<oligo>` sections of `readId \t indel \t background \t mutations` rows.
pub fn write_reads<W: Write>(oligos: &[OligoReads], mut writer: W) -> Result<()> {
    let io_err = |e: std::io::Error| format!("Failed to write reads: {}", e);
    for oligo in oligos {
        writeln!(writer, "@@@{}", oligo.oligo_id()).map_err(io_err)?;
        for (indel, _) in oligo.ranked_indels() {
            for (background, reads) in oligo.by_background(indel) {
                for read in reads {
                    writeln!(
                        writer,
                        "{}\t{}\t{}\t{}",
                        read.read_id, indel, background, read.mutations
                    )
                    .map_err(io_err)?;
                }
            }
        }
    }
    writer.flush().map_err(io_err)?;
    Ok(())
}

/// Oligo ids in the order their sections appear in a summary file.
pub fn oligo_ids_in_summary(path: &Path) -> Result<Vec<String>> {
    let reader = open_reader(path)?;
    let mut ids = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|e| format!("{}: {}", path.display(), e))?;
        if let Some(header) = line.strip_prefix("@@@") {
            if let Some(id) = header.split_whitespace().next() {
                ids.push(id.to_string());
            }
        }
    }
    Ok(ids)
}

struct SummaryRow {
    indel: Indel,
    background: Indel,
    count: f64,
}

fn read_oligo_rows(path: &Path, oligo_id: &str) -> Result<Vec<SummaryRow>> {
    let reader = open_reader(path)?;
    let mut rows = Vec::new();
    let mut in_section = false;
    for (line_number, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| format!("{}: {}", path.display(), e))?;
        if let Some(header) = line.strip_prefix("@@@") {
            in_section = header.split_whitespace().next() == Some(oligo_id);
            continue;
        }
        if !in_section || line.trim().is_empty() {
            continue;
        }
        let fields = split_tabs(&line);
        if fields.len() < 3 {
            return Err(format!(
                "{}:{}: expected indel, background and count",
                path.display(),
                line_number + 1
            )
            .into());
        }
        let count: f64 = fields[2].parse().map_err(|e| {
            format!(
                "{}:{}: invalid read count '{}': {}",
                path.display(),
                line_number + 1,
                fields[2],
                e
            )
        })?;
        rows.push(SummaryRow {
            indel: Indel::parse(fields[0])?,
            background: Indel::parse(fields[1])?,
            count,
        });
    }
    Ok(rows)
}

/// Adds the reads of one oligo from a summary file to `profile`.
///
/// A missing file contributes nothing and yields zero counts. Unless
/// `no_exclude` is set, reads from unacceptable background templates and
/// edits that do not span the cut site are dropped, and indels also seen in
/// the wild-type control are kept only when sufficiently enriched over it.
pub fn read_summary_to_profile(
    path: &Path,
    profile: &mut Profile,
    oligo_id: &str,
    filter: &SummaryFilter,
) -> Result<SummaryCounts> {
    if !path.is_file() {
        log::warn!("Could not find summary file {}", path.display());
        return Ok(SummaryCounts::default());
    }

    let mut wild_type = Profile::new();
    if let (false, Some(wt_path)) = (filter.no_exclude, &filter.wild_type) {
        if !wt_path.is_file() {
            log::warn!("Could not find wild-type summary {}", wt_path.display());
        } else {
            let wt_filter = SummaryFilter {
                wild_type: None,
                ..filter.clone()
            };
            read_summary_to_profile(wt_path, &mut wild_type, oligo_id, &SummaryFilter::unfiltered())?;
            let wt_counts =
                read_summary_to_profile(wt_path, &mut Profile::new(), oligo_id, &wt_filter)?;
            if wt_counts.percent_accepted < MIN_WILD_TYPE_ACCEPTED_PERCENT {
                log::debug!(
                    "{}: only {:.1}% of wild-type reads accepted, skipping",
                    oligo_id,
                    wt_counts.percent_accepted
                );
                return Ok(SummaryCounts::default());
            }
        }
    }

    let original_null = profile.null_count();
    if !profile.contains(&Indel::null()) {
        profile.set(Indel::null(), 0.0);
    }
    let (mut total, mut accepted) = (0.0, 0.0);
    let mut shared_with_wild_type = Vec::new();
    for row in read_oligo_rows(path, oligo_id)? {
        total += row.count;
        if !filter.no_exclude {
            if !row.background.is_allowable_background() {
                continue;
            }
            let indel = &row.indel;
            if !indel.is_null() {
                if indel.left() > CUT_SPAN_LIMIT || indel.right() < -CUT_SPAN_LIMIT {
                    continue;
                }
                if filter.remove_long_indels && indel.size() > MAX_INDEL_SIZE {
                    continue;
                }
                if wild_type.contains(indel) {
                    shared_with_wild_type.push((row.indel, row.count));
                    continue;
                }
            }
        }
        profile.add(row.indel, row.count);
        accepted += row.count;
    }

    let wt_total = wild_type.total();
    for (indel, count) in shared_with_wild_type {
        if count / total > wild_type.get(&indel) * filter.wt_thresh / wt_total {
            profile.add(indel, count);
            accepted += count;
        }
    }

    let percent_accepted = if total == 0.0 {
        0.0
    } else {
        accepted * 100.0 / total
    };
    Ok(SummaryCounts {
        accepted,
        percent_accepted,
        null_reads: profile.null_count() - original_null,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::reconcile::{AssignedRead, OligoReads};

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn write_summary_orders_rows() {
        let mut oligo = OligoReads::new("Oligo3");
        let read = |id: &str| AssignedRead {
            read_id: id.to_string(),
            mutations: "-".to_string(),
        };
        let d2 = Indel::parse("D2_L-2R1").unwrap();
        oligo.add(d2.clone(), Indel::parse("-_M30").unwrap(), read("a"));
        oligo.add(d2.clone(), Indel::null(), read("b"));
        oligo.add(d2, Indel::null(), read("c"));
        oligo.add(Indel::null(), Indel::null(), read("d"));
        let mut out = Vec::new();
        write_summary(&[oligo.clone()], &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "@@@Oligo3\n-\t-\t1\nD2_L-2R1\t-\t2\nD2_L-2R1\t-_M30\t1\n"
        );
        let mut out = Vec::new();
        write_reads(&[oligo], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 5);
        assert!(text.contains("a\tD2_L-2R1\t-_M30\t-\n"));
    }

    #[test]
    fn missing_summary_is_zero() {
        let mut profile = Profile::new();
        let counts = read_summary_to_profile(
            Path::new("/nonexistent/summary.txt"),
            &mut profile,
            "Oligo1",
            &SummaryFilter::default(),
        )
        .unwrap();
        assert_eq!(counts, SummaryCounts::default());
        assert!(profile.is_empty());
    }

    #[test]
    fn filters_background_and_cut_span() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "sum.txt",
            "@@@Oligo1\n-\t-\t50\nD2_L-2R1\t-\t20\nD2_L-2R1\t-_M-3\t5\n\
             D2_L10R13\t-\t10\nD40_L-20R21\t-\t15\n@@@Oligo2\nD2_L-2R1\t-\t99\n",
        );
        let mut profile = Profile::new();
        let counts =
            read_summary_to_profile(&path, &mut profile, "Oligo1", &SummaryFilter::default())
                .unwrap();
        assert_eq!(counts.accepted, 85.0);
        assert_eq!(counts.null_reads, 50.0);
        assert_eq!(counts.percent_accepted, 85.0);
        assert_eq!(profile.get(&Indel::parse("D2_L-2R1").unwrap()), 20.0);
        assert!(!profile.contains(&Indel::parse("D2_L10R13").unwrap()));

        let mut profile = Profile::new();
        let filter = SummaryFilter {
            remove_long_indels: true,
            ..Default::default()
        };
        let counts = read_summary_to_profile(&path, &mut profile, "Oligo1", &filter).unwrap();
        assert_eq!(counts.accepted, 70.0);

        let mut profile = Profile::new();
        let counts =
            read_summary_to_profile(&path, &mut profile, "Oligo1", &SummaryFilter::unfiltered())
                .unwrap();
        assert_eq!(counts.accepted, 100.0);
    }

    #[test]
    fn wild_type_threshold() {
        let dir = tempfile::tempdir().unwrap();
        // D1 is at 10% in the wild type; the sample has it at 20% (kept at
        // 1.5x, dropped at 3x) and I1 at 40%.
        let wt = write_file(
            dir.path(),
            "wt.txt",
            "@@@Oligo1\n-\t-\t90\nD1_L-1R1\t-\t10\n",
        );
        let sample = write_file(
            dir.path(),
            "sample.txt",
            "@@@Oligo1\n-\t-\t40\nD1_L-1R1\t-\t20\nI1_L-1R0\t-\t40\n",
        );
        let d1 = Indel::parse("D1_L-1R1").unwrap();

        let mut profile = Profile::new();
        let filter = SummaryFilter {
            wild_type: Some(wt.clone()),
            ..Default::default()
        };
        let counts = read_summary_to_profile(&sample, &mut profile, "Oligo1", &filter).unwrap();
        assert_eq!(counts.accepted, 80.0);
        assert!(!profile.contains(&d1));

        let mut profile = Profile::new();
        let filter = SummaryFilter {
            wild_type: Some(wt),
            wt_thresh: 1.5,
            ..Default::default()
        };
        let counts = read_summary_to_profile(&sample, &mut profile, "Oligo1", &filter).unwrap();
        assert_eq!(counts.accepted, 100.0);
        assert_eq!(profile.get(&d1), 20.0);
    }

    #[test]
    fn poor_wild_type_disqualifies_oligo() {
        let dir = tempfile::tempdir().unwrap();
        let wt = write_file(dir.path(), "wt.txt", "@@@Oligo1\n-\t-_M-3\t95\n-\t-\t5\n");
        let sample = write_file(dir.path(), "sample.txt", "@@@Oligo1\n-\t-\t40\n");
        let filter = SummaryFilter {
            wild_type: Some(wt),
            ..Default::default()
        };
        let mut profile = Profile::new();
        let counts = read_summary_to_profile(&sample, &mut profile, "Oligo1", &filter).unwrap();
        assert_eq!(counts, SummaryCounts::default());
    }

    #[test]
    fn profiles_accumulate_across_samples() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "a.txt", "@@@Oligo1\n-\t-\t5\nD2_L-2R1\t-\t3\n");
        let b = write_file(dir.path(), "b.txt", "@@@Oligo1\n-\t-\t7\nD2_L-2R1\t-\t1\n");
        let mut profile = Profile::new();
        let first = read_summary_to_profile(&a, &mut profile, "Oligo1", &SummaryFilter::default())
            .unwrap();
        let second = read_summary_to_profile(&b, &mut profile, "Oligo1", &SummaryFilter::default())
            .unwrap();
        assert_eq!(first.null_reads, 5.0);
        assert_eq!(second.null_reads, 7.0);
        assert_eq!(second.mutated_reads(), 1.0);
        assert_eq!(profile.total(), 16.0);
    }

    #[test]
    fn list_oligo_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "sum.txt", "@@@Oligo1\n-\t-\t5\n@@@Oligo20\n");
        assert_eq!(oligo_ids_in_summary(&path).unwrap(), vec!["Oligo1", "Oligo20"]);
    }
}
