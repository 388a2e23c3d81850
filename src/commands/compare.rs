use crate::cli::CompareArgs;
use crate::indel::IndelType;
use crate::profile::metrics::{
    class_symmetric_kl, entropy, first_mismatch_rank, percent_overlap, symmetric_kl,
};
use crate::profile::{oligo_ids_in_summary, read_summary_to_profile, Profile, SummaryFilter};
use crate::utils::{open_writer, Result};
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

const HEADER: &str = "ID\tNum Reads 1\tNum Reads 2\tNum States 1\tNum States 2\t\
Num null reads 1\tNum null reads 2\tKL with Null\tKL without null\tClass KL\t\
Perc Accepted Reads 1\tPerc Accepted Reads 2\t1st Nonmatch Indel\t\
Profile 1 Entropy\tProfile 2 Entropy\tPerc Overlap";

/// Drops insertions longer than one base.
fn without_large_insertions(profile: &Profile) -> Profile {
    profile
        .iter()
        .filter(|(indel, _)| indel.kind() != IndelType::Insertion || indel.size() == 1)
        .map(|(indel, count)| (indel.clone(), count))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
struct Comparison {
    reads: (f64, f64),
    states: (usize, usize),
    null_reads: (f64, f64),
    kl_with_null: f64,
    kl_without_null: f64,
    class_kl: f64,
    percent_accepted: (f64, f64),
    first_mismatch: usize,
    entropy: (f64, f64),
    overlap: f64,
}

fn compare_oligo(first: &Path, second: &Path, oligo_id: &str, keep_large: bool) -> Result<Comparison> {
    let filter = SummaryFilter::default();
    let (mut p1, mut p2) = (Profile::new(), Profile::new());
    let c1 = read_summary_to_profile(first, &mut p1, oligo_id, &filter)?;
    let c2 = read_summary_to_profile(second, &mut p2, oligo_id, &filter)?;
    let states = (p1.len(), p2.len());
    if !keep_large {
        p1 = without_large_insertions(&p1);
        p2 = without_large_insertions(&p2);
    }
    Ok(Comparison {
        reads: (c1.accepted, c2.accepted),
        states,
        null_reads: (c1.null_reads, c2.null_reads),
        kl_with_null: symmetric_kl(&p1, &p2, false),
        kl_without_null: symmetric_kl(&p1, &p2, true),
        class_kl: class_symmetric_kl(&p1, &p2),
        percent_accepted: (c1.percent_accepted, c2.percent_accepted),
        first_mismatch: first_mismatch_rank(&p1, &p2),
        entropy: (entropy(&p1, true), entropy(&p2, true)),
        overlap: percent_overlap(&p1, &p2, true),
    })
}

pub fn compare(args: CompareArgs) -> Result<()> {
    let second_ids: HashSet<String> = oligo_ids_in_summary(&args.second_path)?.into_iter().collect();
    let common: Vec<String> = oligo_ids_in_summary(&args.first_path)?
        .into_iter()
        .filter(|id| second_ids.contains(id))
        .collect();
    log::info!("Comparing {} oligos present in both summaries", common.len());

    let mut writer = open_writer(Path::new(&args.output_path))?;
    let io_err = |e: std::io::Error| format!("{}: {}", args.output_path, e);
    writeln!(writer, "{}", HEADER).map_err(io_err)?;
    for oligo_id in &common {
        let c = compare_oligo(
            &args.first_path,
            &args.second_path,
            oligo_id,
            args.keep_large_insertions,
        )?;
        writeln!(
            writer,
            "{}\t{:.0}\t{:.0}\t{}\t{}\t{:.0}\t{:.0}\t{:.6}\t{:.6}\t{:.6}\t{:.3}\t{:.3}\t{}\t{:.3}\t{:.3}\t{:.3}",
            oligo_id,
            c.reads.0,
            c.reads.1,
            c.states.0,
            c.states.1,
            c.null_reads.0,
            c.null_reads.1,
            c.kl_with_null,
            c.kl_without_null,
            c.class_kl,
            c.percent_accepted.0,
            c.percent_accepted.1,
            c.first_mismatch,
            c.entropy.0,
            c.entropy.1,
            c.overlap
        )
        .map_err(io_err)?;
    }
    writer.flush().map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indel::Indel;
    use crate::profile::profile_of;
    use approx::assert_abs_diff_eq;

    #[test]
    fn large_insertions_are_removed() {
        let profile = profile_of(&[("-", 5.0), ("I1_L-1R0", 3.0), ("I4_L-1R0", 2.0), ("D2_L-2R1", 1.0)]);
        let filtered = without_large_insertions(&profile);
        assert_eq!(filtered.len(), 3);
        assert!(!filtered.contains(&Indel::parse("I4_L-1R0").unwrap()));
    }

    #[test]
    fn compare_writes_one_row_per_shared_oligo() {
        let dir = tempfile::tempdir().unwrap();
        let (first, second) = (dir.path().join("a.txt"), dir.path().join("b.txt"));
        std::fs::write(
            &first,
            "@@@Oligo1\n-\t-\t10\nD2_L-2R1\t-\t6\nI1_L-1R0\t-\t4\n@@@Oligo2\nD1_L-1R1\t-\t3\n",
        )
        .unwrap();
        std::fs::write(&second, "@@@Oligo1\n-\t-\t10\nD2_L-2R1\t-\t6\nI1_L-1R0\t-\t4\n").unwrap();
        let output = dir.path().join("cmp.txt");
        compare(CompareArgs {
            first_path: first.clone(),
            second_path: second.clone(),
            output_path: output.to_string_lossy().to_string(),
            keep_large_insertions: false,
        })
        .unwrap();
        let text = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let fields: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(fields[..7], ["Oligo1", "20", "20", "3", "3", "10", "10"]);

        let c = compare_oligo(&first, &second, "Oligo1", false).unwrap();
        assert_abs_diff_eq!(c.kl_with_null, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c.overlap, 100.0, epsilon = 1e-9);
        assert_eq!(c.first_mismatch, 0);
    }
}
