use crate::cli::ReadsArgs;
use crate::features::{catalog_files, write_reads_table, GenIndelCatalog, SampleProfile};
use crate::model::READS_SUFFIX;
use crate::profile::{read_summary_to_profile, Profile, SummaryFilter};
use crate::utils::{grouped_oligo_path, open_writer, per_oligo_path, Result};
use rayon::{prelude::*, ThreadPoolBuilder};
use std::path::{Path, PathBuf};

pub const SUMMARY_SUFFIX: &str = "_mappedindelsummary.txt";

/// Label of a sample: the last component of its directory.
fn sample_label(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| dir.display().to_string())
}

fn sample_profile(
    sample_dir: &Path,
    oligo_id: &str,
    wild_type_dir: Option<&PathBuf>,
    base_filter: &SummaryFilter,
) -> Result<SampleProfile> {
    let filter = SummaryFilter {
        wild_type: wild_type_dir
            .map(|dir| grouped_oligo_path(dir, oligo_id, SUMMARY_SUFFIX))
            .transpose()?,
        ..base_filter.clone()
    };
    let path = grouped_oligo_path(sample_dir, oligo_id, SUMMARY_SUFFIX)?;
    let mut profile = Profile::new();
    let counts = read_summary_to_profile(&path, &mut profile, oligo_id, &filter)?;
    Ok(SampleProfile {
        label: sample_label(sample_dir),
        profile,
        mutated_reads: counts.mutated_reads(),
    })
}

pub fn reads(args: ReadsArgs) -> Result<()> {
    let files = catalog_files(&args.gen_indel_dir)?;
    let filter = SummaryFilter {
        no_exclude: args.no_exclude,
        remove_long_indels: args.remove_long_indels,
        wild_type: None,
        wt_thresh: args.wt_thresh,
    };
    log::info!(
        "Compiling reads of {} oligos across {} samples",
        files.len(),
        args.sample_dirs.len()
    );

    let pool = ThreadPoolBuilder::new()
        .num_threads(args.num_threads)
        .build()
        .map_err(|e| format!("Failed to build thread pool: {}", e))?;
    pool.install(|| {
        files.par_iter().try_for_each(|(oligo_id, path)| -> Result<()> {
            let catalog = GenIndelCatalog::from_path(path)?;
            let samples = args
                .sample_dirs
                .iter()
                .map(|dir| sample_profile(dir, oligo_id, args.wild_type_dir.as_ref(), &filter))
                .collect::<Result<Vec<_>>>()?;
            let out_path = per_oligo_path(&args.output_dir, oligo_id, READS_SUFFIX)?;
            write_reads_table(open_writer(&out_path)?, &catalog, &samples)
                .map_err(|e| format!("{}: {}", out_path.display(), e))?;
            Ok(())
        })
    })?;
    log::info!("Wrote reads tables to {}", args.output_dir.display());
    Ok(())
}
