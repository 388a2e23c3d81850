use crate::cli::ReconcileArgs;
use crate::profile::{write_reads, write_summary, BackgroundCatalog, Reconciler};
use crate::utils::{create_writer, format_number_with_commas, open_reader, open_writer, Result};
use rand::{rngs::StdRng, SeedableRng};
use std::path::Path;

const SUMMARY_SUFFIX: &str = "_mappedindelsummary.txt";
const READS_SUFFIX: &str = "_mappedindelreads.txt";

pub fn reconcile(args: ReconcileArgs) -> Result<()> {
    let catalog = args
        .background_path
        .as_deref()
        .map(BackgroundCatalog::from_path)
        .transpose()?;

    let mut reconciler = Reconciler::new(StdRng::seed_from_u64(args.seed), catalog.as_ref());
    for path in &args.mapping_paths {
        if !path.is_file() {
            log::warn!("Could not find mapping file {}", path.display());
            continue;
        }
        log::info!("Reconciling mappings in {}", path.display());
        reconciler.ingest(open_reader(path)?)?;
    }
    let result = reconciler.finish();
    let stats = result.stats;
    log::info!(
        "Assigned {} of {} reads to {} oligos",
        format_number_with_commas(stats.assigned),
        format_number_with_commas(stats.reads),
        result.oligos.len()
    );
    if stats.dropped() > 0 {
        log::warn!(
            "Dropped {} reads: unmapped={} unknown_background={} zero_weight={}",
            format_number_with_commas(stats.dropped()),
            stats.unmapped,
            stats.unknown_background,
            stats.zero_weight
        );
    }

    create_writer(&args.output_prefix, SUMMARY_SUFFIX, |path| {
        write_summary(&result.oligos, open_writer(Path::new(path))?)
    })?;
    if args.write_reads {
        create_writer(&args.output_prefix, READS_SUFFIX, |path| {
            write_reads(&result.oligos, open_writer(Path::new(path))?)
        })?;
    }
    Ok(())
}
