use crate::cli::FeaturesArgs;
use crate::features::{
    catalog_files, encode_catalog, load_oligo_targets, write_feature_table, GenIndelCatalog,
};
use crate::model::FEATURES_SUFFIX;
use crate::utils::{open_writer, per_oligo_path, Result};
use rayon::{prelude::*, ThreadPoolBuilder};

pub fn features(args: FeaturesArgs) -> Result<()> {
    let targets = load_oligo_targets(&args.oligo_details_path)?;
    let files = catalog_files(&args.gen_indel_dir)?;
    log::info!(
        "Encoding {} generated indel files with {} threads",
        files.len(),
        args.num_threads
    );

    let pool = ThreadPoolBuilder::new()
        .num_threads(args.num_threads)
        .build()
        .map_err(|e| format!("Failed to build thread pool: {}", e))?;
    let locations: usize = pool.install(|| {
        files
            .par_iter()
            .map(|(oligo_id, path)| -> Result<usize> {
                let target = targets
                    .get(oligo_id)
                    .ok_or_else(|| format!("No oligo details for {}", oligo_id))?;
                let catalog = GenIndelCatalog::from_path(path)?;
                let uncut = target.uncut_sequence();
                let cut_site = target.cut_site();
                let rows = encode_catalog(&catalog, &uncut, cut_site, target.orientation);
                let out_path = per_oligo_path(&args.output_dir, oligo_id, FEATURES_SUFFIX)?;
                write_feature_table(
                    open_writer(&out_path)?,
                    &catalog.header,
                    &uncut,
                    cut_site,
                    target.orientation,
                    &rows,
                )
                .map_err(|e| format!("{}: {}", out_path.display(), e))?;
                log::debug!("{}: {} indel locations encoded", oligo_id, rows.len());
                Ok(rows.len())
            })
            .sum::<Result<usize>>()
    })?;
    log::info!(
        "Wrote feature tables for {} oligos ({} indel locations) to {}",
        files.len(),
        locations,
        args.output_dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureTable;
    use std::path::Path;

    const TARGET: &str = "CTGAGTAGCTATGCGGCCAGCAGCGAGACGCTCAGCGTGAAGCGGCAGTATCCCTCTTTCCTGCGCACCATCCCCAATC";

    fn write_inputs(dir: &Path) {
        let gen_dir = dir.join("genindels");
        std::fs::create_dir(&gen_dir).unwrap();
        std::fs::write(
            gen_dir.join("Oligo7_genindels.txt"),
            "@@@Git Commit: test\nD1_L-1R1\t1\t[(38,40,)]\nI1_L-1R0\t1\t[(38,39,'A')]\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("oligos.txt"),
            format!("ID\tTarget\tPAM Location\tPAM Direction\nOligo_7\t{}\t42\tFORWARD\n", TARGET),
        )
        .unwrap();
    }

    #[test]
    fn features_writes_one_table_per_oligo() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());
        features(FeaturesArgs {
            gen_indel_dir: dir.path().join("genindels"),
            oligo_details_path: dir.path().join("oligos.txt"),
            output_dir: dir.path().join("features"),
            num_threads: 2,
        })
        .unwrap();
        let table = FeatureTable::from_path(
            &dir.path().join("features/Oligos_0/Oligo7_gen_indel_features.txt"),
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.cut_site, 39);
    }

    #[test]
    fn features_without_oligo_details_err() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());
        std::fs::write(dir.path().join("oligos.txt"), "ID\tTarget\tPAM Location\tPAM Direction\n").unwrap();
        let result = features(FeaturesArgs {
            gen_indel_dir: dir.path().join("genindels"),
            oligo_details_path: dir.path().join("oligos.txt"),
            output_dir: dir.path().join("features"),
            num_threads: 1,
        });
        assert!(result.is_err());
    }
}
