use crate::cli::TrainArgs;
use crate::model::{
    assess_fit, initial_theta, kfold_split, read_oligo_ids, record_predictions, train_model,
    DataSource, LbfgsParams, Model, TrainParams,
};
use crate::utils::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// `<dir>/tmp_<model file name>_<fold>.txt`, next to the final model.
fn checkpoint_path(output: &Path, fold: usize) -> PathBuf {
    let name = output
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    output.with_file_name(format!("tmp_{}_{}.txt", name, fold))
}

pub fn train(args: TrainArgs) -> Result<()> {
    if args.fold >= args.folds {
        return Err(format!("Fold {} is out of range for {} folds", args.fold, args.folds).into());
    }
    let source = Arc::new(DataSource {
        features_dir: args.features_dir.clone(),
        reads_dir: args.reads_dir.clone(),
        samples: args.samples.clone(),
    });
    let params = TrainParams {
        reg: args.reg,
        i1_reg: args.i1_reg,
        lbfgs: LbfgsParams {
            tolerance: args.tolerance,
            history: args.history,
            max_iterations: args.max_iterations,
        },
        num_workers: args.num_workers,
        seed: args.seed,
    };

    let oligo_ids = read_oligo_ids(&args.oligos_path)?;
    let (mut train_set, test_set) = if args.folds > 1 {
        kfold_split(&oligo_ids, args.folds, args.fold)
    } else {
        (oligo_ids.clone(), Vec::new())
    };
    if train_set.is_empty() {
        return Err("No oligos to train on".into());
    }

    let output = PathBuf::from(&args.output_path);
    let checkpoint = checkpoint_path(&output, args.fold);
    let (columns, theta0) = if args.resume && checkpoint.is_file() {
        let saved = Model::from_path(&checkpoint)?;
        log::info!(
            "Resuming from {} ({} training oligos)",
            checkpoint.display(),
            saved.train_set.len()
        );
        train_set = saved.train_set;
        (saved.columns, saved.theta)
    } else {
        let columns = source.feature_columns(&train_set[0])?;
        let theta0 = initial_theta(columns.len(), params.seed);
        (columns, theta0)
    };
    log::info!(
        "Fold {} of {}: {} training and {} test oligos",
        args.fold + 1,
        args.folds,
        train_set.len(),
        test_set.len()
    );

    let columns = Arc::new(columns);
    let trained = train_model(&source, &train_set, &columns, theta0, &params, &checkpoint)?;
    trained.model.write_to_path(&output)?;
    log::info!(
        "Wrote model to {} (Q={:.5}, converged={})",
        output.display(),
        trained.objective,
        trained.converged
    );
    if let Err(e) = std::fs::remove_file(&checkpoint) {
        log::warn!("Could not remove checkpoint {}: {}", checkpoint.display(), e);
    }

    if !test_set.is_empty() {
        trained.model.check_no_leakage(&test_set)?;
        let test_fit = assess_fit(&source, &trained.model, &test_set, params.num_workers)?;
        log::info!("Test objective: {:.5}", test_fit);
    }

    if let Some(dir) = &args.predicted_dir {
        record_predictions(&source, &trained.model, &train_set, &dir.join("train"))?;
        if !test_set.is_empty() {
            record_predictions(&source, &trained.model, &test_set, &dir.join("test"))?;
        }
    }
    Ok(())
}
