use super::data::DataSource;
use super::lbfgs::{minimize, LbfgsParams};
use super::predict::predicted_profile;
use super::theta::{penalties, Model};
use super::workers::WorkerPool;
use crate::utils::{open_writer, per_oligo_path, Result};
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const PREDICTED_SUMMARY_SUFFIX: &str = "_mappedindelsummary_predicted.txt";

#[derive(Debug, Clone)]
pub struct TrainParams {
    pub reg: f64,
    pub i1_reg: f64,
    pub lbfgs: LbfgsParams,
    pub num_workers: usize,
    pub seed: u64,
}

/// Fitted weights and how the optimization ended.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub model: Model,
    pub objective: f64,
    pub converged: bool,
}

/// Standard normal starting weights from a seeded generator.
pub fn initial_theta(dims: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..dims)
        .map(|_| -> f64 { StandardNormal.sample(&mut rng) })
        .collect()
}

/// Contiguous k-fold split, larger folds first: returns `(train, test)` for `fold`.
pub fn kfold_split(ids: &[String], folds: usize, fold: usize) -> (Vec<String>, Vec<String>) {
    let folds = folds.max(1);
    let (base, extra) = (ids.len() / folds, ids.len() % folds);
    let start = fold * base + fold.min(extra);
    let len = base + usize::from(fold < extra);
    let end = (start + len).min(ids.len());
    let test = ids[start.min(ids.len())..end].to_vec();
    let train = ids[..start.min(ids.len())]
        .iter()
        .chain(&ids[end..])
        .cloned()
        .collect();
    (train, test)
}

/// Fits weights for `columns` on `train_set`, starting from `theta0`.
///
/// The current weights are written to `checkpoint` after every evaluation so
/// an interrupted run can resume from them.
pub fn train_model(
    source: &Arc<DataSource>,
    train_set: &[String],
    columns: &Arc<Vec<String>>,
    theta0: Vec<f64>,
    params: &TrainParams,
    checkpoint: &Path,
) -> Result<TrainedModel> {
    let pool = start_pool(source, train_set, columns, params.num_workers)?;
    log::info!(
        "Training on {} oligos with {} features ({} workers)",
        pool.num_oligos(),
        columns.len(),
        pool.num_workers()
    );
    let reg_weights = penalties(columns, params.reg, params.i1_reg);
    let mut evaluations = 0usize;
    let objective = |theta: &[f64]| -> Result<(f64, Vec<f64>)> {
        let result = pool.evaluate(theta, &reg_weights)?;
        evaluations += 1;
        let (min, max) = result.min_max();
        log::info!(
            "Q={:.5} Min={:.3} Max={:.3} Num={} Lambda={:e} I1_Lambda={:e}",
            result.value,
            min,
            max,
            result.per_oligo.len(),
            params.reg,
            params.i1_reg
        );
        Model::new(columns.to_vec(), theta.to_vec(), train_set.to_vec())?.write_to_path(checkpoint)?;
        Ok((result.value, result.gradient))
    };
    let minimum = minimize(objective, theta0, &params.lbfgs)?;
    log::debug!("{} objective evaluations", evaluations);
    if minimum.converged {
        log::info!("Optimization converged after {} iterations", minimum.iterations);
    } else {
        log::warn!(
            "Optimization did not converge after {} iterations",
            minimum.iterations
        );
    }
    Ok(TrainedModel {
        model: Model::new(columns.to_vec(), minimum.x, train_set.to_vec())?,
        objective: minimum.value,
        converged: minimum.converged,
    })
}

/// Unregularized objective of `model` on `oligo_ids`.
pub fn assess_fit(
    source: &Arc<DataSource>,
    model: &Model,
    oligo_ids: &[String],
    num_workers: usize,
) -> Result<f64> {
    let columns = Arc::new(model.columns.clone());
    let pool = start_pool(source, oligo_ids, &columns, num_workers)?;
    let result = pool.evaluate(&model.theta, &vec![0.0; model.theta.len()])?;
    let (min, max) = result.min_max();
    log::info!(
        "Q={:.5} Min={:.3} Max={:.3} Num={} (unregularized)",
        result.value,
        min,
        max,
        result.per_oligo.len()
    );
    Ok(result.value)
}

fn start_pool(
    source: &Arc<DataSource>,
    oligo_ids: &[String],
    columns: &Arc<Vec<String>>,
    num_workers: usize,
) -> Result<WorkerPool> {
    let (source, load_columns) = (source.clone(), columns.clone());
    WorkerPool::start(oligo_ids, num_workers, columns.len(), move |id| {
        source.load(id, &load_columns)
    })
}

/// Writes the predicted profile of each oligo to
/// `<dir>/Oligos_<n>/<id>_mappedindelsummary_predicted.txt`.
pub fn record_predictions(
    source: &DataSource,
    model: &Model,
    oligo_ids: &[String],
    output_dir: &Path,
) -> Result<()> {
    oligo_ids.par_iter().try_for_each(|oligo_id| -> Result<()> {
        let table = source.load_features(oligo_id, &model.columns)?;
        let profile = predicted_profile(&table, &model.theta);
        let path: PathBuf = per_oligo_path(output_dir, oligo_id, PREDICTED_SUMMARY_SUFFIX)?;
        let mut writer = open_writer(&path)?;
        let io_err = |e: std::io::Error| format!("{}: {}", path.display(), e);
        writeln!(writer, "@@@{}", oligo_id).map_err(io_err)?;
        for row in profile.profile_counts() {
            if row.count >= 1.0 {
                writeln!(writer, "{}\t-\t{}", row.indel, row.count as i64).map_err(io_err)?;
            }
        }
        writer.flush().map_err(io_err)?;
        Ok(())
    })?;
    log::info!(
        "Recorded predicted profiles for {} oligos in {}",
        oligo_ids.len(),
        output_dir.display()
    );
    Ok(())
}
