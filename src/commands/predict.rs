use crate::cli::PredictArgs;
use crate::features::GenIndelCatalog;
use crate::model::{
    load_prediction_targets, predict_target, write_predictions, Model, Prediction,
    PredictionTarget,
};
use crate::utils::Result;
use rayon::{prelude::*, ThreadPoolBuilder};

fn predict_one(model: &Model, target: &PredictionTarget, add_null: bool) -> Result<Prediction> {
    let catalog = GenIndelCatalog::from_path(&target.catalog)?;
    predict_target(
        model,
        &target.id,
        &target.target,
        target.pam_idx,
        &catalog,
        add_null,
    )
    .map_err(|e| match e {
        crate::utils::Error::Msg(msg) => format!("{}: {}", target.id, msg).into(),
        other => other,
    })
}

fn targets_from_args(args: &PredictArgs) -> Result<Vec<PredictionTarget>> {
    if let Some(path) = &args.batch_path {
        return load_prediction_targets(path);
    }
    match (&args.target, args.pam_idx, &args.catalog_path) {
        (Some(target), Some(pam_idx), Some(catalog)) => Ok(vec![PredictionTarget {
            id: args.id.clone(),
            target: target.to_ascii_uppercase(),
            pam_idx,
            catalog: catalog.clone(),
        }]),
        _ => Err("A single target needs --target, --pam-idx and --catalog".into()),
    }
}

pub fn predict(args: PredictArgs) -> Result<()> {
    let model = Model::from_path(&args.model_path)?;
    let targets = targets_from_args(&args)?;
    log::info!(
        "Predicting {} targets with {} features",
        targets.len(),
        model.columns.len()
    );

    let pool = ThreadPoolBuilder::new()
        .num_threads(args.num_threads)
        .build()
        .map_err(|e| format!("Failed to build thread pool: {}", e))?;
    let predictions = pool.install(|| {
        targets
            .par_iter()
            .map(|target| predict_one(&model, target, args.add_null))
            .collect::<Result<Vec<_>>>()
    })?;

    let (summary, reads) = write_predictions(&args.output_prefix, &predictions)?;
    log::info!(
        "Wrote {} and {}",
        summary.display(),
        reads.display()
    );
    Ok(())
}
