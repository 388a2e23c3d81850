mod data;
mod lbfgs;
pub(crate) mod objective;
mod predict;
mod theta;
mod train;
mod workers;

pub use data::{read_oligo_ids, DataSource, OligoData, FEATURES_SUFFIX, READS_SUFFIX};
pub use lbfgs::{minimize, LbfgsParams, Minimum};
pub use objective::{evaluate, Objective};
pub use predict::{
    load_prediction_targets, predict_target, predicted_profile, validate_target,
    write_predicted_reads, write_predicted_summary, write_predictions, Prediction,
    PredictionTarget, PREDICTED_READS,
};
pub use theta::{penalties, Model};
pub use train::{
    assess_fit, initial_theta, kfold_split, record_predictions, train_model, TrainParams,
    TrainedModel,
};
pub use workers::{round_robin, WorkerPool};
