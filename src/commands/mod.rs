pub mod compare;
pub mod features;
pub mod predict;
pub mod reads;
pub mod reconcile;
pub mod train;
