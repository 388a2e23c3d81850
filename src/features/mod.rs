mod catalog;
mod encode;
mod groups;
mod microhomology;
mod reads_table;
mod table;
mod targets;

pub use catalog::{catalog_files, parse_locations, GenIndelCatalog, GenIndelEntry, IndelLocation};
pub use encode::{encode_catalog, oriented_location, write_feature_table, FeatureRow};
pub use groups::{calculate_features, feature_values, Group, IndelEvent, FEATURE_LABELS, PAIRWISE};
pub use microhomology::{has_left_mh, has_right_mh};
pub use reads_table::{write_reads_table, ReadsTable, SampleProfile};
pub use table::{cut_site_of, FeatureTable};
pub use targets::{load_oligo_targets, OligoTarget};
