mod background;
mod counts;
pub mod metrics;
mod reconcile;
mod summary;

pub use background::{BackgroundCatalog, BackgroundTemplate};
pub use counts::{Profile, ProfileCount};
pub use reconcile::{
    AssignedRead, Candidate, CandidateMapping, OligoReads, ReconcileStats, Reconciler,
    Reconciliation,
};
pub use summary::{
    oligo_ids_in_summary, read_summary_to_profile, write_reads, write_summary, SummaryCounts,
    SummaryFilter,
};

#[cfg(test)]
pub(crate) use counts::profile_of;
