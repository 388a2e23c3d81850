use crate::utils::Result;
use std::path::{Path, PathBuf};

/// Oligos are grouped on disk in directories of one thousand and files of fifty.
const OLIGOS_PER_DIR: usize = 1000;
const OLIGOS_PER_FILE: usize = 50;

/// Numeric index of an oligo id such as `Oligo12345` or `Oligo_12345`.
pub fn oligo_index(oligo_id: &str) -> Result<usize> {
    let compact = oligo_id.replace('_', "");
    compact
        .strip_prefix("Oligo")
        .and_then(|idx| idx.parse().ok())
        .ok_or_else(|| format!("Invalid oligo id: {}", oligo_id).into())
}

/// Directory and file stem that hold a given oligo, e.g. `(Oligos_12, Oligos_12300-12349)`.
pub fn oligo_file_location(oligo_idx: usize) -> (String, String) {
    let first = (oligo_idx / OLIGOS_PER_FILE) * OLIGOS_PER_FILE;
    let last = first + OLIGOS_PER_FILE - 1;
    (
        format!("Oligos_{}", oligo_idx / OLIGOS_PER_DIR),
        format!("Oligos_{}-{}", first, last),
    )
}

/// Per-oligo file inside a data directory: `<dir>/Oligos_<n>/<oligo_id><suffix>`.
pub fn per_oligo_path(dir: &Path, oligo_id: &str, suffix: &str) -> Result<PathBuf> {
    let (subdir, _) = oligo_file_location(oligo_index(oligo_id)?);
    Ok(dir.join(subdir).join(format!("{}{}", oligo_id, suffix)))
}

/// Summary file of the oligo's block of fifty inside a sample directory:
/// `<dir>/Oligos_<n>/Oligos_<first>-<last><suffix>`.
pub fn grouped_oligo_path(dir: &Path, oligo_id: &str, suffix: &str) -> Result<PathBuf> {
    let (subdir, stem) = oligo_file_location(oligo_index(oligo_id)?);
    Ok(dir.join(subdir).join(format!("{}{}", stem, suffix)))
}

/// Oligo id from a read id of the form `<oligo_id>.<read_name>`.
pub fn oligo_id_from_read_id(read_id: &str) -> &str {
    read_id.split('.').next().unwrap_or(read_id)
}
