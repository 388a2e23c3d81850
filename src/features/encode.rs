use super::catalog::{GenIndelCatalog, IndelLocation};
use super::groups::{feature_values, IndelEvent, FEATURE_LABELS};
use crate::indel::Indel;
use crate::utils::{reverse_complement, PamOrientation, Result};
use std::io::Write;

/// Features of one location of a catalog indel, in forward-strand coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub indel: Indel,
    pub left: i64,
    pub right: i64,
    pub inserted: String,
    pub values: Vec<bool>,
}

/// Maps a catalog location onto the strand of the guide.
pub fn oriented_location(
    location: &IndelLocation,
    reference_len: usize,
    orientation: PamOrientation,
) -> IndelLocation {
    match orientation {
        PamOrientation::Forward => location.clone(),
        PamOrientation::Reverse => {
            let last = reference_len as i64 - 1;
            IndelLocation {
                left: last - location.right,
                right: last - location.left,
                inserted: reverse_complement(&location.inserted),
            }
        }
    }
}

/// Encodes every location of every catalog indel against `uncut`, which must
/// already be on the guide strand.
pub fn encode_catalog(
    catalog: &GenIndelCatalog,
    uncut: &str,
    cut_site: i64,
    orientation: PamOrientation,
) -> Vec<FeatureRow> {
    let mut rows = Vec::new();
    for entry in &catalog.entries {
        for location in &entry.locations {
            let location = oriented_location(location, uncut.len(), orientation);
            let event = IndelEvent {
                uncut: uncut.as_bytes(),
                cut_site,
                left: location.left,
                right: location.right,
                inserted: location.inserted.as_bytes(),
            };
            rows.push(FeatureRow {
                indel: entry.indel.clone(),
                left: location.left,
                right: location.right,
                values: feature_values(&event),
                inserted: location.inserted,
            });
        }
    }
    rows
}

/// Writes a feature table: passthrough header, `###uncut\tcut\tDIR`, the
/// column header and one 0/1 row per location.
pub fn write_feature_table<W: Write>(
    mut writer: W,
    header: &str,
    uncut: &str,
    cut_site: i64,
    orientation: PamOrientation,
    rows: &[FeatureRow],
) -> Result<()> {
    let io_err = |e: std::io::Error| format!("Failed to write feature table: {}", e);
    writeln!(writer, "{}", header).map_err(io_err)?;
    writeln!(writer, "###{}\t{}\t{}", uncut, cut_site, orientation).map_err(io_err)?;
    writeln!(
        writer,
        "Indel\tLeft\tRight\tInserted Seq\t{}",
        FEATURE_LABELS.join("\t")
    )
    .map_err(io_err)?;
    for row in rows {
        let mut line = format!("{}\t{}\t{}\t{}", row.indel, row.left, row.right, row.inserted);
        line.reserve(row.values.len() * 2 + 1);
        for &value in &row.values {
            line.push('\t');
            line.push(if value { '1' } else { '0' });
        }
        writeln!(writer, "{}", line).map_err(io_err)?;
    }
    writer.flush().map_err(io_err)?;
    Ok(())
}
