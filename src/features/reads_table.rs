use super::catalog::GenIndelCatalog;
use crate::indel::Indel;
use crate::profile::Profile;
use crate::utils::{open_reader, split_tabs, Result};
use itertools::Itertools;
use std::io::{BufRead, Write};
use std::path::Path;

const ALL_MUTATED: &str = "All Mutated";
/// Pseudo-count added to every indel before normalizing sample reads.
const PSEUDO_COUNT: f64 = 0.5;

/// Observed reads of one sample, as contributed to a reads table.
#[derive(Debug, Clone)]
pub struct SampleProfile {
    pub label: String,
    pub profile: Profile,
    pub mutated_reads: f64,
}

/// Writes the per-sample read counts of every catalog indel.
pub fn write_reads_table<W: Write>(
    mut writer: W,
    catalog: &GenIndelCatalog,
    samples: &[SampleProfile],
) -> Result<()> {
    let io_err = |e: std::io::Error| format!("Failed to write reads table: {}", e);
    writeln!(writer, "{}", catalog.header).map_err(io_err)?;
    writeln!(
        writer,
        "Indel\tDetails\t{}",
        samples.iter().map(|s| &s.label).join("\t")
    )
    .map_err(io_err)?;
    writeln!(
        writer,
        "{}\t[]\t{}",
        ALL_MUTATED,
        samples.iter().map(|s| format!("{:.0}", s.mutated_reads)).join("\t")
    )
    .map_err(io_err)?;
    for entry in &catalog.entries {
        let counts = samples
            .iter()
            .map(|s| format!("{:.0}", s.profile.get(&entry.indel)))
            .join("\t");
        writeln!(writer, "{}\t{}\t{}", entry.indel, entry.locations_text, counts)
            .map_err(io_err)?;
    }
    writer.flush().map_err(io_err)?;
    Ok(())
}

/// Read counts per catalog indel and sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadsTable {
    pub samples: Vec<String>,
    pub mutated_reads: Vec<f64>,
    pub rows: Vec<(Indel, Vec<f64>)>,
}

impl ReadsTable {
    pub fn from_path(path: &Path) -> Result<Self> {
        let reader = open_reader(path)?;
        Self::from_reader(reader).map_err(|e| format!("{}: {}", path.display(), e).into())
    }

    pub fn from_reader<B: BufRead>(reader: B) -> Result<Self> {
        let mut lines = reader.lines().skip(1);
        let header = match lines.next() {
            Some(line) => line.map_err(|e| e.to_string())?,
            None => return Err("reads table has no column header".into()),
        };
        let header = split_tabs(&header);
        if header.len() < 2 || header[0] != "Indel" {
            return Err(format!("unexpected reads table header '{}'", header.join("\t")).into());
        }
        let samples: Vec<String> = header[2..].iter().map(|s| s.to_string()).collect();

        let mut table = ReadsTable {
            samples,
            mutated_reads: Vec::new(),
            rows: Vec::new(),
        };
        for (line_number, line) in lines.enumerate() {
            let line = line.map_err(|e| e.to_string())?;
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_tabs(&line);
            if fields.len() != table.samples.len() + 2 {
                return Err(format!(
                    "line {}: expected {} columns, found {}",
                    line_number + 3,
                    table.samples.len() + 2,
                    fields.len()
                )
                .into());
            }
            let counts = fields[2..]
                .iter()
                .map(|c| {
                    c.parse::<f64>()
                        .map_err(|_| format!("line {}: invalid count '{}'", line_number + 3, c))
                })
                .collect::<std::result::Result<Vec<f64>, String>>()?;
            if fields[0] == ALL_MUTATED {
                table.mutated_reads = counts;
            } else {
                table.rows.push((Indel::parse(fields[0])?, counts));
            }
        }
        Ok(table)
    }

    /// Fraction of the selected samples' reads per indel, after adding a
    /// pseudo-count to every indel.
    pub fn sample_fractions(&self, samples: &[String]) -> Result<Vec<(Indel, f64)>> {
        let columns = samples
            .iter()
            .map(|name| {
                self.samples
                    .iter()
                    .position(|s| s == name)
                    .ok_or_else(|| format!("sample '{}' not found in reads table", name))
            })
            .collect::<std::result::Result<Vec<usize>, String>>()?;
        let sums: Vec<f64> = self
            .rows
            .iter()
            .map(|(_, counts)| columns.iter().map(|&c| counts[c]).sum::<f64>() + PSEUDO_COUNT)
            .collect();
        let total: f64 = sums.iter().sum();
        if total == 0.0 {
            return Err("no mutated reads in reads table".into());
        }
        Ok(self
            .rows
            .iter()
            .zip(sums)
            .map(|((indel, _), sum)| (indel.clone(), sum / total))
            .collect())
    }
}
