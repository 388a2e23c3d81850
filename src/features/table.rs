use super::encode::FeatureRow;
use crate::indel::Indel;
use crate::utils::{open_reader, split_tabs, Error, PamOrientation, Result};
use std::collections::{BTreeMap, HashMap};
use std::io::BufRead;
use std::path::Path;

const LOCATION_COLUMNS: [&str; 5] = ["Oligo ID", "Indel", "Left", "Right", "Inserted Seq"];

/// Per-indel feature sets of one oligo, with the features of all locations of
/// an indel merged by logical OR. Active features are stored as column indices.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub uncut: String,
    pub cut_site: i64,
    pub orientation: PamOrientation,
    pub columns: Vec<String>,
    /// Indels in descriptor order.
    pub indels: Vec<Indel>,
    pub active: Vec<Vec<u32>>,
}

impl FeatureTable {
    pub fn from_path(path: &Path) -> Result<Self> {
        let reader = open_reader(path)?;
        Self::from_reader(reader).map_err(|e| format!("{}: {}", path.display(), e).into())
    }

    pub fn from_reader<B: BufRead>(reader: B) -> Result<Self> {
        let mut lines = reader.lines();
        let mut next_line = |what: &str| -> Result<String> {
            match lines.next() {
                Some(line) => Ok(line.map_err(|e| e.to_string())?),
                None => Err(format!("feature table is missing its {} line", what).into()),
            }
        };
        next_line("passthrough header")?;
        let (uncut, cut_site, orientation) = parse_site_line(&next_line("###")?)?;
        let header_line = next_line("column header")?;
        let header = split_tabs(&header_line);

        let indel_col = header
            .iter()
            .position(|h| *h == "Indel")
            .ok_or("feature table has no Indel column")?;
        let feature_cols: Vec<usize> = (0..header.len())
            .filter(|&i| !LOCATION_COLUMNS.contains(&header[i]))
            .collect();
        let columns: Vec<String> = feature_cols.iter().map(|&i| header[i].to_string()).collect();

        let mut merged: BTreeMap<Indel, Vec<bool>> = BTreeMap::new();
        for (line_number, line) in lines.enumerate() {
            let line = line.map_err(|e| e.to_string())?;
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_tabs(&line);
            if fields.len() != header.len() {
                return Err(format!(
                    "line {}: expected {} columns, found {}",
                    line_number + 4,
                    header.len(),
                    fields.len()
                )
                .into());
            }
            let indel = Indel::parse(fields[indel_col])?;
            let values = merged
                .entry(indel)
                .or_insert_with(|| vec![false; feature_cols.len()]);
            for (value, &col) in values.iter_mut().zip(&feature_cols) {
                *value |= fields[col] == "1";
            }
        }

        let (indels, active) = merged
            .into_iter()
            .map(|(indel, values)| (indel, active_indices(&values)))
            .unzip();
        Ok(FeatureTable {
            uncut,
            cut_site,
            orientation,
            columns,
            indels,
            active,
        })
    }

    /// Builds a table from encoded location rows, merging rows of the same indel.
    pub fn from_rows(
        uncut: &str,
        cut_site: i64,
        orientation: PamOrientation,
        columns: Vec<String>,
        rows: &[FeatureRow],
    ) -> Self {
        let mut merged: BTreeMap<&Indel, Vec<bool>> = BTreeMap::new();
        for row in rows {
            let values = merged
                .entry(&row.indel)
                .or_insert_with(|| vec![false; columns.len()]);
            for (value, &v) in values.iter_mut().zip(&row.values) {
                *value |= v;
            }
        }
        let (indels, active) = merged
            .into_iter()
            .map(|(indel, values)| (indel.clone(), active_indices(&values)))
            .unzip();
        FeatureTable {
            uncut: uncut.to_string(),
            cut_site,
            orientation,
            columns,
            indels,
            active,
        }
    }

    pub fn len(&self) -> usize {
        self.indels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indels.is_empty()
    }

    /// Re-expresses the active features in the order of `columns`. Every
    /// requested column must exist in this table.
    pub fn project(&self, columns: &[String]) -> Result<FeatureTable> {
        if columns == self.columns.as_slice() {
            return Ok(self.clone());
        }
        let positions: HashMap<&str, usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();
        let missing: Vec<&String> = columns
            .iter()
            .filter(|c| !positions.contains_key(c.as_str()))
            .collect();
        if let Some(example) = missing.first() {
            return Err(Error::FeatureMismatch {
                missing: missing.len(),
                example: example.to_string(),
            });
        }
        let mut remap = vec![None; self.columns.len()];
        for (new_idx, column) in columns.iter().enumerate() {
            remap[positions[column.as_str()]] = Some(new_idx as u32);
        }
        let active = self
            .active
            .iter()
            .map(|features| {
                let mut projected: Vec<u32> =
                    features.iter().filter_map(|&i| remap[i as usize]).collect();
                projected.sort_unstable();
                projected
            })
            .collect();
        Ok(FeatureTable {
            columns: columns.to_vec(),
            active,
            ..self.clone()
        })
    }
}

fn active_indices(values: &[bool]) -> Vec<u32> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v)
        .map(|(i, _)| i as u32)
        .collect()
}

fn parse_site_line(line: &str) -> Result<(String, i64, PamOrientation)> {
    let body = line
        .strip_prefix("###")
        .ok_or_else(|| format!("expected ### site line, found '{}'", line))?;
    let fields = split_tabs(body);
    if fields.len() < 2 {
        return Err(format!("malformed site line '{}'", line).into());
    }
    let cut_site = fields[1]
        .parse()
        .map_err(|_| format!("invalid cut site '{}'", fields[1]))?;
    let orientation = match fields.get(2) {
        Some(dir) => dir.parse()?,
        None => PamOrientation::Forward,
    };
    Ok((fields[0].to_string(), cut_site, orientation))
}

/// Cut site recorded in a feature table, without loading the features.
pub fn cut_site_of(path: &Path) -> Result<i64> {
    let mut lines = open_reader(path)?.lines().skip(1);
    let line = lines
        .next()
        .ok_or_else(|| format!("{}: missing ### site line", path.display()))?
        .map_err(|e| format!("{}: {}", path.display(), e))?;
    Ok(parse_site_line(&line)?.1)
}
