use crate::indel::Indel;
use crate::utils::{open_reader, split_tabs, Result};
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// One way of realising an indel on the reference: absolute positions of the
/// last retained base before and the first retained base after the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndelLocation {
    pub left: i64,
    pub right: i64,
    pub inserted: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenIndelEntry {
    pub indel: Indel,
    pub details: String,
    pub locations: Vec<IndelLocation>,
    /// Location list as written in the catalog.
    pub locations_text: String,
    pub representative_read: Option<String>,
}

/// Indels enumerated for a target by the external indel generator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenIndelCatalog {
    /// First line of the catalog, passed through to derived tables.
    pub header: String,
    pub entries: Vec<GenIndelEntry>,
}

impl GenIndelCatalog {
    pub fn from_path(path: &Path) -> Result<Self> {
        let reader = open_reader(path)?;
        Self::from_reader(reader).map_err(|e| format!("{}: {}", path.display(), e).into())
    }

    pub fn from_reader<B: BufRead>(reader: B) -> Result<Self> {
        let mut lines = reader.lines();
        let header = match lines.next() {
            Some(line) => line.map_err(|e| e.to_string())?,
            None => return Err("empty generated indel catalog".into()),
        };
        let mut entries = Vec::new();
        for (line_number, line) in lines.enumerate() {
            let line = line.map_err(|e| e.to_string())?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = parse_entry(&line).map_err(|e| format!("line {}: {}", line_number + 2, e))?;
            entries.push(entry);
        }
        Ok(GenIndelCatalog {
            header: header.trim_end_matches('\r').to_string(),
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Representative read of the smallest indel, ties broken by descriptor.
    pub fn smallest_indel(&self) -> Option<&GenIndelEntry> {
        self.entries
            .iter()
            .min_by(|a, b| (a.indel.size(), &a.indel).cmp(&(b.indel.size(), &b.indel)))
    }
}

/// Catalog files in `dir` keyed by oligo id, the file name up to the first `_`.
pub fn catalog_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = std::fs::read_dir(dir).map_err(|e| format!("{}: {}", dir.display(), e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| format!("{}: {}", dir.display(), e))?.path();
        if !path.is_file() {
            continue;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if let Some(oligo_id) = name.split('_').next().filter(|id| id.starts_with("Oligo")) {
            files.push((oligo_id.to_string(), path.clone()));
        }
    }
    files.sort();
    Ok(files)
}

fn parse_entry(line: &str) -> Result<GenIndelEntry> {
    let fields = split_tabs(line);
    if fields.len() < 3 {
        return Err(format!("expected at least 3 columns, found {}", fields.len()).into());
    }
    let locations = parse_locations(fields[2])?;
    Ok(GenIndelEntry {
        indel: Indel::parse(fields[0])?,
        details: fields[1].to_string(),
        locations,
        locations_text: fields[2].to_string(),
        representative_read: fields
            .get(3)
            .filter(|read| !read.is_empty())
            .map(|read| read.to_string()),
    })
}

/// Parses `[(l,r,SEQ),(l,r,)]`; the inserted sequence may be quoted or absent.
pub fn parse_locations(text: &str) -> Result<Vec<IndelLocation>> {
    let inner = text
        .trim()
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .ok_or_else(|| format!("malformed location list '{}'", text))?;
    let mut locations = Vec::new();
    for tuple in inner.split(')').map(str::trim) {
        let tuple = tuple.trim_start_matches(',').trim();
        if tuple.is_empty() {
            continue;
        }
        let body = tuple
            .strip_prefix('(')
            .ok_or_else(|| format!("malformed location '{}'", tuple))?;
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(format!("malformed location '{}'", tuple).into());
        }
        let coordinate = |s: &str| {
            s.parse::<i64>()
                .map_err(|_| format!("invalid coordinate '{}' in '{}'", s, tuple))
        };
        let inserted = parts
            .get(2)
            .map(|s| s.trim_matches(|c| c == '\'' || c == '"').to_string())
            .unwrap_or_default();
        locations.push(IndelLocation {
            left: coordinate(parts[0])?,
            right: coordinate(parts[1])?,
            inserted,
        });
    }
    Ok(locations)
}
