use crate::indel::Indel;
use crate::utils::{open_reader, split_tabs, PamOrientation, Result};
use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::path::Path;

/// A synthesized template variant of an oligo, as observed in the plasmid library.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundTemplate {
    pub sequence: String,
    pub indel: Indel,
    pub pam_loc: usize,
    pub orientation: PamOrientation,
    pub percent: f64,
}

/// Known background templates per oligo. Candidates referring to a template
/// missing from the catalog are treated as mapping artefacts.
#[derive(Debug, Default)]
pub struct BackgroundCatalog {
    templates: HashMap<String, Vec<BackgroundTemplate>>,
    indels: HashMap<String, HashSet<Indel>>,
}

impl BackgroundCatalog {
    pub fn from_path(path: &Path) -> Result<Self> {
        let reader = open_reader(path)?;
        let mut catalog = BackgroundCatalog::default();
        let mut oligo_id: Option<String> = None;
        for (line_number, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| format!("{}: {}", path.display(), e))?;
            if line.trim().is_empty() {
                continue;
            }
            if let Some(header) = line.strip_prefix("@@@") {
                oligo_id = header.split_whitespace().next().map(str::to_string);
                continue;
            }
            let Some(id) = oligo_id.as_ref() else {
                return Err(format!(
                    "{}:{}: template listed before any @@@ oligo header",
                    path.display(),
                    line_number + 1
                )
                .into());
            };
            let template = parse_template(&line).map_err(|e| {
                format!("{}:{}: {}", path.display(), line_number + 1, e)
            })?;
            catalog.insert(id, template);
        }
        log::debug!(
            "Loaded background templates for {} oligos from {}",
            catalog.templates.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn insert(&mut self, oligo_id: &str, template: BackgroundTemplate) {
        self.indels
            .entry(oligo_id.to_string())
            .or_default()
            .insert(template.indel.clone());
        self.templates
            .entry(oligo_id.to_string())
            .or_default()
            .push(template);
    }

    pub fn contains(&self, oligo_id: &str, indel: &Indel) -> bool {
        self.indels
            .get(oligo_id)
            .is_some_and(|indels| indels.contains(indel))
    }

    pub fn templates(&self, oligo_id: &str) -> &[BackgroundTemplate] {
        self.templates.get(oligo_id).map_or(&[], Vec::as_slice)
    }
}

fn parse_template(line: &str) -> Result<BackgroundTemplate> {
    let fields = split_tabs(line);
    if fields.len() < 5 {
        return Err(format!("expected 5 fields, found {}", fields.len()).into());
    }
    Ok(BackgroundTemplate {
        sequence: fields[0].to_string(),
        indel: Indel::parse(fields[1])?,
        pam_loc: fields[2]
            .parse()
            .map_err(|e| format!("invalid PAM location '{}': {}", fields[2], e))?,
        orientation: fields[3].parse()?,
        percent: fields[4]
            .parse()
            .map_err(|e| format!("invalid percentage '{}': {}", fields[4], e))?,
    })
}
