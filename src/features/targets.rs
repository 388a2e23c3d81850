use crate::utils::{open_reader, reverse_complement, split_tabs, PamOrientation, Result};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// Reference details of one synthesized oligo.
#[derive(Debug, Clone, PartialEq)]
pub struct OligoTarget {
    pub id: String,
    pub sequence: String,
    pub pam_loc: usize,
    pub orientation: PamOrientation,
}

impl OligoTarget {
    /// Reference on the strand of the guide: reverse complemented for reverse PAMs.
    pub fn uncut_sequence(&self) -> String {
        match self.orientation {
            PamOrientation::Forward => self.sequence.clone(),
            PamOrientation::Reverse => reverse_complement(&self.sequence),
        }
    }

    /// Cut site in the coordinates of [`OligoTarget::uncut_sequence`].
    pub fn cut_site(&self) -> i64 {
        let pam = self.pam_loc as i64;
        match self.orientation {
            PamOrientation::Forward => pam - 3,
            PamOrientation::Reverse => self.sequence.len() as i64 - pam - 3,
        }
    }
}

const REQUIRED_COLUMNS: [&str; 4] = ["ID", "Target", "PAM Location", "PAM Direction"];

/// Loads a tab-delimited oligo details table keyed by oligo id. Ids are stored
/// without underscores (`Oligo_12` becomes `Oligo12`).
pub fn load_oligo_targets(path: &Path) -> Result<HashMap<String, OligoTarget>> {
    let mut lines = open_reader(path)?.lines();
    let header = match lines.next() {
        Some(line) => line.map_err(|e| format!("{}: {}", path.display(), e))?,
        None => return Err(format!("{}: empty oligo details file", path.display()).into()),
    };
    let header = split_tabs(&header);
    let mut columns = [0usize; 4];
    for (slot, name) in columns.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = header
            .iter()
            .position(|h| *h == name)
            .ok_or_else(|| format!("{}: missing column '{}'", path.display(), name))?;
    }
    let [id_col, target_col, pam_col, dir_col] = columns;

    let mut targets = HashMap::new();
    for (line_number, line) in lines.enumerate() {
        let line = line.map_err(|e| format!("{}: {}", path.display(), e))?;
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_tabs(&line);
        let field = |col: usize| {
            fields.get(col).copied().ok_or_else(|| {
                format!("{}:{}: missing column {}", path.display(), line_number + 2, col + 1)
            })
        };
        let id = field(id_col)?.replace('_', "");
        let pam_loc = field(pam_col)?.parse().map_err(|_| {
            format!("{}:{}: invalid PAM location", path.display(), line_number + 2)
        })?;
        let orientation = field(dir_col)?
            .parse()
            .map_err(|e| format!("{}:{}: {}", path.display(), line_number + 2, e))?;
        targets.insert(
            id.clone(),
            OligoTarget {
                id,
                sequence: field(target_col)?.to_string(),
                pam_loc,
                orientation,
            },
        );
    }
    log::debug!("Loaded {} oligo targets from {}", targets.len(), path.display());
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_and_reverse_cut_sites() {
        let forward = OligoTarget {
            id: "Oligo1".into(),
            sequence: "AACCGGTTAACCGGTTAACC".into(),
            pam_loc: 15,
            orientation: PamOrientation::Forward,
        };
        assert_eq!(forward.cut_site(), 12);
        assert_eq!(forward.uncut_sequence(), forward.sequence);

        let reverse = OligoTarget {
            orientation: PamOrientation::Reverse,
            pam_loc: 2,
            ..forward
        };
        assert_eq!(reverse.cut_site(), 15);
        assert_eq!(reverse.uncut_sequence(), "GGTTAACCGGTTAACCGGTT");
    }

    #[test]
    fn load_targets_by_header_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oligos.txt");
        std::fs::write(
            &path,
            "ID\tGuide\tPAM Location\tPAM Direction\tTarget\n\
             Oligo_5\tAC\t42\tFORWARD\tACGTACGT\n\
             Oligo7\tAC\t30\tREVERSE\tTTTT\n",
        )
        .unwrap();
        let targets = load_oligo_targets(&path).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets["Oligo5"].sequence, "ACGTACGT");
        assert_eq!(targets["Oligo5"].pam_loc, 42);
        assert_eq!(targets["Oligo7"].orientation, PamOrientation::Reverse);
    }

    #[test]
    fn load_targets_missing_column_err() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oligos.txt");
        std::fs::write(&path, "ID\tTarget\nOligo1\tACGT\n").unwrap();
        assert!(load_oligo_targets(&path).is_err());
    }
}
