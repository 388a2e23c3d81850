//! Compact textual indel descriptors, e.g. `D2_L-3C1R0` or `I1_L-1R0_M-21`.
//!
//! A descriptor is identified by its text: two descriptors are equal exactly
//! when their strings match, and they order lexicographically.

use super::mutation::{format_mutations, parse_mutations, PointMutation};
use super::tokens::tokenize;
use crate::utils::{Error, Result};
use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

pub const NULL_INDEL: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndelType {
    #[default]
    None,
    Insertion,
    Deletion,
}

impl IndelType {
    fn symbol(&self) -> char {
        match self {
            IndelType::None => '-',
            IndelType::Insertion => 'I',
            IndelType::Deletion => 'D',
        }
    }
}

/// Field values used to construct a descriptor programmatically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndelParts {
    pub kind: IndelType,
    pub size: u32,
    pub left: i32,
    pub right: i32,
    pub central: u32,
    pub inserted: u32,
    pub deleted: u32,
    pub mutations: Vec<PointMutation>,
}

#[derive(Debug, Clone)]
pub struct Indel {
    text: String,
    parts: IndelParts,
}

impl Indel {
    pub fn null() -> Self {
        Indel {
            text: NULL_INDEL.to_string(),
            parts: IndelParts::default(),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let malformed = |reason: String| Error::MalformedIndel {
            text: text.to_string(),
            reason,
        };

        let fields: Vec<&str> = text.split('_').collect();
        let type_field = fields[0];
        let (kind, size) = match type_field.as_bytes().first() {
            Some(b'-') if type_field.len() == 1 => (IndelType::None, 0),
            Some(&letter @ (b'I' | b'D')) => {
                let size: u32 = type_field[1..]
                    .parse()
                    .map_err(|_| malformed(format!("invalid size '{}'", &type_field[1..])))?;
                let kind = if letter == b'I' {
                    IndelType::Insertion
                } else {
                    IndelType::Deletion
                };
                (kind, size)
            }
            _ => return Err(malformed(format!("unknown indel type '{}'", type_field))),
        };

        let mut parts = IndelParts {
            kind,
            size,
            ..Default::default()
        };

        let mutation_field = match (kind, fields.len()) {
            (IndelType::None, 1) => None,
            (IndelType::None, 2) => Some(fields[1]),
            (IndelType::None, _) => return Err(malformed("too many fields".to_string())),
            (_, 2) => {
                parse_details(fields[1], &mut parts).map_err(malformed)?;
                None
            }
            (_, 3) => {
                parse_details(fields[1], &mut parts).map_err(malformed)?;
                Some(fields[2])
            }
            (_, 1) => return Err(malformed("missing L/R details".to_string())),
            _ => return Err(malformed("too many fields".to_string())),
        };

        let mut canonical = fields[..fields.len().min(2)].join("_");
        if kind == IndelType::None {
            canonical = NULL_INDEL.to_string();
        }
        if let Some(field) = mutation_field {
            parts.mutations = parse_mutations(field).map_err(malformed)?;
            if !parts.mutations.is_empty() {
                canonical = format!("{}_{}", canonical, field);
            }
        }

        Ok(Indel {
            text: canonical,
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> IndelType {
        self.parts.kind
    }

    pub fn is_null(&self) -> bool {
        self.parts.kind == IndelType::None
    }

    pub fn size(&self) -> u32 {
        self.parts.size
    }

    pub fn left(&self) -> i32 {
        self.parts.left
    }

    pub fn right(&self) -> i32 {
        self.parts.right
    }

    pub fn central(&self) -> u32 {
        self.parts.central
    }

    pub fn inserted(&self) -> u32 {
        self.parts.inserted
    }

    pub fn deleted(&self) -> u32 {
        self.parts.deleted
    }

    pub fn mutations(&self) -> &[PointMutation] {
        &self.parts.mutations
    }

    /// Size net of the secondary operation of a compound event.
    pub fn net_size(&self) -> i64 {
        self.parts.size as i64 - self.parts.inserted as i64 - self.parts.deleted as i64
    }

    pub fn is_in_frame(&self) -> bool {
        self.net_size() % 3 == 0
    }

    /// Type and size without location details, e.g. `D2` for `D2_L-3R0`.
    pub fn class_label(&self) -> &str {
        self.text.split('_').next().unwrap_or(&self.text)
    }
}

fn parse_details(encoding: &str, parts: &mut IndelParts) -> std::result::Result<(), String> {
    let mut seen = Vec::new();
    let (mut left, mut right) = (None, None);
    for token in tokenize(encoding)? {
        if token.nucleotides.is_some() {
            return Err(format!("detail '{}' cannot carry nucleotides", token.letter as char));
        }
        if seen.contains(&token.letter) {
            return Err(format!("duplicate detail '{}'", token.letter as char));
        }
        seen.push(token.letter);
        let unsigned = || {
            u32::try_from(token.value)
                .map_err(|_| format!("negative value for '{}'", token.letter as char))
        };
        match token.letter {
            b'L' => left = Some(token.value),
            b'R' => right = Some(token.value),
            b'C' => parts.central = unsigned()?,
            b'I' => parts.inserted = unsigned()?,
            b'D' => parts.deleted = unsigned()?,
            other => return Err(format!("unknown detail '{}'", other as char)),
        }
    }
    parts.left = left.ok_or("missing L offset")?;
    parts.right = right.ok_or("missing R offset")?;
    Ok(())
}

impl From<IndelParts> for Indel {
    fn from(parts: IndelParts) -> Self {
        let mut text = if parts.kind == IndelType::None {
            NULL_INDEL.to_string()
        } else {
            let mut text = format!("{}{}_L{}", parts.kind.symbol(), parts.size, parts.left);
            if parts.inserted > 0 {
                text.push_str(&format!("I{}", parts.inserted));
            }
            if parts.deleted > 0 {
                text.push_str(&format!("D{}", parts.deleted));
            }
            if parts.central > 0 {
                text.push_str(&format!("C{}", parts.central));
            }
            text.push_str(&format!("R{}", parts.right));
            text
        };
        if !parts.mutations.is_empty() {
            text.push('_');
            text.push_str(&format_mutations(&parts.mutations));
        }
        Indel { text, parts }
    }
}

impl FromStr for Indel {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Indel::parse(s)
    }
}

impl fmt::Display for Indel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl PartialEq for Indel {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Indel {}

impl Hash for Indel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl PartialOrd for Indel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Indel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text.cmp(&other.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_deletion() {
        let indel = Indel::parse("D2_L-2R1C0").unwrap();
        assert_eq!(indel.kind(), IndelType::Deletion);
        assert_eq!(indel.size(), 2);
        assert_eq!(indel.left(), -2);
        assert_eq!(indel.right(), 1);
        assert_eq!(indel.central(), 0);
        assert!(indel.mutations().is_empty());
        assert_eq!(indel.to_string(), "D2_L-2R1C0");
        assert_eq!(indel.class_label(), "D2");
    }

    #[test]
    fn parse_compound_deletion() {
        let indel = Indel::parse("D5_L-3I2C1R4").unwrap();
        assert_eq!(indel.size(), 5);
        assert_eq!(indel.inserted(), 2);
        assert_eq!(indel.central(), 1);
        assert_eq!(indel.net_size(), 3);
        assert!(indel.is_in_frame());
    }

    #[test]
    fn parse_null_forms() {
        assert_eq!(Indel::parse("-").unwrap(), Indel::null());
        assert_eq!(Indel::parse("-_-").unwrap(), Indel::null());
        assert!(Indel::parse("-_-").unwrap().is_null());
    }

    #[test]
    fn parse_null_with_mutations() {
        let indel = Indel::parse("-_M-3").unwrap();
        assert!(indel.is_null());
        assert_eq!(indel.mutations(), &[PointMutation::Mismatch { pos: -3 }]);
        assert_ne!(indel, Indel::null());
    }

    #[test]
    fn parse_insertion_with_mutations() {
        let indel = Indel::parse("I1_L-1R0_M-21N3[A]").unwrap();
        assert_eq!(indel.kind(), IndelType::Insertion);
        assert_eq!(indel.mutations().len(), 2);
        assert_eq!(indel.to_string(), "I1_L-1R0_M-21N3[A]");
    }

    #[test]
    fn trailing_dash_mutation_field_is_dropped() {
        assert_eq!(Indel::parse("D1_L-4C7R5_-").unwrap().to_string(), "D1_L-4C7R5");
    }

    #[test]
    fn malformed_indels_err() {
        for text in [
            "", "X2_L1R2", "D_L1R2", "Dx_L1R2", "D2", "D2_L1", "D2_R1", "D2_L1R2L3", "D2_L1Q2R3",
            "D2_L1R2_M1_M2", "D2_L1R2_Z3", "-_M1_M2", "D2_L1C-1R2",
        ] {
            assert!(
                matches!(Indel::parse(text), Err(Error::MalformedIndel { .. })),
                "{} should fail",
                text
            );
        }
    }

    #[test]
    fn constructed_indels_round_trip() {
        let parts = [
            IndelParts::default(),
            IndelParts {
                kind: IndelType::Deletion,
                size: 4,
                left: -3,
                right: 2,
                central: 1,
                ..Default::default()
            },
            IndelParts {
                kind: IndelType::Insertion,
                size: 3,
                left: -1,
                right: 1,
                deleted: 1,
                mutations: vec![
                    PointMutation::Mismatch { pos: 12 },
                    PointMutation::Deletion { len: 1, pos: -30 },
                ],
                ..Default::default()
            },
            IndelParts {
                mutations: vec![PointMutation::Substitution {
                    pos: 4,
                    nucleotide: "T".to_string(),
                }],
                ..Default::default()
            },
        ];
        for p in parts {
            let indel = Indel::from(p.clone());
            let reparsed = Indel::parse(&indel.to_string()).unwrap();
            assert_eq!(reparsed, indel);
            assert_eq!(reparsed.parts, p);
        }
    }

    #[test]
    fn constructed_text_is_canonical() {
        let indel = Indel::from(IndelParts {
            kind: IndelType::Deletion,
            size: 1,
            left: -4,
            right: 5,
            central: 7,
            ..Default::default()
        });
        assert_eq!(indel.to_string(), "D1_L-4C7R5");
    }

    #[test]
    fn ordering_is_lexicographic() {
        let mut indels: Vec<Indel> = ["I1_L-1R0", "D2_L-2R1", "-"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        indels.sort();
        let texts: Vec<&str> = indels.iter().map(|i| i.as_str()).collect();
        assert_eq!(texts, vec!["-", "D2_L-2R1", "I1_L-1R0"]);
    }
}
