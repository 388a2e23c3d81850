use super::tokens::tokenize;
use std::fmt;

/// Synthesis-derived noise recorded alongside an indel call. Positions are
/// relative to the cut site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PointMutation {
    /// `M<pos>`: mismatching base at `pos`
    Mismatch { pos: i32 },
    /// `N<pos>[<nt>]`: base at `pos` replaced by `nt`
    Substitution { pos: i32, nucleotide: String },
    /// `D<len>S<pos>`
    Deletion { len: u32, pos: i32 },
    /// `I<len>S<pos>`
    Insertion { len: u32, pos: i32 },
}

impl PointMutation {
    /// Location used for guide/PAM window checks. Substitutions carry no
    /// location marker in the encoding and are never window-checked.
    pub fn marked_position(&self) -> Option<i32> {
        match self {
            PointMutation::Mismatch { pos } => Some(*pos),
            PointMutation::Deletion { pos, .. } | PointMutation::Insertion { pos, .. } => {
                Some(*pos)
            }
            PointMutation::Substitution { .. } => None,
        }
    }

    /// Net change in read length caused by the mutation.
    pub fn length_delta(&self) -> i32 {
        match self {
            PointMutation::Insertion { len, .. } => *len as i32,
            PointMutation::Deletion { len, .. } => -(*len as i32),
            _ => 0,
        }
    }
}

impl fmt::Display for PointMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointMutation::Mismatch { pos } => write!(f, "M{}", pos),
            PointMutation::Substitution { pos, nucleotide } => write!(f, "N{}[{}]", pos, nucleotide),
            PointMutation::Deletion { len, pos } => write!(f, "D{}S{}", len, pos),
            PointMutation::Insertion { len, pos } => write!(f, "I{}S{}", len, pos),
        }
    }
}

/// Parses a mutation field (`-` for none).
pub fn parse_mutations(encoding: &str) -> Result<Vec<PointMutation>, String> {
    if encoding.is_empty() || encoding == "-" {
        return Ok(Vec::new());
    }
    let tokens = tokenize(encoding)?;
    let mut mutations = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter().peekable();
    while let Some(token) = iter.next() {
        let mutation = match token.letter {
            b'M' => {
                if token.nucleotides.is_some() {
                    return Err(format!("mismatch M{} cannot carry nucleotides", token.value));
                }
                PointMutation::Mismatch { pos: token.value }
            }
            b'N' => {
                let nucleotide = token
                    .nucleotides
                    .ok_or_else(|| format!("substitution N{} is missing its nucleotide", token.value))?;
                PointMutation::Substitution {
                    pos: token.value,
                    nucleotide,
                }
            }
            letter @ (b'D' | b'I') => {
                let len = u32::try_from(token.value)
                    .map_err(|_| format!("negative length {}{}", letter as char, token.value))?;
                let pos = match iter.next() {
                    Some(start) if start.letter == b'S' && start.nucleotides.is_none() => start.value,
                    _ => {
                        return Err(format!(
                            "{}{} must be followed by its S<pos> start",
                            letter as char, token.value
                        ))
                    }
                };
                if letter == b'D' {
                    PointMutation::Deletion { len, pos }
                } else {
                    PointMutation::Insertion { len, pos }
                }
            }
            other => return Err(format!("unknown mutation letter '{}'", other as char)),
        };
        mutations.push(mutation);
    }
    Ok(mutations)
}

pub fn format_mutations(mutations: &[PointMutation]) -> String {
    if mutations.is_empty() {
        return "-".to_string();
    }
    mutations.iter().map(|m| m.to_string()).collect()
}
