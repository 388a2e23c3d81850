use std::{fmt, str::FromStr};

/// Strand of the PAM relative to the reference sequence of an oligo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PamOrientation {
    Forward,
    Reverse,
}

impl FromStr for PamOrientation {
    type Err = String;
    fn from_str(orientation: &str) -> Result<Self, Self::Err> {
        match orientation {
            "FORWARD" => Ok(PamOrientation::Forward),
            "REVERSE" => Ok(PamOrientation::Reverse),
            _ => Err(format!(
                "Invalid PAM orientation '{}'. Options are: FORWARD, REVERSE",
                orientation
            )),
        }
    }
}

impl fmt::Display for PamOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PamOrientation::Forward => write!(f, "FORWARD"),
            PamOrientation::Reverse => write!(f, "REVERSE"),
        }
    }
}

pub fn reverse_complement(seq: &str) -> String {
    seq.bytes()
        .rev()
        .map(|b| match b {
            b'A' => 'T',
            b'T' => 'A',
            b'C' => 'G',
            b'G' => 'C',
            b'a' => 't',
            b't' => 'a',
            b'c' => 'g',
            b'g' => 'c',
            other => other as char,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_parses_and_prints() {
        assert_eq!("FORWARD".parse::<PamOrientation>(), Ok(PamOrientation::Forward));
        assert_eq!("REVERSE".parse::<PamOrientation>(), Ok(PamOrientation::Reverse));
        assert!("forward".parse::<PamOrientation>().is_err());
        assert_eq!(PamOrientation::Reverse.to_string(), "REVERSE");
    }

    #[test]
    fn reverse_complement_of_dinucleotide() {
        assert_eq!(reverse_complement("AC"), "GT");
        assert_eq!(reverse_complement(""), "");
        assert_eq!(reverse_complement("GGN"), "NCC");
    }
}
