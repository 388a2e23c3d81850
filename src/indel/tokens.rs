/// A single `<letter><signed int>[<nucleotides>]` token of an indel encoding.
#[derive(Debug, PartialEq)]
pub struct Token {
    pub letter: u8,
    pub value: i32,
    pub nucleotides: Option<String>,
}

/// Splits an encoding such as `L-3C1R4` or `M-21D2S-22N5[A]` into tokens.
pub fn tokenize(encoding: &str) -> Result<Vec<Token>, String> {
    let bytes = encoding.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let letter = bytes[pos];
        if !letter.is_ascii_uppercase() {
            return Err(format!(
                "expected a token letter at position {}, found '{}'",
                pos, letter as char
            ));
        }
        pos += 1;

        let start = pos;
        if pos < bytes.len() && bytes[pos] == b'-' {
            pos += 1;
        }
        let digits_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == digits_start {
            return Err(format!("token '{}' has no numeric value", letter as char));
        }
        let value: i32 = encoding[start..pos]
            .parse()
            .map_err(|e| format!("invalid value in token '{}': {}", letter as char, e))?;

        let mut nucleotides = None;
        if pos < bytes.len() && bytes[pos] == b'[' {
            let close = encoding[pos..]
                .find(']')
                .map(|offset| pos + offset)
                .ok_or_else(|| format!("unterminated nucleotide bracket in '{}'", encoding))?;
            let nts = &encoding[pos + 1..close];
            if nts.is_empty() || !nts.bytes().all(|b| b"ACGTN".contains(&b)) {
                return Err(format!("invalid nucleotides '[{}]'", nts));
            }
            nucleotides = Some(nts.to_string());
            pos = close + 1;
        }

        tokens.push(Token {
            letter,
            value,
            nucleotides,
        });
    }
    Ok(tokens)
}
