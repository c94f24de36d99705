//! Natural ordering of file and folder names (`IMG_2` before `IMG_10`)

use std::cmp::Ordering;

/// One run of a name: either consecutive ASCII digits or everything else
#[derive(Debug, Clone, PartialEq, Eq)]
enum Chunk {
    /// Digits with leading zeros stripped
    Number(String),
    Text(String),
}

impl Ord for Chunk {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Chunk::Number(a), Chunk::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Chunk::Number(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Number(_)) => Ordering::Greater,
            (Chunk::Text(a), Chunk::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Chunk {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort key splitting a name into digit and text runs.
///
/// Digit runs compare by numeric value, so arbitrarily long runs never
/// overflow.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NaturalKey(Vec<Chunk>);

impl NaturalKey {
    pub fn new(name: &str) -> Self {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut in_digits = false;

        for c in name.chars() {
            let is_digit = c.is_ascii_digit();
            if !current.is_empty() && is_digit != in_digits {
                chunks.push(Self::finish(std::mem::take(&mut current), in_digits));
            }
            in_digits = is_digit;
            current.push(c);
        }
        if !current.is_empty() {
            chunks.push(Self::finish(current, in_digits));
        }

        NaturalKey(chunks)
    }

    fn finish(run: String, digits: bool) -> Chunk {
        if digits {
            let trimmed = run.trim_start_matches('0');
            Chunk::Number(trimmed.to_string())
        } else {
            Chunk::Text(run)
        }
    }
}

/// Natural comparison with a case-insensitive, then exact, tie-break
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    NaturalKey::new(a)
        .cmp(&NaturalKey::new(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

/// Sort names in place using [`natural_cmp`]
pub fn natural_sort<S: AsRef<str>>(names: &mut [S]) {
    names.sort_by(|a, b| natural_cmp(a.as_ref(), b.as_ref()));
}
