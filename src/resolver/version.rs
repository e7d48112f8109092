//! Version-aware ordering of candidate names
//!
//! Strings are split into runs of digits and runs of everything else.
//! Digit runs compare numerically, other runs compare bytewise, so
//! `php8.10-fpm` sorts after `php8.3-fpm`.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Ordering rule used to pick the newest candidate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionOrdering {
    /// Numeric runs compare as numbers
    #[default]
    Version,
    /// Plain byte-wise comparison
    Lexical,
}

impl VersionOrdering {
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            VersionOrdering::Version => compare_versions(a, b),
            VersionOrdering::Lexical => a.cmp(b),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Number(&'a str),
    Text(&'a str),
}

fn segments(s: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let bytes = s.as_bytes();
    let mut start = 0;

    while start < bytes.len() {
        let digit = bytes[start].is_ascii_digit();
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() == digit {
            end += 1;
        }
        let run = &s[start..end];
        out.push(if digit {
            Segment::Number(run)
        } else {
            Segment::Text(run)
        });
        start = end;
    }

    out
}

/// Compare two digit runs without parsing, so long runs cannot overflow
fn compare_numbers(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Version-aware comparison
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left = segments(a);
    let right = segments(b);

    for (l, r) in left.iter().zip(right.iter()) {
        let ordering = match (l, r) {
            (Segment::Number(x), Segment::Number(y)) => compare_numbers(x, y),
            (Segment::Text(x), Segment::Text(y)) => x.cmp(y),
            (Segment::Number(_), Segment::Text(_)) => Ordering::Greater,
            (Segment::Text(_), Segment::Number(_)) => Ordering::Less,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    left.len().cmp(&right.len())
}

/// The newest item under `ordering`
///
/// Among items that compare equal the one appearing last wins.
pub fn pick_newest<T, F>(items: &[T], key: F, ordering: VersionOrdering) -> Option<&T>
where
    F: Fn(&T) -> &str,
{
    // Iterator::max_by returns the last of several equal maxima
    items
        .iter()
        .max_by(|a, b| ordering.compare(key(a), key(b)))
}
