use regex::Regex;

pub const WILDCARD: char = '*';

/// A compiled glob pattern. `*` matches zero or more characters, every other
/// character matches itself. Matching is case-sensitive and anchored at both
/// ends.
#[derive(Debug, Clone)]
pub enum Pattern {
    Literal(String),
    Glob(Regex),
    /// Pieces between wildcards, used when the pattern is too large to
    /// compile into a regex.
    Segments(Vec<String>),
}

impl Pattern {
    pub fn new(pattern: &str) -> Self {
        if !pattern.contains(WILDCARD) {
            return Pattern::Literal(pattern.to_string());
        }

        let body = pattern
            .split(WILDCARD)
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        match Regex::new(&format!("(?s)^{body}$")) {
            Ok(regex) => Pattern::Glob(regex),
            Err(_) => Pattern::segments(pattern),
        }
    }

    fn segments(pattern: &str) -> Self {
        Pattern::Segments(pattern.split(WILDCARD).map(str::to_string).collect())
    }

    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Pattern::Literal(s) => s == candidate,
            Pattern::Glob(regex) => regex.is_match(candidate),
            Pattern::Segments(segments) => match_segments(segments, candidate),
        }
    }
}

/// Glob match over the pieces of a pattern split on `*`. There are always at
/// least two pieces: the first is anchored at the start, the last at the end
/// and the ones in between are found left to right.
fn match_segments(segments: &[String], candidate: &str) -> bool {
    let (first, rest) = match segments.split_first() {
        Some(split) => split,
        None => return candidate.is_empty(),
    };
    let (last, middle) = match rest.split_last() {
        Some(split) => split,
        None => return first == candidate,
    };
    if candidate.len() < first.len() + last.len()
        || !candidate.starts_with(first.as_str())
        || !candidate.ends_with(last.as_str())
    {
        return false;
    }

    let mut remaining = &candidate[first.len()..candidate.len() - last.len()];
    for segment in middle {
        match remaining.find(segment.as_str()) {
            Some(index) => remaining = &remaining[index + segment.len()..],
            None => return false,
        }
    }
    true
}

/// One-shot match. Prefer [`Pattern::new`] when testing many candidates.
pub fn matches(pattern: &str, candidate: &str) -> bool {
    Pattern::new(pattern).matches(candidate)
}

#[cfg(test)]
mod tests {
    use super::{matches, Pattern};

    #[test]
    fn literal() {
        assert!(matches("users", "users"));
        assert!(!matches("users", "user"));
        assert!(!matches("users", "Users"));
        assert!(matches("", ""));
        assert!(!matches("", "a"));
    }

    #[test]
    fn star() {
        assert!(matches("*", ""));
        assert!(matches("*", "anything"));
        assert!(matches("us*", "users"));
        assert!(matches("us*", "us"));
        assert!(matches("*ers", "users"));
        assert!(matches("u*r*s", "users"));
        assert!(matches("t*t", "test-set"));
        assert!(!matches("t*t", "test-sets"));
        assert!(!matches("a*", ""));
        assert!(matches("**", "x"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        assert!(matches("a.b*", "a.bc"));
        assert!(!matches("a.b*", "axbc"));
        assert!(matches("(x)?*", "(x)?y"));
        assert!(!matches("?", "a"));
        assert!(matches("[ab]", "[ab]"));
    }

    #[test]
    fn spans_newlines() {
        assert!(matches("a*b", "a\nb"));
    }

    #[test]
    fn oversized_glob_still_expands() {
        let prefix = "a".repeat(3_000_000);
        let pattern = Pattern::new(&format!("{prefix}*"));
        assert!(matches!(pattern, Pattern::Segments(_)));
        assert!(pattern.matches(&format!("{prefix}b")));
        assert!(pattern.matches(&prefix));
        assert!(!pattern.matches(&format!("b{prefix}")));
    }

    #[test]
    fn segment_matching() {
        let cases = [
            ("*", "", true),
            ("*", "abc", true),
            ("us*", "users", true),
            ("*ers", "users", true),
            ("u*r*s", "users", true),
            ("t*t", "test-set", true),
            ("t*t", "test-sets", false),
            ("a*a", "a", false),
            ("a*b*c", "aXbYc", true),
            ("a*b*c", "acb", false),
            ("*b*b*", "abab", true),
            ("*b*b*", "ab", false),
            ("**", "x", true),
        ];
        for (pattern, candidate, expected) in cases {
            assert_eq!(
                Pattern::segments(pattern).matches(candidate),
                expected,
                "{pattern:?} against {candidate:?}"
            );
            assert_eq!(matches(pattern, candidate), expected);
        }
    }

    #[test]
    fn compiled_reuse() {
        let pattern = Pattern::new("user-*");
        assert!(pattern.matches("user-1"));
        assert!(pattern.matches("user-"));
        assert!(!pattern.matches("admin-1"));
    }
}
