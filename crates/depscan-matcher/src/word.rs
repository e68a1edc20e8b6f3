//! Whole-word stem patterns

use regex::Regex;

use crate::error::{MatchError, MatchResult};

/// Matches a file stem when it appears in a line bounded by word boundaries
/// on both sides: `log` matches `import log` but not `login` or `catalog`.
#[derive(Debug, Clone)]
pub struct StemPattern {
    stem: String,
    regex: Option<Regex>,
}

impl StemPattern {
    pub fn new(stem: &str) -> MatchResult<Self> {
        // An empty stem would match at every word boundary.
        let regex = if stem.is_empty() {
            None
        } else {
            let pattern = format!(r"\b{}\b", regex::escape(stem));
            Some(Regex::new(&pattern).map_err(|source| MatchError::Pattern {
                stem: stem.to_string(),
                source,
            })?)
        };
        Ok(Self {
            stem: stem.to_string(),
            regex,
        })
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn is_match(&self, line: &str) -> bool {
        match &self.regex {
            // substring check first; most lines mention most stems nowhere
            Some(regex) => line.contains(self.stem.as_str()) && regex.is_match(line),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_word_only() {
        let log = StemPattern::new("log").unwrap();
        assert!(log.is_match("log"));
        assert!(log.is_match("import log"));
        assert!(log.is_match("from log import info"));
        assert!(log.is_match("log.info('x')"));
        assert!(!log.is_match("login()"));
        assert!(!log.is_match("catalog"));
        assert!(!log.is_match("log_level = 3"));
    }

    #[test]
    fn test_exact_stem_not_prefix() {
        let util = StemPattern::new("util").unwrap();
        assert!(util.is_match("import util"));
        assert!(!util.is_match("this mentions utility directly"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let stem = StemPattern::new("a.b").unwrap();
        assert!(stem.is_match("use a.b here"));
        assert!(!stem.is_match("use axb here"));

        let dashed = StemPattern::new("my-module").unwrap();
        assert!(dashed.is_match("require('my-module')"));
    }

    #[test]
    fn test_empty_stem_never_matches() {
        let empty = StemPattern::new("").unwrap();
        assert!(!empty.is_match("anything at all"));
        assert!(!empty.is_match(""));
    }
}
