//! Matching output lines against expected patterns.
//!
//! A pattern is a literal line, a regular expression anchored at the start
//! of the line, or a set of patterns of which any may match.

use std::fmt;

use regex::Regex;

/// A pattern an output line can be tested against.
#[derive(Debug, Clone)]
pub enum LinePattern {
    /// The whole line must equal this text.
    Literal(String),
    /// The expression must match at the start of the line.
    Regex(Regex),
    /// Any member matching is enough.
    Any(Vec<LinePattern>),
}

impl LinePattern {
    /// Build a literal pattern.
    pub fn literal(text: impl Into<String>) -> Self {
        LinePattern::Literal(text.into())
    }

    /// Compile a regex pattern.
    pub fn regex(expr: &str) -> Result<Self, regex::Error> {
        Regex::new(expr).map(LinePattern::Regex)
    }

    /// Build a pattern matching any of the given literal lines.
    pub fn any_of<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LinePattern::Any(lines.into_iter().map(|s| LinePattern::Literal(s.into())).collect())
    }

    /// Test a single line.
    pub fn matches(&self, line: &str) -> bool {
        match self {
            LinePattern::Literal(text) => line == text,
            LinePattern::Regex(re) => re.find(line).is_some_and(|m| m.start() == 0),
            LinePattern::Any(patterns) => patterns.iter().any(|p| p.matches(line)),
        }
    }

    /// Test whether any line of `output` matches.
    pub fn matches_any<S: AsRef<str>>(&self, output: &[S]) -> bool {
        output.iter().any(|line| self.matches(line.as_ref()))
    }
}

/// Test `line` against `pattern`.
pub fn match_line(line: &str, pattern: &LinePattern) -> bool {
    pattern.matches(line)
}

impl fmt::Display for LinePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinePattern::Literal(text) => write!(f, "{text:?}"),
            LinePattern::Regex(re) => write!(f, "/{}/", re.as_str()),
            LinePattern::Any(patterns) => {
                write!(f, "any of [")?;
                for (i, p) in patterns.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for LinePattern {
    fn from(text: &str) -> Self {
        LinePattern::Literal(text.to_string())
    }
}

impl From<String> for LinePattern {
    fn from(text: String) -> Self {
        LinePattern::Literal(text)
    }
}

impl From<Regex> for LinePattern {
    fn from(re: Regex) -> Self {
        LinePattern::Regex(re)
    }
}

impl From<Vec<LinePattern>> for LinePattern {
    fn from(patterns: Vec<LinePattern>) -> Self {
        LinePattern::Any(patterns)
    }
}

impl From<&[&str]> for LinePattern {
    fn from(lines: &[&str]) -> Self {
        LinePattern::any_of(lines.iter().copied())
    }
}
