use regex::Regex;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::sync::Arc;

use crate::parser::LogParser;

/// Boolean test over a raw log line
#[derive(Clone)]
pub enum Predicate {
    /// Raw line contains a literal substring
    Term(String),

    /// Parsed `datetime` contains `{day}/{month}/{year}`
    Date { needle: String },

    /// Request under a directory whose file extension is allowed
    PathExtensions {
        /// `" " + directory`, matched against the raw line
        dir_token: String,
        extensions: BTreeSet<String>,
    },

    /// Raw line matches a regular expression
    Pattern(Regex),

    /// Caller-supplied test
    Custom {
        name: String,
        test: Arc<dyn Fn(&str) -> bool + Send + Sync>,
    },
}

impl Predicate {
    /// Match lines containing `term` anywhere
    pub fn term(term: impl Into<String>) -> Self {
        Self::Term(term.into())
    }

    /// Match lines requested on a given day
    ///
    /// No padding is applied: `date("May", 18, 2015)` looks for `18/May/2015`.
    pub fn date(month: &str, day: impl Display, year: impl Display) -> Self {
        Self::Date {
            needle: format!("{day}/{month}/{year}"),
        }
    }

    /// Match requests under `dir` whose path ends in one of `extensions`
    ///
    /// Extensions include the leading dot and are case-sensitive (`.png`).
    pub fn path_with_extensions<I, S>(dir: &str, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::PathExtensions {
            dir_token: format!(" {dir}"),
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }

    /// Match lines against a regular expression
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Pattern(Regex::new(pattern)?))
    }

    /// Wrap a closure; `name` is only used for debug output
    pub fn from_fn<F>(name: impl Into<String>, test: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::Custom {
            name: name.into(),
            test: Arc::new(test),
        }
    }

    /// Check if a raw line satisfies this predicate
    pub fn matches(&self, line: &str) -> bool {
        match self {
            Self::Term(term) => line.contains(term.as_str()),
            Self::Date { needle } => LogParser::parse(line).datetime.contains(needle.as_str()),
            Self::PathExtensions {
                dir_token,
                extensions,
            } => {
                // Cheap substring test first, parse only on a hit
                line.contains(dir_token.as_str())
                    && extensions.contains(extension(&LogParser::parse(line).pathname))
            }
            Self::Pattern(re) => re.is_match(line),
            Self::Custom { test, .. } => test(line),
        }
    }
}

impl std::fmt::Debug for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Term(term) => f.debug_tuple("Term").field(term).finish(),
            Self::Date { needle } => f.debug_struct("Date").field("needle", needle).finish(),
            Self::PathExtensions {
                dir_token,
                extensions,
            } => f
                .debug_struct("PathExtensions")
                .field("dir", &dir_token.trim_start())
                .field("extensions", extensions)
                .finish(),
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Self::Custom { name, .. } => f.debug_tuple("Custom").field(name).finish(),
        }
    }
}

/// Extension of the last path segment, including the dot
///
/// Trailing slashes are ignored. Empty when the segment has no dot, only a
/// leading one (`.htaccess`), or is `..`.
fn extension(pathname: &str) -> &str {
    let trimmed = pathname.trim_end_matches('/');
    let segment = trimmed.rsplit('/').next().unwrap_or(trimmed);
    if segment == ".." {
        return "";
    }
    match segment.rfind('.') {
        Some(0) | None => "",
        Some(idx) => &segment[idx..],
    }
}
