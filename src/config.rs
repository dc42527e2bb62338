//! Query catalog and source configuration
//!
//! Loaded from a TOML file; without one the built-in catalog is used.
//!
//! ```toml
//! source = "https://example.com/access.log"
//!
//! [[query]]
//! label = "How many 5xx responses?"
//! kind = "pattern"
//! pattern = '" 5\d\d '
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::Error as _;

use logfork_logs::{FanoutEngine, Predicate, Query};

/// Elastic's sample Apache access log
pub const DEFAULT_SOURCE_URL: &str = "https://raw.githubusercontent.com/elastic/examples/master/Common%20Data%20Formats/apache_logs/apache_logs";

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// URL the log is fetched from
    #[serde(default = "default_source")]
    pub source: String,

    /// Queries in reporting order; empty means the built-in catalog
    #[serde(default, rename = "query")]
    pub queries: Vec<QueryConfig>,
}

/// One `[[query]]` entry: a `label` plus the keys of its `kind`
///
/// Keys that do not belong to the kind are rejected.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(try_from = "toml::Table")]
pub struct QueryConfig {
    pub label: String,
    pub kind: QueryKind,
}

impl TryFrom<toml::Table> for QueryConfig {
    type Error = toml::de::Error;

    fn try_from(mut table: toml::Table) -> Result<Self, Self::Error> {
        let label = table
            .remove("label")
            .ok_or_else(|| toml::de::Error::missing_field("label"))?
            .try_into()?;
        let kind = toml::Value::Table(table).try_into()?;
        Ok(Self { label, kind })
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum QueryKind {
    /// Lines containing a literal string
    Term { term: String },

    /// Lines requested on `day/month/year`; numbers are not zero-padded
    Date { month: String, day: u32, year: u32 },

    /// Requests under `dir` with one of `extensions` (e.g. ".png")
    PathExtensions { dir: String, extensions: Vec<String> },

    /// Lines matching a regular expression
    Pattern { pattern: String },

    /// Average requests per day
    DailyAverage {},
}

fn default_source() -> String {
    DEFAULT_SOURCE_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: default_source(),
            queries: default_queries(),
        }
    }
}

impl Config {
    /// Load from `path`, or fall back to the defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        if config.queries.is_empty() {
            config.queries = default_queries();
        }
        Ok(config)
    }

    /// Create an engine with every configured query registered
    pub fn build_engine(&self) -> Result<FanoutEngine> {
        let mut engine = FanoutEngine::new();
        for query in &self.queries {
            engine.register(query.label.clone(), query.kind.to_query()?);
        }
        Ok(engine)
    }
}

impl QueryKind {
    fn to_query(&self) -> Result<Query> {
        let query = match self {
            Self::Term { term } => Query::count(Predicate::term(term.clone())),
            Self::Date { month, day, year } => Query::count(Predicate::date(month, day, year)),
            Self::PathExtensions { dir, extensions } => Query::count(
                Predicate::path_with_extensions(dir, extensions.iter().cloned()),
            ),
            Self::Pattern { pattern } => Query::count(
                Predicate::pattern(pattern)
                    .with_context(|| format!("Invalid pattern '{}'", pattern))?,
            ),
            Self::DailyAverage {} => Query::daily_average(),
        };
        Ok(query)
    }
}

fn default_queries() -> Vec<QueryConfig> {
    vec![
        QueryConfig {
            label: "How many times did “Googlebot/2.1” fetch resources?".to_string(),
            kind: QueryKind::Term {
                term: "Googlebot/2.1".to_string(),
            },
        },
        QueryConfig {
            label: "How many transactions took place on May 18, 2015?".to_string(),
            kind: QueryKind::Date {
                month: "May".to_string(),
                day: 18,
                year: 2015,
            },
        },
        QueryConfig {
            label: "How many images loaded from /images?".to_string(),
            kind: QueryKind::PathExtensions {
                dir: "/images".to_string(),
                extensions: [".jpeg", ".jpg", ".png", ".gif"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
            },
        },
        QueryConfig {
            label: "Average number of resources loaded per day?".to_string(),
            kind: QueryKind::DailyAverage {},
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use logfork_logs::{MemorySink, QueryValue};
    use std::io;
    use std::sync::Arc;

    #[test]
    fn test_default_catalog() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.source, DEFAULT_SOURCE_URL);
        assert_eq!(config.queries.len(), 4);
        assert_eq!(config.build_engine().unwrap().len(), 4);
    }

    #[test]
    fn test_parse_toml() {
        let config = Config::from_toml(
            r#"
            source = "http://localhost/access.log"

            [[query]]
            label = "errors"
            kind = "pattern"
            pattern = '" 5\d\d '

            [[query]]
            label = "may 17"
            kind = "date"
            month = "May"
            day = 17
            year = 2015

            [[query]]
            label = "avg"
            kind = "daily_average"
            "#,
        )
        .unwrap();

        assert_eq!(config.source, "http://localhost/access.log");
        assert_eq!(config.queries.len(), 3);
        assert_eq!(
            config.queries[1].kind,
            QueryKind::Date {
                month: "May".into(),
                day: 17,
                year: 2015
            }
        );
        assert_eq!(config.queries[2].kind, QueryKind::DailyAverage {});
    }

    #[test]
    fn test_source_only_keeps_default_queries() {
        let config = Config::from_toml(r#"source = "http://localhost/log""#).unwrap();
        assert_eq!(config.queries, default_queries());
    }

    #[test]
    fn test_rejects_unknown_kind() {
        let result = Config::from_toml(
            r#"
            [[query]]
            label = "x"
            kind = "median"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_misspelled_query_key() {
        let err = Config::from_toml(
            r#"
            [[query]]
            label = "images"
            kind = "path_extensions"
            dir = "/images"
            extensions = [".png"]
            extension = [".gif"]
            "#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("unknown field `extension`"));

        let result = Config::from_toml(
            r#"
            [[query]]
            label = "avg"
            kind = "daily_average"
            per = "day"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_query_without_label() {
        let err = Config::from_toml(
            r#"
            [[query]]
            kind = "term"
            term = "Googlebot/2.1"
            "#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("missing field `label`"));
    }

    #[test]
    fn test_invalid_pattern() {
        let config = Config::from_toml(
            r#"
            [[query]]
            label = "broken"
            kind = "pattern"
            pattern = "("
            "#,
        )
        .unwrap();
        let err = config.build_engine().err().unwrap();
        assert!(format!("{err:#}").contains("Invalid pattern"));
    }

    #[tokio::test]
    async fn test_default_catalog_answers() {
        let lines = [
            r#"66.249.73.135 - - [17/May/2015:10:05:03 +0000] "GET /images/a.png HTTP/1.1" 200 1 "-" "Googlebot/2.1""#,
            r#"10.0.0.1 - - [18/May/2015:10:05:03 +0000] "GET /images/b.jpeg HTTP/1.1" 200 1 "-" "Firefox""#,
            r#"10.0.0.1 - - [18/May/2015:11:00:00 +0000] "GET /blog/c.png HTTP/1.1" 200 1 "-" "Firefox""#,
        ];
        let source = futures::stream::iter(lines.map(|l| Ok::<_, io::Error>(l.to_string())));
        let sink = Arc::new(MemorySink::new());

        Config::default()
            .build_engine()
            .unwrap()
            .run(source, sink.clone())
            .await
            .unwrap();

        let values: Vec<_> = sink.reports().into_iter().map(|r| r.value).collect();
        assert_eq!(
            values,
            [
                QueryValue::Count { count: 1 },
                QueryValue::Count { count: 2 },
                QueryValue::Count { count: 2 },
                QueryValue::Average {
                    average: 1.5,
                    counts: vec![2, 1]
                },
            ]
        );
    }
}
