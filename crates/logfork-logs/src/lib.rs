//! Log processing for logfork
//!
//! This crate provides Common Log Format parsing, the predicate and reducer
//! queries, and the single-pass fan-out engine that feeds them.

mod fanout;
mod filter;
mod parser;
mod query;
mod reducer;
mod sink;

pub use fanout::{FanoutEngine, FanoutError, RunSummary};
pub use filter::Predicate;
pub use parser::LogParser;
pub use query::Query;
pub use reducer::DailyAverage;
pub use sink::{JsonSink, MemorySink, ResultSink, TextSink};

// Re-export types used in our public API
pub use logfork_types::{DailyAverageState, LogRecord, QueryReport, QueryValue};
