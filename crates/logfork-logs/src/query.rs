use logfork_types::{DailyAverageState, QueryReport, QueryValue};

use crate::filter::Predicate;
use crate::reducer::DailyAverage;

/// A question that can be asked of the log stream
#[derive(Clone, Debug)]
pub enum Query {
    /// Count lines satisfying a predicate
    Count(Predicate),
    /// Average number of requests per day
    DailyAverage(DailyAverage),
}

impl Query {
    pub fn count(predicate: Predicate) -> Self {
        Self::Count(predicate)
    }

    pub fn daily_average() -> Self {
        Self::DailyAverage(DailyAverage)
    }
}

/// A query paired with the accumulator it folds into
#[derive(Clone, Debug)]
enum Fold {
    Count {
        predicate: Predicate,
        count: u64,
    },
    DailyAverage {
        reducer: DailyAverage,
        state: DailyAverageState,
    },
}

/// A registered query together with its private state
#[derive(Debug)]
pub(crate) struct Observer {
    label: String,
    fold: Fold,
    lines_seen: u64,
}

impl Observer {
    pub(crate) fn new(label: String, query: Query) -> Self {
        let fold = match query {
            Query::Count(predicate) => Fold::Count {
                predicate,
                count: 0,
            },
            Query::DailyAverage(reducer) => Fold::DailyAverage {
                state: reducer.init(),
                reducer,
            },
        };
        Self {
            label,
            fold,
            lines_seen: 0,
        }
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn lines_seen(&self) -> u64 {
        self.lines_seen
    }

    /// Feed one line to the query
    pub(crate) fn observe(&mut self, line: &str) {
        self.lines_seen += 1;
        match &mut self.fold {
            Fold::Count { predicate, count } => {
                if predicate.matches(line) {
                    *count += 1;
                }
            }
            Fold::DailyAverage { reducer, state } => {
                let current = std::mem::take(state);
                *state = reducer.step(current, line);
            }
        }
    }

    /// Snapshot of the current value
    pub(crate) fn report(&self) -> QueryReport {
        let value = match &self.fold {
            Fold::Count { count, .. } => QueryValue::Count { count: *count },
            Fold::DailyAverage { state, .. } => DailyAverage::value(state),
        };
        QueryReport::new(self.label.clone(), self.lines_seen, value)
    }
}
