use logfork_types::{DailyAverageState, QueryValue};

use crate::parser::LogParser;

/// Running average of requests per day
///
/// Days are detected by a change in the date part of `datetime`. A line is
/// counted against the current bucket *before* the day change is checked, so
/// the first line of a new day lands in the previous day's bucket and the new
/// bucket stays at zero until the next line.
#[derive(Clone, Copy, Debug, Default)]
pub struct DailyAverage;

impl DailyAverage {
    /// Initial accumulator: no date yet, a single zero bucket
    pub fn init(&self) -> DailyAverageState {
        DailyAverageState::default()
    }

    /// Fold one raw line into the accumulator
    pub fn step(&self, mut state: DailyAverageState, line: &str) -> DailyAverageState {
        if line.is_empty() {
            return state;
        }

        let record = LogParser::parse(line);
        let date = record.date();

        if let Some(last) = state.counts.last_mut() {
            *last += 1;
        }

        // An empty last date (malformed previous line) does not open a day
        let new_day = matches!(
            state.last_date.as_deref(),
            Some(last) if !last.is_empty() && last != date
        );
        if new_day {
            state.counts.push(0);
        }

        state.average = mean(&state.counts);
        state.last_date = Some(date.to_string());
        state
    }

    /// Reportable value of an accumulator
    pub fn value(state: &DailyAverageState) -> QueryValue {
        QueryValue::Average {
            average: state.average,
            counts: state.counts.clone(),
        }
    }
}

fn mean(counts: &[u64]) -> f64 {
    if counts.is_empty() {
        return 0.0;
    }
    counts.iter().sum::<u64>() as f64 / counts.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(date: &str) -> String {
        format!(r#"10.0.0.1 - - [{date}:10:05:03 +0000] "GET / HTTP/1.1" 200 1"#)
    }

    fn fold(lines: &[String]) -> DailyAverageState {
        let reducer = DailyAverage;
        lines
            .iter()
            .fold(reducer.init(), |state, l| reducer.step(state, l))
    }

    #[test]
    fn test_init() {
        let state = DailyAverage.init();
        assert_eq!(state.last_date, None);
        assert_eq!(state.counts, vec![0]);
        assert_eq!(state.average, 0.0);
    }

    #[test]
    fn test_first_line_does_not_open_a_day() {
        let state = fold(&[line("17/May/2015")]);
        assert_eq!(state.counts, vec![1]);
        assert_eq!(state.average, 1.0);
        assert_eq!(state.last_date.as_deref(), Some("17/May/2015"));
    }

    #[test]
    fn test_day_boundary_counts_previous_bucket_first() {
        let mut lines = vec![line("17/May/2015"), line("17/May/2015"), line("18/May/2015")];
        let state = fold(&lines);
        assert_eq!(state.counts, vec![3, 0]);
        assert_eq!(state.average, 1.5);
        assert_eq!(state.last_date.as_deref(), Some("18/May/2015"));

        lines.push(line("18/May/2015"));
        let state = fold(&lines);
        assert_eq!(state.counts, vec![3, 1]);
        assert_eq!(state.average, 2.0);
    }

    #[test]
    fn test_new_day_bucket_starts_at_zero() {
        // The first D2 line is charged to the D1 bucket before the D2 bucket opens
        let d1 = line("17/May/2015");
        let d2 = line("18/May/2015");
        let reducer = DailyAverage;

        let state = reducer.step(reducer.init(), &d1);
        let state = reducer.step(state, &d2);
        assert_eq!(state.counts, vec![2, 0]);
        assert_eq!(state.last_date.as_deref(), Some("18/May/2015"));
        assert_eq!(state.average, 1.0);

        let state = reducer.step(state, &d2);
        assert_eq!(state.counts, vec![2, 1]);
        assert_eq!(state.average, 1.5);
    }

    #[test]
    fn test_blank_line_is_ignored() {
        let reducer = DailyAverage;
        let state = reducer.step(reducer.init(), &line("17/May/2015"));
        let after = reducer.step(state.clone(), "");
        assert_eq!(after, state);
    }

    #[test]
    fn test_malformed_line_date_is_treated_as_unset() {
        // "garbage" has no datetime field, so its date is empty. It opens a
        // bucket, but the following line does not since the last date is empty.
        let state = fold(&[line("17/May/2015"), "garbage".to_string(), line("18/May/2015")]);
        assert_eq!(state.counts, vec![2, 1]);
        assert_eq!(state.average, 1.5);
    }

    #[test]
    fn test_average_tracks_mean_after_every_line() {
        let lines = [
            line("17/May/2015"),
            line("18/May/2015"),
            line("19/May/2015"),
            line("19/May/2015"),
        ];
        let reducer = DailyAverage;
        let mut state = reducer.init();
        for l in &lines {
            state = reducer.step(state, l);
            let expected = state.counts.iter().sum::<u64>() as f64 / state.counts.len() as f64;
            assert_eq!(state.average, expected);
            assert!(!state.counts.is_empty());
        }
        assert_eq!(state.counts, vec![2, 1, 1]);
    }

    #[test]
    fn test_value() {
        let state = fold(&[line("17/May/2015")]);
        assert_eq!(
            DailyAverage::value(&state),
            QueryValue::Average {
                average: 1.0,
                counts: vec![1]
            }
        );
    }
}
