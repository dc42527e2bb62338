use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use std::error::Error as StdError;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use logfork_types::{QueryReport, QueryValue};

use crate::parser::LogParser;
use crate::query::{Observer, Query};
use crate::sink::ResultSink;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Why a run stopped before the source was exhausted
#[derive(Debug, thiserror::Error)]
pub enum FanoutError {
    /// The source failed mid-stream (network error, truncated body)
    #[error("source aborted after {lines} lines: {source}")]
    SourceAborted {
        lines: u64,
        #[source]
        source: BoxError,
        partial: Vec<QueryReport>,
    },

    /// The run was cancelled through its token
    #[error("cancelled after {lines} lines")]
    Cancelled {
        lines: u64,
        partial: Vec<QueryReport>,
    },
}

impl FanoutError {
    /// Lines every observer received before the run stopped
    pub fn lines_delivered(&self) -> u64 {
        match self {
            Self::SourceAborted { lines, .. } | Self::Cancelled { lines, .. } => *lines,
        }
    }

    /// Query values as of the last delivered line
    pub fn partial_reports(&self) -> &[QueryReport] {
        match self {
            Self::SourceAborted { partial, .. } | Self::Cancelled { partial, .. } => partial,
        }
    }
}

/// Outcome of a run that reached the end of its source
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// Lines read from the source
    pub lines: u64,

    /// One report per registered query, in registration order
    pub reports: Vec<QueryReport>,

    /// Request time of the first line with a parseable timestamp
    pub first_seen: Option<DateTime<Utc>>,

    /// Request time of the last line with a parseable timestamp
    pub last_seen: Option<DateTime<Utc>>,
}

/// Earliest and latest request times, in line order
#[derive(Clone, Copy, Debug, Default)]
struct Period {
    first: Option<DateTime<Utc>>,
    last: Option<DateTime<Utc>>,
}

impl Period {
    fn observe(&mut self, line: &str) {
        if line.is_empty() {
            return;
        }
        if let Some(ts) = LogParser::parse(line).timestamp() {
            self.first.get_or_insert(ts);
            self.last = Some(ts);
        }
    }
}

enum StreamEnd {
    Exhausted,
    Aborted(BoxError),
    Cancelled,
}

/// Reads a line source once and replays every line to each registered query
///
/// Each query runs in its own task behind an unbounded queue, so a slow query
/// never holds back the source or the other queries. Lines are shared as
/// `Arc<str>` and never mutated after they are read.
pub struct FanoutEngine {
    /// Registered queries, in registration order
    observers: Vec<Observer>,

    /// Cancellation token for stopping the run
    cancel: CancellationToken,

    /// Emit a progress snapshot every N lines per query
    progress_every: Option<u64>,
}

impl FanoutEngine {
    /// Create an engine with no queries
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
            cancel: CancellationToken::new(),
            progress_every: None,
        }
    }

    /// Register a labelled query
    ///
    /// Registration is only possible before `run`, which consumes the engine.
    pub fn register(&mut self, label: impl Into<String>, query: Query) -> &mut Self {
        let observer = Observer::new(label.into(), query);
        tracing::debug!(label = observer.label(), "Registered query");
        self.observers.push(observer);
        self
    }

    /// Send progress snapshots to the sink every `every` lines (0 disables)
    pub fn with_progress(mut self, every: u64) -> Self {
        self.progress_every = (every > 0).then_some(every);
        self
    }

    /// Token that stops the run when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Number of registered queries
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Consume `source` to the end, feeding every query
    ///
    /// On normal end of input each final report is emitted to `sink` and
    /// returned. If the source fails or the run is cancelled nothing is
    /// emitted; the error carries the partial reports instead.
    pub async fn run<S, E>(
        self,
        source: S,
        sink: Arc<dyn ResultSink>,
    ) -> Result<RunSummary, FanoutError>
    where
        S: Stream<Item = Result<String, E>>,
        E: StdError + Send + Sync + 'static,
    {
        let Self {
            observers,
            cancel,
            progress_every,
        } = self;

        tracing::info!(queries = observers.len(), "Starting fan-out");

        let mut senders = Vec::with_capacity(observers.len() + 1);
        let mut tasks = Vec::with_capacity(observers.len());
        for observer in observers {
            let (line_tx, line_rx) = mpsc::unbounded_channel::<Arc<str>>();
            let label = observer.label().to_string();
            let task = spawn_observer(observer, line_rx, progress_every, Arc::clone(&sink));
            senders.push(line_tx);
            tasks.push((label, task));
        }

        let (period_tx, period_rx) = mpsc::unbounded_channel::<Arc<str>>();
        senders.push(period_tx);
        let period_task = spawn_period(period_rx);

        let mut source = std::pin::pin!(source);
        let mut lines: u64 = 0;

        let end = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break StreamEnd::Cancelled,

                next = source.next() => {
                    match next {
                        Some(Ok(line)) => {
                            let line: Arc<str> = Arc::from(line);
                            lines += 1;

                            for line_tx in &senders {
                                // A closed queue means the observer task died;
                                // its failure is reported when it is joined
                                let _ = line_tx.send(Arc::clone(&line));
                            }
                        }
                        Some(Err(e)) => break StreamEnd::Aborted(Box::new(e)),
                        None => break StreamEnd::Exhausted,
                    }
                }
            }
        };

        // Closing the queues lets every observer drain what it was sent and finish
        drop(senders);

        let mut reports = Vec::with_capacity(tasks.len());
        for (label, task) in tasks {
            match task.await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::error!(label = %label, error = %e, "Query failed");
                    reports.push(QueryReport::new(
                        label,
                        0,
                        QueryValue::Failed {
                            reason: e.to_string(),
                        },
                    ));
                }
            }
        }

        match end {
            StreamEnd::Exhausted => {
                let Period {
                    first: first_seen,
                    last: last_seen,
                } = period_task.await.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Period tracking failed");
                    Period::default()
                });
                tracing::info!(
                    lines,
                    first = ?first_seen,
                    last = ?last_seen,
                    "Source exhausted"
                );
                for report in &reports {
                    sink.emit(report);
                }
                Ok(RunSummary {
                    lines,
                    reports,
                    first_seen,
                    last_seen,
                })
            }
            StreamEnd::Aborted(source) => {
                tracing::warn!(lines, error = %source, "Source aborted");
                Err(FanoutError::SourceAborted {
                    lines,
                    source,
                    partial: reports,
                })
            }
            StreamEnd::Cancelled => {
                tracing::warn!(lines, "Fan-out cancelled");
                Err(FanoutError::Cancelled {
                    lines,
                    partial: reports,
                })
            }
        }
    }
}

impl Default for FanoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_observer(
    mut observer: Observer,
    mut line_rx: mpsc::UnboundedReceiver<Arc<str>>,
    progress_every: Option<u64>,
    sink: Arc<dyn ResultSink>,
) -> JoinHandle<QueryReport> {
    tokio::spawn(async move {
        while let Some(line) = line_rx.recv().await {
            observer.observe(&line);

            if let Some(every) = progress_every {
                if observer.lines_seen() % every == 0 {
                    sink.progress(&observer.report());
                }
            }
        }
        observer.report()
    })
}

fn spawn_period(mut line_rx: mpsc::UnboundedReceiver<Arc<str>>) -> JoinHandle<Period> {
    tokio::spawn(async move {
        let mut period = Period::default();
        while let Some(line) = line_rx.recv().await {
            period.observe(&line);
        }
        period
    })
}
