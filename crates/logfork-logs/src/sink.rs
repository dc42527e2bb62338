use std::io::Write;

use parking_lot::Mutex;

use logfork_types::QueryReport;

/// Destination for query results
pub trait ResultSink: Send + Sync {
    /// Final value of a query after the source ended normally
    fn emit(&self, report: &QueryReport);

    /// Intermediate snapshot while the stream is still running
    fn progress(&self, _report: &QueryReport) {}

    /// Value of a query whose source was cut short
    fn partial(&self, report: &QueryReport) {
        self.emit(report);
    }
}

/// Plain `label: value` lines on stdout
#[derive(Debug, Default)]
pub struct TextSink;

impl TextSink {
    fn write_line(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{line}") {
            tracing::warn!(error = %e, "Failed to write report");
        }
    }
}

impl ResultSink for TextSink {
    fn emit(&self, report: &QueryReport) {
        self.write_line(&format!("{}: {}", report.label, report.value));
    }

    fn progress(&self, report: &QueryReport) {
        self.write_line(&format!(
            "{} (after {} lines): {}",
            report.label, report.lines_seen, report.value
        ));
    }

    fn partial(&self, report: &QueryReport) {
        self.write_line(&format!(
            "{} (incomplete, {} lines): {}",
            report.label, report.lines_seen, report.value
        ));
    }
}

/// One JSON object per line on stdout
#[derive(Debug, Default)]
pub struct JsonSink;

impl JsonSink {
    /// Render a report as a JSON object tagged with its status
    pub fn render(report: &QueryReport, status: &str) -> String {
        serde_json::json!({
            "status": status,
            "report": report,
        })
        .to_string()
    }

    fn write_json(&self, report: &QueryReport, status: &str) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{}", Self::render(report, status)) {
            tracing::warn!(error = %e, "Failed to write report");
        }
    }
}

impl ResultSink for JsonSink {
    fn emit(&self, report: &QueryReport) {
        self.write_json(report, "final");
    }

    fn progress(&self, report: &QueryReport) {
        self.write_json(report, "progress");
    }

    fn partial(&self, report: &QueryReport) {
        self.write_json(report, "partial");
    }
}

/// Collects reports in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    finals: Mutex<Vec<QueryReport>>,
    snapshots: Mutex<Vec<QueryReport>>,
    partials: Mutex<Vec<QueryReport>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Final reports in emission order
    pub fn reports(&self) -> Vec<QueryReport> {
        self.finals.lock().clone()
    }

    /// Progress snapshots in arrival order
    pub fn snapshots(&self) -> Vec<QueryReport> {
        self.snapshots.lock().clone()
    }

    pub fn partials(&self) -> Vec<QueryReport> {
        self.partials.lock().clone()
    }
}

impl ResultSink for MemorySink {
    fn emit(&self, report: &QueryReport) {
        self.finals.lock().push(report.clone());
    }

    fn progress(&self, report: &QueryReport) {
        self.snapshots.lock().push(report.clone());
    }

    fn partial(&self, report: &QueryReport) {
        self.partials.lock().push(report.clone());
    }
}
