//! Plain-text run reports for the invoking host.

use std::fmt;

use serde::{Deserialize, Serialize};

use updrift_common::{TaskOutcome, UploadResult};

/// Aggregated outcome of one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    source: String,
    results: Vec<UploadResult>,
}

impl RunReport {
    /// Build a report over the per-task results, in execution order.
    pub fn new(source: impl Into<String>, results: Vec<UploadResult>) -> Self {
        Self {
            source: source.into(),
            results,
        }
    }

    /// Per-task results.
    pub fn results(&self) -> &[UploadResult] {
        &self.results
    }

    /// Number of files that landed remotely.
    pub fn uploaded_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_uploaded()).count()
    }

    /// Number of tasks that failed.
    pub fn failed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, TaskOutcome::Failed { .. }))
            .count()
    }

    /// Number of tasks skipped due to cancellation.
    pub fn skipped_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, TaskOutcome::Skipped))
            .count()
    }

    /// True when no task failed (skipped tasks don't count as failures).
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Browser links of the uploaded files, in result order.
    pub fn links(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter_map(|r| r.web_view_link())
            .collect()
    }

    /// Render the report as plain text: one status line per task, a
    /// summary line, and the collected links.
    pub fn render(&self) -> String {
        if self.results.is_empty() {
            return format!("{}: no files to upload", self.source);
        }

        let mut out = String::new();
        for result in &self.results {
            out.push_str(&result.to_string());
            out.push('\n');
        }

        let mut summary = format!(
            "Uploaded {} of {} file(s)",
            self.uploaded_count(),
            self.results.len()
        );
        if self.failed_count() > 0 {
            summary.push_str(&format!(", {} failed", self.failed_count()));
        }
        if self.skipped_count() > 0 {
            summary.push_str(&format!(", {} skipped", self.skipped_count()));
        }
        out.push_str(&summary);

        let links = self.links();
        if !links.is_empty() {
            out.push_str("\nLinks:\n");
            for link in links {
                out.push_str(link);
                out.push('\n');
            }
            out.pop();
        }

        out
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}
