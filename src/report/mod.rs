//! Report generation for cycle findings

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{CycleReport, Finding, Severity};

/// Receives the findings of each completed cycle
pub trait Presentation: Send {
    fn render(&mut self, cycle_timestamp: DateTime<Utc>, device_id: &str, findings: Vec<Finding>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// One line per finding
    #[default]
    Text,
    /// Pretty-printed JSON document per cycle
    Json,
}

/// JSON counters (internal serialization)
#[derive(Serialize)]
struct SummaryJson {
    critical: usize,
    warning: usize,
    info: usize,
}

/// JSON structure for complete report (internal serialization)
#[derive(Serialize)]
struct ReportJson<'a> {
    ts_time: String,
    device_id: &'a str,
    healthy: bool,
    summary: SummaryJson,
    findings: &'a [Finding],
}

/// Prints cycle findings to stdout
#[derive(Debug, Default)]
pub struct Reporter {
    pub format: ReportFormat,
}

impl Reporter {
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    /// Structured report for API consumers
    pub fn create_report(cycle_timestamp: DateTime<Utc>, device_id: &str, findings: Vec<Finding>) -> CycleReport {
        CycleReport {
            timestamp: cycle_timestamp.to_rfc3339(),
            device_id: device_id.to_string(),
            findings,
        }
    }

    /// Pretty-printed JSON string for CLI output
    pub fn generate_json_report(cycle_timestamp: DateTime<Utc>, device_id: &str, findings: &[Finding]) -> String {
        let count = |s: Severity| findings.iter().filter(|f| f.severity == s).count();
        let rep = ReportJson {
            ts_time: cycle_timestamp.to_rfc3339(),
            device_id,
            healthy: findings.iter().all(|f| f.severity == Severity::Info),
            summary: SummaryJson {
                critical: count(Severity::Critical),
                warning: count(Severity::Warning),
                info: count(Severity::Info),
            },
            findings,
        };
        serde_json::to_string_pretty(&rep).unwrap_or_else(|_| "{\"error\": \"JSON serialization failed\"}".to_string())
    }

    /// Plain lines, one per finding
    pub fn generate_text_report(cycle_timestamp: DateTime<Utc>, device_id: &str, findings: &[Finding]) -> String {
        let mut out = format!(
            "==== Multicast validation report: {device_id} @ {} ====\n",
            cycle_timestamp.to_rfc3339()
        );
        if findings.is_empty() {
            out.push_str("OK       no multicast issues detected\n");
        }
        for f in findings {
            let severity = f.severity.to_string().to_uppercase();
            out.push_str(&format!("{severity:<8} {:<12} {}\n", f.category.to_string(), f.message));
        }
        out
    }
}

impl Presentation for Reporter {
    fn render(&mut self, cycle_timestamp: DateTime<Utc>, device_id: &str, findings: Vec<Finding>) {
        let text = match self.format {
            ReportFormat::Json => Self::generate_json_report(cycle_timestamp, device_id, &findings),
            ReportFormat::Text => Self::generate_text_report(cycle_timestamp, device_id, &findings),
        };
        println!("{text}");
    }
}
