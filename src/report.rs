//! Plain-text diff report rendering.

use chrono::{DateTime, SecondsFormat, Utc};

pub const REPORT_FILE_NAME: &str = "DocSyncAI_Report.txt";

/// Document-section text for a session with a single file.
pub const SINGLE_FILE_NOTE: &str = "Single file processed. No diff available.";

pub const DOCUMENT_SECTION: &str = "Document Diff Summary:";
pub const CODE_SECTION: &str = "Code Combined Diff Summary:";

/// Summaries for one processed file set. At most one is normally present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summaries {
    pub document: Option<String>,
    pub code: Option<String>,
}

pub fn render_report(
    file_names: &[String],
    summaries: &Summaries,
    generated_at: DateTime<Utc>,
) -> String {
    let mut report = String::from("DocSyncAI Diff Report\n");
    report.push_str(&format!(
        "Generated: {}\n\n",
        generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));

    if let [first, second] = file_names {
        report.push_str(&format!("Files Compared: {} vs {}\n\n", first, second));
    }

    if let Some(summary) = summaries.document.as_deref().filter(|s| !s.is_empty()) {
        report.push_str(DOCUMENT_SECTION);
        report.push('\n');
        report.push_str(summary);
        report.push_str("\n\n");
    }

    if let Some(summary) = summaries.code.as_deref().filter(|s| !s.is_empty()) {
        report.push_str(CODE_SECTION);
        report.push('\n');
        report.push_str(summary);
        report.push_str("\n\n");
    }

    report
}
