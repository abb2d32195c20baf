//! Diagnostic infrastructure
//!
//! Compilation never halts on the first problem: the visitors accumulate
//! an ordered list of records and keep emitting best-effort code, so a
//! caller can report every problem in one pass. Records serialize to JSON
//! for tooling and render with source context for humans.

use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label, Severity as CsSeverity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use serde::{Deserialize, Serialize};

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One diagnostic record: severity, human-readable message, source line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub line: u32,
}

/// Ordered accumulator for diagnostics.
#[derive(Debug, Default)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, message: impl Into<String>, line: u32) {
        self.records.push(Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            line,
        });
    }

    pub fn warning(&mut self, message: impl Into<String>, line: u32) {
        self.records.push(Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
            line,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn has_errors(&self) -> bool {
        self.records.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Diagnostic> {
        self.records
    }

    /// Machine-readable form for build tooling.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.records).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Render diagnostics with source context to stderr.
///
/// Records carry line numbers only, so each one labels its whole line.
pub fn render(
    records: &[Diagnostic],
    file_name: &str,
    source: &str,
) -> Result<(), codespan_reporting::files::Error> {
    let mut files = SimpleFiles::new();
    let file_id = files.add(file_name, source);
    let ranges = line_ranges(source);
    let writer = StandardStream::stderr(ColorChoice::Auto);
    let config = term::Config::default();

    for record in records {
        let severity = match record.severity {
            Severity::Error => CsSeverity::Error,
            Severity::Warning => CsSeverity::Warning,
        };
        let mut diag = CsDiagnostic::new(severity).with_message(record.message.clone());
        if record.line >= 1 {
            if let Some(range) = ranges.get(record.line as usize - 1) {
                diag = diag.with_labels(vec![Label::primary(file_id, range.clone())]);
            }
        }
        term::emit(&mut writer.lock(), &config, &files, &diag)?;
    }
    Ok(())
}

/// Byte range of every line in `source`, newline excluded.
fn line_ranges(source: &str) -> Vec<std::ops::Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0usize;
    for segment in source.split_inclusive('\n') {
        let end = start + segment.trim_end_matches(['\n', '\r']).len();
        ranges.push(start..end);
        start += segment.len();
    }
    ranges
}
