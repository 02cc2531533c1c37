//! CLI output formatting for every command.
//!
//! Each command has a `format_*` function that returns the lines to show and
//! a `print_*` wrapper that writes them to stdout. Format functions are pure,
//! so tests assert on the exact lines.
//!
//! ## Build
//!
//! ```text
//! Page → dist/index.html (6 structured-data records)
//! Assets
//!     styles.css
//!     assets/favicon.svg
//! Skipped (not present)
//!     editor.js
//! Built 1 page, copied 2 assets
//! ```
//!
//! ## Check
//!
//! ```text
//! Template template.html reads 14 fields
//! Content content.json
//!     missing: hero.tagline
//! ```
//!
//! ## Edit
//!
//! ```text
//! Repository nuno/site
//! State OnlineEditing
//!     set hero.headline (1 region)
//! Status: Published. The site updates in about a minute.
//! ```

use crate::editor::{EditorSession, StatusKind};
use crate::generate::{BuildReport, CheckReport};

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{n} {}", if n == 1 { one } else { many })
}

pub fn format_build_output(report: &BuildReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Page \u{2192} {} ({})",
        report.output_dir.join(&report.page).display(),
        plural(report.structured_data, "structured-data record", "structured-data records")
    )];

    if !report.copied.is_empty() {
        lines.push("Assets".to_string());
        for path in &report.copied {
            lines.push(format!("{}{}", indent(1), path.display()));
        }
    }

    if !report.skipped.is_empty() {
        lines.push("Skipped (not present)".to_string());
        for path in &report.skipped {
            lines.push(format!("{}{}", indent(1), path.display()));
        }
    }

    lines.push(format!(
        "Built 1 page, copied {}",
        plural(report.copied.len(), "asset", "assets")
    ));
    lines
}

pub fn print_build_output(report: &BuildReport) {
    for line in format_build_output(report) {
        println!("{line}");
    }
}

pub fn format_check_output(report: &CheckReport) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Template {} reads {}",
            report.template.display(),
            plural(report.fields.len(), "field", "fields")
        ),
        format!("Content {}", report.content.display()),
    ];
    for path in &report.missing {
        lines.push(format!("{}missing: {path}", indent(1)));
    }
    for path in &report.malformed {
        lines.push(format!("{}malformed: {path}", indent(1)));
    }
    lines
}

pub fn print_check_output(report: &CheckReport) {
    for line in format_check_output(report) {
        println!("{line}");
    }
}

/// One `--set` applied during an edit session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEdit {
    pub path: String,
    pub regions: usize,
}

pub fn format_edit_report(session: &EditorSession, edits: &[AppliedEdit]) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(repo) = session.repository_in_use() {
        lines.push(format!("Repository {repo}"));
    }
    lines.push(format!("State {:?}", session.state()));
    for edit in edits {
        if edit.regions == 0 {
            lines.push(format!("{}no region for {}", indent(1), edit.path));
        } else {
            lines.push(format!(
                "{}set {} ({})",
                indent(1),
                edit.path,
                plural(edit.regions, "region", "regions")
            ));
        }
    }
    let status = session.status();
    let label = match status.kind {
        StatusKind::Info | StatusKind::Success => "Status",
        StatusKind::Error => "Error status",
    };
    lines.push(format!("{label}: {}", status.text));
    lines
}

pub fn print_edit_report(session: &EditorSession, edits: &[AppliedEdit]) {
    for line in format_edit_report(session, edits) {
        println!("{line}");
    }
}
