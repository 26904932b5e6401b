//! Markdown and JSON report generation.
//!
//! This module renders the artifacts of every replayed pass into a report.

use crate::config::ReportConfig;
use crate::models::{Artifact, CorrelatedListener, ListenerSummary, PassReport, Report, ReportMetadata};
use anyhow::Result;
use std::fmt::Write as _;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, config: &ReportConfig) -> String {
    let mut output = String::new();

    output.push_str("# Event Listener Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));

    if config.include_summary {
        output.push_str(&generate_summary_section(&report.summary));
    }

    output.push_str(&generate_passes_section(&report.passes, config));

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    let _ = writeln!(
        section,
        "- **Generated:** {}",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(section, "- **Element Selector:** `{}`", metadata.element_selector);
    let _ = writeln!(section, "- **Sessions:** {}", metadata.sessions);
    let _ = writeln!(section, "- **Listeners:** {}", metadata.total_listeners);
    let _ = writeln!(section, "- **Duration:** {:.2}s", metadata.duration_seconds);
    section.push('\n');

    section
}

/// Generate the summary section.
fn generate_summary_section(summary: &ListenerSummary) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Listeners | Passive | Failed Passes |\n");
    section.push_str("|:---:|:---:|:---:|\n");
    let _ = writeln!(
        section,
        "| {} | {} | {} |\n",
        summary.total, summary.passive, summary.failed_passes
    );

    if !summary.by_event_type.is_empty() {
        section.push_str("### Listeners by Event Type\n\n");
        section.push_str("| Event | Count |\n");
        section.push_str("|:---|:---:|\n");

        let mut event_types: Vec<_> = summary.by_event_type.iter().collect();
        event_types.sort_by_key(|(_, count)| std::cmp::Reverse(**count));

        for (event_type, count) in event_types {
            let _ = writeln!(section, "| `{}` | {} |", event_type, count);
        }
        section.push('\n');
    }

    section
}

/// Generate one section per pass.
fn generate_passes_section(passes: &[PassReport], config: &ReportConfig) -> String {
    let mut section = String::new();

    section.push_str("## Passes\n\n");

    if passes.is_empty() {
        section.push_str("No sessions were replayed.\n\n");
        return section;
    }

    for pass in passes {
        section.push_str(&generate_pass_section(pass, config));
    }

    section
}

/// Generate the section for a single pass.
fn generate_pass_section(pass: &PassReport, config: &ReportConfig) -> String {
    let mut section = String::new();

    let _ = writeln!(section, "### {}\n", pass.page_url_or_source());
    let _ = writeln!(section, "*Session: `{}`*\n", pass.source);

    let listeners = match &pass.artifact {
        Artifact::Failure(sentinel) => {
            let _ = writeln!(section, "> **Failed:** {}\n", sentinel.debug_string);
            return section;
        }
        Artifact::Listeners(listeners) => listeners,
    };

    if listeners.is_empty() {
        section.push_str("No listeners could be attributed to a parsed script.\n\n");
        return section;
    }

    if config.include_flags {
        section.push_str("| Event | Target | Source | Capture | Passive | Once |\n");
        section.push_str("|:---|:---|:---|:---:|:---:|:---:|\n");
    } else {
        section.push_str("| Event | Target | Source |\n");
        section.push_str("|:---|:---|:---|\n");
    }

    let shown = match config.max_listeners_per_pass {
        0 => listeners.len(),
        max => max.min(listeners.len()),
    };

    for listener in &listeners[..shown] {
        section.push_str(&generate_listener_row(listener, config.include_flags));
    }

    if shown < listeners.len() {
        let _ = writeln!(section, "\n*{} more listeners not shown.*", listeners.len() - shown);
    }
    section.push('\n');

    section
}

/// Generate a single table row.
fn generate_listener_row(listener: &CorrelatedListener, include_flags: bool) -> String {
    let mut row = format!(
        "| `{}` | `{}` | `{}` |",
        listener.event_type,
        listener.object_name,
        listener.location()
    );

    if include_flags {
        let _ = write!(
            row,
            " {} | {} | {} |",
            flag(listener.use_capture),
            flag(listener.passive),
            flag(listener.once)
        );
    }
    row.push('\n');

    row
}

fn flag(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "yes",
        Some(false) => "no",
        None => "-",
    }
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by listenscope*\n");

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

impl PassReport {
    fn page_url_or_source(&self) -> &str {
        if self.page_url.is_empty() {
            &self.source
        } else {
            &self.page_url
        }
    }
}
