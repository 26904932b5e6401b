//! Data models for the listener gatherer.
//!
//! This module contains the core data structures shared by the gatherer,
//! the replay driver, and the report generator: script metadata, raw and
//! correlated listener records, target references, and the pass artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Message carried by the failure sentinel artifact.
pub const FAILURE_MESSAGE: &str = "Unable to collect passive events listener usage.";

/// Field names owned by [`CorrelatedListener`] itself. Extra metadata under
/// these keys is never copied into the flattened details.
const RESERVED_FIELDS: &[&str] = &[
    "type",
    "useCapture",
    "passive",
    "once",
    "scriptId",
    "lineNumber",
    "columnNumber",
    "url",
    "objectName",
    "line",
    "col",
];

/// Protocol node identifier of a page element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {}", self.0)
    }
}

/// Well-known globals whose listeners are always queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlobalName {
    Document,
    Window,
}

impl GlobalName {
    /// The expression that evaluates to this global.
    pub fn as_str(&self) -> &'static str {
        match self {
            GlobalName::Document => "document",
            GlobalName::Window => "window",
        }
    }
}

impl fmt::Display for GlobalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something whose attached listeners can be queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetReference {
    /// A page element, by node id.
    Node(NodeId),
    /// `document` or `window`.
    Global(GlobalName),
}

impl fmt::Display for TargetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetReference::Node(id) => write!(f, "{}", id),
            TargetReference::Global(name) => write!(f, "{}", name),
        }
    }
}

/// Metadata of one parsed script, as delivered by a parse notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedScript {
    /// Unique script identifier within the inspected page.
    pub script_id: String,
    /// Source url, empty for inline or eval'd scripts.
    #[serde(default)]
    pub url: String,
    /// Every other field of the notification (startLine, hash, ...).
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// One listener as returned by the listener query, before correlation.
///
/// Only the fields present in the query response are carried; a record
/// without a `scriptId` can never be correlated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawListenerRecord {
    /// Event type, e.g. `scroll` or `touchstart`.
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_capture: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub once: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_id: Option<String>,
    /// 0-indexed.
    #[serde(default)]
    pub line_number: u64,
    /// 0-indexed.
    #[serde(default)]
    pub column_number: u64,
    /// Remaining protocol fields (handler, backendNodeId, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A listener joined with the metadata of the script that defined it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelatedListener {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_capture: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub once: Option<bool>,
    pub script_id: String,
    pub line_number: u64,
    pub column_number: u64,
    /// Url of the defining script.
    pub url: String,
    /// Listener extras overlaid with script metadata.
    #[serde(flatten)]
    pub details: Map<String, Value>,
    /// Description of the object the listener is attached to.
    pub object_name: String,
    /// 1-indexed line.
    pub line: u64,
    /// 1-indexed column.
    pub col: u64,
}

impl CorrelatedListener {
    /// Merge a raw record with its script. Script fields win over listener
    /// fields of the same name.
    pub fn merge(record: &RawListenerRecord, script: &ParsedScript, object_name: &str) -> Self {
        let mut details = Map::new();
        for (key, value) in record.extra.iter().chain(script.metadata.iter()) {
            if !RESERVED_FIELDS.contains(&key.as_str()) {
                details.insert(key.clone(), value.clone());
            }
        }

        Self {
            event_type: record.event_type.clone(),
            use_capture: record.use_capture,
            passive: record.passive,
            once: record.once,
            script_id: script.script_id.clone(),
            line_number: record.line_number,
            column_number: record.column_number,
            url: script.url.clone(),
            details,
            object_name: object_name.to_string(),
            line: record.line_number + 1,
            col: record.column_number + 1,
        }
    }

    /// Returns `url:line:col`, or `<inline>:line:col` without a url.
    pub fn location(&self) -> String {
        let url = if self.url.is_empty() {
            "<inline>"
        } else {
            self.url.as_str()
        };
        format!("{}:{}:{}", url, self.line, self.col)
    }
}

/// The fixed value committed when a pass cannot be gathered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureSentinel {
    pub raw_value: i64,
    pub debug_string: String,
}

impl Default for FailureSentinel {
    fn default() -> Self {
        Self {
            raw_value: -1,
            debug_string: FAILURE_MESSAGE.to_string(),
        }
    }
}

/// The value committed by the gatherer for one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Artifact {
    Listeners(Vec<CorrelatedListener>),
    Failure(FailureSentinel),
}

impl Artifact {
    /// The failure sentinel artifact.
    pub fn failure() -> Self {
        Artifact::Failure(FailureSentinel::default())
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Artifact::Failure(_))
    }

    /// Listeners of a successful pass; empty for the sentinel.
    pub fn listeners(&self) -> &[CorrelatedListener] {
        match self {
            Artifact::Listeners(listeners) => listeners,
            Artifact::Failure(_) => &[],
        }
    }
}

/// The artifact of one replayed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassReport {
    /// Path of the session file the pass was replayed from.
    pub source: String,
    /// Page url recorded in the session.
    pub page_url: String,
    pub artifact: Artifact,
}

/// Summary of listeners across all passes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListenerSummary {
    /// Total number of correlated listeners.
    pub total: usize,
    /// Passes that committed the failure sentinel.
    pub failed_passes: usize,
    /// Listeners registered as passive.
    pub passive: usize,
    /// Listeners grouped by event type.
    pub by_event_type: BTreeMap<String, usize>,
}

impl ListenerSummary {
    /// Creates a summary from the pass reports.
    pub fn from_passes(passes: &[PassReport]) -> Self {
        let mut summary = Self::default();

        for pass in passes {
            if pass.artifact.is_failure() {
                summary.failed_passes += 1;
                continue;
            }

            for listener in pass.artifact.listeners() {
                summary.total += 1;
                if listener.passive == Some(true) {
                    summary.passive += 1;
                }
                *summary
                    .by_event_type
                    .entry(listener.event_type.clone())
                    .or_insert(0) += 1;
            }
        }

        summary
    }
}

/// Metadata about the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Selector used to enumerate elements.
    pub element_selector: String,
    /// Number of sessions replayed.
    pub sessions: usize,
    /// Total number of correlated listeners.
    pub total_listeners: usize,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete listener report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub passes: Vec<PassReport>,
    pub summary: ListenerSummary,
}
