//! Data model for recorded trace entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Event ─────────────────────────────────────────────────────────────────

/// One call made against a trace sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEvent {
    /// A collapsible section opened.
    StartDetails { title: String },
    /// The innermost section closed.
    EndDetails,
    /// A leaf line.
    Item { title: String },
    /// A titled fenced block.
    DetailsFenced {
        title: String,
        content: String,
        language: String,
    },
    /// An image reference.
    Image {
        url: String,
        filename: Option<String>,
    },
    /// An error message.
    Error { message: String },
    /// A labeled value.
    ItemValue { label: String, value: String },
}

impl TraceEvent {
    /// Short name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StartDetails { .. } => "start_details",
            Self::EndDetails => "end_details",
            Self::Item { .. } => "item",
            Self::DetailsFenced { .. } => "details_fenced",
            Self::Image { .. } => "image",
            Self::Error { .. } => "error",
            Self::ItemValue { .. } => "item_value",
        }
    }
}

/// A recorded event with its nesting depth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Number of sections open when the event was recorded.
    pub depth: usize,
    /// When the event was recorded.
    pub at: DateTime<Utc>,
    /// What happened.
    pub event: TraceEvent,
}

// ── Log ───────────────────────────────────────────────────────────────────

/// An ordered collection of entries for one render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceLog {
    /// Unique log id.
    pub id: String,
    /// When the log started.
    pub started_at: DateTime<Utc>,
    /// All entries in recording order.
    pub entries: Vec<TraceEntry>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    /// Record an event at the given depth.
    pub fn push(&mut self, depth: usize, event: TraceEvent) {
        self.entries.push(TraceEntry {
            depth,
            at: Utc::now(),
            event,
        });
    }

    /// Events in recording order.
    pub fn events(&self) -> impl Iterator<Item = &TraceEvent> {
        self.entries.iter().map(|e| &e.event)
    }

    /// Number of events of the given kind.
    pub fn count(&self, kind: &str) -> usize {
        self.events().filter(|e| e.kind() == kind).count()
    }
}

impl Default for TraceLog {
    fn default() -> Self {
        Self::new()
    }
}
