//! Council streaming events.
//!
//! Every phase of a council run is reported to the client as one JSON event
//! tagged by `type`. The same events drive the streaming API and are what a
//! client replays to build the stage panels incrementally.
//!
//! # Example
//!
//! ```rust
//! use llm_council::events::{CouncilEvent, sse_event};
//!
//! let sse = sse_event(&CouncilEvent::Stage1Start);
//! assert_eq!(sse, "event: stage1_start\ndata: {\"type\":\"stage1_start\"}\n\n");
//! ```

use serde::Serialize;

use crate::council::RankingMetadata;
use crate::conversation::{ResearchResult, Stage1Response, Stage2Ranking, Stage3Result};
use crate::modes::CouncilMode;

/// Mode announced at the start of a stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeInfo {
    pub mode: String,
    pub config: CouncilMode,
}

/// Title generated for a new conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleInfo {
    pub title: String,
}

/// Events emitted while a council run progresses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CouncilEvent {
    /// Mode and its configuration, always first.
    ModeInfo { data: ModeInfo },
    /// Deep research started (research-first mode only).
    ResearchStart,
    /// Deep research finished; `null` when the research model failed.
    ResearchComplete { data: Option<ResearchResult> },
    Stage1Start,
    Stage1Complete { data: Vec<Stage1Response> },
    Stage2Start,
    Stage2Complete {
        data: Vec<Stage2Ranking>,
        metadata: RankingMetadata,
    },
    Stage3Start,
    Stage3Complete { data: Stage3Result },
    /// Title of a conversation's first exchange.
    TitleComplete { data: TitleInfo },
    /// Results are persisted; the stream ends.
    Complete,
    /// The run failed; the stream ends.
    Error { message: String },
}

impl CouncilEvent {
    /// Wire name of the event, identical to its `type` tag.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ModeInfo { .. } => "mode_info",
            Self::ResearchStart => "research_start",
            Self::ResearchComplete { .. } => "research_complete",
            Self::Stage1Start => "stage1_start",
            Self::Stage1Complete { .. } => "stage1_complete",
            Self::Stage2Start => "stage2_start",
            Self::Stage2Complete { .. } => "stage2_complete",
            Self::Stage3Start => "stage3_start",
            Self::Stage3Complete { .. } => "stage3_complete",
            Self::TitleComplete { .. } => "title_complete",
            Self::Complete => "complete",
            Self::Error { .. } => "error",
        }
    }

    /// Whether no further event follows this one.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error { .. })
    }
}

/// Convert a [`CouncilEvent`] to an SSE-formatted string.
///
/// The output carries both an `event:` line (for `EventSource` listeners and
/// the HTMX SSE extension) and a `data:` line with the JSON payload, which is
/// all a plain `fetch` reader needs.
pub fn sse_event(evt: &CouncilEvent) -> String {
    let json = serde_json::to_string(evt).unwrap_or_else(|e| {
        serde_json::json!({ "type": "error", "message": e.to_string() }).to_string()
    });

    format!("event: {}\ndata: {json}\n\n", evt.name())
}
