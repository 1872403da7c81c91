use serde_json::json;
use tokio::sync::mpsc;

use crate::error::{RugpullError, Result, UpstreamErrorKind};

pub const STATUS: &str = "STATUS";
pub const ANALYSIS: &str = "ANALYSIS";
pub const AI_VERDICT: &str = "AI_VERDICT";
pub const CACHED_ANALYSIS: &str = "CACHED_ANALYSIS";
pub const GREETING: &str = "GREETING";
pub const CHAT_RESPONSE: &str = "CHAT_RESPONSE";
pub const ERROR: &str = "ERROR";
pub const DONE: &str = "done";

/// One step of a request's output. A well-formed stream ends with exactly
/// one `Done`.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    Status(String),
    Block { name: &'static str, text: String },
    /// `kind` is `None` for faults that did not come from a remote service.
    Error {
        kind: Option<UpstreamErrorKind>,
        message: String,
    },
    Done,
}

impl AgentEvent {
    pub fn status(text: impl Into<String>) -> Self {
        AgentEvent::Status(text.into())
    }

    pub fn block(name: &'static str, text: impl Into<String>) -> Self {
        AgentEvent::Block {
            name,
            text: text.into(),
        }
    }

    pub fn error(kind: Option<UpstreamErrorKind>, message: impl Into<String>) -> Self {
        AgentEvent::Error {
            kind,
            message: message.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AgentEvent::Status(_) => STATUS,
            AgentEvent::Block { name, .. } => *name,
            AgentEvent::Error { .. } => ERROR,
            AgentEvent::Done => DONE,
        }
    }

    /// Text shown to the user, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            AgentEvent::Status(text) | AgentEvent::Block { text, .. } => Some(text.as_str()),
            AgentEvent::Error { message, .. } => Some(message.as_str()),
            AgentEvent::Done => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, AgentEvent::Done)
    }

    pub fn payload(&self) -> serde_json::Value {
        match self {
            AgentEvent::Status(text) | AgentEvent::Block { text, .. } => json!({
                "event_name": self.name(),
                "content_type": "text",
                "content": text,
            }),
            AgentEvent::Error { kind, message } => json!({
                "event_name": ERROR,
                "content_type": "text",
                "error_kind": kind.as_ref().map(UpstreamErrorKind::as_str).unwrap_or("internal"),
                "content": message,
            }),
            AgentEvent::Done => json!({ "event_name": DONE }),
        }
    }

    pub fn to_sse(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.name(), self.payload())
    }
}

/// Producer half of a request's event channel.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<AgentEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<AgentEvent>) -> Self {
        Self { tx }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AgentEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    pub async fn emit(&self, event: AgentEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| RugpullError::Runtime(DISCONNECTED.to_string()))
    }
}

pub(crate) const DISCONNECTED: &str = "event consumer disconnected";

pub(crate) fn is_disconnect(err: &RugpullError) -> bool {
    matches!(err, RugpullError::Runtime(message) if message == DISCONNECTED)
}
