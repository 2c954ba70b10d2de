//! Spans decoded from OTLP trace exports, and traces assembled from them.

use super::Attributes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

/// What a span represents, following the OTLP span kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    /// Internal operation; also used for unspecified and unknown kinds.
    #[default]
    Internal,
    /// Server side of a synchronous call.
    Server,
    /// Client side of a synchronous call.
    Client,
    /// Sender of an asynchronous message.
    Producer,
    /// Receiver of an asynchronous message.
    Consumer,
}

impl SpanKind {
    /// Maps an OTLP `SpanKind` enum value.
    #[must_use]
    pub fn from_otlp(value: i32) -> Self {
        match value {
            2 => Self::Server,
            3 => Self::Client,
            4 => Self::Producer,
            5 => Self::Consumer,
            _ => Self::Internal,
        }
    }

    /// Lowercase name used in JSON and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::Server => "server",
            Self::Client => "client",
            Self::Producer => "producer",
            Self::Consumer => "consumer",
        }
    }
}

impl std::fmt::Display for SpanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome recorded on a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    /// No status was set by the instrumentation.
    #[default]
    Unset,
    /// Explicitly marked successful.
    Ok,
    /// The operation failed.
    Error,
}

impl SpanStatus {
    /// Maps an OTLP `StatusCode` value; unknown codes count as unset.
    #[must_use]
    pub fn from_otlp(code: i32) -> Self {
        match code {
            1 => Self::Ok,
            2 => Self::Error,
            _ => Self::Unset,
        }
    }
}

/// A timestamped annotation inside a span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanEvent {
    /// Event name.
    pub name: String,
    /// When the event happened.
    pub time: DateTime<Utc>,
    /// Event attributes.
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

/// One unit of work in a distributed trace.
///
/// Ids are lowercase hex when converted from OTLP.
///
/// ```
/// use shared::models::Span;
///
/// let span = Span::new("4bf92f3577b34da6a3ce929d0e0e4736", "00f067aa0ba902b7", "GET /", "web")
///     .with_parent("53995c3f42cd8ad8");
///
/// assert!(!span.is_root());
/// assert!(span.validate_span().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Span {
    /// Trace the span belongs to.
    #[validate(length(min = 1, message = "trace_id is empty"))]
    pub trace_id: String,

    /// Id of this span, unique within the trace.
    #[validate(length(min = 1, message = "span_id is empty"))]
    pub span_id: String,

    /// Parent span; `None` for a root span.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,

    /// Operation name.
    #[validate(length(min = 1, message = "name is empty"))]
    pub name: String,

    /// Reporting service (`service.name` resource attribute).
    #[validate(length(min = 1, message = "service is empty"))]
    pub service: String,

    /// Span kind.
    #[serde(default)]
    pub kind: SpanKind,

    /// Span status.
    #[serde(default)]
    pub status: SpanStatus,

    /// Start of the operation.
    pub start_time: DateTime<Utc>,

    /// End of the operation.
    pub end_time: DateTime<Utc>,

    /// Span attributes, plus resource attributes under a `resource.` prefix.
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,

    /// Span events.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SpanEvent>,
}

/// Why a span was rejected.
#[derive(Debug, Error)]
pub enum SpanValidationError {
    /// A required field is missing or malformed.
    #[error("span {span_id:?}: {source}")]
    Fields {
        /// Offending span.
        span_id: String,
        /// Field-level failures.
        #[source]
        source: validator::ValidationErrors,
    },

    /// `end_time` lies before `start_time`.
    #[error("span {span_id:?} ends before it starts")]
    EndsBeforeStart {
        /// Offending span.
        span_id: String,
    },

    /// The span names itself as its parent.
    #[error("span {span_id:?} is its own parent")]
    OwnParent {
        /// Offending span.
        span_id: String,
    },
}

impl Span {
    /// Creates a root span of internal kind, starting and ending now.
    #[must_use]
    pub fn new(
        trace_id: impl Into<String>,
        span_id: impl Into<String>,
        name: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            trace_id: trace_id.into(),
            span_id: span_id.into(),
            parent_span_id: None,
            name: name.into(),
            service: service.into(),
            kind: SpanKind::default(),
            status: SpanStatus::default(),
            start_time: now,
            end_time: now,
            attributes: Attributes::new(),
            events: Vec::new(),
        }
    }

    /// Sets the parent span id.
    #[must_use]
    pub fn with_parent(mut self, parent_span_id: impl Into<String>) -> Self {
        self.parent_span_id = Some(parent_span_id.into());
        self
    }

    /// Sets start and end time.
    #[must_use]
    pub fn with_times(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    /// Elapsed time in whole milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.end_time - self.start_time).num_milliseconds()
    }

    /// True when the span has no parent.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_none()
    }

    /// Checks the span before it is stored.
    ///
    /// # Errors
    ///
    /// Returns the first problem found: missing ids, name or service, an
    /// inverted time range, or a span that is its own parent.
    pub fn validate_span(&self) -> Result<(), SpanValidationError> {
        self.validate()
            .map_err(|source| SpanValidationError::Fields {
                span_id: self.span_id.clone(),
                source,
            })?;
        if self.end_time < self.start_time {
            return Err(SpanValidationError::EndsBeforeStart {
                span_id: self.span_id.clone(),
            });
        }
        if self.parent_span_id.as_deref() == Some(self.span_id.as_str()) {
            return Err(SpanValidationError::OwnParent {
                span_id: self.span_id.clone(),
            });
        }
        Ok(())
    }
}

/// All stored spans sharing one trace id, ordered by start time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    /// Shared trace id.
    pub trace_id: String,
    /// Spans, earliest first.
    pub spans: Vec<Span>,
}

impl Trace {
    /// Orders `spans` into a trace; `None` when there are no spans.
    #[must_use]
    pub fn assemble(mut spans: Vec<Span>) -> Option<Self> {
        let trace_id = spans.first()?.trace_id.clone();
        spans.sort_by_key(|span| span.start_time);
        Some(Self { trace_id, spans })
    }

    /// The earliest span without a parent.
    #[must_use]
    pub fn root_span(&self) -> Option<&Span> {
        self.spans.iter().find(|span| span.is_root())
    }

    /// Number of spans.
    #[must_use]
    pub fn span_count(&self) -> usize {
        self.spans.len()
    }
}
