//! Error tracking sink.
//!
//! Failures that must be visible to operators (handler crashes, failed
//! publishes, failed reloads) are captured through an [`ErrorTracker`]. The
//! returned [`TrackingId`] is shown to the user in the error reply so a
//! report can be matched to the captured event.

use std::fmt;
use std::sync::Arc;

use tracing::error;
use uuid::Uuid;

/// Identifier of one captured error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackingId(String);

impl TrackingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Context attached to a captured error.
#[derive(Debug, Clone, Default)]
pub struct CaptureContext {
    /// The acting user, if the error happened while handling an interaction.
    pub user_id: Option<String>,
    /// The guild the error happened in.
    pub guild_id: Option<String>,
    /// The operation that failed (e.g. `"publish"`, `"reload"`).
    pub operation: Option<&'static str>,
}

impl CaptureContext {
    /// Context for a lifecycle operation.
    pub fn operation(operation: &'static str) -> Self {
        Self {
            operation: Some(operation),
            ..Default::default()
        }
    }

    /// Context for an interaction failure.
    pub fn user(user_id: impl Into<String>, guild_id: Option<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            guild_id,
            operation: Some("interaction"),
        }
    }
}

/// Sink for captured errors.
///
/// Capturing is fire-and-forget: implementations must not block the caller
/// and must always hand back an id.
pub trait ErrorTracker: Send + Sync {
    fn capture(
        &self,
        error: &(dyn std::error::Error + 'static),
        context: &CaptureContext,
    ) -> TrackingId;
}

/// Shared tracker handle.
pub type BoxedTracker = Arc<dyn ErrorTracker>;

/// Tracker that records errors as `tracing` events with a random id.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTracker;

impl ErrorTracker for TracingTracker {
    fn capture(
        &self,
        err: &(dyn std::error::Error + 'static),
        context: &CaptureContext,
    ) -> TrackingId {
        let id = TrackingId(Uuid::new_v4().simple().to_string());
        error!(
            tracking_id = %id,
            user_id = context.user_id.as_deref().unwrap_or("-"),
            guild_id = context.guild_id.as_deref().unwrap_or("-"),
            operation = context.operation.unwrap_or("-"),
            error = %err,
            "Captured error"
        );
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;

    #[test]
    fn test_tracing_tracker_returns_unique_ids() {
        let tracker = TracingTracker;
        let err = HandlerError::custom("boom");
        let a = tracker.capture(&err, &CaptureContext::operation("test"));
        let b = tracker.capture(&err, &CaptureContext::user("u-1", None));
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }
}
