use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper so a stale confirm/cancel can be told apart from the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfirmationId(pub u64);

impl fmt::Display for ConfirmationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "confirm-{:06}", self.0)
    }
}

static CONFIRMATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_confirmation_id() -> ConfirmationId {
    ConfirmationId(CONFIRMATION_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

/// Question put to the user before a deferred change or submission proceeds.
///
/// The owner of the request (a field gate or the submission coordinator)
/// exposes the matching `confirm`/`cancel` transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub id: ConfirmationId,
    pub title: String,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

impl ConfirmationRequest {
    pub(crate) fn raise(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: next_confirmation_id(),
            title: title.into(),
            message: message.into(),
            raised_at: Utc::now(),
        }
    }
}
