//! Out-of-band participant notification

use crate::error::Result;
use crate::types::{ParticipantId, ReadyCheckId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Direct-message style notification with an action button
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Ask one participant to confirm a ready check before the deadline.
    /// Closed inboxes are the collaborator's concern; a failure here never
    /// blocks the check.
    async fn send_ready_prompt(
        &self,
        participant_id: &ParticipantId,
        rc_id: &ReadyCheckId,
        deadline: DateTime<Utc>,
    ) -> Result<()>;
}
