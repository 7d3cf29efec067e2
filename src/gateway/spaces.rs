//! Coordination-space and voice-room interfaces

use crate::error::Result;
use crate::types::{MatchId, ParticipantId, SpaceId, VoiceRooms};
use async_trait::async_trait;

/// Private per-match coordination space (thread) management
#[async_trait]
pub trait CoordinationSpaces: Send + Sync {
    /// Create a private space owned by the given participants; returns an
    /// opaque reference the core persists on the match document.
    async fn create_match_space(
        &self,
        match_id: MatchId,
        participant_ids: &[ParticipantId],
    ) -> Result<SpaceId>;

    /// Archive/lock a space at finalize or cancel time
    async fn archive_space(&self, space_id: &SpaceId) -> Result<()>;
}

/// Team voice rooms, created at match start and destroyed at the end
#[async_trait]
pub trait VoiceRoomProvider: Send + Sync {
    async fn create_team_rooms(
        &self,
        match_id: MatchId,
        team_a: &[ParticipantId],
        team_b: &[ParticipantId],
    ) -> Result<VoiceRooms>;

    async fn destroy_rooms(&self, match_id: MatchId, rooms: &VoiceRooms) -> Result<()>;
}
