//! Captain result vote and admin-review escalation
//!
//! Only the two captains vote. Agreement finalizes the match immediately;
//! disagreement escalates to the admin-review surface, where an authorized
//! admin's decision closes the match.

use crate::boards::views::ReviewView;
use crate::error::{Result, ScrimError};
use crate::lifecycle::manager::MatchLifecycle;
use crate::types::{MatchId, MatchStatus, ScrimEvent, Team};
use tracing::{info, warn};

impl MatchLifecycle {
    /// One captain's result vote. A captain may revise their vote until both
    /// are in. Rejections: `MatchNotFound`, `NotACaptain`, `InvalidState`
    /// once the match left the voting phase.
    pub async fn cast_captain_vote(
        &self,
        match_id: MatchId,
        actor_id: &str,
        choice: Team,
    ) -> Result<()> {
        let veto = self
            .store()
            .veto_state(match_id)
            .await?
            .ok_or(ScrimError::MatchNotFound { match_id })?;

        let captain_team = if veto.captain_a == actor_id {
            Team::A
        } else if veto.captain_b == actor_id {
            Team::B
        } else {
            return Err(ScrimError::NotACaptain.into());
        };

        let record = self
            .store()
            .record_captain_vote(match_id, captain_team, choice)
            .await?;
        info!(
            "Match {}: captain of team {} voted for team {}",
            match_id, captain_team, choice
        );

        let votes = record.captain_votes;
        if !votes.both_cast() {
            return Ok(());
        }
        let (vote_a, vote_b) = (
            votes.team_a.expect("both votes cast"),
            votes.team_b.expect("both votes cast"),
        );

        if vote_a == vote_b {
            // Duplicate finalization from a racing vote is a benign no-op
            self.finalize(match_id, vote_a).await?;
            return Ok(());
        }

        // Disagreement: escalate. The conditional transition makes a racing
        // escalation a no-op.
        match self.store().mark_review(match_id).await {
            Ok(_) => {
                info!(
                    "Match {}: captains disagree ({} vs {}), escalating to review",
                    match_id, vote_a, vote_b
                );
                if let Err(e) = self
                    .presenter()
                    .post_review_prompt(ReviewView {
                        match_id,
                        vote_a,
                        vote_b,
                    })
                    .await
                {
                    warn!("Review prompt for match {} failed: {}", match_id, e);
                }
                self.publisher()
                    .publish(ScrimEvent::ReviewRequested { match_id })
                    .await
                    .ok();
                self.boards().refresh_match_history(match_id).await?;
            }
            Err(_) => {
                // Already escalated or otherwise resolved meanwhile
            }
        }
        Ok(())
    }

    /// Admin decision on an escalated match
    pub async fn resolve_review(&self, match_id: MatchId, winner: Team) -> Result<()> {
        let record = self
            .store()
            .match_record(match_id)
            .await?
            .ok_or(ScrimError::MatchNotFound { match_id })?;
        if record.status != MatchStatus::Review {
            return Err(ScrimError::InvalidState {
                match_id,
                status: record.status.to_string(),
            }
            .into());
        }

        info!("Match {}: review resolved, team {} wins", match_id, winner);
        self.finalize(match_id, winner).await?;
        Ok(())
    }
}
