//! In-memory store implementation
//!
//! Every operation takes the single write lock for its whole read-modify-write,
//! which is what makes the conditional updates of the [`MatchStore`] contract
//! atomic under interleaved handlers. The production deployment swaps this for
//! a document-database-backed implementation behind the same trait.

use crate::config::{QueueSettings, VetoSettings};
use crate::error::{Result, ScrimError};
use crate::store::{CloseOutcome, MatchStore, WinStats};
use crate::types::{
    CancellationEvent, MatchId, MatchParticipant, MatchRecord, MatchStatus, Participant,
    ParticipantId, QueueEntry, RatingHistoryEntry, ReadyCheck, ReadyCheckStatus, Team, VetoState,
    VoiceRooms,
};
use crate::utils::current_timestamp;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Counter name used for match-id allocation
const MATCH_ID_COUNTER: &str = "match_id";

#[derive(Debug, Default)]
struct Collections {
    participants: HashMap<ParticipantId, Participant>,
    queue: HashMap<ParticipantId, DateTime<Utc>>,
    ready_checks: HashMap<String, ReadyCheck>,
    matches: HashMap<MatchId, MatchRecord>,
    match_participants: Vec<MatchParticipant>,
    vetoes: HashMap<MatchId, VetoState>,
    rating_history: Vec<RatingHistoryEntry>,
    cancel_events: Vec<CancellationEvent>,
    counters: HashMap<String, i64>,
    queue_settings: Option<QueueSettings>,
    veto_settings: Option<VetoSettings>,
    action_roles: HashMap<String, Vec<String>>,
}

/// In-memory [`MatchStore`] implementation
#[derive(Debug, Default)]
pub struct InMemoryMatchStore {
    inner: RwLock<Collections>,
}

impl InMemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>> {
        self.inner.read().map_err(|_| {
            ScrimError::InternalError {
                message: "Failed to acquire store read lock".to_string(),
            }
            .into()
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>> {
        self.inner.write().map_err(|_| {
            ScrimError::InternalError {
                message: "Failed to acquire store write lock".to_string(),
            }
            .into()
        })
    }
}

fn sorted_queue(queue: &HashMap<ParticipantId, DateTime<Utc>>) -> Vec<QueueEntry> {
    let mut entries: Vec<QueueEntry> = queue
        .iter()
        .map(|(id, joined_at)| QueueEntry {
            participant_id: id.clone(),
            joined_at: *joined_at,
        })
        .collect();
    entries.sort_by(|a, b| {
        a.joined_at
            .cmp(&b.joined_at)
            .then_with(|| a.participant_id.cmp(&b.participant_id))
    });
    entries
}

#[async_trait]
impl MatchStore for InMemoryMatchStore {
    async fn participant(&self, id: &str) -> Result<Option<Participant>> {
        Ok(self.read()?.participants.get(id).cloned())
    }

    async fn ensure_participant(
        &self,
        id: &str,
        baseline_rating: i64,
        synthetic: bool,
    ) -> Result<Participant> {
        let mut inner = self.write()?;
        let now = current_timestamp();
        let entry = inner
            .participants
            .entry(id.to_string())
            .or_insert_with(|| Participant {
                id: id.to_string(),
                rating: baseline_rating,
                games_played: 0,
                banned: false,
                synthetic,
                created_at: now,
                updated_at: now,
            });
        entry.updated_at = now;
        Ok(entry.clone())
    }

    async fn apply_rating_change(&self, id: &str, delta: i64, games_delta: i64) -> Result<()> {
        let mut inner = self.write()?;
        let participant =
            inner
                .participants
                .get_mut(id)
                .ok_or_else(|| ScrimError::PlayerNotFound {
                    player_id: id.to_string(),
                })?;
        participant.rating += delta;
        participant.games_played += games_delta;
        participant.updated_at = current_timestamp();
        Ok(())
    }

    async fn set_banned(&self, id: &str, banned: bool) -> Result<bool> {
        let mut inner = self.write()?;
        match inner.participants.get_mut(id) {
            Some(participant) => {
                participant.banned = banned;
                participant.updated_at = current_timestamp();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn all_participants(&self) -> Result<Vec<Participant>> {
        Ok(self.read()?.participants.values().cloned().collect())
    }

    async fn queue_entries(&self) -> Result<Vec<QueueEntry>> {
        Ok(sorted_queue(&self.read()?.queue))
    }

    async fn queue_len(&self) -> Result<usize> {
        Ok(self.read()?.queue.len())
    }

    async fn is_queued(&self, id: &str) -> Result<bool> {
        Ok(self.read()?.queue.contains_key(id))
    }

    async fn try_insert_queue_entry(&self, id: &str, joined_at: DateTime<Utc>) -> Result<bool> {
        let mut inner = self.write()?;
        if inner.queue.contains_key(id) {
            return Ok(false);
        }
        inner.queue.insert(id.to_string(), joined_at);
        Ok(true)
    }

    async fn remove_queue_entry(&self, id: &str) -> Result<bool> {
        Ok(self.write()?.queue.remove(id).is_some())
    }

    async fn remove_queue_entries(&self, ids: &[ParticipantId]) -> Result<usize> {
        let mut inner = self.write()?;
        let mut removed = 0;
        for id in ids {
            if inner.queue.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn clear_queue(&self) -> Result<usize> {
        let mut inner = self.write()?;
        let removed = inner.queue.len();
        inner.queue.clear();
        Ok(removed)
    }

    async fn promote_to_front(&self, ids: &[ParticipantId]) -> Result<()> {
        let mut inner = self.write()?;
        let base = DateTime::<Utc>::UNIX_EPOCH;
        for (index, id) in ids.iter().enumerate() {
            let slot = base + Duration::milliseconds(index as i64);
            inner.queue.insert(id.clone(), slot);
        }
        Ok(())
    }

    async fn pending_ready_check(&self) -> Result<Option<ReadyCheck>> {
        Ok(self
            .read()?
            .ready_checks
            .values()
            .find(|rc| rc.status == ReadyCheckStatus::Pending)
            .cloned())
    }

    async fn ready_check(&self, rc_id: &str) -> Result<Option<ReadyCheck>> {
        Ok(self.read()?.ready_checks.get(rc_id).cloned())
    }

    async fn insert_ready_check_if_none_pending(&self, check: ReadyCheck) -> Result<bool> {
        let mut inner = self.write()?;
        let has_pending = inner
            .ready_checks
            .values()
            .any(|rc| rc.status == ReadyCheckStatus::Pending);
        if has_pending {
            return Ok(false);
        }
        inner.ready_checks.insert(check.rc_id.clone(), check);
        Ok(true)
    }

    async fn confirm_ready(&self, rc_id: &str, participant_id: &str) -> Result<ReadyCheck> {
        let mut inner = self.write()?;
        let check = inner.ready_checks.get_mut(rc_id);
        let check = match check {
            Some(check) if check.status == ReadyCheckStatus::Pending => check,
            _ => {
                return Err(ScrimError::CheckNotPending {
                    rc_id: rc_id.to_string(),
                }
                .into())
            }
        };
        if !check.participant_ids.iter().any(|id| id == participant_id) {
            return Err(ScrimError::NotInThisCheck {
                rc_id: rc_id.to_string(),
            }
            .into());
        }
        if check.confirmed_ids.iter().any(|id| id == participant_id) {
            return Err(ScrimError::AlreadyConfirmed.into());
        }
        check.confirmed_ids.push(participant_id.to_string());
        Ok(check.clone())
    }

    async fn set_ready_check_status(
        &self,
        rc_id: &str,
        from: ReadyCheckStatus,
        to: ReadyCheckStatus,
    ) -> Result<bool> {
        let mut inner = self.write()?;
        match inner.ready_checks.get_mut(rc_id) {
            Some(check) if check.status == from => {
                check.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn next_match_id(&self) -> Result<MatchId> {
        let mut inner = self.write()?;
        let counter = inner.counters.entry(MATCH_ID_COUNTER.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn insert_match(&self, record: MatchRecord) -> Result<()> {
        self.write()?.matches.insert(record.match_id, record);
        Ok(())
    }

    async fn match_record(&self, match_id: MatchId) -> Result<Option<MatchRecord>> {
        Ok(self.read()?.matches.get(&match_id).cloned())
    }

    async fn all_matches(&self) -> Result<Vec<MatchRecord>> {
        let mut matches: Vec<MatchRecord> = self.read()?.matches.values().cloned().collect();
        matches.sort_by_key(|m| m.match_id);
        Ok(matches)
    }

    async fn active_match_for(&self, participant_id: &str) -> Result<Option<MatchId>> {
        let inner = self.read()?;
        for row in &inner.match_participants {
            if row.participant_id != participant_id {
                continue;
            }
            if let Some(record) = inner.matches.get(&row.match_id) {
                if !record.status.is_terminal() {
                    return Ok(Some(record.match_id));
                }
            }
        }
        Ok(None)
    }

    async fn insert_match_participants(&self, rows: Vec<MatchParticipant>) -> Result<()> {
        self.write()?.match_participants.extend(rows);
        Ok(())
    }

    async fn match_participants(&self, match_id: MatchId) -> Result<Vec<MatchParticipant>> {
        Ok(self
            .read()?
            .match_participants
            .iter()
            .filter(|row| row.match_id == match_id)
            .cloned()
            .collect())
    }

    async fn set_match_space(
        &self,
        match_id: MatchId,
        space_id: Option<String>,
        voice_rooms: Option<VoiceRooms>,
    ) -> Result<()> {
        let mut inner = self.write()?;
        let record = inner
            .matches
            .get_mut(&match_id)
            .ok_or(ScrimError::MatchNotFound { match_id })?;
        record.space_id = space_id;
        record.voice_rooms = voice_rooms;
        Ok(())
    }

    async fn set_picked_map(&self, match_id: MatchId, map: &str) -> Result<()> {
        let mut inner = self.write()?;
        let record = inner
            .matches
            .get_mut(&match_id)
            .ok_or(ScrimError::MatchNotFound { match_id })?;
        record.picked_map = Some(map.to_string());
        Ok(())
    }

    async fn record_captain_vote(
        &self,
        match_id: MatchId,
        captain_team: Team,
        choice: Team,
    ) -> Result<MatchRecord> {
        let mut inner = self.write()?;
        let record = inner
            .matches
            .get_mut(&match_id)
            .ok_or(ScrimError::MatchNotFound { match_id })?;
        if record.status != MatchStatus::Voting {
            return Err(ScrimError::InvalidState {
                match_id,
                status: record.status.to_string(),
            }
            .into());
        }
        match captain_team {
            Team::A => record.captain_votes.team_a = Some(choice),
            Team::B => record.captain_votes.team_b = Some(choice),
        }
        Ok(record.clone())
    }

    async fn close_match(&self, match_id: MatchId, winner: Team) -> Result<CloseOutcome> {
        let mut inner = self.write()?;
        let record = inner
            .matches
            .get_mut(&match_id)
            .ok_or(ScrimError::MatchNotFound { match_id })?;
        match record.status {
            MatchStatus::Closed => Ok(CloseOutcome::AlreadyClosed),
            MatchStatus::Voting | MatchStatus::Review | MatchStatus::Reversed => {
                record.status = MatchStatus::Closed;
                record.winner = Some(winner);
                record.closed_at = Some(current_timestamp());
                Ok(CloseOutcome::Closed(record.clone()))
            }
            MatchStatus::Abandoned => Err(ScrimError::InvalidState {
                match_id,
                status: record.status.to_string(),
            }
            .into()),
        }
    }

    async fn mark_reversed(&self, match_id: MatchId) -> Result<MatchRecord> {
        let mut inner = self.write()?;
        let record = inner
            .matches
            .get_mut(&match_id)
            .ok_or(ScrimError::MatchNotFound { match_id })?;
        if record.status != MatchStatus::Closed {
            return Err(ScrimError::InvalidState {
                match_id,
                status: record.status.to_string(),
            }
            .into());
        }
        record.status = MatchStatus::Reversed;
        record.previous_winner = record.winner.take();
        record.reversed_at = Some(current_timestamp());
        Ok(record.clone())
    }

    async fn mark_abandoned(&self, match_id: MatchId) -> Result<MatchRecord> {
        let mut inner = self.write()?;
        let record = inner
            .matches
            .get_mut(&match_id)
            .ok_or(ScrimError::MatchNotFound { match_id })?;
        if matches!(record.status, MatchStatus::Closed | MatchStatus::Abandoned) {
            return Err(ScrimError::InvalidState {
                match_id,
                status: record.status.to_string(),
            }
            .into());
        }
        record.status = MatchStatus::Abandoned;
        record.canceled_at = Some(current_timestamp());
        Ok(record.clone())
    }

    async fn mark_review(&self, match_id: MatchId) -> Result<MatchRecord> {
        let mut inner = self.write()?;
        let record = inner
            .matches
            .get_mut(&match_id)
            .ok_or(ScrimError::MatchNotFound { match_id })?;
        if record.status != MatchStatus::Voting {
            return Err(ScrimError::InvalidState {
                match_id,
                status: record.status.to_string(),
            }
            .into());
        }
        record.status = MatchStatus::Review;
        Ok(record.clone())
    }

    async fn set_winner_set_by(&self, match_id: MatchId, admin_id: &str) -> Result<()> {
        let mut inner = self.write()?;
        let record = inner
            .matches
            .get_mut(&match_id)
            .ok_or(ScrimError::MatchNotFound { match_id })?;
        record.winner_set_by = Some(admin_id.to_string());
        Ok(())
    }

    async fn upsert_veto(&self, state: VetoState) -> Result<()> {
        self.write()?.vetoes.insert(state.match_id, state);
        Ok(())
    }

    async fn veto_state(&self, match_id: MatchId) -> Result<Option<VetoState>> {
        Ok(self.read()?.vetoes.get(&match_id).cloned())
    }

    async fn set_turn_deadline(
        &self,
        match_id: MatchId,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut inner = self.write()?;
        let state = inner
            .vetoes
            .get_mut(&match_id)
            .ok_or(ScrimError::MatchNotFound { match_id })?;
        state.turn_ends_at = deadline;
        state.updated_at = current_timestamp();
        Ok(())
    }

    async fn set_veto_captain(
        &self,
        match_id: MatchId,
        team: Team,
        participant_id: &str,
    ) -> Result<VetoState> {
        let mut inner = self.write()?;
        let state = inner
            .vetoes
            .get_mut(&match_id)
            .ok_or(ScrimError::MatchNotFound { match_id })?;
        let members = match team {
            Team::A => &state.team_a,
            Team::B => &state.team_b,
        };
        if !members.iter().any(|id| id == participant_id) {
            return Err(ScrimError::PlayerNotFound {
                player_id: participant_id.to_string(),
            }
            .into());
        }
        match team {
            Team::A => state.captain_a = participant_id.to_string(),
            Team::B => state.captain_b = participant_id.to_string(),
        }
        state.updated_at = current_timestamp();
        Ok(state.clone())
    }

    async fn apply_ban(
        &self,
        match_id: MatchId,
        actor: Option<&str>,
        map: &str,
    ) -> Result<VetoState> {
        let mut inner = self.write()?;
        let state = inner
            .vetoes
            .get_mut(&match_id)
            .ok_or(ScrimError::MatchNotFound { match_id })?;

        let current = match state.current_team {
            Some(team) => team,
            None => return Err(ScrimError::VetoFinished { match_id }.into()),
        };

        if let Some(actor_id) = actor {
            if state.captain_of(current) != actor_id {
                return Err(ScrimError::NotYourTurn { current }.into());
            }
        }

        let position = state.remaining.iter().position(|m| m == map);
        let position = match position {
            Some(position) => position,
            None => {
                return Err(ScrimError::MapUnavailable {
                    map: map.to_string(),
                }
                .into())
            }
        };
        state.remaining.remove(position);

        if state.remaining.len() == 1 {
            state.picked = Some(state.remaining[0].clone());
            state.current_team = None;
        } else {
            state.current_team = Some(current.other());
        }
        // Every accepted ban invalidates the old turn deadline; the next turn
        // is armed by the coordinator
        state.turn_ends_at = None;
        state.updated_at = current_timestamp();
        Ok(state.clone())
    }

    async fn append_rating_history(&self, entries: Vec<RatingHistoryEntry>) -> Result<()> {
        self.write()?.rating_history.extend(entries);
        Ok(())
    }

    async fn active_history_for_match(
        &self,
        match_id: MatchId,
    ) -> Result<Vec<RatingHistoryEntry>> {
        Ok(self
            .read()?
            .rating_history
            .iter()
            .filter(|row| row.match_id == match_id && !row.reverted)
            .cloned()
            .collect())
    }

    async fn mark_history_reverted(&self, match_id: MatchId) -> Result<usize> {
        let mut inner = self.write()?;
        let mut marked = 0;
        for row in inner
            .rating_history
            .iter_mut()
            .filter(|row| row.match_id == match_id && !row.reverted)
        {
            row.reverted = true;
            marked += 1;
        }
        Ok(marked)
    }

    async fn append_cancellation(&self, event: CancellationEvent) -> Result<()> {
        self.write()?.cancel_events.push(event);
        Ok(())
    }

    async fn cancellation_totals(&self) -> Result<Vec<(ParticipantId, i64)>> {
        let inner = self.read()?;
        let mut totals: HashMap<ParticipantId, i64> = HashMap::new();
        for event in &inner.cancel_events {
            *totals.entry(event.participant_id.clone()).or_insert(0) += event.weight;
        }
        let mut rows: Vec<(ParticipantId, i64)> = totals
            .into_iter()
            .filter(|(_, total)| *total > 0)
            .collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(rows)
    }

    async fn win_stats(&self) -> Result<HashMap<ParticipantId, WinStats>> {
        let inner = self.read()?;
        let mut stats: HashMap<ParticipantId, WinStats> = HashMap::new();
        for row in &inner.match_participants {
            let record = match inner.matches.get(&row.match_id) {
                Some(record) if record.status == MatchStatus::Closed => record,
                _ => continue,
            };
            let entry = stats.entry(row.participant_id.clone()).or_default();
            entry.games += 1;
            if record.winner == Some(row.team) {
                entry.wins += 1;
            }
        }
        Ok(stats)
    }

    async fn queue_settings(&self) -> Result<QueueSettings> {
        Ok(self.read()?.queue_settings.clone().unwrap_or_default())
    }

    async fn set_queue_settings(&self, settings: QueueSettings) -> Result<()> {
        self.write()?.queue_settings = Some(settings);
        Ok(())
    }

    async fn veto_settings(&self) -> Result<VetoSettings> {
        Ok(self.read()?.veto_settings.clone().unwrap_or_default())
    }

    async fn set_veto_settings(&self, settings: VetoSettings) -> Result<()> {
        self.write()?.veto_settings = Some(settings);
        Ok(())
    }

    async fn roles_for_action(&self, action: &str) -> Result<Vec<String>> {
        Ok(self
            .read()?
            .action_roles
            .get(action)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_roles_for_action(&self, action: &str, roles: Vec<String>) -> Result<()> {
        self.write()?.action_roles.insert(action.to_string(), roles);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CaptainVotes;

    fn new_match(match_id: MatchId) -> MatchRecord {
        MatchRecord {
            match_id,
            status: MatchStatus::Voting,
            winner: None,
            picked_map: None,
            space_id: None,
            voice_rooms: None,
            captain_votes: CaptainVotes::default(),
            previous_winner: None,
            winner_set_by: None,
            created_at: current_timestamp(),
            closed_at: None,
            reversed_at: None,
            canceled_at: None,
        }
    }

    fn new_veto(match_id: MatchId, maps: &[&str]) -> VetoState {
        let now = current_timestamp();
        VetoState {
            match_id,
            team_a: vec!["a1".into(), "a2".into()],
            team_b: vec!["b1".into(), "b2".into()],
            captain_a: "a1".into(),
            captain_b: "b1".into(),
            all_maps: maps.iter().map(|m| m.to_string()).collect(),
            remaining: maps.iter().map(|m| m.to_string()).collect(),
            current_team: Some(Team::A),
            turn_ends_at: None,
            picked: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_match_id_counter_is_monotonic() {
        let store = InMemoryMatchStore::new();
        assert_eq!(store.next_match_id().await.unwrap(), 1);
        assert_eq!(store.next_match_id().await.unwrap(), 2);
        assert_eq!(store.next_match_id().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_ensure_participant_keeps_existing_rating() {
        let store = InMemoryMatchStore::new();
        store.ensure_participant("p1", 1000, false).await.unwrap();
        store.apply_rating_change("p1", 50, 1).await.unwrap();

        let again = store.ensure_participant("p1", 1000, false).await.unwrap();
        assert_eq!(again.rating, 1050);
        assert_eq!(again.games_played, 1);
    }

    #[tokio::test]
    async fn test_queue_insert_is_duplicate_safe() {
        let store = InMemoryMatchStore::new();
        let now = current_timestamp();
        assert!(store.try_insert_queue_entry("p1", now).await.unwrap());
        assert!(!store.try_insert_queue_entry("p1", now).await.unwrap());
        assert_eq!(store.queue_len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_queue_ordering_and_promotion() {
        let store = InMemoryMatchStore::new();
        let base = current_timestamp();
        for i in 0..4 {
            store
                .try_insert_queue_entry(&format!("p{}", i), base + Duration::seconds(i))
                .await
                .unwrap();
        }

        store
            .promote_to_front(&["p3".to_string(), "p2".to_string()])
            .await
            .unwrap();

        let entries = store.queue_entries().await.unwrap();
        let order: Vec<&str> = entries.iter().map(|e| e.participant_id.as_str()).collect();
        assert_eq!(order, vec!["p3", "p2", "p0", "p1"]);
    }

    #[tokio::test]
    async fn test_only_one_pending_ready_check() {
        let store = InMemoryMatchStore::new();
        let now = current_timestamp();
        let check = ReadyCheck {
            rc_id: "rc1".into(),
            status: ReadyCheckStatus::Pending,
            participant_ids: vec!["p1".into()],
            confirmed_ids: vec![],
            created_at: now,
            deadline: now,
        };
        assert!(store
            .insert_ready_check_if_none_pending(check.clone())
            .await
            .unwrap());

        let mut second = check.clone();
        second.rc_id = "rc2".into();
        assert!(!store
            .insert_ready_check_if_none_pending(second.clone())
            .await
            .unwrap());

        // Once the first completes, a new check can be created
        assert!(store
            .set_ready_check_status("rc1", ReadyCheckStatus::Pending, ReadyCheckStatus::Complete)
            .await
            .unwrap());
        assert!(store
            .insert_ready_check_if_none_pending(second)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_confirm_ready_guards() {
        let store = InMemoryMatchStore::new();
        let now = current_timestamp();
        store
            .insert_ready_check_if_none_pending(ReadyCheck {
                rc_id: "rc1".into(),
                status: ReadyCheckStatus::Pending,
                participant_ids: vec!["p1".into(), "p2".into()],
                confirmed_ids: vec![],
                created_at: now,
                deadline: now,
            })
            .await
            .unwrap();

        assert!(store.confirm_ready("rc1", "outsider").await.is_err());
        store.confirm_ready("rc1", "p1").await.unwrap();
        assert!(store.confirm_ready("rc1", "p1").await.is_err());

        store
            .set_ready_check_status("rc1", ReadyCheckStatus::Pending, ReadyCheckStatus::Expired)
            .await
            .unwrap();
        // Late confirm after expiry is rejected
        assert!(store.confirm_ready("rc1", "p2").await.is_err());
    }

    #[tokio::test]
    async fn test_close_match_is_idempotent() {
        let store = InMemoryMatchStore::new();
        store.insert_match(new_match(1)).await.unwrap();

        match store.close_match(1, Team::A).await.unwrap() {
            CloseOutcome::Closed(record) => {
                assert_eq!(record.winner, Some(Team::A));
                assert!(record.closed_at.is_some());
            }
            CloseOutcome::AlreadyClosed => panic!("first close must apply"),
        }
        assert!(matches!(
            store.close_match(1, Team::B).await.unwrap(),
            CloseOutcome::AlreadyClosed
        ));
    }

    #[tokio::test]
    async fn test_reverse_requires_closed() {
        let store = InMemoryMatchStore::new();
        store.insert_match(new_match(1)).await.unwrap();
        assert!(store.mark_reversed(1).await.is_err());

        store.close_match(1, Team::B).await.unwrap();
        let reversed = store.mark_reversed(1).await.unwrap();
        assert_eq!(reversed.status, MatchStatus::Reversed);
        assert_eq!(reversed.winner, None);
        assert_eq!(reversed.previous_winner, Some(Team::B));
    }

    #[tokio::test]
    async fn test_abandon_blocked_for_closed() {
        let store = InMemoryMatchStore::new();
        store.insert_match(new_match(1)).await.unwrap();
        store.close_match(1, Team::A).await.unwrap();
        assert!(store.mark_abandoned(1).await.is_err());
    }

    #[tokio::test]
    async fn test_apply_ban_full_protocol() {
        let store = InMemoryMatchStore::new();
        store
            .upsert_veto(new_veto(1, &["m1", "m2", "m3"]))
            .await
            .unwrap();

        // Wrong captain
        assert!(store.apply_ban(1, Some("b1"), "m1").await.is_err());

        // Captain A bans, turn flips to B
        let state = store.apply_ban(1, Some("a1"), "m1").await.unwrap();
        assert_eq!(state.current_team, Some(Team::B));
        assert_eq!(state.remaining.len(), 2);

        // Banned map is rejected
        assert!(store.apply_ban(1, Some("b1"), "m1").await.is_err());

        // Final ban terminates with the last map picked
        let state = store.apply_ban(1, Some("b1"), "m2").await.unwrap();
        assert_eq!(state.current_team, None);
        assert_eq!(state.picked.as_deref(), Some("m3"));

        // Any further ban is rejected
        assert!(store.apply_ban(1, None, "m3").await.is_err());
    }

    #[tokio::test]
    async fn test_win_stats_only_counts_closed() {
        let store = InMemoryMatchStore::new();
        store.insert_match(new_match(1)).await.unwrap();
        store.insert_match(new_match(2)).await.unwrap();
        store
            .insert_match_participants(vec![
                MatchParticipant {
                    match_id: 1,
                    participant_id: "p1".into(),
                    team: Team::A,
                },
                MatchParticipant {
                    match_id: 2,
                    participant_id: "p1".into(),
                    team: Team::A,
                },
            ])
            .await
            .unwrap();
        store.close_match(1, Team::A).await.unwrap();

        let stats = store.win_stats().await.unwrap();
        let p1 = stats.get("p1").unwrap();
        assert_eq!(p1.games, 1);
        assert_eq!(p1.wins, 1);
    }

    #[tokio::test]
    async fn test_cancellation_totals_aggregate() {
        let store = InMemoryMatchStore::new();
        for (id, weight) in [("p1", 1), ("p2", 1), ("p1", 1)] {
            store
                .append_cancellation(CancellationEvent {
                    participant_id: id.to_string(),
                    rc_id: None,
                    reason: "ready-check-expired".into(),
                    weight,
                    created_at: current_timestamp(),
                })
                .await
                .unwrap();
        }
        let totals = store.cancellation_totals().await.unwrap();
        assert_eq!(totals[0], ("p1".to_string(), 2));
        assert_eq!(totals[1], ("p2".to_string(), 1));
    }
}
