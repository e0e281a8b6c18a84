//! Claim orchestration: LOOP → CLAIMING → IDLE.
//!
//! [`ClaimCoordinator::submit`] takes a session whose path has closed, finds
//! the rival zone its centroid lands in (the runner's own zones are skipped),
//! arbitrates, and persists the outcome through a [`TerritoryStore`]. Captures are written conditionally; when the
//! zone changed between the caller's listing and the write, the coordinator
//! re-reads it and arbitrates again against the fresh owner.
//!
//! The zone write is the commit point. Player stat updates that follow it are
//! applied on a best-effort basis and reported in [`ClaimReport::stats_updated`].

use std::sync::Arc;

use log::{debug, info, warn};

use crate::arbitration::{arbitrate, Arbitration, Challenger, Outcome, Zone};
use crate::error::{Result, TerritoryError};
use crate::session::{RunPhase, RunSession};
use crate::store::{LeaderboardCallback, OwnershipChange, Player, RecordGuard, StatDeltas, Subscription, TerritoryStore};
use crate::zones::ZoneIndex;
use crate::RunRecord;

/// Tunables for claim submission.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ClaimConfig {
    /// Capture writes attempted before a conflict is surfaced.
    /// Default: 3
    pub max_capture_attempts: u32,
    /// Players delivered by [`ClaimCoordinator::watch_leaderboard`].
    /// Default: 20
    pub leaderboard_size: u32,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            max_capture_attempts: 3,
            leaderboard_size: 20,
        }
    }
}

/// Result of a submitted claim.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimReport {
    pub arbitration: Arbitration,
    /// Zone created or captured; `None` when rejected
    pub zone_id: Option<String>,
    /// Arbitrations run, including re-arbitrations after conflicts
    pub attempts: u32,
    /// False if any player stat update after the zone write failed
    pub stats_updated: bool,
}

/// Persists arbitration outcomes against a store.
pub struct ClaimCoordinator<S: ?Sized> {
    store: Arc<S>,
    config: ClaimConfig,
}

impl<S: TerritoryStore + ?Sized> ClaimCoordinator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, ClaimConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: ClaimConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &ClaimConfig {
        &self.config
    }

    /// Fetch a player, registering them with zeroed stats on first sight.
    pub fn ensure_player(&self, player_id: &str, username: &str) -> Result<Player> {
        if let Some(player) = self.store.get_player(player_id)? {
            return Ok(player);
        }
        let player = Player::new(player_id, username);
        self.store.create_player(player.clone())?;
        Ok(player)
    }

    /// Subscribe to the top players, sized by [`ClaimConfig::leaderboard_size`].
    pub fn watch_leaderboard(&self, callback: LeaderboardCallback) -> Result<Subscription> {
        self.store
            .subscribe_leaderboard(self.config.leaderboard_size as usize, callback)
    }

    /// Claim, capture or get rejected with the session's closed loop.
    ///
    /// `zones` is the caller's latest zone listing. The session must be in
    /// LOOP, or in CLAIMING when retrying after a store failure. On success
    /// or rejection the session returns to IDLE; on error it stays in
    /// CLAIMING so the caller can retry or reset.
    pub fn submit(
        &self,
        session: &mut RunSession,
        zones: &[Zone],
        player: &Player,
        now_ms: i64,
    ) -> Result<ClaimReport> {
        if session.phase() == RunPhase::Loop {
            session.begin_claim()?;
        }
        let polygon = session
            .closed_polygon()
            .cloned()
            .ok_or(TerritoryError::InvalidTransition {
                from: session.phase(),
                action: "submit a claim",
            })?;

        let record = session.run_record();
        let challenger = Challenger::new(player.id.clone(), player.username.clone(), player.color.clone(), record);
        let mut existing = ZoneIndex::new(zones.to_vec())
            .find_rival(&polygon, &player.id)
            .cloned();
        let max_attempts = self.config.max_capture_attempts.max(1);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let decision = arbitrate(existing.as_ref(), &polygon, &challenger, now_ms);
            debug!(
                "[ClaimCoordinator] Attempt {} for {}: {}",
                attempt, challenger.player_id, decision.reason
            );

            let written = match (&decision.outcome, existing.as_ref()) {
                (Outcome::Claim(new_zone), _) => {
                    let zone_id = self.store.create_zone(new_zone.clone())?;
                    info!("[ClaimCoordinator] {} claimed {}", challenger.player_id, zone_id);
                    let stats_updated = self.credit_winner(&challenger.player_id, &record);
                    return self.finish(session, decision, Some(zone_id), attempt, stats_updated);
                }
                (Outcome::Rejected(_), _) => {
                    info!(
                        "[ClaimCoordinator] {} rejected: {}",
                        challenger.player_id, decision.reason
                    );
                    return self.finish(session, decision, None, attempt, true);
                }
                (Outcome::Captured { zone: captured, .. }, Some(before)) => self
                    .store
                    .update_zone_ownership(
                        &before.id,
                        &RecordGuard::of(before),
                        &OwnershipChange::between(before, captured),
                    )
                    .map(|()| before.clone()),
                (Outcome::Captured { zone: captured, .. }, None) => {
                    Err(TerritoryError::ZoneNotFound(captured.id.clone()))
                }
            };

            match written {
                Ok(previous) => {
                    info!(
                        "[ClaimCoordinator] {} captured {} from {}",
                        challenger.player_id, previous.id, previous.owner_id
                    );
                    let winner_ok = self.credit_winner(&challenger.player_id, &record);
                    let loser_ok = self.debit_loser(&previous.owner_id);
                    return self.finish(session, decision, Some(previous.id), attempt, winner_ok && loser_ok);
                }
                Err(TerritoryError::Conflict { zone_id }) if attempt < max_attempts => {
                    warn!(
                        "[ClaimCoordinator] {} changed under {}, re-arbitrating",
                        zone_id, challenger.player_id
                    );
                    let fresh = self
                        .store
                        .get_zone(&zone_id)?
                        .ok_or(TerritoryError::ZoneNotFound(zone_id))?;
                    existing = Some(fresh);
                }
                Err(e) => {
                    warn!("[ClaimCoordinator] Claim by {} failed: {}", challenger.player_id, e);
                    return Err(e);
                }
            }
        }
    }

    fn finish(
        &self,
        session: &mut RunSession,
        arbitration: Arbitration,
        zone_id: Option<String>,
        attempts: u32,
        stats_updated: bool,
    ) -> Result<ClaimReport> {
        session.finish_claim()?;
        Ok(ClaimReport {
            arbitration,
            zone_id,
            attempts,
            stats_updated,
        })
    }

    fn credit_winner(&self, player_id: &str, record: &RunRecord) -> bool {
        match self.store.update_player_stats(player_id, &StatDeltas::for_win(record)) {
            Ok(()) => true,
            Err(e) => {
                warn!("[ClaimCoordinator] Stats for winner {} not updated: {}", player_id, e);
                false
            }
        }
    }

    fn debit_loser(&self, player_id: &str) -> bool {
        match self.store.update_player_stats(player_id, &StatDeltas::zone_lost()) {
            Ok(()) => true,
            Err(e) => {
                warn!("[ClaimCoordinator] Zone count for {} not updated: {}", player_id, e);
                false
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
