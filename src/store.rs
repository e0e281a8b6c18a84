//! Remote store boundary.
//!
//! [`TerritoryStore`] is the contract the core needs from whatever backend
//! persists zones and players. Implementations are constructed explicitly and
//! passed to the code that needs them; nothing here is a process-wide client.
//!
//! Subscriptions push the full current listing on every change and hand back a
//! [`Subscription`] that stops delivery when cancelled or dropped.
//!
//! Ownership changes are conditional: [`TerritoryStore::update_zone_ownership`]
//! only writes if the zone still has the owner and record the caller
//! arbitrated against ([`RecordGuard`]), and fails with
//! [`TerritoryError::Conflict`] otherwise. Two runners challenging the same
//! zone at once therefore cannot both win against the same stale record.
//!
//! [`MemoryStore`] is an in-process implementation with the same semantics,
//! used by tests, demos and offline play.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::arbitration::{NewZone, OwnershipEntry, Zone};
use crate::error::{Result, TerritoryError};
use crate::format::player_color;
use crate::{now_millis, RunRecord};

/// Receives the full zone listing on every change.
pub type ZonesCallback = Arc<dyn Fn(&[Zone]) + Send + Sync>;

/// Receives the top players, most zones first, on every change.
pub type LeaderboardCallback = Arc<dyn Fn(&[Player]) + Send + Sync>;

// ============================================================================
// Records
// ============================================================================

/// Aggregate stats for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Player {
    #[serde(rename = "uid")]
    pub id: String,
    pub username: String,
    pub color: String,
    /// Meters, summed over winning runs
    pub total_distance: f64,
    /// Seconds, summed over winning runs
    pub total_time: u64,
    pub total_steps: u64,
    pub zones_owned: u32,
}

impl Player {
    /// A fresh player with zeroed stats and the colour derived from their id.
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        let id = id.into();
        let color = player_color(&id).to_string();
        Self {
            id,
            username: username.into(),
            color,
            total_distance: 0.0,
            total_time: 0,
            total_steps: 0,
            zones_owned: 0,
        }
    }

    /// Apply stat deltas. Totals never go below zero.
    pub fn apply(&mut self, deltas: &StatDeltas) {
        self.total_distance = (self.total_distance + deltas.distance_m).max(0.0);
        self.total_time = self.total_time.saturating_add(deltas.time_secs);
        self.total_steps = self.total_steps.saturating_add(deltas.steps);
        self.zones_owned = self.zones_owned.saturating_add_signed(deltas.zones_owned);
    }
}

/// Increments for a player's aggregate stats.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct StatDeltas {
    pub distance_m: f64,
    pub time_secs: u64,
    pub steps: u64,
    pub zones_owned: i32,
}

impl StatDeltas {
    /// Credit for a winning run: its distance (whole meters), time, steps and one zone.
    pub fn for_win(record: &RunRecord) -> Self {
        Self {
            distance_m: record.distance_m.round(),
            time_secs: record.duration_secs,
            steps: u64::from(record.steps),
            zones_owned: 1,
        }
    }

    /// Debit for the owner who just lost a zone.
    pub fn zone_lost() -> Self {
        Self { zones_owned: -1, ..Self::default() }
    }
}

/// The ownership a capture was arbitrated against.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct RecordGuard {
    pub owner_id: String,
    pub record: RunRecord,
}

impl RecordGuard {
    pub fn of(zone: &Zone) -> Self {
        Self { owner_id: zone.owner_id.clone(), record: zone.record }
    }

    /// True while the zone still carries the guarded owner and record.
    pub fn matches(&self, zone: &Zone) -> bool {
        zone.owner_id == self.owner_id && zone.record == self.record
    }
}

/// New owner fields for a captured zone plus the history entry to append.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct OwnershipChange {
    pub owner_id: String,
    pub owner_name: String,
    pub owner_color: String,
    pub record: RunRecord,
    pub claimed_at: i64,
    pub history_entry: OwnershipEntry,
}

impl OwnershipChange {
    /// Describe the write that turns `before` into the captured zone `after`.
    pub fn between(before: &Zone, after: &Zone) -> Self {
        Self {
            owner_id: after.owner_id.clone(),
            owner_name: after.owner_name.clone(),
            owner_color: after.owner_color.clone(),
            record: after.record,
            claimed_at: after.claimed_at,
            history_entry: OwnershipEntry {
                owner_id: before.owner_id.clone(),
                owner_name: before.owner_name.clone(),
                lost_at: after.claimed_at,
            },
        }
    }

    pub fn apply_to(&self, zone: &mut Zone) {
        zone.owner_id = self.owner_id.clone();
        zone.owner_name = self.owner_name.clone();
        zone.owner_color = self.owner_color.clone();
        zone.record = self.record;
        zone.claimed_at = self.claimed_at;
        zone.history.push(self.history_entry.clone());
    }
}

// ============================================================================
// Subscriptions
// ============================================================================

/// Handle for a live subscription. Delivery stops on [`Subscription::cancel`] or drop.
#[must_use = "dropping a Subscription cancels it"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

// ============================================================================
// Store Contract
// ============================================================================

/// Read/write access to zones and players.
pub trait TerritoryStore: Send + Sync {
    /// Deliver the full zone listing now and after every change.
    fn subscribe_zones(&self, callback: ZonesCallback) -> Result<Subscription>;

    /// Insert a zone and return its new id. The store sets `claimedAt`.
    fn create_zone(&self, zone: NewZone) -> Result<String>;

    fn get_zone(&self, zone_id: &str) -> Result<Option<Zone>>;

    /// Transfer ownership if the zone still matches `guard`.
    ///
    /// Fails with [`TerritoryError::Conflict`] when another write got there
    /// first, and [`TerritoryError::ZoneNotFound`] when the zone is gone.
    fn update_zone_ownership(&self, zone_id: &str, guard: &RecordGuard, change: &OwnershipChange) -> Result<()>;

    /// Deliver the top `limit` players by zones owned, now and after every change.
    fn subscribe_leaderboard(&self, limit: usize, callback: LeaderboardCallback) -> Result<Subscription>;

    fn get_player(&self, player_id: &str) -> Result<Option<Player>>;

    fn create_player(&self, player: Player) -> Result<()>;

    fn update_player_stats(&self, player_id: &str, deltas: &StatDeltas) -> Result<()>;
}

// ============================================================================
// In-memory Store
// ============================================================================

#[derive(Default)]
struct Inner {
    zones: Vec<Zone>,
    players: HashMap<String, Player>,
    zone_listeners: Vec<(u64, ZonesCallback)>,
    leaderboard_listeners: Vec<(u64, usize, LeaderboardCallback)>,
    next_listener: u64,
    next_zone: u64,
    offline: bool,
    failing_writes: u32,
}

impl Inner {
    fn check_online(&self) -> Result<()> {
        if self.offline {
            Err(TerritoryError::StoreUnavailable("store is offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn check_write(&mut self) -> Result<()> {
        self.check_online()?;
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(TerritoryError::StoreWriteFailed("write rejected".to_string()));
        }
        Ok(())
    }

    fn leaderboard(&self, limit: usize) -> Vec<Player> {
        let mut players: Vec<Player> = self.players.values().cloned().collect();
        players.sort_by(|a, b| {
            b.zones_owned
                .cmp(&a.zones_owned)
                .then_with(|| a.username.cmp(&b.username))
                .then_with(|| a.id.cmp(&b.id))
        });
        players.truncate(limit);
        players
    }
}

/// Pending listener calls, made after the store lock is released so a
/// callback may call back into the store.
struct Notifications {
    zones: Option<(Vec<Zone>, Vec<ZonesCallback>)>,
    leaderboards: Vec<(Vec<Player>, LeaderboardCallback)>,
}

impl Notifications {
    fn deliver(self) {
        if let Some((zones, callbacks)) = self.zones {
            for callback in callbacks {
                callback(&zones);
            }
        }
        for (players, callback) in self.leaderboards {
            callback(&players);
        }
    }
}

/// Thread-safe in-process [`TerritoryStore`].
///
/// Zones are listed in creation order. Failure switches
/// ([`MemoryStore::set_offline`], [`MemoryStore::fail_next_writes`]) let
/// callers exercise their error paths.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with [`TerritoryError::StoreUnavailable`].
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.offline = offline;
        }
    }

    /// Make the next `count` writes fail with [`TerritoryError::StoreWriteFailed`].
    pub fn fail_next_writes(&self, count: u32) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failing_writes = count;
        }
    }

    /// Current zone listing, in creation order.
    pub fn zones(&self) -> Result<Vec<Zone>> {
        let inner = self.lock()?;
        inner.check_online()?;
        Ok(inner.zones.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| TerritoryError::StoreUnavailable("store lock poisoned".to_string()))
    }

    fn zone_notifications(inner: &Inner) -> Notifications {
        let callbacks: Vec<ZonesCallback> = inner.zone_listeners.iter().map(|(_, cb)| Arc::clone(cb)).collect();
        Notifications {
            zones: Some((inner.zones.clone(), callbacks)),
            leaderboards: Vec::new(),
        }
    }

    fn leaderboard_notifications(inner: &Inner) -> Vec<(Vec<Player>, LeaderboardCallback)> {
        inner
            .leaderboard_listeners
            .iter()
            .map(|(_, limit, cb)| (inner.leaderboard(*limit), Arc::clone(cb)))
            .collect()
    }

    fn remove_listener(inner: &Weak<Mutex<Inner>>, listener_id: u64) {
        if let Some(inner) = inner.upgrade() {
            let mut inner = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            inner.zone_listeners.retain(|(id, _)| *id != listener_id);
            inner.leaderboard_listeners.retain(|(id, _, _)| *id != listener_id);
            debug!("[MemoryStore] Listener {} removed", listener_id);
        }
    }

    fn subscription_for(&self, listener_id: u64) -> Subscription {
        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || Self::remove_listener(&weak, listener_id))
    }
}

impl TerritoryStore for MemoryStore {
    fn subscribe_zones(&self, callback: ZonesCallback) -> Result<Subscription> {
        let (listener_id, initial) = {
            let mut inner = self.lock()?;
            inner.check_online()?;
            let listener_id = inner.next_listener;
            inner.next_listener += 1;
            inner.zone_listeners.push((listener_id, Arc::clone(&callback)));
            (listener_id, inner.zones.clone())
        };
        callback(&initial);
        Ok(self.subscription_for(listener_id))
    }

    fn create_zone(&self, zone: NewZone) -> Result<String> {
        let (zone_id, notifications) = {
            let mut inner = self.lock()?;
            inner.check_write()?;
            inner.next_zone += 1;
            let zone_id = format!("zone-{}", inner.next_zone);
            let owner = zone.owner_id.clone();
            inner.zones.push(zone.into_zone(zone_id.clone(), now_millis()));
            info!("[MemoryStore] Created {} for {}", zone_id, owner);
            (zone_id, Self::zone_notifications(&inner))
        };
        notifications.deliver();
        Ok(zone_id)
    }

    fn get_zone(&self, zone_id: &str) -> Result<Option<Zone>> {
        let inner = self.lock()?;
        inner.check_online()?;
        Ok(inner.zones.iter().find(|z| z.id == zone_id).cloned())
    }

    fn update_zone_ownership(&self, zone_id: &str, guard: &RecordGuard, change: &OwnershipChange) -> Result<()> {
        let notifications = {
            let mut inner = self.lock()?;
            inner.check_write()?;
            let zone = inner
                .zones
                .iter_mut()
                .find(|z| z.id == zone_id)
                .ok_or_else(|| TerritoryError::ZoneNotFound(zone_id.to_string()))?;

            if !guard.matches(zone) {
                warn!(
                    "[MemoryStore] Ownership write to {} rejected: expected owner {}, found {}",
                    zone_id, guard.owner_id, zone.owner_id
                );
                return Err(TerritoryError::Conflict { zone_id: zone_id.to_string() });
            }

            change.apply_to(zone);
            info!("[MemoryStore] {} now owned by {}", zone_id, change.owner_id);
            Self::zone_notifications(&inner)
        };
        notifications.deliver();
        Ok(())
    }

    fn subscribe_leaderboard(&self, limit: usize, callback: LeaderboardCallback) -> Result<Subscription> {
        let (listener_id, initial) = {
            let mut inner = self.lock()?;
            inner.check_online()?;
            let listener_id = inner.next_listener;
            inner.next_listener += 1;
            inner.leaderboard_listeners.push((listener_id, limit, Arc::clone(&callback)));
            (listener_id, inner.leaderboard(limit))
        };
        callback(&initial);
        Ok(self.subscription_for(listener_id))
    }

    fn get_player(&self, player_id: &str) -> Result<Option<Player>> {
        let inner = self.lock()?;
        inner.check_online()?;
        Ok(inner.players.get(player_id).cloned())
    }

    fn create_player(&self, player: Player) -> Result<()> {
        let notifications = {
            let mut inner = self.lock()?;
            inner.check_write()?;
            info!("[MemoryStore] Registered player {} ({})", player.id, player.username);
            inner.players.insert(player.id.clone(), player);
            Notifications {
                zones: None,
                leaderboards: Self::leaderboard_notifications(&inner),
            }
        };
        notifications.deliver();
        Ok(())
    }

    fn update_player_stats(&self, player_id: &str, deltas: &StatDeltas) -> Result<()> {
        let notifications = {
            let mut inner = self.lock()?;
            inner.check_write()?;
            let player = inner
                .players
                .get_mut(player_id)
                .ok_or_else(|| TerritoryError::PlayerNotFound(player_id.to_string()))?;
            player.apply(deltas);
            debug!("[MemoryStore] Stats for {}: {:?}", player_id, deltas);
            Notifications {
                zones: None,
                leaderboards: Self::leaderboard_notifications(&inner),
            }
        };
        notifications.deliver();
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeoPoint;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn new_zone(owner: &str, distance_m: f64, duration_secs: u64) -> NewZone {
        let coordinates = vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 0.001),
            GeoPoint::new(0.001, 0.001),
            GeoPoint::new(0.001, 0.0),
        ];
        NewZone {
            centroid: crate::geo_utils::compute_center(&coordinates),
            area_square_metres: crate::geo_utils::polygon_area(&coordinates),
            coordinates,
            owner_id: owner.to_string(),
            owner_name: owner.to_string(),
            owner_color: player_color(owner).to_string(),
            record: RunRecord { distance_m, duration_secs, steps: 0, started_at: 0 },
        }
    }

    fn capture_change(zone: &Zone, new_owner: &str, distance_m: f64) -> OwnershipChange {
        let mut after = zone.clone();
        after.owner_id = new_owner.to_string();
        after.owner_name = new_owner.to_string();
        after.record.distance_m = distance_m;
        after.claimed_at = zone.claimed_at + 1;
        OwnershipChange::between(zone, &after)
    }

    #[test]
    fn test_create_and_get_zone() {
        let store = MemoryStore::new();
        let id = store.create_zone(new_zone("ann", 500.0, 300)).unwrap();
        let zone = store.get_zone(&id).unwrap().unwrap();
        assert_eq!(zone.id, id);
        assert_eq!(zone.owner_id, "ann");
        assert!(zone.history.is_empty());
        assert!(zone.claimed_at > 0);
        assert!(store.get_zone("missing").unwrap().is_none());
    }

    #[test]
    fn test_zone_ids_are_unique_and_ordered() {
        let store = MemoryStore::new();
        let a = store.create_zone(new_zone("ann", 1.0, 1)).unwrap();
        let b = store.create_zone(new_zone("bob", 1.0, 1)).unwrap();
        assert_ne!(a, b);
        let ids: Vec<String> = store.zones().unwrap().into_iter().map(|z| z.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn test_conditional_ownership_update() {
        let store = MemoryStore::new();
        let id = store.create_zone(new_zone("ann", 500.0, 300)).unwrap();
        let zone = store.get_zone(&id).unwrap().unwrap();
        let guard = RecordGuard::of(&zone);

        store.update_zone_ownership(&id, &guard, &capture_change(&zone, "bob", 600.0)).unwrap();
        let updated = store.get_zone(&id).unwrap().unwrap();
        assert_eq!(updated.owner_id, "bob");
        assert_eq!(updated.record.distance_m, 600.0);
        assert_eq!(updated.history.len(), 1);
        assert_eq!(updated.history[0].owner_id, "ann");

        // Second writer arbitrated against the same stale record
        let err = store
            .update_zone_ownership(&id, &guard, &capture_change(&zone, "cat", 700.0))
            .unwrap_err();
        assert_eq!(err, TerritoryError::Conflict { zone_id: id.clone() });
        assert_eq!(store.get_zone(&id).unwrap().unwrap().owner_id, "bob");
    }

    #[test]
    fn test_ownership_update_missing_zone() {
        let store = MemoryStore::new();
        let id = store.create_zone(new_zone("ann", 500.0, 300)).unwrap();
        let zone = store.get_zone(&id).unwrap().unwrap();
        let err = store
            .update_zone_ownership("nope", &RecordGuard::of(&zone), &capture_change(&zone, "bob", 1.0))
            .unwrap_err();
        assert_eq!(err, TerritoryError::ZoneNotFound("nope".to_string()));
    }

    #[test]
    fn test_zone_subscription_delivers_and_cancels() {
        let store = MemoryStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let last_len = Arc::new(AtomicUsize::new(usize::MAX));

        let subscription = {
            let calls = Arc::clone(&calls);
            let last_len = Arc::clone(&last_len);
            store
                .subscribe_zones(Arc::new(move |zones: &[Zone]| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    last_len.store(zones.len(), Ordering::SeqCst);
                }))
                .unwrap()
        };
        // Initial delivery
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(last_len.load(Ordering::SeqCst), 0);

        store.create_zone(new_zone("ann", 1.0, 1)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(last_len.load(Ordering::SeqCst), 1);

        subscription.cancel();
        store.create_zone(new_zone("bob", 1.0, 1)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_dropping_subscription_cancels() {
        let store = MemoryStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let calls = Arc::clone(&calls);
            let _subscription = store
                .subscribe_zones(Arc::new(move |_: &[Zone]| {
                    calls.fetch_add(1, Ordering::SeqCst);
                }))
                .unwrap();
        }
        store.create_zone(new_zone("ann", 1.0, 1)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_may_read_store() {
        let store = MemoryStore::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let reader = store.clone();
        let seen_in_cb = Arc::clone(&seen);
        let _subscription = store
            .subscribe_zones(Arc::new(move |zones: &[Zone]| {
                if let Some(zone) = zones.last() {
                    // Would deadlock if listeners ran under the store lock
                    if reader.get_zone(&zone.id).unwrap().is_some() {
                        seen_in_cb.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }))
            .unwrap();
        store.create_zone(new_zone("ann", 1.0, 1)).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_player_stats_and_leaderboard() {
        let store = MemoryStore::new();
        store.create_player(Player::new("a1", "ann")).unwrap();
        store.create_player(Player::new("b1", "bob")).unwrap();
        store.create_player(Player::new("c1", "cat")).unwrap();

        let record = RunRecord { distance_m: 512.4, duration_secs: 300, steps: 670, started_at: 0 };
        store.update_player_stats("bob_missing", &StatDeltas::for_win(&record)).unwrap_err();
        store.update_player_stats("b1", &StatDeltas::for_win(&record)).unwrap();
        store.update_player_stats("b1", &StatDeltas::for_win(&record)).unwrap();
        store.update_player_stats("c1", &StatDeltas::for_win(&record)).unwrap();

        let bob = store.get_player("b1").unwrap().unwrap();
        assert_eq!(bob.total_distance, 1024.0);
        assert_eq!(bob.total_time, 600);
        assert_eq!(bob.total_steps, 1340);
        assert_eq!(bob.zones_owned, 2);

        let board = Arc::new(Mutex::new(Vec::<String>::new()));
        let board_in_cb = Arc::clone(&board);
        let _subscription = store
            .subscribe_leaderboard(2, Arc::new(move |players: &[Player]| {
                *board_in_cb.lock().unwrap() = players.iter().map(|p| p.username.clone()).collect();
            }))
            .unwrap();
        assert_eq!(*board.lock().unwrap(), vec!["bob", "cat"]);

        store.update_player_stats("b1", &StatDeltas::zone_lost()).unwrap();
        store.update_player_stats("b1", &StatDeltas::zone_lost()).unwrap();
        store.update_player_stats("b1", &StatDeltas::zone_lost()).unwrap();
        assert_eq!(store.get_player("b1").unwrap().unwrap().zones_owned, 0);
        assert_eq!(*board.lock().unwrap(), vec!["cat", "ann"]);
    }

    #[test]
    fn test_offline_and_failing_writes() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert!(matches!(store.zones(), Err(TerritoryError::StoreUnavailable(_))));
        assert!(matches!(
            store.create_zone(new_zone("ann", 1.0, 1)),
            Err(TerritoryError::StoreUnavailable(_))
        ));
        store.set_offline(false);

        store.fail_next_writes(1);
        assert!(matches!(
            store.create_zone(new_zone("ann", 1.0, 1)),
            Err(TerritoryError::StoreWriteFailed(_))
        ));
        assert!(store.create_zone(new_zone("ann", 1.0, 1)).is_ok());
    }

    #[test]
    fn test_player_document_shape() {
        let json = serde_json::to_value(Player::new("abc", "ann")).unwrap();
        assert_eq!(json["uid"], "abc");
        assert_eq!(json["zonesOwned"], 0);
        assert_eq!(json["totalDistance"], 0.0);
        assert_eq!(json["color"], player_color("abc"));
    }
}
