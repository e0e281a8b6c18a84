//! Zone arbitration: claim, capture or reject.
//!
//! [`arbitrate`] is a pure function. It looks at the zone the new loop landed
//! in (if any) and the challenger's run, and returns the zone state that
//! should be written together with a human-readable reason. Persisting that
//! state is the caller's job (see [`crate::claim::ClaimCoordinator`]).
//!
//! ## Rules
//!
//! | Existing zone | Condition | Outcome |
//! |---------------|-----------|---------|
//! | none | - | [`Outcome::Claim`] |
//! | owned by challenger | - | [`Outcome::Rejected`] |
//! | owned by someone else | faster time **or** more distance | [`Outcome::Captured`] |
//! | owned by someone else | neither | [`Outcome::Rejected`] |
//!
//! When both criteria hold, the reason reports the faster time.

use log::info;
use serde::{Deserialize, Serialize};

use crate::format::{format_minutes_seconds, player_color};
use crate::{GeoPoint, LoopPolygon, RunRecord};

// ============================================================================
// Zone Types
// ============================================================================

/// One past owner of a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct OwnershipEntry {
    pub owner_id: String,
    pub owner_name: String,
    /// When ownership was lost (Unix timestamp, milliseconds)
    pub lost_at: i64,
}

/// A claimed territory as stored remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Zone {
    pub id: String,
    /// Loop vertices as they were recorded by the first claimant
    pub coordinates: Vec<GeoPoint>,
    pub centroid: GeoPoint,
    #[serde(rename = "area")]
    pub area_square_metres: f64,
    pub owner_id: String,
    pub owner_name: String,
    pub owner_color: String,
    /// The record to beat: always the most recent winning run
    #[serde(flatten)]
    pub record: RunRecord,
    /// Previous owners, oldest first
    #[serde(default)]
    pub history: Vec<OwnershipEntry>,
    /// Last claim or capture (Unix timestamp, milliseconds)
    pub claimed_at: i64,
}

/// A zone about to be created by a first claim. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct NewZone {
    pub coordinates: Vec<GeoPoint>,
    pub centroid: GeoPoint,
    #[serde(rename = "area")]
    pub area_square_metres: f64,
    pub owner_id: String,
    pub owner_name: String,
    pub owner_color: String,
    #[serde(flatten)]
    pub record: RunRecord,
}

impl NewZone {
    /// Materialize the stored zone once the store has picked an id.
    pub fn into_zone(self, id: String, claimed_at: i64) -> Zone {
        Zone {
            id,
            coordinates: self.coordinates,
            centroid: self.centroid,
            area_square_metres: self.area_square_metres,
            owner_id: self.owner_id,
            owner_name: self.owner_name,
            owner_color: self.owner_color,
            record: self.record,
            history: Vec::new(),
            claimed_at,
        }
    }
}

/// The runner asking for a zone, with the run they are asking with.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Challenger {
    pub player_id: String,
    pub name: String,
    pub color: String,
    pub record: RunRecord,
}

impl Challenger {
    pub fn new(
        player_id: impl Into<String>,
        name: impl Into<String>,
        color: impl Into<String>,
        record: RunRecord,
    ) -> Self {
        Self {
            player_id: player_id.into(),
            name: name.into(),
            color: color.into(),
            record,
        }
    }

    /// Challenger whose colour is derived from their id.
    pub fn with_default_color(player_id: impl Into<String>, name: impl Into<String>, record: RunRecord) -> Self {
        let player_id = player_id.into();
        let color = player_color(&player_id);
        Self::new(player_id, name, color, record)
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Which part of the record the challenger beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum CaptureCriterion {
    FasterTime,
    MoreDistance,
}

/// Why a challenge failed.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// Players cannot capture their own zone
    AlreadyOwner,
    /// Neither the owner's time nor distance was beaten
    RecordNotBeaten { duration_secs: u64, distance_m: f64 },
}

/// What should happen to the zone.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// No zone here yet: create this one
    Claim(NewZone),
    /// Ownership moves to the challenger: write this zone state
    Captured { zone: Zone, criterion: CaptureCriterion },
    /// Nothing changes
    Rejected(RejectReason),
}

/// Decision plus the message shown to the runner.
#[derive(Debug, Clone, PartialEq)]
pub struct Arbitration {
    pub outcome: Outcome,
    pub reason: String,
}

impl Arbitration {
    /// True for claims and captures.
    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, Outcome::Rejected(_))
    }
}

// ============================================================================
// Arbitration
// ============================================================================

/// Decide who owns the ground under `candidate`.
///
/// `existing` is the zone whose polygon contains the candidate's centroid, as
/// found by [`crate::zones::find_rival_zone`]. `now_ms` stamps the
/// history entry and claim time of a capture.
///
/// # Example
/// ```
/// use territory_core::{arbitrate, Challenger, GeoPoint, LoopPolygon, Outcome, RunRecord};
///
/// let ring = vec![
///     GeoPoint::new(51.5000, -0.1300),
///     GeoPoint::new(51.5004, -0.1300),
///     GeoPoint::new(51.5004, -0.1294),
///     GeoPoint::new(51.5000, -0.1300),
/// ];
/// let polygon = LoopPolygon::from_closed_path(ring, 20.0, 3).unwrap();
/// let record = RunRecord { distance_m: 500.0, duration_secs: 300, steps: 650, started_at: 0 };
/// let runner = Challenger::new("uid-1", "ada", "#00f5a0", record);
///
/// let decision = arbitrate(None, &polygon, &runner, 0);
/// assert!(matches!(decision.outcome, Outcome::Claim(_)));
/// ```
pub fn arbitrate(
    existing: Option<&Zone>,
    candidate: &LoopPolygon,
    challenger: &Challenger,
    now_ms: i64,
) -> Arbitration {
    let Some(zone) = existing else {
        info!(
            "[Arbitration] Claim by {}: {:.0}m in {}s",
            challenger.player_id, challenger.record.distance_m, challenger.record.duration_secs
        );
        return Arbitration {
            outcome: Outcome::Claim(NewZone {
                coordinates: candidate.points().to_vec(),
                centroid: candidate.centroid(),
                area_square_metres: candidate.area(),
                owner_id: challenger.player_id.clone(),
                owner_name: challenger.name.clone(),
                owner_color: challenger.color.clone(),
                record: challenger.record,
            }),
            reason: "Zone claimed".to_string(),
        };
    };

    if zone.owner_id == challenger.player_id {
        info!("[Arbitration] {} already owns zone {}", challenger.player_id, zone.id);
        return Arbitration {
            outcome: Outcome::Rejected(RejectReason::AlreadyOwner),
            reason: "You already own this zone".to_string(),
        };
    }

    let faster_time = challenger.record.duration_secs < zone.record.duration_secs;
    let more_distance = challenger.record.distance_m > zone.record.distance_m;

    let criterion = match (faster_time, more_distance) {
        (true, _) => CaptureCriterion::FasterTime,
        (false, true) => CaptureCriterion::MoreDistance,
        (false, false) => {
            info!(
                "[Arbitration] {} failed to beat zone {} ({}s / {:.0}m)",
                challenger.player_id, zone.id, zone.record.duration_secs, zone.record.distance_m
            );
            return Arbitration {
                outcome: Outcome::Rejected(RejectReason::RecordNotBeaten {
                    duration_secs: zone.record.duration_secs,
                    distance_m: zone.record.distance_m,
                }),
                reason: format!(
                    "Beat the owner's time ({}) or distance ({:.0}m)",
                    format_minutes_seconds(zone.record.duration_secs),
                    zone.record.distance_m
                ),
            };
        }
    };

    let mut captured = zone.clone();
    captured.history.push(OwnershipEntry {
        owner_id: zone.owner_id.clone(),
        owner_name: zone.owner_name.clone(),
        lost_at: now_ms,
    });
    captured.owner_id = challenger.player_id.clone();
    captured.owner_name = challenger.name.clone();
    captured.owner_color = challenger.color.clone();
    captured.record = challenger.record;
    captured.claimed_at = now_ms;

    info!(
        "[Arbitration] {} captured zone {} from {} ({:?})",
        challenger.player_id, zone.id, zone.owner_id, criterion
    );

    let reason = match criterion {
        CaptureCriterion::FasterTime => "Faster time!",
        CaptureCriterion::MoreDistance => "More distance!",
    };
    Arbitration {
        outcome: Outcome::Captured { zone: captured, criterion },
        reason: reason.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
