//! UniFFI exports for the mobile app.
//!
//! The UI layer owns the map, the sensors and the remote store client. It
//! feeds sensor events into an [`FfiRunSession`] and asks the core for
//! geometry and arbitration decisions.

use std::sync::{Mutex, MutexGuard};

use log::{debug, info};

use crate::arbitration::{arbitrate, Arbitration, CaptureCriterion, Challenger, NewZone, Outcome, RejectReason, Zone};
use crate::claim::ClaimConfig;
use crate::error::TerritoryError;
use crate::geo_utils::{self, DEFAULT_CLOSURE_THRESHOLD_M};
use crate::session::{FixOutcome, LocationFix, LocationPermission, MotionSample, RunSession, SessionConfig, SessionSnapshot};
use crate::zones::find_rival_zone_parallel;
use crate::{format, init_logging, GeoPoint, LoopPolygon, RunRecord};

// ============================================================================
// Errors
// ============================================================================

/// Error surfaced to Kotlin/Swift. Only the message crosses the boundary.
#[derive(Debug, thiserror::Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum FfiError {
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    InvalidPolygon(String),
    #[error("{0}")]
    Store(String),
}

impl From<TerritoryError> for FfiError {
    fn from(err: TerritoryError) -> Self {
        let message = err.to_string();
        match err {
            TerritoryError::PermissionDenied => FfiError::PermissionDenied(message),
            TerritoryError::InvalidTransition { .. } => FfiError::InvalidState(message),
            _ => FfiError::Store(message),
        }
    }
}

// ============================================================================
// Arbitration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiOutcomeKind {
    Claim,
    Captured,
    Rejected,
}

/// Flattened [`Arbitration`]: exactly one of `new_zone` / `captured_zone` is
/// set for claims and captures, neither for rejections.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiArbitration {
    pub kind: FfiOutcomeKind,
    pub reason: String,
    pub new_zone: Option<NewZone>,
    pub captured_zone: Option<Zone>,
    pub criterion: Option<CaptureCriterion>,
    /// True when the challenger already owns the zone
    pub already_owner: bool,
}

impl From<Arbitration> for FfiArbitration {
    fn from(arbitration: Arbitration) -> Self {
        let mut result = FfiArbitration {
            kind: FfiOutcomeKind::Rejected,
            reason: arbitration.reason,
            new_zone: None,
            captured_zone: None,
            criterion: None,
            already_owner: false,
        };
        match arbitration.outcome {
            Outcome::Claim(zone) => {
                result.kind = FfiOutcomeKind::Claim;
                result.new_zone = Some(zone);
            }
            Outcome::Captured { zone, criterion } => {
                result.kind = FfiOutcomeKind::Captured;
                result.captured_zone = Some(zone);
                result.criterion = Some(criterion);
            }
            Outcome::Rejected(reason) => {
                result.already_owner = reason == RejectReason::AlreadyOwner;
            }
        }
        result
    }
}

/// Overlap lookup plus arbitration for a closed loop.
///
/// `polygon` must already satisfy the closure predicate at the default
/// threshold with at least three points.
#[uniffi::export]
pub fn ffi_arbitrate(
    zones: Vec<Zone>,
    polygon: Vec<GeoPoint>,
    challenger: Challenger,
    now_ms: i64,
) -> Result<FfiArbitration, FfiError> {
    init_logging();
    let candidate = LoopPolygon::from_closed_path(polygon, DEFAULT_CLOSURE_THRESHOLD_M, 3)
        .ok_or_else(|| FfiError::InvalidPolygon("Path does not form a closed loop".to_string()))?;
    Ok(arbitrate_against(&zones, &candidate, &challenger, now_ms))
}

fn arbitrate_against(zones: &[Zone], candidate: &LoopPolygon, challenger: &Challenger, now_ms: i64) -> FfiArbitration {
    let existing = find_rival_zone_parallel(zones, candidate, &challenger.player_id);
    debug!(
        "[TerritoryFfi] Arbitrating {} against {} zones (overlap: {:?})",
        challenger.player_id,
        zones.len(),
        existing.map(|z| z.id.as_str())
    );
    arbitrate(existing, candidate, challenger, now_ms).into()
}

/// First zone, in listing order, containing the centroid of `polygon`.
#[uniffi::export]
pub fn ffi_find_overlapping_zone(zones: Vec<Zone>, polygon: Vec<GeoPoint>) -> Option<Zone> {
    let centroid = geo_utils::compute_center(&polygon);
    zones
        .into_iter()
        .find(|zone| geo_utils::point_in_polygon(&centroid, &zone.coordinates))
}

// ============================================================================
// Geometry
// ============================================================================

#[uniffi::export]
pub fn ffi_distance_between(p1: GeoPoint, p2: GeoPoint) -> f64 {
    geo_utils::haversine_distance(&p1, &p2)
}

#[uniffi::export]
pub fn ffi_path_length(points: Vec<GeoPoint>) -> f64 {
    geo_utils::polyline_length(&points)
}

#[uniffi::export]
pub fn ffi_steps_from_distance(distance_m: f64) -> u32 {
    geo_utils::steps_from_distance(distance_m)
}

#[uniffi::export]
pub fn ffi_is_loop_closed(points: Vec<GeoPoint>, threshold_m: f64, min_points: u32) -> bool {
    geo_utils::is_loop_closed(&points, threshold_m, min_points as usize)
}

#[uniffi::export]
pub fn ffi_centroid(points: Vec<GeoPoint>) -> GeoPoint {
    geo_utils::compute_center(&points)
}

#[uniffi::export]
pub fn ffi_polygon_area(points: Vec<GeoPoint>) -> f64 {
    geo_utils::polygon_area(&points)
}

#[uniffi::export]
pub fn ffi_point_in_polygon(point: GeoPoint, polygon: Vec<GeoPoint>) -> bool {
    geo_utils::point_in_polygon(&point, &polygon)
}

/// Points from a flat `[lat1, lng1, lat2, lng2, ...]` buffer. A trailing odd value is dropped.
#[uniffi::export]
pub fn points_from_flat(coords: Vec<f64>) -> Vec<GeoPoint> {
    coords
        .chunks_exact(2)
        .map(|pair| GeoPoint::new(pair[0], pair[1]))
        .collect()
}

// ============================================================================
// Display & Defaults
// ============================================================================

#[uniffi::export]
pub fn ffi_format_duration(seconds: u64) -> String {
    format::format_duration(seconds)
}

#[uniffi::export]
pub fn ffi_format_distance(meters: f64) -> String {
    format::format_distance(meters)
}

#[uniffi::export]
pub fn ffi_player_color(player_id: String) -> String {
    format::player_color(&player_id).to_string()
}

#[uniffi::export]
pub fn default_session_config() -> SessionConfig {
    init_logging();
    info!("[TerritoryFfi] default_session_config called");
    SessionConfig::default()
}

#[uniffi::export]
pub fn default_claim_config() -> ClaimConfig {
    ClaimConfig::default()
}

// ============================================================================
// Run Session Object
// ============================================================================

/// A [`RunSession`] shared with the UI thread and sensor callbacks.
#[derive(uniffi::Object)]
pub struct FfiRunSession {
    session: Mutex<RunSession>,
}

impl FfiRunSession {
    fn lock(&self) -> MutexGuard<'_, RunSession> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[uniffi::export]
impl FfiRunSession {
    #[uniffi::constructor]
    pub fn new(config: SessionConfig) -> Self {
        init_logging();
        Self {
            session: Mutex::new(RunSession::new(config)),
        }
    }

    pub fn start(&self, permission: LocationPermission, now_ms: i64) -> Result<(), FfiError> {
        Ok(self.lock().start(permission, now_ms)?)
    }

    pub fn on_location_fix(&self, fix: LocationFix) -> FixOutcome {
        self.lock().on_location_fix(fix.point, fix.accuracy_m)
    }

    /// Returns true when the sample registered a step.
    pub fn on_motion_sample(&self, sample: MotionSample) -> bool {
        self.lock().on_motion_sample(&sample)
    }

    pub fn on_tick(&self, elapsed_secs: u64) {
        self.lock().on_tick(elapsed_secs)
    }

    pub fn stop(&self) -> Result<(), FfiError> {
        Ok(self.lock().stop()?)
    }

    pub fn begin_claim(&self) -> Result<(), FfiError> {
        Ok(self.lock().begin_claim()?)
    }

    pub fn finish_claim(&self) -> Result<(), FfiError> {
        Ok(self.lock().finish_claim()?)
    }

    pub fn reset(&self) {
        self.lock().reset()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    pub fn run_record(&self) -> RunRecord {
        self.lock().run_record()
    }

    /// The frozen loop, once the path has closed.
    pub fn closed_polygon(&self) -> Option<Vec<GeoPoint>> {
        self.lock().closed_polygon().map(|polygon| polygon.points().to_vec())
    }

    /// Arbitrate this session's closed loop against `zones`. Does not change phase.
    pub fn arbitrate(
        &self,
        zones: Vec<Zone>,
        player_id: String,
        player_name: String,
        player_color: String,
        now_ms: i64,
    ) -> Result<FfiArbitration, FfiError> {
        let session = self.lock();
        let candidate = session
            .closed_polygon()
            .ok_or_else(|| FfiError::InvalidState(format!("No closed loop while session is {:?}", session.phase())))?;
        let challenger = Challenger::new(player_id, player_name, player_color, session.run_record());
        Ok(arbitrate_against(&zones, candidate, &challenger, now_ms))
    }
}
