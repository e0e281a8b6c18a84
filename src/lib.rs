//! # Territory Core
//!
//! Loop detection, zone geometry and capture rules for a GPS territory game.
//!
//! A runner traces a path; once the path comes back within 20 m of where it
//! started (after at least 10 fixes) it closes into a polygon. The runner can
//! claim that polygon as a zone, or, if its centroid lands inside another
//! player's zone, challenge the owner's record.
//!
//! This library provides:
//! - The geometry kernel ([`geo_utils`]): distance, area, centroid, containment
//! - The run session state machine ([`session`])
//! - Zone arbitration ([`arbitration`]) and overlap lookup ([`zones`])
//! - The remote store contract ([`store`]) and claim orchestration ([`claim`])
//! - An async tracker wiring sensor streams into a session ([`tracker`])
//!
//! ## Features
//!
//! - **`runtime`** (default) - Async run tracker built on tokio
//! - **`parallel`** - Parallel zone scanning with rayon
//! - **`ffi`** - FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use territory_core::{arbitrate, Challenger, GeoPoint, LocationPermission, Outcome, RunSession};
//!
//! let mut session = RunSession::default();
//! session.start(LocationPermission::Granted, 0).unwrap();
//!
//! // A small square loop, ~45 m per side, ending back at the start
//! let start = GeoPoint::new(51.5000, -0.1300);
//! let corners = [
//!     GeoPoint::new(51.5000, -0.1300),
//!     GeoPoint::new(51.5004, -0.1300),
//!     GeoPoint::new(51.5004, -0.1294),
//!     GeoPoint::new(51.5000, -0.1294),
//! ];
//! for i in 0..12 {
//!     session.on_tick(i as u64 * 20);
//!     let fix = if i == 11 { start } else { corners[i % 4] };
//!     session.on_location_fix(fix, Some(5.0));
//! }
//!
//! let polygon = session.closed_polygon().cloned().unwrap();
//! let runner = Challenger::new("uid-1", "ada", "#00f5a0", session.run_record());
//! let decision = arbitrate(None, &polygon, &runner, 0);
//! assert!(matches!(decision.outcome, Outcome::Claim(_)));
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, TerritoryError};

// Geometry kernel (distance, area, centroid, containment, loop closure)
pub mod geo_utils;

// Display helpers shared with the UI layer
pub mod format;
pub use format::{format_distance, format_duration, player_color};

// Run session state machine
pub mod session;
pub use session::{
    LocationFix, LocationPermission, MotionSample, FixOutcome, RunPhase, RunSession,
    SessionConfig, SessionSnapshot, StepDetector,
};

// Claim / capture / reject decision
pub mod arbitration;
pub use arbitration::{
    arbitrate, Arbitration, CaptureCriterion, Challenger, NewZone, OwnershipEntry, Outcome,
    RejectReason, Zone,
};

// Overlap lookup against the known zone set
pub mod zones;
pub use zones::{find_overlapping_zone, find_rival_zone, ZoneIndex};
#[cfg(feature = "parallel")]
pub use zones::find_rival_zone_parallel;

// Remote store boundary
pub mod store;
pub use store::{
    MemoryStore, OwnershipChange, Player, RecordGuard, StatDeltas, Subscription, TerritoryStore,
};

// Claim orchestration (arbitrate + persist + stats)
pub mod claim;
pub use claim::{ClaimConfig, ClaimCoordinator, ClaimReport};

// Async tracker driving a session from sensor streams
#[cfg(feature = "runtime")]
pub mod tracker;
#[cfg(feature = "runtime")]
pub use tracker::{RunTracker, SensorHub};

// FFI exports (only when feature enabled)
#[cfg(feature = "ffi")]
mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("TerritoryCore")
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude in decimal degrees.
///
/// # Example
/// ```
/// use territory_core::GeoPoint;
/// let point = GeoPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box of a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

/// Performance record of one run: what a zone owner has to defend.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct RunRecord {
    /// Distance covered in meters
    #[serde(rename = "distance")]
    pub distance_m: f64,
    /// Elapsed wall-clock time in whole seconds
    #[serde(rename = "durationSeconds")]
    pub duration_secs: u64,
    /// Fused step count
    pub steps: u32,
    /// Session start (Unix timestamp, milliseconds)
    pub started_at: i64,
}

/// A path frozen at the instant it closed into a loop.
///
/// Always holds at least three points and its first and last points were
/// within the closure threshold when it was frozen. The only ways to get one
/// are a session closing ([`RunSession::on_location_fix`]) or
/// [`LoopPolygon::from_closed_path`], which checks the same predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopPolygon {
    points: Vec<GeoPoint>,
}

impl LoopPolygon {
    pub(crate) fn freeze(points: Vec<GeoPoint>) -> Self {
        debug_assert!(points.len() >= 3);
        Self { points }
    }

    /// Build a polygon from an already-closed path.
    ///
    /// Returns `None` unless the path has at least `max(min_points, 3)` points
    /// and ends within `threshold_meters` of its start.
    ///
    /// # Example
    /// ```
    /// use territory_core::{GeoPoint, LoopPolygon};
    ///
    /// let ring = vec![
    ///     GeoPoint::new(51.5000, -0.1300),
    ///     GeoPoint::new(51.5004, -0.1300),
    ///     GeoPoint::new(51.5004, -0.1294),
    ///     GeoPoint::new(51.5000, -0.1300),
    /// ];
    /// assert!(LoopPolygon::from_closed_path(ring.clone(), 20.0, 4).is_some());
    /// assert!(LoopPolygon::from_closed_path(ring, 20.0, 10).is_none());
    /// ```
    pub fn from_closed_path(points: Vec<GeoPoint>, threshold_meters: f64, min_points: usize) -> Option<Self> {
        if geo_utils::is_loop_closed(&points, threshold_meters, min_points.max(3)) {
            Some(Self::freeze(points))
        } else {
            None
        }
    }

    /// Vertices in the order they were recorded.
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Vertex-average centroid, used as the loop's location for overlap tests.
    pub fn centroid(&self) -> GeoPoint {
        geo_utils::compute_center(&self.points)
    }

    /// Approximate enclosed area in square meters.
    pub fn area(&self) -> f64 {
        geo_utils::polygon_area(&self.points)
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        geo_utils::point_in_polygon(point, &self.points)
    }

    pub fn into_points(self) -> Vec<GeoPoint> {
        self.points
    }
}

/// Current time as a Unix timestamp in milliseconds.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_validation() {
        assert!(GeoPoint::new(51.5074, -0.1278).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, 181.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_loop_polygon_requires_three_points() {
        let p = GeoPoint::new(51.5, -0.13);
        assert!(LoopPolygon::from_closed_path(vec![p, p], 20.0, 0).is_none());
        let polygon = LoopPolygon::from_closed_path(vec![p, p, p], 20.0, 0).unwrap();
        assert_eq!(polygon.len(), 3);
        assert!(!polygon.is_empty());
    }

    #[test]
    fn test_loop_polygon_rejects_open_path() {
        let path = vec![
            GeoPoint::new(51.5000, -0.1300),
            GeoPoint::new(51.5004, -0.1300),
            GeoPoint::new(51.5008, -0.1300),
        ];
        assert!(LoopPolygon::from_closed_path(path, 20.0, 3).is_none());
    }

    #[test]
    fn test_run_record_document_fields() {
        let record = RunRecord {
            distance_m: 512.0,
            duration_secs: 300,
            steps: 674,
            started_at: 1_700_000_000_000,
        };
        let json = serde_json::to_value(record).unwrap();
        assert_eq!(json["distance"], 512.0);
        assert_eq!(json["durationSeconds"], 300);
        assert_eq!(json["steps"], 674);
        assert_eq!(json["startedAt"], 1_700_000_000_000_i64);
    }
}
