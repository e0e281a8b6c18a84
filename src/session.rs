//! Run session state machine.
//!
//! One [`RunSession`] tracks one attempt at tracing a loop:
//!
//! ```text
//! Idle ──start──▶ Running ──loop closes──▶ Loop ──begin_claim──▶ Claiming ──finish_claim──▶ Idle
//!                    │                        │
//!                    └──stop──▶ Idle          └──reset (discard)──▶ Idle
//! ```
//!
//! The session is a plain synchronous value. It does not own any sensor
//! stream; whoever drives it (see [`crate::tracker::RunTracker`]) feeds it
//! location fixes, motion samples and timer ticks one at a time and must stop
//! feeding as soon as [`FixOutcome::LoopClosed`] comes back. The session also
//! ignores every input outside [`RunPhase::Running`], so a late event can never
//! grow a frozen loop.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TerritoryError};
use crate::geo_utils::{self, DEFAULT_CLOSURE_THRESHOLD_M, DEFAULT_MIN_LOOP_POINTS};
use crate::{GeoPoint, LoopPolygon, RunRecord};

// ============================================================================
// Types
// ============================================================================

/// Lifecycle phase of a run session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum RunPhase {
    /// Not running
    #[default]
    Idle,
    /// Actively tracking
    Running,
    /// Loop closed, waiting for the runner to claim or discard it
    Loop,
    /// Claim or capture is being persisted
    Claiming,
}

/// Answer from the platform's location permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum LocationPermission {
    Granted,
    Denied,
}

/// One fix from the location source.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct LocationFix {
    pub point: GeoPoint,
    /// Horizontal accuracy reported by the receiver, if any
    pub accuracy_m: Option<f64>,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, accuracy_m: Option<f64>) -> Self {
        Self { point: GeoPoint::new(latitude, longitude), accuracy_m }
    }
}

/// One 3-axis accelerometer reading.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct MotionSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Milliseconds on any monotonic clock; only differences are used
    pub timestamp_ms: u64,
}

impl MotionSample {
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// What a location fix did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum FixOutcome {
    /// Session was not running; nothing changed
    Ignored,
    /// Point appended, path still open
    Appended,
    /// Point appended and the path closed; the session is now in [`RunPhase::Loop`]
    LoopClosed,
}

/// Configuration for loop detection and step counting.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SessionConfig {
    /// Maximum distance between first and last fix for the path to count as closed.
    /// Default: 20.0 meters
    pub closure_threshold_m: f64,

    /// Minimum number of fixes before closure is considered. Values below 3 act as 3.
    /// Default: 10
    pub min_loop_points: u32,

    /// Accelerometer magnitude a step must rise above.
    /// Default: 1.2
    pub step_threshold: f64,

    /// Crossings within this many milliseconds of the previous step are ignored.
    /// Default: 300
    pub step_debounce_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            closure_threshold_m: DEFAULT_CLOSURE_THRESHOLD_M,
            min_loop_points: DEFAULT_MIN_LOOP_POINTS as u32,
            step_threshold: 1.2,
            step_debounce_ms: 300,
        }
    }
}

/// Read-only view of a session for HUD rendering.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SessionSnapshot {
    pub phase: RunPhase,
    pub point_count: u32,
    pub distance_m: f64,
    pub steps: u32,
    pub elapsed_secs: u64,
    /// Most recent fix, if any
    pub location: Option<GeoPoint>,
    pub accuracy_m: Option<f64>,
}

// ============================================================================
// Step Detection
// ============================================================================

/// Threshold-crossing step detector over accelerometer magnitude.
///
/// A step is one upward crossing of the threshold. Crossings closer than the
/// debounce window to the previous step are the same footfall ringing and are
/// dropped.
#[derive(Debug, Clone)]
pub struct StepDetector {
    threshold: f64,
    debounce_ms: u64,
    last_magnitude: f64,
    last_step_ms: Option<u64>,
    count: u32,
}

impl StepDetector {
    pub fn new(threshold: f64, debounce_ms: u64) -> Self {
        Self {
            threshold,
            debounce_ms,
            last_magnitude: 0.0,
            last_step_ms: None,
            count: 0,
        }
    }

    /// Feed one sample. Returns true if it produced a step.
    pub fn process(&mut self, sample: &MotionSample) -> bool {
        let magnitude = sample.magnitude();
        let crossed = magnitude > self.threshold && self.last_magnitude <= self.threshold;
        let settled = self
            .last_step_ms
            .map_or(true, |last| sample.timestamp_ms.saturating_sub(last) > self.debounce_ms);

        self.last_magnitude = magnitude;

        if crossed && settled {
            self.count += 1;
            self.last_step_ms = Some(sample.timestamp_ms);
            true
        } else {
            false
        }
    }

    /// Steps detected since creation or the last reset.
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn reset(&mut self) {
        self.last_magnitude = 0.0;
        self.last_step_ms = None;
        self.count = 0;
    }
}

// ============================================================================
// Run Session
// ============================================================================

/// State of one run attempt.
#[derive(Debug, Clone)]
pub struct RunSession {
    config: SessionConfig,
    phase: RunPhase,
    path: Vec<GeoPoint>,
    distance_m: f64,
    steps: u32,
    elapsed_secs: u64,
    started_at: i64,
    closed: Option<LoopPolygon>,
    last_location: Option<GeoPoint>,
    last_accuracy: Option<f64>,
    detector: StepDetector,
}

impl Default for RunSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl RunSession {
    pub fn new(config: SessionConfig) -> Self {
        let detector = StepDetector::new(config.step_threshold, config.step_debounce_ms);
        Self {
            config,
            phase: RunPhase::Idle,
            path: Vec::new(),
            distance_m: 0.0,
            steps: 0,
            elapsed_secs: 0,
            started_at: 0,
            closed: None,
            last_location: None,
            last_accuracy: None,
            detector,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Points recorded so far, in arrival order.
    pub fn path(&self) -> &[GeoPoint] {
        &self.path
    }

    pub fn distance(&self) -> f64 {
        self.distance_m
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    /// The frozen loop, once the path has closed.
    pub fn closed_polygon(&self) -> Option<&LoopPolygon> {
        self.closed.as_ref()
    }

    /// Begin a run.
    ///
    /// Fails with [`TerritoryError::PermissionDenied`] without touching the
    /// session if location access was refused, and with
    /// [`TerritoryError::InvalidTransition`] unless the session is idle.
    pub fn start(&mut self, permission: LocationPermission, now_ms: i64) -> Result<()> {
        if permission == LocationPermission::Denied {
            warn!("[RunSession] Start refused: location permission denied");
            return Err(TerritoryError::PermissionDenied);
        }
        self.expect_phase(RunPhase::Idle, "start")?;

        self.clear();
        self.started_at = now_ms;
        self.phase = RunPhase::Running;
        info!("[RunSession] Started at {}", now_ms);
        Ok(())
    }

    /// Apply one location fix.
    ///
    /// Appends the point, grows the live distance by the new segment, resyncs
    /// the step count against the distance estimate and tests for closure. On
    /// closure the path is frozen into a [`LoopPolygon`] and the session moves
    /// to [`RunPhase::Loop`]; the caller must then tear down its input streams.
    pub fn on_location_fix(&mut self, point: GeoPoint, accuracy_m: Option<f64>) -> FixOutcome {
        if self.phase != RunPhase::Running {
            debug!("[RunSession] Ignoring fix while {:?}", self.phase);
            return FixOutcome::Ignored;
        }

        self.last_location = Some(point);
        self.last_accuracy = accuracy_m;

        if let Some(prev) = self.path.last() {
            self.distance_m += geo_utils::haversine_distance(prev, &point);
            // Sensor undercounts are topped up from the stride estimate
            self.steps = self.steps.max(geo_utils::steps_from_distance(self.distance_m));
        }
        self.path.push(point);

        let min_points = (self.config.min_loop_points as usize).max(3);
        if geo_utils::is_loop_closed(&self.path, self.config.closure_threshold_m, min_points) {
            let polygon = LoopPolygon::freeze(self.path.clone());
            info!(
                "[RunSession] Loop closed: {} points, {:.0}m, {}s, area {:.0}m²",
                polygon.len(),
                self.distance_m,
                self.elapsed_secs,
                polygon.area()
            );
            self.closed = Some(polygon);
            self.phase = RunPhase::Loop;
            return FixOutcome::LoopClosed;
        }

        debug!(
            "[RunSession] Fix #{}: {:.1}m total, accuracy {:?}",
            self.path.len(),
            self.distance_m,
            accuracy_m
        );
        FixOutcome::Appended
    }

    /// Apply one accelerometer sample. Returns true if it counted a step.
    pub fn on_motion_sample(&mut self, sample: &MotionSample) -> bool {
        if self.phase != RunPhase::Running {
            return false;
        }
        if self.detector.process(sample) {
            self.steps = self.steps.max(self.detector.count());
            true
        } else {
            false
        }
    }

    /// Timer update with whole seconds since start.
    pub fn on_tick(&mut self, elapsed_secs: u64) {
        if self.phase == RunPhase::Running {
            self.elapsed_secs = self.elapsed_secs.max(elapsed_secs);
        }
    }

    /// Abort a run before it closes. The path is discarded.
    pub fn stop(&mut self) -> Result<()> {
        self.expect_phase(RunPhase::Running, "stop")?;
        info!(
            "[RunSession] Stopped before closing ({} points, {:.0}m discarded)",
            self.path.len(),
            self.distance_m
        );
        self.clear();
        self.phase = RunPhase::Idle;
        Ok(())
    }

    /// Mark the closed loop as being persisted.
    pub fn begin_claim(&mut self) -> Result<()> {
        self.expect_phase(RunPhase::Loop, "begin claim")?;
        self.phase = RunPhase::Claiming;
        Ok(())
    }

    /// Persistence finished; clear the session.
    pub fn finish_claim(&mut self) -> Result<()> {
        self.expect_phase(RunPhase::Claiming, "finish claim")?;
        self.reset();
        Ok(())
    }

    /// Return to idle from any phase, dropping everything recorded.
    pub fn reset(&mut self) {
        if self.phase != RunPhase::Idle {
            info!("[RunSession] Reset from {:?}", self.phase);
        }
        self.clear();
        self.phase = RunPhase::Idle;
    }

    /// The record this session would defend or challenge with.
    pub fn run_record(&self) -> RunRecord {
        RunRecord {
            distance_m: self.distance_m,
            duration_secs: self.elapsed_secs,
            steps: self.steps,
            started_at: self.started_at,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            point_count: self.path.len() as u32,
            distance_m: self.distance_m,
            steps: self.steps,
            elapsed_secs: self.elapsed_secs,
            location: self.last_location,
            accuracy_m: self.last_accuracy,
        }
    }

    fn expect_phase(&self, expected: RunPhase, action: &'static str) -> Result<()> {
        if self.phase == expected {
            Ok(())
        } else {
            warn!("[RunSession] Cannot {} while {:?}", action, self.phase);
            Err(TerritoryError::InvalidTransition { from: self.phase, action })
        }
    }

    fn clear(&mut self) {
        self.path.clear();
        self.distance_m = 0.0;
        self.steps = 0;
        self.elapsed_secs = 0;
        self.started_at = 0;
        self.closed = None;
        self.last_location = None;
        self.last_accuracy = None;
        self.detector.reset();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::EARTH_RADIUS_M;

    fn offset(origin: GeoPoint, north_m: f64, east_m: f64) -> GeoPoint {
        let d_lat = (north_m / EARTH_RADIUS_M).to_degrees();
        let d_lng = (east_m / (EARTH_RADIUS_M * origin.latitude.to_radians().cos())).to_degrees();
        GeoPoint::new(origin.latitude + d_lat, origin.longitude + d_lng)
    }

    /// 12 fixes around a ~100 m square; the last lands 10 m from the first.
    fn twelve_point_loop() -> Vec<GeoPoint> {
        let o = GeoPoint::new(51.5, -0.13);
        vec![
            o,
            offset(o, 0.0, 33.0),
            offset(o, 0.0, 66.0),
            offset(o, 0.0, 100.0),
            offset(o, 33.0, 100.0),
            offset(o, 66.0, 100.0),
            offset(o, 100.0, 100.0),
            offset(o, 100.0, 66.0),
            offset(o, 100.0, 33.0),
            offset(o, 100.0, 0.0),
            offset(o, 50.0, 0.0),
            offset(o, 10.0, 0.0),
        ]
    }

    fn running() -> RunSession {
        let mut session = RunSession::default();
        session.start(LocationPermission::Granted, 1_000).unwrap();
        session
    }

    fn sample(magnitude: f64, timestamp_ms: u64) -> MotionSample {
        MotionSample { x: 0.0, y: 0.0, z: magnitude, timestamp_ms }
    }

    #[test]
    fn test_start_moves_to_running() {
        let session = running();
        assert_eq!(session.phase(), RunPhase::Running);
        assert_eq!(session.run_record().started_at, 1_000);
        assert!(session.path().is_empty());
    }

    #[test]
    fn test_permission_denied_leaves_idle() {
        let mut session = RunSession::default();
        let err = session.start(LocationPermission::Denied, 0).unwrap_err();
        assert_eq!(err, TerritoryError::PermissionDenied);
        assert_eq!(session.phase(), RunPhase::Idle);
    }

    #[test]
    fn test_cannot_start_twice() {
        let mut session = running();
        let err = session.start(LocationPermission::Granted, 0).unwrap_err();
        assert!(matches!(err, TerritoryError::InvalidTransition { from: RunPhase::Running, .. }));
    }

    #[test]
    fn test_first_fix_adds_no_distance() {
        let mut session = running();
        let outcome = session.on_location_fix(GeoPoint::new(51.5, -0.13), Some(4.0));
        assert_eq!(outcome, FixOutcome::Appended);
        assert_eq!(session.distance(), 0.0);
        assert_eq!(session.path().len(), 1);
        assert_eq!(session.snapshot().accuracy_m, Some(4.0));
    }

    #[test]
    fn test_distance_matches_polyline_length() {
        let mut session = running();
        let points = twelve_point_loop();
        for p in &points[..8] {
            session.on_location_fix(*p, None);
        }
        let expected = geo_utils::polyline_length(&points[..8]);
        assert!((session.distance() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_twelve_point_loop_closes_and_freezes() {
        let mut session = running();
        let points = twelve_point_loop();
        let mut outcomes = Vec::new();
        for p in &points {
            outcomes.push(session.on_location_fix(*p, Some(5.0)));
        }

        assert!(outcomes[..11].iter().all(|o| *o == FixOutcome::Appended));
        assert_eq!(outcomes[11], FixOutcome::LoopClosed);
        assert_eq!(session.phase(), RunPhase::Loop);

        let polygon = session.closed_polygon().unwrap().clone();
        assert_eq!(polygon.len(), 12);

        // A 13th fix must not touch the frozen loop
        let outcome = session.on_location_fix(points[1], Some(5.0));
        assert_eq!(outcome, FixOutcome::Ignored);
        assert_eq!(session.closed_polygon().unwrap(), &polygon);
        assert_eq!(session.path().len(), 12);
    }

    #[test]
    fn test_closes_exactly_at_min_points() {
        let mut session = running();
        let o = GeoPoint::new(51.5, -0.13);
        for _ in 0..9 {
            assert_eq!(session.on_location_fix(o, None), FixOutcome::Appended);
        }
        assert_eq!(session.on_location_fix(o, None), FixOutcome::LoopClosed);
    }

    #[test]
    fn test_steps_resync_to_distance() {
        let mut session = running();
        let o = GeoPoint::new(51.5, -0.13);
        session.on_location_fix(o, None);
        session.on_location_fix(offset(o, 76.0, 0.0), None);
        assert_eq!(session.steps(), 100);
    }

    #[test]
    fn test_sensor_steps_never_lower_count() {
        let mut session = running();
        let o = GeoPoint::new(51.5, -0.13);
        session.on_location_fix(o, None);
        session.on_location_fix(offset(o, 76.0, 0.0), None);
        assert_eq!(session.steps(), 100);

        assert!(session.on_motion_sample(&sample(1.5, 1_000)));
        assert_eq!(session.steps(), 100);
    }

    #[test]
    fn test_sensor_steps_lead_when_higher() {
        let mut session = running();
        let mut t = 0;
        for _ in 0..5 {
            session.on_motion_sample(&sample(1.5, t));
            session.on_motion_sample(&sample(0.9, t + 100));
            t += 400;
        }
        assert_eq!(session.steps(), 5);
    }

    #[test]
    fn test_step_detector_threshold_crossing() {
        let mut detector = StepDetector::new(1.2, 300);
        assert!(detector.process(&sample(1.3, 0)));
        // Still above threshold: no new crossing
        assert!(!detector.process(&sample(1.4, 500)));
        assert!(!detector.process(&sample(1.0, 600)));
        assert!(detector.process(&sample(1.3, 700)));
        // Exactly at threshold is not above it
        assert!(!detector.process(&sample(1.0, 1_100)));
        assert!(!detector.process(&sample(1.2, 1_200)));
        assert_eq!(detector.count(), 2);
    }

    #[test]
    fn test_step_detector_debounce() {
        let mut detector = StepDetector::new(1.2, 300);
        assert!(detector.process(&sample(1.5, 1_000)));
        assert!(!detector.process(&sample(1.0, 1_100)));
        // Crossing 200 ms after the step is the same footfall
        assert!(!detector.process(&sample(1.5, 1_200)));
        assert!(!detector.process(&sample(1.0, 1_250)));
        // 300 ms is still inside the window
        assert!(!detector.process(&sample(1.5, 1_300)));
        assert!(!detector.process(&sample(1.0, 1_320)));
        assert!(detector.process(&sample(1.5, 1_600)));
        assert_eq!(detector.count(), 2);
    }

    #[test]
    fn test_motion_ignored_when_not_running() {
        let mut session = RunSession::default();
        assert!(!session.on_motion_sample(&sample(2.0, 0)));
        assert_eq!(session.steps(), 0);
    }

    #[test]
    fn test_tick_only_while_running() {
        let mut session = running();
        session.on_tick(5);
        session.on_tick(3);
        assert_eq!(session.elapsed_secs(), 5);

        for p in twelve_point_loop() {
            session.on_location_fix(p, None);
        }
        session.on_tick(60);
        assert_eq!(session.elapsed_secs(), 5);
    }

    #[test]
    fn test_stop_discards_path() {
        let mut session = running();
        session.on_location_fix(GeoPoint::new(51.5, -0.13), None);
        session.stop().unwrap();
        assert_eq!(session.phase(), RunPhase::Idle);
        assert!(session.path().is_empty());
        assert!(session.closed_polygon().is_none());
    }

    #[test]
    fn test_stop_only_while_running() {
        let mut session = RunSession::default();
        assert!(session.stop().is_err());
    }

    #[test]
    fn test_claim_transitions() {
        let mut session = running();
        assert!(session.begin_claim().is_err());
        for p in twelve_point_loop() {
            session.on_location_fix(p, None);
        }
        session.begin_claim().unwrap();
        assert_eq!(session.phase(), RunPhase::Claiming);
        // Polygon survives into the claiming phase
        assert!(session.closed_polygon().is_some());
        session.finish_claim().unwrap();
        assert_eq!(session.phase(), RunPhase::Idle);
        assert!(session.closed_polygon().is_none());
        assert_eq!(session.distance(), 0.0);
    }

    #[test]
    fn test_reset_from_loop_discards() {
        let mut session = running();
        for p in twelve_point_loop() {
            session.on_location_fix(p, None);
        }
        session.reset();
        assert_eq!(session.snapshot(), RunSession::default().snapshot());
    }

    #[test]
    fn test_restart_after_reset_starts_clean() {
        let mut session = running();
        session.on_location_fix(GeoPoint::new(51.5, -0.13), None);
        session.on_motion_sample(&sample(1.5, 0));
        session.reset();
        session.start(LocationPermission::Granted, 2_000).unwrap();
        assert_eq!(session.steps(), 0);
        assert!(session.path().is_empty());
        // Detector history was cleared, so the first crossing counts again
        assert!(session.on_motion_sample(&sample(1.5, 10)));
    }
}
