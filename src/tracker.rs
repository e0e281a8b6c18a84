//! Async run tracker.
//!
//! [`RunTracker`] owns a [`RunSession`] and one worker task that drains the
//! location stream, the motion stream and a 1 Hz ticker through a single
//! `select!` loop, so every event mutates the session on its own. When a fix
//! closes the loop the worker drops both stream receivers before publishing
//! the LOOP snapshot; producers see their sends fail from then on.
//!
//! Snapshots are published on a `watch` channel for HUD rendering.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};

use crate::error::Result;
use crate::session::{
    FixOutcome, LocationFix, LocationPermission, MotionSample, RunPhase, RunSession, SessionConfig,
    SessionSnapshot,
};
use crate::{now_millis, LoopPolygon};

/// Device sensors as seen by the tracker.
///
/// Each `watch_*` call starts a fresh stream; dropping the receiver stops it.
pub trait SensorHub: Send + Sync + 'static {
    fn location_permission(&self) -> LocationPermission;

    fn watch_location(&self) -> mpsc::UnboundedReceiver<LocationFix>;

    fn watch_motion(&self) -> mpsc::UnboundedReceiver<MotionSample>;
}

struct Worker {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Drives one [`RunSession`] from a [`SensorHub`].
pub struct RunTracker<H: SensorHub> {
    hub: H,
    session: Arc<Mutex<RunSession>>,
    snapshots: watch::Sender<SessionSnapshot>,
    worker: Option<Worker>,
}

impl<H: SensorHub> RunTracker<H> {
    pub fn new(hub: H) -> Self {
        Self::with_config(hub, SessionConfig::default())
    }

    pub fn with_config(hub: H, config: SessionConfig) -> Self {
        let session = RunSession::new(config);
        let (snapshots, _) = watch::channel(session.snapshot());
        Self {
            hub,
            session: Arc::new(Mutex::new(session)),
            snapshots,
            worker: None,
        }
    }

    /// Start a session and its sensor streams.
    ///
    /// Must be called from within a tokio runtime. Fails with
    /// `PermissionDenied` before any stream is opened.
    pub fn start(&mut self) -> Result<()> {
        let permission = self.hub.location_permission();
        lock(&self.session).start(permission, now_millis())?;
        self.publish();

        // A worker left over from a closed loop has already exited
        if let Some(previous) = self.worker.take() {
            previous.handle.abort();
        }

        let fixes = self.hub.watch_location();
        let motion = self.hub.watch_motion();
        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(run_worker(
            Arc::clone(&self.session),
            self.snapshots.clone(),
            fixes,
            motion,
            stop_rx,
        ));
        self.worker = Some(Worker { stop: stop_tx, handle });
        info!("[RunTracker] Tracking started");
        Ok(())
    }

    /// End a run early. The path is discarded and no zone is produced.
    pub async fn stop(&mut self) -> Result<()> {
        lock(&self.session).stop()?;
        self.halt_worker().await;
        self.publish();
        Ok(())
    }

    /// Tear everything down and return to IDLE from any phase.
    pub async fn reset(&mut self) {
        self.halt_worker().await;
        lock(&self.session).reset();
        self.publish();
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Wait until the session leaves RUNNING and return its closed loop.
    ///
    /// Resolves to `None` if the run ended without closing (stopped, reset
    /// or never started).
    pub async fn wait_for_loop(&self) -> Option<LoopPolygon> {
        let mut rx = self.snapshots.subscribe();
        rx.wait_for(|snapshot| snapshot.phase != RunPhase::Running)
            .await
            .ok()?;
        lock(&self.session).closed_polygon().cloned()
    }

    /// Run `f` against the session, then publish the resulting snapshot.
    ///
    /// This is how a claim is submitted for a tracked run:
    /// `tracker.with_session(|s| coordinator.submit(s, &zones, &player, now))`.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut RunSession) -> R) -> R {
        let result = f(&mut lock(&self.session));
        self.publish();
        result
    }

    fn publish(&self) {
        let snapshot = lock(&self.session).snapshot();
        self.snapshots.send_replace(snapshot);
    }

    async fn halt_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop.send(());
            if let Err(e) = worker.handle.await {
                warn!("[RunTracker] Worker ended abnormally: {}", e);
            }
        }
    }
}

impl<H: SensorHub> Drop for RunTracker<H> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.handle.abort();
        }
    }
}

/// Session state stays consistent across a panicking holder, so a poisoned
/// lock is still usable.
fn lock(session: &Mutex<RunSession>) -> MutexGuard<'_, RunSession> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn run_worker(
    session: Arc<Mutex<RunSession>>,
    snapshots: watch::Sender<SessionSnapshot>,
    mut fixes: mpsc::UnboundedReceiver<LocationFix>,
    mut motion: mpsc::UnboundedReceiver<MotionSample>,
    mut stop: oneshot::Receiver<()>,
) {
    let started = Instant::now();
    let mut ticker = time::interval_at(started + Duration::from_secs(1), Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut fixes_open = true;
    let mut motion_open = true;

    loop {
        tokio::select! {
            _ = &mut stop => {
                debug!("[RunTracker] Stop requested");
                break;
            }
            fix = fixes.recv(), if fixes_open => match fix {
                Some(fix) => {
                    let outcome = lock(&session).on_location_fix(fix.point, fix.accuracy_m);
                    if outcome == FixOutcome::LoopClosed {
                        info!("[RunTracker] Loop closed, closing sensor streams");
                        break;
                    }
                    snapshots.send_replace(lock(&session).snapshot());
                }
                None => {
                    warn!("[RunTracker] Location stream ended");
                    fixes_open = false;
                }
            },
            sample = motion.recv(), if motion_open => match sample {
                Some(sample) => {
                    if lock(&session).on_motion_sample(&sample) {
                        snapshots.send_replace(lock(&session).snapshot());
                    }
                }
                None => {
                    debug!("[RunTracker] Motion stream ended");
                    motion_open = false;
                }
            },
            _ = ticker.tick() => {
                let elapsed = started.elapsed().as_secs();
                let mut guard = lock(&session);
                if guard.phase() != RunPhase::Running {
                    break;
                }
                guard.on_tick(elapsed);
                snapshots.send_replace(guard.snapshot());
            }
        }
    }

    drop(fixes);
    drop(motion);
    snapshots.send_replace(lock(&session).snapshot());
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TerritoryError;

    struct ChannelHub {
        permission: LocationPermission,
        fixes: Mutex<Option<mpsc::UnboundedReceiver<LocationFix>>>,
        motion: Mutex<Option<mpsc::UnboundedReceiver<MotionSample>>>,
    }

    impl SensorHub for ChannelHub {
        fn location_permission(&self) -> LocationPermission {
            self.permission
        }

        fn watch_location(&self) -> mpsc::UnboundedReceiver<LocationFix> {
            self.fixes.lock().unwrap().take().expect("location watched twice")
        }

        fn watch_motion(&self) -> mpsc::UnboundedReceiver<MotionSample> {
            self.motion.lock().unwrap().take().expect("motion watched twice")
        }
    }

    fn hub(
        permission: LocationPermission,
    ) -> (
        ChannelHub,
        mpsc::UnboundedSender<LocationFix>,
        mpsc::UnboundedSender<MotionSample>,
    ) {
        let (fix_tx, fix_rx) = mpsc::unbounded_channel();
        let (motion_tx, motion_rx) = mpsc::unbounded_channel();
        let hub = ChannelHub {
            permission,
            fixes: Mutex::new(Some(fix_rx)),
            motion: Mutex::new(Some(motion_rx)),
        };
        (hub, fix_tx, motion_tx)
    }

    fn square_loop() -> Vec<LocationFix> {
        let corners = [
            (51.5000, -0.1300),
            (51.5004, -0.1300),
            (51.5004, -0.1294),
            (51.5000, -0.1294),
        ];
        (0..12)
            .map(|i| {
                let (lat, lng) = if i == 11 { corners[0] } else { corners[i % 4] };
                LocationFix::new(lat, lng, Some(5.0))
            })
            .collect()
    }

    fn sample(magnitude: f64, timestamp_ms: u64) -> MotionSample {
        MotionSample { x: magnitude, y: 0.0, z: 0.0, timestamp_ms }
    }

    #[tokio::test]
    async fn test_loop_closure_tears_down_streams() {
        let (hub, fix_tx, motion_tx) = hub(LocationPermission::Granted);
        let mut tracker = RunTracker::new(hub);
        tracker.start().unwrap();
        assert_eq!(tracker.snapshot().phase, RunPhase::Running);

        for fix in square_loop() {
            fix_tx.send(fix).unwrap();
        }

        let polygon = tracker.wait_for_loop().await.unwrap();
        assert_eq!(polygon.len(), 12);
        assert_eq!(tracker.snapshot().phase, RunPhase::Loop);
        assert_eq!(tracker.snapshot().point_count, 12);

        // Receivers are gone: nothing can reach the frozen session
        assert!(fix_tx.send(LocationFix::new(51.6, -0.1, None)).is_err());
        assert!(motion_tx.send(sample(2.0, 10_000)).is_err());
        assert_eq!(tracker.with_session(|s| s.path().len()), 12);
    }

    #[tokio::test]
    async fn test_permission_denied_opens_no_streams() {
        let (hub, fix_tx, _motion_tx) = hub(LocationPermission::Denied);
        let mut tracker = RunTracker::new(hub);
        assert_eq!(tracker.start().unwrap_err(), TerritoryError::PermissionDenied);
        assert_eq!(tracker.snapshot().phase, RunPhase::Idle);
        // Hub never handed out its receiver
        assert!(fix_tx.send(LocationFix::new(51.5, -0.13, None)).is_ok());
    }

    #[tokio::test]
    async fn test_motion_samples_count_steps() {
        let (hub, _fix_tx, motion_tx) = hub(LocationPermission::Granted);
        let mut tracker = RunTracker::new(hub);
        let mut rx = tracker.subscribe();
        tracker.start().unwrap();

        for s in [
            sample(1.0, 0),
            sample(1.5, 100),
            sample(1.0, 200),
            sample(1.5, 300), // within debounce of the first step
            sample(1.0, 400),
            sample(1.5, 700),
        ] {
            motion_tx.send(s).unwrap();
        }

        let steps = rx.wait_for(|s| s.steps >= 2).await.unwrap().steps;
        assert_eq!(steps, 2);
        tracker.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_updates_elapsed() {
        let (hub, _fix_tx, _motion_tx) = hub(LocationPermission::Granted);
        let mut tracker = RunTracker::new(hub);
        let mut rx = tracker.subscribe();
        tracker.start().unwrap();

        let elapsed = rx.wait_for(|s| s.elapsed_secs >= 3).await.unwrap().elapsed_secs;
        assert_eq!(elapsed, 3);
        tracker.reset().await;
        assert_eq!(tracker.snapshot().elapsed_secs, 0);
    }

    #[tokio::test]
    async fn test_stop_discards_run() {
        let (hub, fix_tx, _motion_tx) = hub(LocationPermission::Granted);
        let mut tracker = RunTracker::new(hub);
        tracker.start().unwrap();
        fix_tx.send(LocationFix::new(51.5, -0.13, Some(4.0))).unwrap();
        let mut rx = tracker.subscribe();
        rx.wait_for(|s| s.point_count == 1).await.unwrap();

        tracker.stop().await.unwrap();
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.phase, RunPhase::Idle);
        assert_eq!(snapshot.point_count, 0);
        assert!(tracker.wait_for_loop().await.is_none());
        assert!(fix_tx.send(LocationFix::new(51.5, -0.13, None)).is_err());
    }

    #[tokio::test]
    async fn test_stop_outside_running_is_rejected() {
        let (hub, _fix_tx, _motion_tx) = hub(LocationPermission::Granted);
        let mut tracker = RunTracker::new(hub);
        let err = tracker.stop().await.unwrap_err();
        assert!(matches!(err, TerritoryError::InvalidTransition { from: RunPhase::Idle, .. }));
    }

    #[tokio::test]
    async fn test_closed_loop_can_be_claimed_through_tracker() {
        use crate::claim::ClaimCoordinator;
        use crate::store::{MemoryStore, TerritoryStore};

        let (hub, fix_tx, _motion_tx) = hub(LocationPermission::Granted);
        let mut tracker = RunTracker::new(hub);
        tracker.start().unwrap();
        for fix in square_loop() {
            fix_tx.send(fix).unwrap();
        }
        tracker.wait_for_loop().await.unwrap();

        let store = Arc::new(MemoryStore::new());
        let coordinator = ClaimCoordinator::new(Arc::clone(&store));
        let player = coordinator.ensure_player("ann", "Ann").unwrap();
        let report = tracker
            .with_session(|s| coordinator.submit(s, &[], &player, 1_000))
            .unwrap();
        assert!(report.zone_id.is_some());
        assert_eq!(tracker.snapshot().phase, RunPhase::Idle);
        assert_eq!(store.zones().unwrap().len(), 1);
        assert_eq!(store.get_player("ann").unwrap().unwrap().zones_owned, 1);
    }
}
