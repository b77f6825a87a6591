use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle, time::timeout};
use travel_alert_lib::position::{Coordinate, Position};

use crate::{TrackingError, sensor::LocationSensor};

/// Bounded wait for a single-shot fix.
pub const FIX_TIMEOUT: Duration = Duration::from_secs(10);
/// Synthetic accuracy attached to simulated fixes.
pub const SIMULATED_ACCURACY_M: f64 = 10.0;
pub const DEFAULT_SIMULATION_STEPS: u32 = 20;
pub const DEFAULT_SIMULATION_INTERVAL: Duration = Duration::from_secs(2);

/// Cancellation handle for a live watch or a running simulation.
///
/// `stop` is idempotent and safe in any state. Dropping the handle stops
/// the subscription, so a torn-down session cannot leak a sensor watch or
/// a simulation timer.
pub struct WatchHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl WatchHandle {
    fn new(tasks: Vec<JoinHandle<()>>) -> Self {
        Self { tasks }
    }

    pub fn stop(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }

    /// True once every underlying task has ended, whether it ran to
    /// completion (simulation exhausted) or was stopped.
    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(|task| task.is_finished())
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Produces the live sequence of positions a tracking session consumes,
/// either from the injected sensor (watch mode) or from a synthetic
/// interpolated path (simulation mode).
#[derive(Clone)]
pub struct PositionSource {
    sensor: Arc<dyn LocationSensor>,
}

impl PositionSource {
    pub fn new(sensor: Arc<dyn LocationSensor>) -> Self {
        Self { sensor }
    }

    /// One fresh fix, bounded by [`FIX_TIMEOUT`]. No caching of stale fixes.
    pub async fn current_position(&self) -> Result<Position, TrackingError> {
        match timeout(FIX_TIMEOUT, self.sensor.request_fix()).await {
            Ok(result) => result,
            Err(_) => Err(TrackingError::LocationTimeout),
        }
    }

    /// Begin continuous emission into `updates`. Transient sensor errors
    /// are logged and swallowed; the stream keeps running.
    pub fn start_watch(&self, updates: mpsc::Sender<Position>) -> WatchHandle {
        let (raw_tx, mut raw_rx) = mpsc::channel(16);
        let sensor_task = self.sensor.start_watch(raw_tx);

        let forward_task = tokio::spawn(async move {
            while let Some(item) = raw_rx.recv().await {
                match item {
                    Ok(position) => {
                        if updates.send(position).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => tracing::warn!("Transient location error, stream continues: {err}"),
                }
            }
        });

        WatchHandle::new(vec![sensor_task, forward_task])
    }

    /// Linear interpolation per axis between start and destination,
    /// `steps + 1` points including both endpoints. Pure: calling it again
    /// with the same inputs reproduces the identical path.
    pub fn simulate_movement(start: Coordinate, destination: Coordinate, steps: u32) -> Vec<Position> {
        let steps = steps.max(1);
        let lat_step = (destination.latitude - start.latitude) / steps as f64;
        let lon_step = (destination.longitude - start.longitude) / steps as f64;

        (0..=steps)
            .map(|i| {
                let coordinate = Coordinate::new(
                    start.latitude + lat_step * i as f64,
                    start.longitude + lon_step * i as f64,
                );
                Position::new(coordinate, SIMULATED_ACCURACY_M)
            })
            .collect()
    }

    /// Play `positions` into `updates`, one per `interval` tick, stopping
    /// on its own after the last element. The returned handle cancels the
    /// timer early.
    pub fn run_simulation(positions: Vec<Position>, interval: Duration, updates: mpsc::Sender<Position>) -> WatchHandle {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; consume it so each
            // position lands one full interval apart, the first included.
            ticker.tick().await;
            for position in positions {
                ticker.tick().await;
                if updates.send(position).await.is_err() {
                    break;
                }
            }
        });

        WatchHandle::new(vec![task])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::ScriptedSensor;
    use travel_alert_lib::geodesy::distance_km;

    fn origin() -> Coordinate {
        Coordinate::new(28.6139, 77.2090)
    }

    #[test]
    fn simulation_path_has_evenly_spaced_endpoints() {
        let start = Coordinate::new(10.0, 20.0);
        let dest = Coordinate::new(11.0, 22.0);
        let path = PositionSource::simulate_movement(start, dest, 4);

        assert_eq!(path.len(), 5);
        assert_eq!(path[0].coordinate, start);
        assert_eq!(path[4].coordinate, dest);
        for (i, position) in path.iter().enumerate() {
            assert!((position.coordinate.latitude - (10.0 + 0.25 * i as f64)).abs() < 1e-12);
            assert!((position.coordinate.longitude - (20.0 + 0.5 * i as f64)).abs() < 1e-12);
            assert_eq!(position.accuracy_m, SIMULATED_ACCURACY_M);
        }
    }

    #[test]
    fn simulation_path_is_reproducible() {
        let start = Coordinate::new(10.0, 20.0);
        let dest = Coordinate::new(11.0, 22.0);
        let first: Vec<_> = PositionSource::simulate_movement(start, dest, 8)
            .into_iter()
            .map(|p| p.coordinate)
            .collect();
        let second: Vec<_> = PositionSource::simulate_movement(start, dest, 8)
            .into_iter()
            .map(|p| p.coordinate)
            .collect();
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn run_simulation_emits_everything_then_stops() {
        let path = PositionSource::simulate_movement(origin(), Coordinate::new(28.7, 77.3), 4);
        let (tx, mut rx) = mpsc::channel(16);
        let handle = PositionSource::run_simulation(path.clone(), Duration::from_secs(2), tx);

        let mut received = Vec::new();
        while let Some(position) = rx.recv().await {
            received.push(position.coordinate);
        }
        assert_eq!(received.len(), path.len());
        assert!(handle.is_finished());
        // Stopping after natural completion is a no-op.
        handle.stop();
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_a_simulation_cancels_the_timer() {
        let path = PositionSource::simulate_movement(origin(), Coordinate::new(28.7, 77.3), 10);
        let total = path.len();
        // Capacity 1 keeps the player blocked on send, so stop() lands
        // while most of the path is still unplayed.
        let (tx, mut rx) = mpsc::channel(1);
        let handle = PositionSource::run_simulation(path, Duration::from_secs(2), tx);

        let first = rx.recv().await;
        assert!(first.is_some());
        handle.stop();
        handle.stop();

        // The sender is gone once the task is aborted; anything still
        // buffered drains, then the channel closes.
        let mut received = 1;
        while rx.recv().await.is_some() {
            received += 1;
        }
        assert!(received < total, "timer kept running: {received} of {total}");
    }

    #[tokio::test(start_paused = true)]
    async fn watch_swallows_transient_errors() {
        let a = Position::new(origin(), 5.0);
        let b = Position::new(Coordinate::new(28.62, 77.21), 5.0);
        let sensor = ScriptedSensor::new(
            Ok(a),
            vec![
                Ok(a),
                Err(TrackingError::LocationUnavailable("no signal".into())),
                Ok(b),
            ],
            Duration::from_secs(1),
        );
        let source = PositionSource::new(Arc::new(sensor));

        let (tx, mut rx) = mpsc::channel(16);
        let _handle = source.start_watch(tx);

        assert_eq!(rx.recv().await.unwrap().coordinate, a.coordinate);
        // The error in between is logged, not delivered, and the stream
        // keeps running.
        assert_eq!(rx.recv().await.unwrap().coordinate, b.coordinate);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn single_shot_fix_times_out() {
        struct SilentSensor;
        impl LocationSensor for SilentSensor {
            fn request_fix(&self) -> futures::future::BoxFuture<'static, Result<Position, TrackingError>> {
                Box::pin(std::future::pending())
            }
            fn start_watch(&self, _updates: mpsc::Sender<Result<Position, TrackingError>>) -> JoinHandle<()> {
                tokio::spawn(async {})
            }
        }

        let source = PositionSource::new(Arc::new(SilentSensor));
        let result = source.current_position().await;
        assert!(matches!(result, Err(TrackingError::LocationTimeout)));
    }

    #[test]
    fn simulated_path_distance_shrinks_monotonically() {
        let dest = Coordinate::new(28.6428, 77.2197);
        let path = PositionSource::simulate_movement(origin(), dest, 20);
        let distances: Vec<f64> = path.iter().map(|p| distance_km(p.coordinate, dest)).collect();
        for pair in distances.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-9);
        }
        assert!(distances.last().unwrap().abs() < 1e-6);
    }
}
