use std::time::Duration;

use futures::future::BoxFuture;
use tokio::{sync::mpsc, task::JoinHandle};
use travel_alert_lib::position::Position;

use crate::TrackingError;

/// The platform geolocation collaborator, injected into the position
/// source so sessions and tests never touch ambient globals.
pub trait LocationSensor: Send + Sync {
    /// One fresh high-accuracy fix. No cached stale fixes; the position
    /// source bounds the wait.
    fn request_fix(&self) -> BoxFuture<'static, Result<Position, TrackingError>>;

    /// Continuous fresh fixes into `updates` until the task is aborted or
    /// the receiver is dropped. Errors on individual fixes are sent as
    /// `Err` items and must not end the task.
    fn start_watch(&self, updates: mpsc::Sender<Result<Position, TrackingError>>) -> JoinHandle<()>;
}

// Deterministic playback sensor for the demo binary and tests.
#[derive(Clone)]
pub struct ScriptedSensor {
    fix: Result<Position, TrackingError>,
    updates: Vec<Result<Position, TrackingError>>,
    interval: Duration,
}

impl ScriptedSensor {
    pub fn new(fix: Result<Position, TrackingError>, updates: Vec<Result<Position, TrackingError>>, interval: Duration) -> Self {
        Self {
            fix,
            updates,
            interval,
        }
    }

    /// A sensor that always resolves `fix` and emits nothing on watch.
    pub fn fixed(fix: Position) -> Self {
        Self::new(Ok(fix), Vec::new(), Duration::from_secs(1))
    }
}

impl LocationSensor for ScriptedSensor {
    fn request_fix(&self) -> BoxFuture<'static, Result<Position, TrackingError>> {
        let fix = self.fix.clone();
        Box::pin(async move { fix })
    }

    fn start_watch(&self, updates: mpsc::Sender<Result<Position, TrackingError>>) -> JoinHandle<()> {
        let script = self.updates.clone();
        let interval = self.interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            for item in script {
                ticker.tick().await;
                if updates.send(item).await.is_err() {
                    break;
                }
            }
        })
    }
}
