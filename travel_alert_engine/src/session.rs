use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use travel_alert_lib::{
    geodesy::{self, DEFAULT_AVG_SPEED_KMH},
    position::Position,
    trip::{AlertConfig, AlertType, Destination, Trip, TripStatus},
};

use crate::{
    TrackingError,
    alert::AlertLatch,
    notify::Notifier,
    position_source::{DEFAULT_SIMULATION_INTERVAL, DEFAULT_SIMULATION_STEPS, PositionSource, WatchHandle},
    store::TripStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMode {
    Idle,
    Live,
    Simulated,
}

/// What a tracking session currently knows, published to observers on
/// every position update. Serializable so a hosting UI can forward it
/// as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSnapshot {
    pub mode: TrackingMode,
    pub position: Option<Position>,
    pub distance_km: Option<f64>,
    pub eta_minutes: Option<i64>,
    pub alert_fired: bool,
}

impl TrackingSnapshot {
    fn idle() -> Self {
        Self {
            mode: TrackingMode::Idle,
            position: None,
            distance_km: None,
            eta_minutes: None,
            alert_fired: false,
        }
    }
}

/// Glues the position source to the alert latch and the trip's external
/// lifecycle. One controller per trip view; it owns the single active
/// subscription and the latch, and nothing else mutates them.
pub struct SessionController {
    trip: Trip,
    source: PositionSource,
    store: Arc<dyn TripStore>,
    notifier: Arc<dyn Notifier>,
    // Shared with the driver task; lock scope covers check-then-set only.
    latch: Arc<Mutex<AlertLatch>>,
    subscription: Option<WatchHandle>,
    driver: Option<JoinHandle<()>>,
    snapshot_tx: watch::Sender<TrackingSnapshot>,
}

impl SessionController {
    pub fn new(trip: Trip, source: PositionSource, store: Arc<dyn TripStore>, notifier: Arc<dyn Notifier>) -> Self {
        let (snapshot_tx, _) = watch::channel(TrackingSnapshot::idle());
        Self {
            trip,
            source,
            store,
            notifier,
            latch: Arc::new(Mutex::new(AlertLatch::new())),
            subscription: None,
            driver: None,
            snapshot_tx,
        }
    }

    /// Fetch the trip from the persistence collaborator, then build a
    /// controller for it. The latch starts armed even if the persisted
    /// record already has `alertTriggered` set.
    pub async fn load(
        trip_id: &str,
        source: PositionSource,
        store: Arc<dyn TripStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, TrackingError> {
        let trip = store.get_trip(trip_id).await?;
        Ok(Self::new(trip, source, store, notifier))
    }

    pub fn trip(&self) -> &Trip {
        &self.trip
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackingSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> TrackingSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Begin live tracking. Replaces any subscription already running, so
    /// there is never more than one. A failed initial fix surfaces to the
    /// caller and tracking does not start.
    pub async fn start(&mut self) -> Result<(), TrackingError> {
        self.stop();

        let first = self.source.current_position().await?;

        let (tx, rx) = mpsc::channel(16);
        self.subscription = Some(self.source.start_watch(tx));
        self.spawn_driver(rx, TrackingMode::Live, Some(first));

        self.activate_if_pending().await
    }

    /// Like [`start`](Self::start), but the position stream comes from an
    /// interpolated path towards the destination instead of the sensor.
    /// Everything downstream of position sourcing behaves identically.
    pub async fn start_simulation(&mut self) -> Result<(), TrackingError> {
        self.stop();

        // Copy out of the watch guard before awaiting on a fresh fix.
        let last_known = self.snapshot_tx.borrow().position;
        let start = match last_known {
            Some(position) => position.coordinate,
            None => self.source.current_position().await?.coordinate,
        };
        let path = PositionSource::simulate_movement(start, self.trip.destination.coordinates, DEFAULT_SIMULATION_STEPS);

        let (tx, rx) = mpsc::channel(16);
        self.subscription = Some(PositionSource::run_simulation(path, DEFAULT_SIMULATION_INTERVAL, tx));
        self.spawn_driver(rx, TrackingMode::Simulated, None);

        self.activate_if_pending().await
    }

    /// Cancel whichever subscription is active. Idempotent, callable in
    /// any state, and never resets the latch: a trip that already fired
    /// stays fired for the remainder of the session.
    pub fn stop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.stop();
        }
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
        self.snapshot_tx.send_modify(|snapshot| snapshot.mode = TrackingMode::Idle);
    }

    /// Stop tracking and transition the trip to completed. The local
    /// status advances only once persistence confirms.
    pub async fn complete(&mut self) -> Result<Trip, TrackingError> {
        self.stop();
        let updated = self.store.set_status(&self.trip.id, TripStatus::Completed).await?;
        self.trip = updated;
        Ok(self.trip.clone())
    }

    /// Pending trips go active when tracking starts. The local status is
    /// advanced optimistically; a persistence failure surfaces to the
    /// caller and may leave local and remote state diverged until the
    /// next fetch.
    async fn activate_if_pending(&mut self) -> Result<(), TrackingError> {
        if self.trip.status != TripStatus::Pending {
            return Ok(());
        }
        self.trip.status = TripStatus::Active;
        self.store.set_status(&self.trip.id, TripStatus::Active).await?;
        Ok(())
    }

    fn spawn_driver(&mut self, mut updates: mpsc::Receiver<Position>, mode: TrackingMode, initial: Option<Position>) {
        self.snapshot_tx.send_modify(|snapshot| snapshot.mode = mode);

        let driver = SessionDriver {
            trip_id: self.trip.id.clone(),
            destination: self.trip.destination.clone(),
            alert_type: self.trip.alert_type,
            config: self.trip.alert_config,
            mode,
            latch: self.latch.clone(),
            store: self.store.clone(),
            notifier: self.notifier.clone(),
            snapshot_tx: self.snapshot_tx.clone(),
        };

        self.driver = Some(tokio::spawn(async move {
            if let Some(position) = initial {
                driver.process(position);
            }
            while let Some(position) = updates.recv().await {
                driver.process(position);
            }
            // Stream exhausted (simulation played out or watch torn down).
            driver.snapshot_tx.send_modify(|snapshot| snapshot.mode = TrackingMode::Idle);
        }));
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The per-update work, owned by the single driver task. No two updates
/// are ever processed concurrently for one session, which keeps the
/// latch's check-then-set atomic.
struct SessionDriver {
    trip_id: String,
    destination: Destination,
    alert_type: AlertType,
    config: AlertConfig,
    mode: TrackingMode,
    latch: Arc<Mutex<AlertLatch>>,
    store: Arc<dyn TripStore>,
    notifier: Arc<dyn Notifier>,
    snapshot_tx: watch::Sender<TrackingSnapshot>,
}

impl SessionDriver {
    fn process(&self, position: Position) {
        let distance = geodesy::distance_km(position.coordinate, self.destination.coordinates);
        let eta = geodesy::eta_minutes(distance, DEFAULT_AVG_SPEED_KMH);

        let (fired_now, fired) = {
            let mut latch = self.latch.lock().unwrap();
            let fired_now = latch.check_and_fire(&position, &self.destination, self.alert_type, &self.config);
            (fired_now, latch.fired())
        };

        self.snapshot_tx.send_replace(TrackingSnapshot {
            mode: self.mode,
            position: Some(position),
            distance_km: Some(distance),
            eta_minutes: eta,
            alert_fired: fired,
        });

        if fired_now {
            tracing::info!("Alert fired for trip {} at {} from destination", self.trip_id, geodesy::format_distance(distance));
            self.notifier.alert_approaching(&self.destination.name);

            // Best effort: the latch has fired and the notification is out,
            // so a persistence failure is logged and swallowed.
            let store = self.store.clone();
            let trip_id = self.trip_id.clone();
            tokio::spawn(async move {
                if let Err(err) = store.mark_alert_triggered(&trip_id).await {
                    tracing::error!("Failed to mark alert triggered for trip {trip_id}: {err}");
                }
            });
        }
    }
}
