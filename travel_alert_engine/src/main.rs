use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use travel_alert_engine::{
    notify::LogNotifier,
    position_source::PositionSource,
    sensor::ScriptedSensor,
    session::{SessionController, TrackingMode},
    store::InMemoryTripStore,
};
use travel_alert_lib::{
    geodesy,
    position::{Coordinate, Position},
    trip::{AlertConfig, AlertType, Destination, Trip},
};

// Demo: a simulated ride from ~50 km south of Connaught Place, with a
// 5 km distance alert, against an in-memory trip store.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let destination = Coordinate::new(28.6428, 77.2197);
    let start = Coordinate::new(28.1931, 77.2197);

    let trip = Trip::new(
        "demo-trip",
        Destination::new("Connaught Place", destination),
        AlertType::Distance,
        AlertConfig {
            distance_km: Some(5.0),
            minutes_before: None,
        },
    );

    let store = Arc::new(InMemoryTripStore::new());
    store.insert(trip);

    let sensor = ScriptedSensor::fixed(Position::new(start, 10.0));
    let source = PositionSource::new(Arc::new(sensor));

    let mut controller = SessionController::load("demo-trip", source, store, Arc::new(LogNotifier)).await?;
    let mut snapshots = controller.subscribe();

    tracing::info!("Starting simulated trip towards {}", controller.trip().destination.name);
    controller.start_simulation().await?;

    loop {
        snapshots.changed().await?;
        let snapshot = snapshots.borrow().clone();

        if let (Some(distance), Some(eta)) = (snapshot.distance_km, snapshot.eta_minutes) {
            tracing::info!(
                "{} to destination, about {}",
                geodesy::format_distance(distance),
                geodesy::format_time(eta)
            );
        }

        if snapshot.mode == TrackingMode::Idle {
            break;
        }
    }

    let completed = controller.complete().await?;
    tracing::info!("Trip completed with status {:?}, alert fired: {}", completed.status, completed.alert_triggered);

    Ok(())
}
