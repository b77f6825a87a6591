use travel_alert_lib::{
    geodesy::{self, DEFAULT_AVG_SPEED_KMH},
    position::Position,
    trip::{AlertConfig, AlertType, Destination},
};

/// Pure pass/fail decision for one position against the trip's alert rule.
///
/// `Route` is evaluated identically to `Distance` (documented
/// approximation; there is no route-following distance here). Unknown
/// alert types never fire.
pub fn should_trigger(position: &Position, destination: &Destination, alert_type: AlertType, config: &AlertConfig) -> bool {
    let distance = geodesy::distance_km(position.coordinate, destination.coordinates);

    match alert_type {
        AlertType::Distance | AlertType::Route => distance <= config.distance_threshold_km(),
        AlertType::Eta => match geodesy::eta_minutes(distance, DEFAULT_AVG_SPEED_KMH) {
            Some(eta) => eta <= config.minutes_threshold(),
            None => false,
        },
        AlertType::Unknown => false,
    }
}

/// One-way latch enforcing at-most-once firing per tracking session.
///
/// ARMED until the first qualifying position, FIRED afterwards and for the
/// rest of the session. Callers must serialize check_and_fire invocations;
/// the session driver does so by sharing the latch behind a mutex and
/// evaluating from a single task.
#[derive(Debug, Default)]
pub struct AlertLatch {
    fired: bool,
}

impl AlertLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fired(&self) -> bool {
        self.fired
    }

    /// Returns true exactly once: on the first evaluation that passes.
    /// Once fired, returns false without re-evaluating. The caller owns
    /// the one-time side effects (notification, persistence update).
    pub fn check_and_fire(&mut self, position: &Position, destination: &Destination, alert_type: AlertType, config: &AlertConfig) -> bool {
        if self.fired {
            return false;
        }

        if should_trigger(position, destination, alert_type, config) {
            self.fired = true;
            return true;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use travel_alert_lib::{geodesy::EARTH_RADIUS_KM, position::Coordinate};

    fn destination() -> Destination {
        Destination::new("Connaught Place", Coordinate::new(0.0, 0.0))
    }

    /// A point `km` east of the origin along the equator, where Haversine
    /// reduces to arc length and the distance is exact.
    fn position_km_from_origin(km: f64) -> Position {
        let lon = (km / EARTH_RADIUS_KM).to_degrees();
        Position::new(Coordinate::new(0.0, lon), 10.0)
    }

    #[test]
    fn distance_alert_boundary_is_inclusive() {
        let config = AlertConfig {
            distance_km: Some(5.0),
            minutes_before: None,
        };
        let near = position_km_from_origin(4.9);
        let far = position_km_from_origin(5.1);

        assert!(should_trigger(&near, &destination(), AlertType::Distance, &config));
        assert!(!should_trigger(&far, &destination(), AlertType::Distance, &config));
    }

    #[test]
    fn route_alert_behaves_like_distance() {
        let config = AlertConfig {
            distance_km: Some(5.0),
            minutes_before: None,
        };
        let near = position_km_from_origin(4.9);
        assert!(should_trigger(&near, &destination(), AlertType::Route, &config));
    }

    #[test]
    fn eta_alert_boundary_is_inclusive() {
        let config = AlertConfig {
            distance_km: None,
            minutes_before: Some(10),
        };
        // 6.667 km at 40 km/h rounds to exactly 10 minutes.
        let at_boundary = position_km_from_origin(6.667);
        let beyond = position_km_from_origin(7.4);

        assert!(should_trigger(&at_boundary, &destination(), AlertType::Eta, &config));
        assert!(!should_trigger(&beyond, &destination(), AlertType::Eta, &config));
    }

    #[test]
    fn defaults_apply_when_config_is_empty() {
        let config = AlertConfig::default();
        assert!(should_trigger(&position_km_from_origin(4.9), &destination(), AlertType::Distance, &config));
        assert!(!should_trigger(&position_km_from_origin(5.1), &destination(), AlertType::Distance, &config));
    }

    #[test]
    fn unknown_alert_type_never_fires() {
        let on_top = Position::new(Coordinate::new(0.0, 0.0), 10.0);
        assert!(!should_trigger(&on_top, &destination(), AlertType::Unknown, &AlertConfig::default()));
    }

    #[test]
    fn latch_fires_exactly_once() {
        let config = AlertConfig {
            distance_km: Some(5.0),
            minutes_before: None,
        };
        let mut latch = AlertLatch::new();
        let qualifying = position_km_from_origin(1.0);

        let mut fired = 0;
        for _ in 0..5 {
            if latch.check_and_fire(&qualifying, &destination(), AlertType::Distance, &config) {
                fired += 1;
            }
        }

        assert_eq!(fired, 1);
        assert!(latch.fired());
    }

    #[test]
    fn latch_stays_armed_until_a_position_qualifies() {
        let config = AlertConfig {
            distance_km: Some(5.0),
            minutes_before: None,
        };
        let mut latch = AlertLatch::new();

        assert!(!latch.check_and_fire(&position_km_from_origin(20.0), &destination(), AlertType::Distance, &config));
        assert!(!latch.fired());
        assert!(latch.check_and_fire(&position_km_from_origin(3.0), &destination(), AlertType::Distance, &config));
        // Moving away again never reverts the latch.
        assert!(!latch.check_and_fire(&position_km_from_origin(20.0), &destination(), AlertType::Distance, &config));
        assert!(latch.fired());
    }
}
