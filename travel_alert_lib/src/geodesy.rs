use crate::position::Coordinate;

pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const DEFAULT_AVG_SPEED_KMH: f64 = 40.0;

/// Haversine great-circle distance in kilometers.
///
/// The intermediate term is clamped to [0, 1] so floating point overshoot
/// near equal or antipodal points cannot push it out of the domain of the
/// inverse-trig step.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Estimated minutes to cover `distance_km` at `avg_speed_kmh`.
/// `None` when the speed is not positive.
pub fn eta_minutes(distance_km: f64, avg_speed_kmh: f64) -> Option<i64> {
    if avg_speed_kmh <= 0.0 {
        return None;
    }
    Some((distance_km / avg_speed_kmh * 60.0).round() as i64)
}

/// Meters below 1 km, otherwise kilometers with two decimals.
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{} m", (km * 1000.0).round() as i64)
    } else {
        format!("{:.2} km", km)
    }
}

pub fn format_time(minutes: i64) -> String {
    if minutes < 60 {
        format!("{} min", minutes)
    } else {
        format!("{}h {}m", minutes / 60, minutes % 60)
    }
}

/// Forward azimuth from `a` to `b` in degrees, [0, 360).
pub fn bearing_degrees(a: Coordinate, b: Coordinate) -> f64 {
    let d_lon = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}
