//! Coordinate sanity checks.

/// Both axes within this distance of zero mark a "null island" placeholder.
const NULL_ISLAND_EPSILON: f64 = 0.1;

/// Check a possibly-missing coordinate pair.
pub fn is_valid_coordinate(lat: Option<f64>, lon: Option<f64>) -> bool {
    match (lat, lon) {
        (Some(lat), Some(lon)) => is_valid_pair(lat, lon),
        _ => false,
    }
}

/// Reject non-finite values, out-of-range values and pairs hugging (0, 0).
pub fn is_valid_pair(lat: f64, lon: f64) -> bool {
    if !lat.is_finite() || !lon.is_finite() {
        return false;
    }
    if lat.abs() < NULL_ISLAND_EPSILON && lon.abs() < NULL_ISLAND_EPSILON {
        return false;
    }
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}
