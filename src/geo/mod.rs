use crate::error::AppError;
use crate::models::courier::GeoPoint;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters on a spherical Earth.
///
/// Symmetric in its arguments. Out-of-range coordinates are rejected with
/// `AppError::InvalidCoordinate` rather than producing a meaningless number.
pub fn distance_m(a: &GeoPoint, b: &GeoPoint) -> Result<f64, AppError> {
    a.validate()?;
    b.validate()?;
    Ok(haversine_m(a, b))
}

fn haversine_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * central_angle
}

#[cfg(test)]
mod tests {
    use super::distance_m;
    use crate::error::AppError;
    use crate::models::courier::GeoPoint;

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint::new(-6.7924, 39.2083);
        let distance = distance_m(&p, &p).unwrap();
        assert!(distance < 1e-6);
    }

    #[test]
    fn london_to_paris_is_around_343_km() {
        let london = GeoPoint::new(51.5074, -0.1278);
        let paris = GeoPoint::new(48.8566, 2.3522);
        let distance = distance_m(&london, &paris).unwrap();
        assert!((distance - 343_000.0).abs() < 5_000.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GeoPoint::new(-1.2921, 36.8219);
        let b = GeoPoint::new(-1.3032, 36.7073);
        let ab = distance_m(&a, &b).unwrap();
        let ba = distance_m(&b, &a).unwrap();
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn antipodal_points_do_not_overflow() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 180.0);
        let distance = distance_m(&a, &b).unwrap();
        assert!((distance - 20_015_086.0).abs() < 1_000.0);
    }

    #[test]
    fn out_of_range_coordinate_is_rejected() {
        let ok = GeoPoint::new(0.0, 0.0);
        let bad = GeoPoint::new(120.0, 0.0);
        assert!(matches!(
            distance_m(&ok, &bad),
            Err(AppError::InvalidCoordinate { lat, .. }) if lat == 120.0
        ));
    }
}
