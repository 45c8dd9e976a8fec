use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Rejects points outside the WGS84 range (and NaN).
    pub fn validate(&self) -> Result<(), AppError> {
        let lat_ok = (-90.0..=90.0).contains(&self.lat);
        let lng_ok = (-180.0..=180.0).contains(&self.lng);

        if lat_ok && lng_ok {
            Ok(())
        } else {
            Err(AppError::InvalidCoordinate {
                lat: self.lat,
                lng: self.lng,
            })
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: Uuid,
    pub name: String,
    pub location: GeoPoint,
    /// Cleared while the courier is committed to an active route.
    pub available: bool,
    pub rating: f64,
    pub updated_at: DateTime<Utc>,
}

impl Courier {
    pub fn new(name: impl Into<String>, location: GeoPoint, rating: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            location,
            available: true,
            rating: rating.clamp(0.0, 5.0),
            updated_at: Utc::now(),
        }
    }
}
