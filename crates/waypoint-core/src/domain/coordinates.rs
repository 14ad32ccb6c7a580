use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Mean Earth radius (IUGG) in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// WGS84 coordinate pair in decimal degrees.
///
/// Fields are private: every value is range-checked on the way in, including
/// through serde.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DegreePair")]
pub struct Coordinates {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct DegreePair {
    lat: f64,
    lng: f64,
}

impl TryFrom<DegreePair> for Coordinates {
    type Error = ValidationError;

    fn try_from(pair: DegreePair) -> Result<Self, Self::Error> {
        Self::new(pair.lat, pair.lng)
    }
}

impl Coordinates {
    /// Validate a coordinate pair.
    pub fn new(lat: f64, lng: f64) -> Result<Self, ValidationError> {
        Self::validated("lat", lat, "lng", lng)
    }

    /// Validate with caller-facing field names so errors point at the request field.
    pub fn validated(
        lat_field: &'static str,
        lat: f64,
        lng_field: &'static str,
        lng: f64,
    ) -> Result<Self, ValidationError> {
        if !lat.is_finite() {
            return Err(ValidationError::NonFiniteCoordinate { field: lat_field });
        }
        if !lng.is_finite() {
            return Err(ValidationError::NonFiniteCoordinate { field: lng_field });
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::LatitudeOutOfRange {
                field: lat_field,
                value: lat.to_string(),
            });
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(ValidationError::LongitudeOutOfRange {
                field: lng_field,
                value: lng.to_string(),
            });
        }

        Ok(Self { lat, lng })
    }

    /// For compile-time tables whose values are checked by tests.
    pub(crate) const fn from_table(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub const fn lat(&self) -> f64 {
        self.lat
    }

    pub const fn lng(&self) -> f64 {
        self.lng
    }

    /// Great-circle distance in kilometres using the haversine formula.
    pub fn haversine_km(&self, other: &Self) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        // Clamp guards against a > 1 from rounding on antipodal points.
        let c = 2.0 * a.sqrt().min(1.0).asin();

        EARTH_RADIUS_KM * c
    }

    /// `lat,lng` form used by provider query strings.
    pub fn to_query_pair(self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

impl Display for Coordinates {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}
