//! # Domain Models
//!
//! Canonical location types shared by every provider adapter.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Coordinates`] | Validated WGS84 point with haversine distance |
//! | [`AddressComponents`] | Structured address decomposition |
//! | [`MatchLevel`] | Match tier from `exact` down to `partial` |
//! | [`GeocodeCandidate`] | Scored and ranked geocoding result |
//! | [`DistanceResult`] | Distance/duration between two points |
//!
//! Constructors validate invariants, so a [`Coordinates`] value is always in range:
//!
//! ```rust
//! use waypoint_core::{Coordinates, ValidationError};
//!
//! assert!(Coordinates::new(13.75, 100.50).is_ok());
//! assert!(matches!(
//!     Coordinates::new(120.0, 100.50),
//!     Err(ValidationError::LatitudeOutOfRange { .. })
//! ));
//! ```

mod address;
mod coordinates;

pub use address::{AddressComponents, DistanceResult, GeocodeCandidate, MatchLevel};
pub use coordinates::{Coordinates, EARTH_RADIUS_KM};
