use thiserror::Error;

/// Validation and contract errors exposed by `waypoint-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("address cannot be empty")]
    EmptyAddress,
    #[error("address length {len} exceeds max {max}")]
    AddressTooLong { len: usize, max: usize },

    #[error("{field} must be a finite number")]
    NonFiniteCoordinate { field: &'static str },
    #[error("{field} must be within [-90, 90], got {value}")]
    LatitudeOutOfRange { field: &'static str, value: String },
    #[error("{field} must be within [-180, 180], got {value}")]
    LongitudeOutOfRange { field: &'static str, value: String },

    #[error("invalid source '{value}', expected one of primary, secondary, mathematical")]
    InvalidSource { value: String },
    #[error("invalid match level '{value}'")]
    InvalidMatchLevel { value: String },
}

/// Environment/configuration parsing errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {name} must be {expected}, got '{value}'")]
    InvalidValue {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}
