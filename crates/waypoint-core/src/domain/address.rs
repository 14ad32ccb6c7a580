use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ProviderId, ValidationError};

/// Structured decomposition of a resolved location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressComponents {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// State or province.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdistrict: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub road: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub house_number: Option<String>,
}

impl AddressComponents {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// How much of the input address a provider actually matched.
///
/// Variants are ordered from most to least specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchLevel {
    Exact,
    FullAddress,
    DistrictProvince,
    ProvinceOnly,
    Partial,
}

impl MatchLevel {
    pub const ALL: [Self; 5] = [
        Self::Exact,
        Self::FullAddress,
        Self::DistrictProvince,
        Self::ProvinceOnly,
        Self::Partial,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::FullAddress => "full_address",
            Self::DistrictProvince => "district_province",
            Self::ProvinceOnly => "province_only",
            Self::Partial => "partial",
        }
    }
}

impl Display for MatchLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchLevel {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == value.trim())
            .ok_or_else(|| ValidationError::InvalidMatchLevel {
                value: value.to_owned(),
            })
    }
}

/// One ranked geocoding result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeCandidate {
    pub lat: f64,
    pub lng: f64,
    pub formatted_address: String,
    pub address_components: AddressComponents,
    pub match_level: MatchLevel,
    /// How unambiguous the provider's own match was, in `[0, 1]`.
    pub confidence: f64,
    /// Rank key; not meaningful outside one resolution call.
    pub final_score: f64,
    pub source: ProviderId,
}

/// Travel distance between two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceResult {
    pub distance_km: f64,
    /// Only road-network providers report a duration.
    pub duration_seconds: Option<u64>,
    pub source: ProviderId,
    pub warning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_level_round_trips_through_str() {
        for level in MatchLevel::ALL {
            assert_eq!(level.as_str().parse::<MatchLevel>(), Ok(level));
        }
    }

    #[test]
    fn match_levels_order_from_most_specific() {
        assert!(MatchLevel::Exact < MatchLevel::FullAddress);
        assert!(MatchLevel::ProvinceOnly < MatchLevel::Partial);
    }

    #[test]
    fn empty_components_skip_serialization() {
        let json = serde_json::to_value(AddressComponents {
            postcode: Some(String::from("12120")),
            ..AddressComponents::default()
        })
        .expect("serialize");

        assert_eq!(json, serde_json::json!({ "postcode": "12120" }));
    }
}
