use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical provider identifiers used in results and response metadata.
///
/// Declaration order is the default fallback priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Commercial mapping API (Google Maps Platform).
    Primary,
    /// Community mapping services (OpenStreetMap Nominatim + OSRM).
    Secondary,
    /// Offline haversine / gazetteer fallback.
    Mathematical,
}

impl ProviderId {
    pub const ALL: [Self; 3] = [Self::Primary, Self::Secondary, Self::Mathematical];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Mathematical => "mathematical",
        }
    }

    /// Human-readable provider name used in quota/fallback messages.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Primary => "Google Maps",
            Self::Secondary => "OpenStreetMap",
            Self::Mathematical => "straight-line estimate",
        }
    }

    /// Lower rank means higher priority when breaking score ties.
    pub const fn priority_rank(self) -> u8 {
        match self {
            Self::Primary => 0,
            Self::Secondary => 1,
            Self::Mathematical => 2,
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "primary" | "google" | "google_maps" => Ok(Self::Primary),
            "secondary" | "osm" | "openstreetmap" => Ok(Self::Secondary),
            "mathematical" | "haversine" => Ok(Self::Mathematical),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("Google".parse::<ProviderId>(), Ok(ProviderId::Primary));
        assert_eq!(" osm ".parse::<ProviderId>(), Ok(ProviderId::Secondary));
        assert!(matches!(
            "bing".parse::<ProviderId>(),
            Err(ValidationError::InvalidSource { .. })
        ));
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&ProviderId::Mathematical).expect("serialize");
        assert_eq!(json, "\"mathematical\"");
    }
}
