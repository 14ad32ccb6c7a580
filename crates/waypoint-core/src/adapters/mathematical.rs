use crate::adapters::gazetteer::{self, GazetteerHit, THAILAND_CENTROID};
use crate::data_source::{
    CapabilitySet, DistanceRequest, GeocodeRequest, LocationSource, RawCandidate, RawDistance,
    SourceFuture,
};
use crate::{AddressComponents, Coordinates, ProviderId};

const NAME_MATCH_CONFIDENCE: f64 = 0.3;
const POSTCODE_MATCH_CONFIDENCE: f64 = 0.2;
const CENTROID_CONFIDENCE: f64 = 0.05;

/// Offline last-resort source. Never performs I/O and never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct MathematicalSource;

impl MathematicalSource {
    pub fn new() -> Self {
        Self
    }

    /// Great-circle distance; no duration since there is no road network.
    pub fn straight_line(&self, req: &DistanceRequest) -> RawDistance {
        RawDistance {
            distance_km: req.origin.haversine_km(&req.destination),
            duration_seconds: None,
            source: ProviderId::Mathematical,
        }
    }

    /// Province-seat estimate for the address, or the country centroid.
    pub fn estimate(&self, req: &GeocodeRequest) -> RawCandidate {
        let thai = req.language_hint() == "th";
        let country = if thai { "ประเทศไทย" } else { "Thailand" };

        let Some(hit) = gazetteer::lookup(req.address()) else {
            let (lat, lng) = THAILAND_CENTROID;
            return RawCandidate {
                coordinates: Coordinates::from_table(lat, lng),
                formatted_address: country.to_owned(),
                components: AddressComponents {
                    country: Some(country.to_owned()),
                    ..AddressComponents::default()
                },
                provider_confidence: Some(CENTROID_CONFIDENCE),
                alternatives: 0,
                place_name: None,
                source: ProviderId::Mathematical,
            };
        };

        let province = hit.province();
        let state = if thai { province.thai_name } else { province.name };
        let confidence = match hit {
            GazetteerHit::Name(_) => NAME_MATCH_CONFIDENCE,
            GazetteerHit::Postcode(_) => POSTCODE_MATCH_CONFIDENCE,
        };

        RawCandidate {
            coordinates: Coordinates::from_table(province.lat, province.lng),
            formatted_address: format!("{state}, {country}"),
            components: AddressComponents {
                country: Some(country.to_owned()),
                state: Some(state.to_owned()),
                ..AddressComponents::default()
            },
            provider_confidence: Some(confidence),
            alternatives: 0,
            place_name: None,
            source: ProviderId::Mathematical,
        }
    }
}

impl LocationSource for MathematicalSource {
    fn id(&self) -> ProviderId {
        ProviderId::Mathematical
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::full()
    }

    fn geocode<'a>(&'a self, req: GeocodeRequest) -> SourceFuture<'a, Vec<RawCandidate>> {
        let candidate = self.estimate(&req);
        Box::pin(async move { Ok(vec![candidate]) })
    }

    fn distance<'a>(&'a self, req: DistanceRequest) -> SourceFuture<'a, RawDistance> {
        let distance = self.straight_line(&req);
        Box::pin(async move { Ok(distance) })
    }
}
