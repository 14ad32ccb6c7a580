//! Match-level and confidence scoring for geocoding candidates.
//!
//! Each raw candidate's resolved address components are compared against the
//! query text to find the most specific tier that matched, then its
//! confidence is weighted by provider trust and match tier into a rank key.
//! The weights are configuration, not law; [`ScoringWeights::default`] is a
//! starting point tuned for Thai addresses.

use std::cmp::Ordering;

use crate::data_source::{GeocodeRequest, RawCandidate};
use crate::{AddressComponents, GeocodeCandidate, MatchLevel, ProviderId};

/// Administrative prefixes providers attach to component names.
const ADMIN_PREFIXES: [&str; 14] = [
    "chang wat ",
    "changwat ",
    "amphoe ",
    "amphur ",
    "tambon ",
    "khwaeng ",
    "khet ",
    "จังหวัด",
    "อำเภอ",
    "ตำบล",
    "แขวง",
    "เขต",
    "จ ",
    "อ ",
];

const ADMIN_SUFFIXES: [&str; 3] = [" subdistrict", " district", " province"];

/// Tunable weights for confidence and rank computation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringWeights {
    pub primary_trust: f64,
    pub secondary_trust: f64,
    pub mathematical_trust: f64,
    pub exact: f64,
    pub full_address: f64,
    pub district_province: f64,
    pub province_only: f64,
    pub partial: f64,
    /// Confidence divisor growth per alternative interpretation.
    pub ambiguity_penalty: f64,
    /// Confidence bonus when the candidate names the hinted company.
    pub company_bonus: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            primary_trust: 1.0,
            secondary_trust: 0.8,
            mathematical_trust: 0.3,
            exact: 1.0,
            full_address: 0.85,
            district_province: 0.65,
            province_only: 0.45,
            partial: 0.25,
            ambiguity_penalty: 0.1,
            company_bonus: 0.05,
        }
    }
}

impl ScoringWeights {
    pub fn trust(&self, source: ProviderId) -> f64 {
        match source {
            ProviderId::Primary => self.primary_trust,
            ProviderId::Secondary => self.secondary_trust,
            ProviderId::Mathematical => self.mathematical_trust,
        }
    }

    pub fn match_weight(&self, level: MatchLevel) -> f64 {
        match level {
            MatchLevel::Exact => self.exact,
            MatchLevel::FullAddress => self.full_address,
            MatchLevel::DistrictProvince => self.district_province,
            MatchLevel::ProvinceOnly => self.province_only,
            MatchLevel::Partial => self.partial,
        }
    }
}

/// Scores and ranks raw candidates against the query that produced them.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    weights: ScoringWeights,
}

impl ScoringEngine {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Scores every candidate and returns them sorted by descending
    /// `final_score`, ties broken by provider priority then input order.
    pub fn rank(&self, query: &GeocodeRequest, raw: Vec<RawCandidate>) -> Vec<GeocodeCandidate> {
        let profile = QueryProfile::new(query.address());
        let company = query.company_name().map(normalize);

        let mut candidates = raw
            .into_iter()
            .map(|candidate| self.score_one(&profile, company.as_deref(), candidate))
            .collect::<Vec<_>>();

        candidates.sort_by(|left, right| {
            right
                .final_score
                .partial_cmp(&left.final_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    left.source
                        .priority_rank()
                        .cmp(&right.source.priority_rank())
                })
        });

        candidates
    }

    /// Most specific tier at which `components` agree with the query text.
    pub fn match_level(&self, query: &str, components: &AddressComponents) -> MatchLevel {
        QueryProfile::new(query).match_level(components)
    }

    fn score_one(
        &self,
        profile: &QueryProfile,
        company: Option<&str>,
        raw: RawCandidate,
    ) -> GeocodeCandidate {
        let match_level = profile.match_level(&raw.components);

        let base = raw
            .provider_confidence
            .unwrap_or_else(|| fallback_confidence(match_level))
            .clamp(0.0, 1.0);
        let ambiguity = 1.0 + self.weights.ambiguity_penalty * raw.alternatives as f64;
        let mut confidence = base / ambiguity;

        if let Some(company) = company.filter(|name| !name.is_empty()) {
            let named = raw
                .place_name
                .as_deref()
                .into_iter()
                .chain(std::iter::once(raw.formatted_address.as_str()))
                .any(|text| normalize(text).contains(company));
            if named {
                confidence += self.weights.company_bonus;
            }
        }
        let confidence = round4(confidence.clamp(0.0, 1.0));

        let final_score = round4(
            confidence * self.weights.trust(raw.source) * self.weights.match_weight(match_level),
        );

        GeocodeCandidate {
            lat: raw.coordinates.lat(),
            lng: raw.coordinates.lng(),
            formatted_address: raw.formatted_address,
            address_components: raw.components,
            match_level,
            confidence,
            final_score,
            source: raw.source,
        }
    }
}

/// Confidence assumed when a provider reports no certainty signal of its own.
fn fallback_confidence(level: MatchLevel) -> f64 {
    match level {
        MatchLevel::Exact => 0.9,
        MatchLevel::FullAddress => 0.75,
        MatchLevel::DistrictProvince => 0.55,
        MatchLevel::ProvinceOnly => 0.35,
        MatchLevel::Partial => 0.2,
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Query text pre-normalized once per resolution call.
struct QueryProfile {
    text: String,
    padded: String,
    tokens: Vec<String>,
    postcode: Option<String>,
}

impl QueryProfile {
    fn new(query: &str) -> Self {
        let text = normalize(query);
        let tokens = text.split(' ').map(str::to_owned).collect::<Vec<_>>();
        let postcode = tokens
            .iter()
            .find(|token| token.len() == 5 && token.chars().all(|ch| ch.is_ascii_digit()))
            .cloned();

        Self {
            padded: format!(" {text} "),
            text,
            tokens,
            postcode,
        }
    }

    fn match_level(&self, components: &AddressComponents) -> MatchLevel {
        let house = components
            .house_number
            .as_deref()
            .is_some_and(|value| self.has_token(value));
        let road = self.mentions(components.road.as_deref());
        let subdistrict = self.mentions(components.subdistrict.as_deref());
        let postcode = components
            .postcode
            .as_deref()
            .zip(self.postcode.as_deref())
            .is_some_and(|(resolved, queried)| resolved.trim() == queried);
        let district = self.mentions(components.district.as_deref())
            || self.mentions(components.city.as_deref())
            || postcode;
        let province = self.mentions(components.state.as_deref());

        if house && (road || subdistrict) {
            MatchLevel::Exact
        } else if road || subdistrict {
            MatchLevel::FullAddress
        } else if district {
            MatchLevel::DistrictProvince
        } else if province {
            MatchLevel::ProvinceOnly
        } else {
            MatchLevel::Partial
        }
    }

    fn has_token(&self, value: &str) -> bool {
        let value = normalize(value);
        !value.is_empty() && self.tokens.iter().any(|token| *token == value)
    }

    fn mentions(&self, component: Option<&str>) -> bool {
        let Some(value) = component.map(component_key) else {
            return false;
        };
        if value.is_empty() {
            return false;
        }

        // Thai script is written without word spaces, so fall back to substring search.
        if value.chars().any(is_thai) {
            self.text.contains(&value)
        } else {
            self.padded.contains(&format!(" {value} "))
        }
    }
}

/// Normalized component value with administrative prefixes/suffixes removed.
fn component_key(value: &str) -> String {
    let mut key = normalize(value);

    loop {
        let before = key.len();
        for prefix in ADMIN_PREFIXES {
            if let Some(rest) = key.strip_prefix(prefix) {
                key = rest.trim_start().to_owned();
            }
        }
        for suffix in ADMIN_SUFFIXES {
            if let Some(rest) = key.strip_suffix(suffix) {
                key = rest.trim_end().to_owned();
            }
        }
        if key.len() == before {
            return key;
        }
    }
}

pub(crate) fn is_thai(ch: char) -> bool {
    ('\u{0E00}'..='\u{0E7F}').contains(&ch)
}

/// Lowercase, punctuation to spaces, single-spaced. Keeps `/` for house numbers.
pub(crate) fn normalize(value: &str) -> String {
    let mapped = value
        .chars()
        .flat_map(char::to_lowercase)
        .map(|ch| {
            if ch.is_alphanumeric() || is_thai(ch) || ch == '/' {
                ch
            } else {
                ' '
            }
        })
        .collect::<String>();

    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}
