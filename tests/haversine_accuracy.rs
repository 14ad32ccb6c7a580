//! Straight-Line Distance Accuracy Tests
//!
//! The mathematical tier is the last answer a caller can get, so its
//! great-circle figures are checked against known reference distances.

use waypoint_core::{MathematicalSource, ValidationError, EARTH_RADIUS_KM};
use waypoint_tests::*;

fn straight_line(origin: (f64, f64), destination: (f64, f64)) -> f64 {
    let request = DistanceRequest::from_degrees(origin.0, origin.1, destination.0, destination.1)
        .expect("valid coordinates");
    MathematicalSource::new()
        .straight_line(&request)
        .distance_km
}

fn assert_within(actual: f64, expected: f64, tolerance: f64) {
    let error = (actual - expected).abs() / expected;
    assert!(
        error <= tolerance,
        "expected {expected} km within {:.2}%, got {actual} km",
        tolerance * 100.0
    );
}

// ============================================================================
// Reference Distances
// ============================================================================

#[test]
fn when_points_are_about_fifty_km_apart_error_is_under_half_a_percent() {
    // Given: Bangkok (Democracy Monument area) and Nakhon Pathom, ~48.0 km apart
    let bangkok = (13.7563, 100.5018);
    let nakhon_pathom = (13.8199, 100.0621);

    // When
    let distance = straight_line(bangkok, nakhon_pathom);

    // Then
    assert_within(distance, 48.0, 0.005);
}

#[test]
fn when_route_is_long_haul_error_stays_small() {
    // Given: Bangkok to Chiang Mai, ~582 km great-circle
    let distance = straight_line((13.7563, 100.5018), (18.7883, 98.9853));

    // Then
    assert_within(distance, 582.5, 0.01);
}

// ============================================================================
// Metric Properties
// ============================================================================

#[test]
fn when_origin_equals_destination_distance_is_zero() {
    assert_eq!(straight_line((14.0716, 100.6122), (14.0716, 100.6122)), 0.0);
}

#[test]
fn when_endpoints_swap_distance_is_unchanged() {
    let pairs = [
        ((13.7563, 100.5018), (14.0716, 100.6122)),
        ((7.8804, 98.3923), (18.7883, 98.9853)),
        ((-33.8688, 151.2093), (51.5074, -0.1278)),
    ];

    for (a, b) in pairs {
        let forward = straight_line(a, b);
        let backward = straight_line(b, a);
        assert!((forward - backward).abs() < 1e-9, "{a:?} <-> {b:?}");
    }
}

#[test]
fn when_points_are_antipodal_distance_is_half_the_circumference() {
    let distance = straight_line((0.0, 0.0), (0.0, 180.0));
    assert_within(distance, std::f64::consts::PI * EARTH_RADIUS_KM, 1e-9);
}

// ============================================================================
// Input Validation
// ============================================================================

#[test]
fn when_points_are_outside_wgs84_no_coordinates_can_be_built() {
    // Given / When: an out-of-range pair and a NaN latitude
    let out_of_range = Coordinates::new(200.0, 500.0);
    let not_a_number = Coordinates::new(f64::NAN, 0.0);

    // Then: neither can reach a distance request
    assert!(matches!(
        out_of_range,
        Err(ValidationError::LatitudeOutOfRange { field: "lat", .. })
    ));
    assert_eq!(
        not_a_number,
        Err(ValidationError::NonFiniteCoordinate { field: "lat" })
    );
}

#[tokio::test]
async fn when_request_is_built_from_valid_points_estimate_is_finite() {
    // Given: a request assembled from separately validated points
    let origin = Coordinates::new(13.7563, 100.5018).expect("valid");
    let destination = Coordinates::new(14.0716, 100.6122).expect("valid");
    let request = DistanceRequest::new(origin, destination);

    // When
    let routed = FallbackOrchestrator::default()
        .route_distance(&request)
        .await
        .expect("always answers");

    // Then
    assert!(routed.data.distance_km.is_finite());
    assert!((routed.data.distance_km - 37.03).abs() < 0.1);
}

#[tokio::test]
async fn when_routed_through_the_chain_straight_line_has_no_duration() {
    // Given: the mathematical tier on its own
    let orchestrator = FallbackOrchestrator::builder().build();
    let request = scenario_distance_request();

    // When
    let routed = orchestrator
        .route_distance(&request)
        .await
        .expect("always answers");

    // Then
    assert_eq!(routed.selected_source, ProviderId::Mathematical);
    assert_eq!(routed.data.duration_seconds, None);
    assert_eq!(
        routed.data.distance_km,
        request.origin.haversine_km(&request.destination)
    );
}
