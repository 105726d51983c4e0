//! Integration tests for stakeout navigation.
//!
//! These tests drive the public API end to end:
//! - simulated walker → controller → throttle → sink
//! - battery-adaptive rates feeding the throttle interval
//! - activation failures and their alerts
//! - location resolution through a fallback chain
//!
//! Run with: `cargo test --test navigation_integration`

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use stakeout::alerts::{AlertKind, RecordingNotifier};
use stakeout::config::{BatteryAdaptiveRates, BatteryStatus, DataClass, SharedPerformanceConfig};
use stakeout::geo::{haversine_distance, nearest_point_on_geometry, Feature, LngLat};
use stakeout::location::{FallbackChain, LocationSource, NoLocation, SharedLocation};
use stakeout::navigation::{NavigationController, NavigationUpdate};
use stakeout::simulator::{SimulationOutcome, WalkSimulator};
use stakeout::throttle::{IntervalSource, RecordingSink, Throttle};

// ============================================================================
// Helper Functions
// ============================================================================

/// Start point just south of the test field.
const START: LngLat = LngLat::new(14.2229, 46.6263);

/// A field of roughly 75 m x 110 m, about 78 m north of `START`.
const FIELD_JSON: &str = r#"{
    "type": "Feature",
    "properties": { "name": "Field 7" },
    "geometry": {
        "type": "Polygon",
        "coordinates": [[
            [14.2225, 46.6270],
            [14.2235, 46.6270],
            [14.2235, 46.6280],
            [14.2225, 46.6280],
            [14.2225, 46.6270]
        ]]
    }
}"#;

struct Rig {
    controller: NavigationController,
    sink: Arc<RecordingSink<NavigationUpdate>>,
    notifier: Arc<RecordingNotifier>,
    config: SharedPerformanceConfig,
}

/// Wire a controller the way an application would.
fn rig(location: Arc<dyn LocationSource>) -> Rig {
    let config = SharedPerformanceConfig::default();
    let sink = RecordingSink::<NavigationUpdate>::new();
    let notifier = RecordingNotifier::new();

    let throttle = Throttle::<NavigationUpdate>::new(
        "navigation",
        IntervalSource::from_config(config.clone(), DataClass::GpsPosition),
        sink.clone(),
    )
    .expect("inside a tokio runtime");

    let controller =
        NavigationController::new(throttle, location, notifier.clone(), config.clone());

    Rig {
        controller,
        sink,
        notifier,
        config,
    }
}

fn field() -> Feature {
    Feature::from_json(FIELD_JSON).expect("valid feature JSON")
}

// ============================================================================
// Integration Tests
// ============================================================================

/// Walk from outside the field to its boundary and check what the UI saw.
#[tokio::test(start_paused = true)]
async fn test_walk_to_polygon_boundary() {
    let mut rig = rig(Arc::new(NoLocation));
    let target = field();

    assert!(rig.controller.activate_for_feature(Some(&target), Some(START)));
    let nearest = rig
        .controller
        .session()
        .and_then(|s| s.nearest_target_point())
        .expect("polygon yields a nearest point");
    assert!((nearest.lat - 46.6270).abs() < 1e-9);

    let mut walker = WalkSimulator::new(START, nearest).with_speed(5.0);
    let mut fixes = 0usize;
    let controller = &mut rig.controller;
    let outcome = walker
        .run(Duration::from_millis(200), CancellationToken::new(), |fix| {
            fixes += 1;
            controller.update_current_location(fix.lng, fix.lat);
        })
        .await;
    assert_eq!(outcome, SimulationOutcome::Arrived);

    // Let the final held update through
    sleep(Duration::from_millis(1100)).await;

    let updates = rig.sink.updates();
    assert!(fixes > 50, "walk too short: {fixes} fixes");
    assert!(
        updates.len() <= fixes / 3,
        "{} deliveries for {} fixes",
        updates.len(),
        fixes
    );

    // Distances shrink and the final frame shows arrival
    let first = updates.first().expect("initial update");
    let last = updates.last().expect("final update");
    assert!(first.direct_distance_m > 70.0);
    assert!(last.direct_distance_m < 1.0);
    for pair in updates.windows(2) {
        assert!(pair[1].direct_distance_m <= pair[0].direct_distance_m + 1e-6);
    }

    assert!(rig.controller.stop());
    assert_eq!(
        rig.notifier.kinds(),
        vec![AlertKind::StakeOutStarted, AlertKind::StakeOutStopped]
    );
}

/// Low battery stretches the GPS interval, which the throttle honors.
#[tokio::test(start_paused = true)]
async fn test_battery_adaptive_interval() {
    let mut rig = rig(Arc::new(NoLocation));
    let applied =
        BatteryAdaptiveRates::default().apply(BatteryStatus::new(0.15, false), &rig.config);
    assert_eq!(applied, Some(Duration::from_millis(5000)));

    rig.controller.activate_for_feature(Some(&field()), Some(START));
    for i in 1..=12 {
        sleep(Duration::from_secs(1)).await;
        rig.controller
            .update_current_location(START.lng + i as f64 * 1e-5, START.lat);
    }
    sleep(Duration::from_secs(6)).await;

    let updates = rig.sink.updates();
    assert!(
        (3..=4).contains(&updates.len()),
        "unexpected delivery count: {}",
        updates.len()
    );
    assert_eq!(
        updates.last().map(|u| u.current_location),
        Some(LngLat::new(START.lng + 12.0 * 1e-5, START.lat))
    );
}

/// Unsupported features never create a session.
#[tokio::test(start_paused = true)]
async fn test_geometry_collection_rejected_from_json() {
    let mut rig = rig(Arc::new(NoLocation));
    let feature = Feature::from_json(
        r#"{"type": "Feature", "geometry": {"type": "GeometryCollection", "geometries": []}}"#,
    )
    .expect("valid feature JSON");

    assert!(!rig.controller.activate_for_feature(Some(&feature), Some(START)));
    assert!(!rig.controller.is_active());

    rig.controller.update_current_location(START.lng, START.lat);
    sleep(Duration::from_secs(2)).await;

    assert!(rig.sink.is_empty());
    assert_eq!(
        rig.notifier.kinds(),
        vec![AlertKind::UnsupportedFeature {
            geometry_type: "GeometryCollection".to_string()
        }]
    );
}

/// No update reaches the UI after stop, even with fixes still arriving.
#[tokio::test(start_paused = true)]
async fn test_no_updates_after_stop() {
    let mut rig = rig(Arc::new(NoLocation));
    rig.controller.activate_for_feature(Some(&field()), Some(START));
    rig.controller.update_current_location(START.lng, START.lat + 1e-5);
    rig.controller.update_current_location(START.lng, START.lat + 2e-5);

    rig.controller.stop();
    let delivered = rig.sink.len();
    assert_eq!(delivered, 2, "stop flushes the held update");

    for i in 0..10 {
        rig.controller
            .update_current_location(START.lng, START.lat + i as f64 * 1e-5);
        sleep(Duration::from_millis(500)).await;
    }

    assert_eq!(rig.sink.len(), delivered);
    assert!(!rig.controller.throttle().timer_armed());
}

/// A polygon whose coordinates do not decode starts a session that stays
/// silent instead of failing.
#[tokio::test(start_paused = true)]
async fn test_degenerate_polygon_is_silent() {
    let mut rig = rig(Arc::new(NoLocation));
    let feature = Feature::from_json(r#"{"type": "Polygon", "coordinates": [1, 2, 3]}"#)
        .expect("valid geometry JSON");

    assert!(rig.controller.activate_for_feature(Some(&feature), Some(START)));
    for i in 0..5 {
        rig.controller
            .update_current_location(START.lng + i as f64 * 1e-5, START.lat);
    }
    sleep(Duration::from_secs(3)).await;

    assert!(rig.controller.is_active());
    assert!(rig.sink.is_empty());
    assert_eq!(rig.controller.session().map(|s| s.updates_applied()), Some(5));
}

/// Activation without an explicit location asks the injected source.
#[tokio::test(start_paused = true)]
async fn test_location_from_fallback_chain() {
    let navigation = SharedLocation::new();
    let bridge = SharedLocation::new();
    let chain = FallbackChain::new()
        .then(navigation.clone())
        .then(NoLocation)
        .then(bridge.clone());
    let mut rig = rig(Arc::new(chain));

    bridge.set(START);
    let summary = rig
        .controller
        .try_activate(Some(&field()), None)
        .expect("field is supported");
    assert_eq!(summary.start_location, START);

    let closer = LngLat::new(14.2229, 46.6268);
    navigation.set(closer);
    let summary = rig
        .controller
        .try_activate(Some(&field()), None)
        .expect("field is supported");
    assert_eq!(summary.start_location, closer);
    assert!(summary.replaced_previous);

    let geometry = field().geometry().expect("supported geometry");
    let expected = nearest_point_on_geometry(&geometry, closer).expect("nearest point");
    let distance = summary.direct_distance_m.expect("distance");
    assert!((distance - haversine_distance(closer, expected)).abs() < 1e-9);
}

/// A shorter interval set mid-session applies from the next decision on.
#[tokio::test(start_paused = true)]
async fn test_interval_change_mid_session() {
    let mut rig = rig(Arc::new(NoLocation));
    rig.controller.activate_for_feature(Some(&field()), Some(START));

    rig.config
        .set("gps.updateInterval", "250")
        .expect("valid interval");

    // Wait out the cooling window armed under the old interval
    sleep(Duration::from_millis(1100)).await;
    for i in 1..=8 {
        rig.controller
            .update_current_location(START.lng, START.lat + i as f64 * 1e-5);
        sleep(Duration::from_millis(300)).await;
    }

    // 1 initial + one per fix at 300 ms spacing
    assert_eq!(rig.sink.len(), 9);
}
