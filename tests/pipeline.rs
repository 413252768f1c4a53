use std::collections::HashMap;

use bevy::math::DVec2;
use geo::{Area, BooleanOps, MultiPolygon, Polygon};

use parcel_subdivider::errors::{Anomaly, EngineError};
use parcel_subdivider::systems::engine::allocator::AreaSource;
use parcel_subdivider::systems::engine::lots::{subdivide_block, LotKind};
use parcel_subdivider::systems::engine::poly::utils::rect_polygon;
use parcel_subdivider::systems::engine::roads::{derive_streets, RoadSkeleton};
use parcel_subdivider::systems::params::{CreativeFreedom, RoadShapeMode};
use parcel_subdivider::{validate, Parameters, Plan, RawValue, SubdivisionEngine};

fn rect(w: f64, h: f64) -> Vec<DVec2> {
    vec![DVec2::ZERO, DVec2::new(w, 0.0), DVec2::new(w, h), DVec2::new(0.0, h)]
}

// irregular five-sided parcel
fn pentagon() -> Vec<DVec2> {
    vec![
        DVec2::new(0.0, 0.0),
        DVec2::new(160.0, 10.0),
        DVec2::new(180.0, 110.0),
        DVec2::new(70.0, 150.0),
        DVec2::new(-10.0, 90.0),
    ]
}

fn run(vertices: &[DVec2], params: Parameters) -> Plan {
    SubdivisionEngine::new(params)
        .with_seed(17)
        .run(vertices)
        .unwrap()
}

fn overlap(a: &Polygon<f64>, b: &Polygon<f64>) -> f64 {
    a.intersection(b).unsigned_area()
}

fn assert_plan_invariants(plan: &Plan, params: &Parameters) {
    for (i, lot) in plan.lots.iter().enumerate() {
        assert!(lot.area >= params.min_lot_area, "lot {i} area {}", lot.area);
        assert!(lot.frontage >= params.min_lot_frontage, "lot {i} frontage {}", lot.frontage);

        // inside its own block and no other
        let own = overlap(&lot.polygon, &plan.blocks[lot.block]);
        assert!((own - lot.area).abs() < 1e-2, "lot {i} leaves block {}", lot.block);
        for (j, block) in plan.blocks.iter().enumerate() {
            if j != lot.block {
                assert!(overlap(&lot.polygon, block) < 1e-3, "lot {i} leaks into block {j}");
            }
        }

        for (k, other) in plan.lots.iter().enumerate().skip(i + 1) {
            assert!(overlap(&lot.polygon, &other.polygon) < 1e-3, "lots {i} and {k} overlap");
        }
    }

    assert!(plan.internal.area <= plan.perimeter.area + 1e-9);

    let stats = &plan.statistics;
    let accounted = stats.lots.area
        + stats.roads.area
        + stats.sidewalks.area
        + stats.green.area
        + stats.institutional.area;
    assert!(
        accounted <= plan.perimeter.area + 1e-2,
        "accounted {accounted} of {}",
        plan.perimeter.area
    );
}

#[test]
fn scenario_a_rectangle_with_defaults() {
    let params = Parameters::default();
    let plan = run(&rect(100.0, 80.0), params.clone());

    assert!(!plan.internal.degraded);
    assert!(plan.statistics.lot_count >= 1);
    assert!(plan.statistics.roads.area > 0.0);
    assert!((plan.statistics.total_area - 8000.0).abs() < 1e-9);
    assert_plan_invariants(&plan, &params);
}

#[test]
fn scenario_b_too_few_finite_vertices() {
    let mut stages = 0;
    let vertices = vec![
        DVec2::ZERO,
        DVec2::new(f64::NAN, 5.0),
        DVec2::new(10.0, f64::INFINITY),
        DVec2::new(10.0, 0.0),
    ];
    let result = SubdivisionEngine::new(Parameters::default())
        .with_sink(|_: &parcel_subdivider::systems::engine::StageReport| stages += 1)
        .run(&vertices);

    assert!(matches!(result, Err(EngineError::InvalidGeometry { .. })));
    assert_eq!(stages, 0);
}

#[test]
fn scenario_c_nan_road_width_falls_back() {
    let raw = HashMap::from([("road_width".to_string(), RawValue::Number(f64::NAN))]);
    let params = validate(&raw);
    assert_eq!(params.road_width, 8.0);

    let plan = run(&rect(100.0, 80.0), params.clone());
    assert!(plan.statistics.lot_count >= 1);
    assert_plan_invariants(&plan, &params);
}

#[test]
fn scenario_d_block_at_one_point_nine_times_min_area() {
    let params = Parameters::default();
    let perimeter = rect_polygon(DVec2::ZERO, DVec2::new(100.0, 100.0));
    let skeleton = RoadSkeleton {
        lines: vec![vec![DVec2::new(0.0, 50.0), DVec2::new(100.0, 50.0)]],
        strategy: RoadShapeMode::Rectangular,
        fallback: false,
    };
    let streets = derive_streets(&skeleton, &perimeter, &params);

    // 19 x 20 = 1.9 * min_lot_area
    let fronting = rect_polygon(DVec2::new(40.0, 24.0), DVec2::new(59.0, 44.0));
    let (lots, _) = subdivide_block(&fronting, 0, &streets, &params);
    assert_eq!(lots.len(), 1);
    assert_eq!(lots[0].kind, LotKind::Single);
    assert!((lots[0].area - 380.0).abs() < 1e-3);

    let landlocked = rect_polygon(DVec2::new(40.0, 2.0), DVec2::new(59.0, 22.0));
    let (lots, _) = subdivide_block(&landlocked, 0, &streets, &params);
    assert!(lots.is_empty());
}

#[test]
fn deterministic_modes_are_idempotent() {
    for mode in [
        RoadShapeMode::Rectangular,
        RoadShapeMode::Varied,
        RoadShapeMode::Experimental,
    ] {
        let params = Parameters {
            road_shape_mode: mode,
            ..Parameters::default()
        };
        let first = SubdivisionEngine::new(params.clone()).run(&pentagon()).unwrap();
        let second = SubdivisionEngine::new(params).run(&pentagon()).unwrap();

        assert_eq!(first.statistics, second.statistics, "{mode:?}");
        assert_eq!(first.blocks, second.blocks, "{mode:?}");
        let polygons = |plan: &Plan| -> Vec<Polygon<f64>> {
            plan.lots.iter().map(|lot| lot.polygon.clone()).collect()
        };
        assert_eq!(polygons(&first), polygons(&second), "{mode:?}");
    }
}

#[test]
fn seeded_fully_free_is_reproducible() {
    let params = Parameters {
        road_shape_mode: RoadShapeMode::FullyFree,
        creative_freedom: CreativeFreedom::Maximum,
        ..Parameters::default()
    };
    let first = run(&pentagon(), params.clone());
    let second = run(&pentagon(), params);

    assert_eq!(first.skeleton.lines, second.skeleton.lines);
    assert_eq!(first.statistics, second.statistics);
    assert_eq!(first.diagnostics.seed, 17);
}

#[test]
fn every_road_mode_completes_within_invariants() {
    for mode in [
        RoadShapeMode::Rectangular,
        RoadShapeMode::Varied,
        RoadShapeMode::Experimental,
        RoadShapeMode::FullyFree,
    ] {
        let params = Parameters {
            road_shape_mode: mode,
            ..Parameters::default()
        };
        let plan = run(&pentagon(), params.clone());
        assert_eq!(plan.diagnostics.road_strategy, mode);
        assert!(!plan.blocks.is_empty(), "{mode:?}");
        assert_plan_invariants(&plan, &params);
    }
}

#[test]
fn thin_parcel_degrades_without_failing() {
    let params = Parameters::default();
    let plan = run(&rect(1.0, 1.0), params.clone());

    assert!(plan.internal.degraded);
    assert_eq!(plan.internal.area, plan.perimeter.area);
    assert!(plan.diagnostics.anomalies.contains(&Anomaly::DegenerateOperationResult {
        operation: "offset".to_string(),
    }));
    assert_plan_invariants(&plan, &params);
}

#[test]
fn common_areas_stay_outside_lots_and_streets() {
    let params = Parameters {
        green_area_pct: 30.0,
        institutional_area_pct: 10.0,
        ..Parameters::default()
    };
    let plan = run(&pentagon(), params);

    let built: MultiPolygon<f64> = MultiPolygon::new(
        plan.lots
            .iter()
            .map(|lot| lot.polygon.clone())
            .chain(plan.roads.iter().cloned())
            .chain(plan.sidewalks.iter().cloned())
            .collect(),
    );
    for area in &plan.common_areas {
        let shared = MultiPolygon::new(vec![area.polygon.clone()]).intersection(&built);
        assert!(shared.unsigned_area() < 1e-2);
    }
}

#[test]
fn road_fallback_is_diagnosed() {
    // small notched arrowhead that the wide streets erode away entirely
    let arrow = vec![
        DVec2::new(0.0, 0.0),
        DVec2::new(2.0, 1.5),
        DVec2::new(3.0, 1.5),
        DVec2::new(5.0, 0.0),
        DVec2::new(2.5, 5.0),
    ];
    let params = Parameters {
        road_width: 50.0,
        sidewalk_width: 20.0,
        road_shape_mode: RoadShapeMode::FullyFree,
        creative_freedom: CreativeFreedom::Moderate,
        ..Parameters::default()
    };
    let plan = run(&arrow, params.clone());

    assert!(plan.internal.degraded);
    assert!(plan.diagnostics.road_fallback);
    assert_eq!(plan.diagnostics.road_strategy, RoadShapeMode::FullyFree);
    assert_eq!(plan.skeleton.lines.len(), 1);
    assert!(plan.diagnostics.anomalies.contains(&Anomaly::DegenerateOperationResult {
        operation: "road_skeleton".to_string(),
    }));
    assert_plan_invariants(&plan, &params);
}

#[test]
fn zero_quotas_hand_out_no_unused_space() {
    let params = Parameters {
        green_area_pct: 0.0,
        institutional_area_pct: 0.0,
        ..Parameters::default()
    };
    let plan = run(&pentagon(), params.clone());

    assert!(plan
        .common_areas
        .iter()
        .all(|area| area.source == AreaSource::UndersizedBlock));
    assert_plan_invariants(&plan, &params);
}
