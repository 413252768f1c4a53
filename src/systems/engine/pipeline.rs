use bevy::prelude::*;
use geo::Area;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::allocator::allocate;
use super::blocks::extract;
use super::lots::subdivide_blocks;
use super::perimeter::{internalize, load, load_rings, Perimeter};
use super::plan::{compute_statistics, Diagnostics, Plan};
use super::poly::utils::total_area;
use super::roads::{derive_streets, generate_skeleton};
use super::{LogSink, PlanState, Ring, Stage, StageEvent, StageReport, StageSink, SubdivideEvent};
use crate::config::UNDERSIZED_BLOCK_FACTOR;
use crate::errors::{Anomaly, EngineResult};
use crate::systems::params::Parameters;

/// Runs the whole pipeline for one parameter set
///
/// Each run owns its plan; independent engines can run in parallel.
pub struct SubdivisionEngine<'s> {
    params: Parameters,
    seed: Option<u64>,
    sink: Box<dyn StageSink + 's>,
}

impl<'s> SubdivisionEngine<'s> {
    pub fn new(params: Parameters) -> Self {
        Self {
            params,
            seed: None,
            sink: Box::new(LogSink),
        }
    }

    /// Fixes the random source; without it FullyFree plans are not reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_sink(mut self, sink: impl StageSink + 's) -> Self {
        self.sink = Box::new(sink);
        self
    }

    fn emit(&mut self, stage: Stage, count: usize, area: f64) {
        self.sink.report(&StageReport { stage, count, area });
    }

    /// Subdivides a single boundary ring
    ///
    /// # Returns
    /// The plan, or `InvalidGeometry` when no valid perimeter can be established
    pub fn run(&mut self, vertices: &[bevy::math::DVec2]) -> EngineResult<Plan> {
        let perimeter = load(vertices)?;
        Ok(self.run_perimeter(perimeter))
    }

    /// Subdivides the largest ring of a multi-ring boundary
    pub fn run_rings(&mut self, rings: &[Ring]) -> EngineResult<Plan> {
        let perimeter = load_rings(rings)?;
        Ok(self.run_perimeter(perimeter))
    }

    fn run_perimeter(&mut self, perimeter: Perimeter) -> Plan {
        let params = self.params.clone();
        let mut anomalies = Vec::new();

        self.emit(
            Stage::Load,
            perimeter.polygon.exterior().0.len().saturating_sub(1),
            perimeter.area,
        );

        // internalize
        let internal = internalize(&perimeter, &params);
        if internal.offset != Some(params.street_offset()) {
            anomalies.push(Anomaly::DegenerateOperationResult {
                operation: "offset".to_string(),
            });
        }
        self.emit(Stage::Internalize, 1, internal.area);

        // roads
        let seed = self.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = StdRng::seed_from_u64(seed);
        let skeleton = generate_skeleton(&internal.polygon, &params, &mut rng);
        if skeleton.fallback {
            anomalies.push(Anomaly::DegenerateOperationResult {
                operation: "road_skeleton".to_string(),
            });
        }
        if skeleton.is_empty() {
            anomalies.push(Anomaly::InsufficientRoadNetwork);
        }
        let streets = derive_streets(&skeleton, &perimeter.polygon, &params);
        self.emit(
            Stage::RoadGen,
            skeleton.lines.len(),
            streets.road_area() + streets.sidewalk_area(),
        );

        // blocks
        let block_set = extract(&internal.polygon, &streets, &params);
        if block_set.fallback {
            anomalies.push(Anomaly::InsufficientBlocks);
        }
        self.emit(
            Stage::Blocks,
            block_set.blocks.len(),
            total_area(&block_set.blocks),
        );

        // lots
        let outcome = subdivide_blocks(&block_set.blocks, &streets, &params);
        if outcome.rejected > 0 {
            anomalies.push(Anomaly::LotRejected {
                count: outcome.rejected,
            });
        }
        self.emit(
            Stage::Lots,
            outcome.lots.len(),
            outcome.lots.iter().map(|lot| lot.area).sum(),
        );

        // allocate
        let mut undersized = block_set.undersized;
        let conversion_area = params.min_lot_area * UNDERSIZED_BLOCK_FACTOR;
        for &index in &outcome.lotless_blocks {
            let block = &block_set.blocks[index];
            if block.unsigned_area() < conversion_area {
                undersized.push(block.clone());
            }
        }
        let common_areas = allocate(
            &perimeter.polygon,
            &internal.polygon,
            &streets,
            &outcome.lots,
            undersized,
            &params,
        );
        self.emit(
            Stage::Allocate,
            common_areas.len(),
            common_areas.iter().map(|area| area.area).sum(),
        );

        // assemble
        let statistics = compute_statistics(
            perimeter.area,
            &outcome.lots,
            &streets.roads,
            &streets.sidewalks,
            &common_areas,
            block_set.blocks.len(),
            outcome.rejected,
        );
        self.emit(Stage::Assemble, statistics.lot_count, statistics.total_area);

        let diagnostics = Diagnostics {
            repaired_perimeter: perimeter.repaired,
            degraded_offset: internal.degraded,
            offset_used: internal.offset,
            road_strategy: skeleton.strategy,
            road_fallback: skeleton.fallback,
            seed,
            anomalies,
        };

        Plan {
            roads: streets.roads,
            sidewalks: streets.sidewalks,
            blocks: block_set.blocks,
            lots: outcome.lots,
            perimeter,
            internal,
            skeleton,
            common_areas,
            statistics,
            diagnostics,
        }
    }
}

// run the engine for every request, keep the latest plan
pub fn handle_subdivision(
    mut events: EventReader<SubdivideEvent>,
    params: Res<Parameters>,
    mut state: ResMut<PlanState>,
    mut stage_events: EventWriter<StageEvent>,
) {
    for event in events.read() {
        let mut reports = Vec::new();
        let result = {
            let mut engine = SubdivisionEngine::new(Parameters::clone(&params)).with_sink(|report: &StageReport| {
                LogSink.report(report);
                reports.push(*report);
            });
            if let Some(seed) = event.seed {
                engine = engine.with_seed(seed);
            }
            engine.run_rings(&event.rings)
        };

        for report in reports {
            stage_events.write(StageEvent(report));
        }

        match result {
            Ok(plan) => {
                info!(
                    "Subdivision complete: {} lots in {} blocks",
                    plan.statistics.lot_count, plan.statistics.block_count
                );
                state.plan = Some(plan);
                state.last_error = None;
            }
            Err(e) => {
                error!("Subdivision failed: {e}");
                state.plan = None;
                state.last_error = Some(e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::DVec2;

    fn rect(w: f64, h: f64) -> Ring {
        vec![DVec2::ZERO, DVec2::new(w, 0.0), DVec2::new(w, h), DVec2::new(0.0, h)]
    }

    #[test]
    fn every_stage_reports_once_in_order() {
        let mut stages = Vec::new();
        let plan = SubdivisionEngine::new(Parameters::default())
            .with_seed(3)
            .with_sink(|report: &StageReport| stages.push(report.stage))
            .run(&rect(100.0, 80.0))
            .unwrap();
        assert!(plan.statistics.lot_count > 0);
        assert_eq!(
            stages,
            vec![
                Stage::Load,
                Stage::Internalize,
                Stage::RoadGen,
                Stage::Blocks,
                Stage::Lots,
                Stage::Allocate,
                Stage::Assemble,
            ]
        );
    }

    #[test]
    fn invalid_perimeter_runs_no_stage() {
        let mut stages = Vec::new();
        let result = SubdivisionEngine::new(Parameters::default())
            .with_sink(|report: &StageReport| stages.push(report.stage))
            .run(&[DVec2::ZERO, DVec2::X]);
        assert!(result.is_err());
        assert!(stages.is_empty());
    }

    #[test]
    fn degraded_offset_is_diagnosed() {
        let plan = SubdivisionEngine::new(Parameters::default())
            .with_seed(1)
            .run(&rect(1.0, 1.0))
            .unwrap();
        assert!(plan.diagnostics.degraded_offset);
        assert!(plan.diagnostics.anomalies.contains(&Anomaly::DegenerateOperationResult {
            operation: "offset".to_string(),
        }));
        assert_eq!(plan.internal.area, plan.perimeter.area);
    }

    #[test]
    fn seed_is_reported() {
        let plan = SubdivisionEngine::new(Parameters::default())
            .with_seed(99)
            .run(&rect(100.0, 80.0))
            .unwrap();
        assert_eq!(plan.diagnostics.seed, 99);
    }
}
