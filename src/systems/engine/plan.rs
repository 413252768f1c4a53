// final plan and its statistics

use geo::Polygon;
use serde::Serialize;

use super::allocator::{CommonArea, CommonKind};
use super::lots::Lot;
use super::perimeter::{InternalPerimeter, Perimeter};
use super::poly::utils::total_area;
use super::roads::RoadSkeleton;
use crate::errors::Anomaly;
use crate::systems::params::RoadShapeMode;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CategoryStat {
    pub area: f64,
    /// Share of the perimeter area, 0 to 100
    pub percent: f64,
}

impl CategoryStat {
    fn of(area: f64, total: f64) -> Self {
        let percent = if total > 0.0 { area / total * 100.0 } else { 0.0 };
        Self { area, percent }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub total_area: f64,
    pub lot_count: usize,
    pub block_count: usize,
    pub rejected_lots: usize,
    pub lots: CategoryStat,
    pub roads: CategoryStat,
    pub sidewalks: CategoryStat,
    pub green: CategoryStat,
    pub institutional: CategoryStat,
}

/// How the run got to its plan, fallbacks included
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub repaired_perimeter: bool,
    pub degraded_offset: bool,
    pub offset_used: Option<f64>,
    pub road_strategy: RoadShapeMode,
    pub road_fallback: bool,
    /// Seed of the random source, reported so an unseeded run can be replayed
    pub seed: u64,
    pub anomalies: Vec<Anomaly>,
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub perimeter: Perimeter,
    pub internal: InternalPerimeter,
    pub skeleton: RoadSkeleton,
    pub roads: Vec<Polygon<f64>>,
    pub sidewalks: Vec<Polygon<f64>>,
    pub blocks: Vec<Polygon<f64>>,
    pub lots: Vec<Lot>,
    pub common_areas: Vec<CommonArea>,
    pub statistics: Statistics,
    pub diagnostics: Diagnostics,
}

impl Plan {
    pub fn common_of(&self, kind: CommonKind) -> impl Iterator<Item = &CommonArea> {
        self.common_areas.iter().filter(move |area| area.kind == kind)
    }
}

/// Computes statistics from the final plan collections
pub fn compute_statistics(
    total: f64,
    lots: &[Lot],
    roads: &[Polygon<f64>],
    sidewalks: &[Polygon<f64>],
    common_areas: &[CommonArea],
    block_count: usize,
    rejected_lots: usize,
) -> Statistics {
    let common = |kind: CommonKind| -> f64 {
        common_areas
            .iter()
            .filter(|area| area.kind == kind)
            .map(|area| area.area)
            .sum()
    };

    Statistics {
        total_area: total,
        lot_count: lots.len(),
        block_count,
        rejected_lots,
        lots: CategoryStat::of(lots.iter().map(|lot| lot.area).sum(), total),
        roads: CategoryStat::of(total_area(roads), total),
        sidewalks: CategoryStat::of(total_area(sidewalks), total),
        green: CategoryStat::of(common(CommonKind::Green), total),
        institutional: CategoryStat::of(common(CommonKind::Institutional), total),
    }
}
