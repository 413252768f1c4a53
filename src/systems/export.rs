// saves the plan as named layers
// by walking every polygon collection of the plan

use bevy::math::DVec2;
use bevy::prelude::*;
use geo::Polygon;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::errors::EngineResult;
use crate::systems::engine::allocator::CommonKind;
use crate::systems::engine::plan::{Diagnostics, Plan, Statistics};
use crate::systems::engine::poly::utils::{open_ring, to_dvec};
use crate::systems::engine::PlanState;

// export event
#[derive(Event, Debug, Clone)]
pub struct ExportEvent {
    pub path: PathBuf,
    pub include_skeleton: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    Continuous,
    Dashed,
    Center,
}

/// Output layers in drawing order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Perimeter,
    Roads,
    Sidewalks,
    Blocks,
    Lots,
    GreenArea,
    InstitutionalArea,
    RoadSkeleton,
}

impl Layer {
    pub const ALL: [Layer; 8] = [
        Layer::Perimeter,
        Layer::Roads,
        Layer::Sidewalks,
        Layer::Blocks,
        Layer::Lots,
        Layer::GreenArea,
        Layer::InstitutionalArea,
        Layer::RoadSkeleton,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Layer::Perimeter => "PERIMETER",
            Layer::Roads => "ROADS",
            Layer::Sidewalks => "SIDEWALKS",
            Layer::Blocks => "BLOCKS",
            Layer::Lots => "LOTS",
            Layer::GreenArea => "GREEN_AREA",
            Layer::InstitutionalArea => "INSTITUTIONAL_AREA",
            Layer::RoadSkeleton => "ROAD_SKELETON",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Layer::Perimeter => "red",
            Layer::Roads => "yellow",
            Layer::Sidewalks => "gray",
            Layer::Blocks => "green",
            Layer::Lots => "cyan",
            Layer::GreenArea => "green",
            Layer::InstitutionalArea => "magenta",
            Layer::RoadSkeleton => "white",
        }
    }

    pub fn line_style(self) -> LineStyle {
        match self {
            Layer::Blocks => LineStyle::Dashed,
            Layer::RoadSkeleton => LineStyle::Center,
            _ => LineStyle::Continuous,
        }
    }

    /// Skeleton lines are open polylines, everything else is a closed ring
    pub fn closed(self) -> bool {
        self != Layer::RoadSkeleton
    }
}

/// One ring of a layer; holes cut the outer ring emitted just before them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RingRecord {
    pub hole: bool,
    pub points: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerRings {
    pub name: &'static str,
    pub color: &'static str,
    pub line_style: LineStyle,
    pub closed: bool,
    pub rings: Vec<RingRecord>,
}

#[derive(Serialize)]
struct PlanDocument<'a> {
    layers: Vec<LayerRings>,
    statistics: &'a Statistics,
    diagnostics: &'a Diagnostics,
}

fn to_pairs(points: &[DVec2]) -> Vec<[f64; 2]> {
    points.iter().map(|v| [v.x, v.y]).collect()
}

// exterior then holes; the whole polygon is dropped if any vertex is not finite
fn polygon_rings(polygon: &Polygon<f64>) -> Vec<RingRecord> {
    let all_finite = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .flat_map(|line| line.coords())
        .all(|c| to_dvec(*c).is_finite());
    if !all_finite {
        return Vec::new();
    }

    let exterior = open_ring(polygon.exterior());
    if exterior.len() < 3 {
        return Vec::new();
    }

    std::iter::once((false, exterior))
        .chain(polygon.interiors().iter().map(|hole| (true, open_ring(hole))))
        .filter(|(_, ring)| ring.len() >= 3)
        .map(|(hole, ring)| RingRecord {
            hole,
            points: to_pairs(&ring),
        })
        .collect()
}

fn layer_polygons(plan: &Plan, layer: Layer) -> Vec<&Polygon<f64>> {
    match layer {
        Layer::Perimeter => vec![&plan.perimeter.polygon],
        Layer::Roads => plan.roads.iter().collect(),
        Layer::Sidewalks => plan.sidewalks.iter().collect(),
        Layer::Blocks => plan.blocks.iter().collect(),
        Layer::Lots => plan.lots.iter().map(|lot| &lot.polygon).collect(),
        Layer::GreenArea => plan.common_of(CommonKind::Green).map(|a| &a.polygon).collect(),
        Layer::InstitutionalArea => plan
            .common_of(CommonKind::Institutional)
            .map(|a| &a.polygon)
            .collect(),
        Layer::RoadSkeleton => Vec::new(),
    }
}

/// Flattens the plan into named layers of vertex rings
///
/// # Returns
/// One entry per layer in drawing order; the skeleton layer only when requested
pub fn export_layers(plan: &Plan, include_skeleton: bool) -> Vec<LayerRings> {
    Layer::ALL
        .into_iter()
        .filter(|layer| include_skeleton || *layer != Layer::RoadSkeleton)
        .map(|layer| {
            let rings = if layer == Layer::RoadSkeleton {
                plan.skeleton
                    .lines
                    .iter()
                    .filter(|line| line.len() >= 2 && line.iter().all(|v| v.is_finite()))
                    .map(|line| RingRecord {
                        hole: false,
                        points: to_pairs(line),
                    })
                    .collect()
            } else {
                layer_polygons(plan, layer)
                    .into_iter()
                    .flat_map(polygon_rings)
                    .collect()
            };

            LayerRings {
                name: layer.name(),
                color: layer.color(),
                line_style: layer.line_style(),
                closed: layer.closed(),
                rings,
            }
        })
        .collect()
}

// writes layers, statistics and diagnostics as one JSON document
pub fn write_json(plan: &Plan, path: &Path, include_skeleton: bool) -> EngineResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let document = PlanDocument {
        layers: export_layers(plan, include_skeleton),
        statistics: &plan.statistics,
        diagnostics: &plan.diagnostics,
    };
    serde_json::to_writer_pretty(&mut writer, &document)?;
    writeln!(writer)?;

    writer.flush()?;
    Ok(())
}

// handle export events
pub fn handle_export(mut events: EventReader<ExportEvent>, state: Res<PlanState>) {
    for event in events.read() {
        let Some(plan) = &state.plan else {
            warn!("Nothing to export to {}", event.path.display());
            continue;
        };

        match write_json(plan, &event.path, event.include_skeleton) {
            Ok(()) => {
                info!("Export successful: {}", event.path.display());
            }
            Err(e) => {
                error!("Export failed: {}", e);
            }
        }
    }
}
