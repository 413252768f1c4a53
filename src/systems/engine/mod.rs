// this is the entry point for the subdivision plugin
use bevy::math::DVec2;
use bevy::prelude::*;

use crate::systems::export::{handle_export, ExportEvent};
use crate::systems::params::Parameters;

pub mod allocator;
pub mod blocks;
pub mod lots;
pub mod perimeter;
pub mod pipeline;
pub mod plan;
pub mod poly;
pub mod roads;

pub use pipeline::SubdivisionEngine;
pub use plan::{Diagnostics, Plan, Statistics};

// open vertex ring, closing vertex implied
pub type Ring = Vec<DVec2>;

/// Pipeline stage boundaries, in run order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Internalize,
    RoadGen,
    Blocks,
    Lots,
    Allocate,
    Assemble,
}

/// Emitted once per stage, after it completes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageReport {
    pub stage: Stage,
    /// Items the stage produced (vertices, lines, blocks, lots...)
    pub count: usize,
    pub area: f64,
}

/// Receives stage reports during a run
pub trait StageSink {
    fn report(&mut self, report: &StageReport);
}

impl<F: FnMut(&StageReport)> StageSink for F {
    fn report(&mut self, report: &StageReport) {
        self(report)
    }
}

/// Writes stage reports to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl StageSink for LogSink {
    fn report(&mut self, report: &StageReport) {
        info!(
            "{:?}: {} item(s), area {:.2}",
            report.stage, report.count, report.area
        );
    }
}

// resources
#[derive(Resource, Default)]
pub struct PlanState {
    pub plan: Option<Plan>,
    pub last_error: Option<String>,
}

// Event requesting a run on the current Parameters
#[derive(Event, Debug, Clone)]
pub struct SubdivideEvent {
    pub rings: Vec<Ring>,
    pub seed: Option<u64>,
}

// Event mirroring every stage report of the last run
#[derive(Event, Debug, Clone, Copy)]
pub struct StageEvent(pub StageReport);

// main plugin for subdivision
pub struct SubdivisionPlugin;

impl Plugin for SubdivisionPlugin {
    fn build(&self, app: &mut App) {
        app
            // keep Parameters inserted by the caller
            .init_resource::<Parameters>()
            .init_resource::<PlanState>()

            .add_event::<SubdivideEvent>()
            .add_event::<StageEvent>()
            .add_event::<ExportEvent>()

            .add_systems(Update, (pipeline::handle_subdivision, handle_export).chain());
    }
}
