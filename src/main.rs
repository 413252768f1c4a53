use std::collections::HashMap;
use std::path::PathBuf;

use bevy::log::LogPlugin;
use bevy::prelude::*;
use clap::Parser;

use parcel_subdivider::errors::EngineResult;
use parcel_subdivider::systems::engine::{PlanState, Ring, SubdivideEvent};
use parcel_subdivider::systems::export::{handle_export, ExportEvent};
use parcel_subdivider::systems::input::{parse_override, read_boundary, read_parameters};
use parcel_subdivider::{validate_reporting, Parameters, RawValue, SubdivisionPlugin};

/// Subdivides a parcel boundary into roads, blocks, lots and common areas
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Boundary JSON: `[[x, y], ...]` or `{"rings": [...]}`
    input: PathBuf,

    /// Parameter JSON object
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Parameter override, `name=value` (repeatable)
    #[arg(short = 's', long = "set")]
    overrides: Vec<String>,

    /// Seed for the random road modes
    #[arg(long)]
    seed: Option<u64>,

    #[arg(short, long, default_value = "plan.json")]
    output: PathBuf,

    /// Also export the road centrelines
    #[arg(long)]
    skeleton: bool,
}

// one run request, consumed at startup
#[derive(Resource)]
struct Request {
    rings: Vec<Ring>,
    seed: Option<u64>,
    output: PathBuf,
    include_skeleton: bool,
}

fn read_inputs(cli: &Cli) -> EngineResult<(Vec<Ring>, HashMap<String, RawValue>)> {
    let rings = read_boundary(&cli.input)?;

    let mut raw = match &cli.params {
        Some(path) => read_parameters(path)?,
        None => HashMap::new(),
    };
    for text in &cli.overrides {
        let (name, value) = parse_override(text)?;
        raw.insert(name, value);
    }

    Ok((rings, raw))
}

fn main() -> AppExit {
    let cli = Cli::parse();

    let mut app = App::new();
    app.add_plugins(LogPlugin::default());

    let (rings, raw) = match read_inputs(&cli) {
        Ok(inputs) => inputs,
        Err(e) => {
            error!("Cannot read input: {e}");
            return AppExit::error();
        }
    };

    let (params, reports): (Parameters, _) = validate_reporting(&raw);
    for report in &reports {
        warn!("{report}");
    }

    app.insert_resource(params)
        .insert_resource(Request {
            rings,
            seed: cli.seed,
            output: cli.output,
            include_skeleton: cli.skeleton,
        })
        .add_plugins(SubdivisionPlugin)
        .add_systems(Startup, start)
        .add_systems(Update, finish.after(handle_export));

    app.run()
}

fn start(
    request: Res<Request>,
    mut subdivide: EventWriter<SubdivideEvent>,
    mut export: EventWriter<ExportEvent>,
) {
    subdivide.write(SubdivideEvent {
        rings: request.rings.clone(),
        seed: request.seed,
    });
    export.write(ExportEvent {
        path: request.output.clone(),
        include_skeleton: request.include_skeleton,
    });
}

// handle exit
fn finish(state: Res<PlanState>, mut exit: EventWriter<AppExit>) {
    if state.last_error.is_some() {
        exit.write(AppExit::error());
        return;
    }

    if let Some(plan) = &state.plan {
        let stats = &plan.statistics;
        info!(
            "{} lots ({:.1}%), roads {:.1}%, sidewalks {:.1}%, green {:.1}%, institutional {:.1}%",
            stats.lot_count,
            stats.lots.percent,
            stats.roads.percent,
            stats.sidewalks.percent,
            stats.green.percent,
            stats.institutional.percent,
        );
    }
    exit.write(AppExit::Success);
}
