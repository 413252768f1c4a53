// boundary and parameter files for the command line

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use bevy::math::DVec2;
use serde::Deserialize;

use crate::errors::{EngineError, EngineResult};
use crate::systems::engine::Ring;
use crate::systems::params::RawValue;

// null coordinates are accepted and read as NaN, the loader drops them
type RawVertex = [Option<f64>; 2];

#[derive(Deserialize)]
#[serde(untagged)]
enum BoundaryFile {
    Ring(Vec<RawVertex>),
    Rings { rings: Vec<Vec<RawVertex>> },
}

fn to_ring(vertices: Vec<RawVertex>) -> Ring {
    vertices
        .into_iter()
        .map(|[x, y]| DVec2::new(x.unwrap_or(f64::NAN), y.unwrap_or(f64::NAN)))
        .collect()
}

/// Parses `[[x, y], ...]` or `{"rings": [[[x, y], ...], ...]}`
pub fn parse_boundary(text: &str) -> EngineResult<Vec<Ring>> {
    let file: BoundaryFile = serde_json::from_str(text)?;
    Ok(match file {
        BoundaryFile::Ring(vertices) => vec![to_ring(vertices)],
        BoundaryFile::Rings { rings } => rings.into_iter().map(to_ring).collect(),
    })
}

pub fn read_boundary(path: &Path) -> EngineResult<Vec<Ring>> {
    parse_boundary(&fs::read_to_string(path)?)
}

/// Parses a JSON object of option name to value
///
/// # Returns
/// Raw options ready for validation. Values that are neither numbers nor strings are skipped
/// and fall back to their defaults.
pub fn parse_parameters(text: &str) -> EngineResult<HashMap<String, RawValue>> {
    let values: HashMap<String, serde_json::Value> = serde_json::from_str(text)?;
    Ok(values
        .iter()
        .filter_map(|(name, value)| RawValue::from_json(value).map(|raw| (name.clone(), raw)))
        .collect())
}

pub fn read_parameters(path: &Path) -> EngineResult<HashMap<String, RawValue>> {
    parse_parameters(&fs::read_to_string(path)?)
}

/// Splits a `name=value` override; the value stays text and is parsed by the validator
pub fn parse_override(text: &str) -> EngineResult<(String, RawValue)> {
    let Some((name, value)) = text.split_once('=') else {
        return Err(EngineError::InvalidParameter {
            name: text.to_string(),
            value: String::new(),
            reason: "expected name=value".to_string(),
        });
    };
    Ok((name.trim().to_string(), RawValue::from(value.trim())))
}
