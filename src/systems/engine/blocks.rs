use geo::{Area, MultiPolygon, Polygon};

use super::poly::utils::{components, largest_component, subtract};
use super::roads::Streets;
use crate::config::{BLOCK_AREA_FACTOR, UNDERSIZED_MIN_AREA};
use crate::systems::params::Parameters;

#[derive(Debug, Clone, Default)]
pub struct BlockSet {
    pub blocks: Vec<Polygon<f64>>,
    /// Street-free pieces too small to subdivide, handed to the allocator
    pub undersized: Vec<Polygon<f64>>,
    /// No component qualified and a single fallback block was used
    pub fallback: bool,
}

/// Splits the internal perimeter into blocks along the street corridor
///
/// # Returns
/// Components of at least `min_lot_area * 3` as blocks and the smaller ones as undersized.
/// Never returns zero blocks: the internal perimeter (or its largest street-free piece) is the fallback.
pub fn extract(internal: &Polygon<f64>, streets: &Streets, params: &Parameters) -> BlockSet {
    let min_block_area = params.min_lot_area * BLOCK_AREA_FACTOR;
    let free = subtract(&MultiPolygon::new(vec![internal.clone()]), streets.corridor());

    let mut blocks = Vec::new();
    let mut undersized = Vec::new();
    for part in components(free.clone(), UNDERSIZED_MIN_AREA) {
        if part.unsigned_area() >= min_block_area {
            blocks.push(part);
        } else {
            undersized.push(part);
        }
    }

    if !blocks.is_empty() {
        return BlockSet {
            blocks,
            undersized,
            fallback: false,
        };
    }

    let fallback = if streets.is_empty() {
        Some(internal.clone())
    } else {
        largest_component(free)
    };

    match fallback {
        Some(block) => {
            // the fallback may be one of the undersized pieces
            undersized.retain(|part| part != &block);
            BlockSet {
                blocks: vec![block],
                undersized,
                fallback: true,
            }
        }
        None => BlockSet {
            blocks: Vec::new(),
            undersized,
            fallback: true,
        },
    }
}
