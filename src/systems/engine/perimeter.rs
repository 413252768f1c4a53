// perimeter loading and inward offset

use bevy::math::DVec2;
use bevy::prelude::*;
use geo::{Area, Polygon};

use super::poly::buffer::erode;
use super::poly::subdivision::clean_ring;
use super::poly::utils::{
    bounds, exterior_ring, intersect, is_finite_ring, largest_component, line_segment_intersection,
    orient_ccw, rect_polygon, ring_polygon, signed_area,
};
use super::Ring;
use crate::config::{MIN_POLYGON_AREA, OFFSET_RETRY_FACTORS, VERTEX_MERGE_DISTANCE};
use crate::errors::{EngineError, EngineResult};
use crate::systems::params::Parameters;

/// The parcel boundary, simple and counter-clockwise
#[derive(Debug, Clone)]
pub struct Perimeter {
    pub polygon: Polygon<f64>,
    pub area: f64,
    pub repaired: bool,
}

/// The perimeter eroded to leave room for the outer street reservation
#[derive(Debug, Clone)]
pub struct InternalPerimeter {
    pub polygon: Polygon<f64>,
    pub area: f64,
    /// Offset actually applied, `None` in degraded mode
    pub offset: Option<f64>,
    pub degraded: bool,
}

/// Checks every pair of non-adjacent edges for a crossing
pub fn is_simple(ring: &[DVec2]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    for i in 0..n {
        let a1 = ring[i];
        let a2 = ring[(i + 1) % n];
        for j in (i + 1)..n {
            // adjacent edges share a vertex, skip them
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            let b1 = ring[j];
            let b2 = ring[(j + 1) % n];
            if line_segment_intersection(a1, a2, b1, b2).is_some() {
                return false;
            }
        }
    }

    true
}

// even-odd normalization, the polygon clipped to its own padded bounds
fn repair(ring: &[DVec2]) -> Option<Polygon<f64>> {
    let polygon = ring_polygon(ring);
    let (min, max) = bounds(&polygon)?;
    let pad = DVec2::splat(1.0);
    let frame = geo::MultiPolygon::new(vec![rect_polygon(min - pad, max + pad)]);
    largest_component(intersect(&geo::MultiPolygon::new(vec![polygon]), &frame))
}

/// Loads a perimeter from an ordered vertex list
///
/// # Returns
/// A valid Perimeter, or `InvalidGeometry` when fewer than 3 usable vertices remain,
/// the ring has no area, or a self-intersection cannot be repaired
pub fn load(vertices: &[DVec2]) -> EngineResult<Perimeter> {
    let finite: Ring = vertices.iter().copied().filter(|v| v.is_finite()).collect();
    let ring = clean_ring(&finite, VERTEX_MERGE_DISTANCE);

    if ring.len() < 3 {
        return Err(EngineError::invalid_geometry(format!(
            "{} usable vertices, at least 3 are required",
            ring.len()
        )));
    }

    if signed_area(&ring).abs() <= MIN_POLYGON_AREA {
        return Err(EngineError::invalid_geometry("boundary encloses no area"));
    }

    let (polygon, repaired) = if is_simple(&ring) {
        (ring_polygon(&ring), false)
    } else {
        let fixed = repair(&ring)
            .ok_or_else(|| EngineError::invalid_geometry("self-intersection could not be repaired"))?;
        let fixed_ring = exterior_ring(&fixed);
        if !is_simple(&fixed_ring) || !is_finite_ring(&fixed_ring) {
            return Err(EngineError::invalid_geometry(
                "boundary is still self-intersecting after repair",
            ));
        }
        (fixed, true)
    };

    let polygon = orient_ccw(&polygon);
    let area = polygon.unsigned_area();
    if area <= MIN_POLYGON_AREA {
        return Err(EngineError::invalid_geometry("boundary encloses no area"));
    }

    Ok(Perimeter {
        polygon,
        area,
        repaired,
    })
}

/// Loads the ring of greatest area from a multi-ring input
pub fn load_rings(rings: &[Ring]) -> EngineResult<Perimeter> {
    let best = rings
        .iter()
        .map(|ring| {
            let finite: Ring = ring.iter().copied().filter(|v| v.is_finite()).collect();
            (signed_area(&finite).abs(), ring)
        })
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, ring)| ring)
        .ok_or_else(|| EngineError::invalid_geometry("input contains no rings"))?;

    load(best)
}

/// Erodes the perimeter by half the street reservation, backing off when the parcel is too thin
///
/// # Returns
/// The first non-empty erosion in the retry ladder, or the perimeter itself in degraded mode
pub fn internalize(perimeter: &Perimeter, params: &Parameters) -> InternalPerimeter {
    let offset = params.street_offset();

    for factor in OFFSET_RETRY_FACTORS {
        let distance = offset * factor;
        if let Some(polygon) = largest_component(erode(&perimeter.polygon, distance)) {
            let area = polygon.unsigned_area();
            if area > MIN_POLYGON_AREA && area <= perimeter.area {
                if factor < 1.0 {
                    debug!("internal perimeter offset reduced to {distance:.2}");
                }
                return InternalPerimeter {
                    polygon,
                    area,
                    offset: Some(distance),
                    degraded: false,
                };
            }
        }
    }

    warn!("perimeter too small for offset {offset:.2}, using it unchanged");
    InternalPerimeter {
        polygon: perimeter.polygon.clone(),
        area: perimeter.area,
        offset: None,
        degraded: true,
    }
}
