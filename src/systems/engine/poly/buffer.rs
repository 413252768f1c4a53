// polygon offsetting built from corridors and discs
// buffer(lines, d) = union of segment corridors and vertex discs
// erode(P, d)      = P minus the buffer of its own boundary

use bevy::math::DVec2;
use geo::{MultiPolygon, Polygon};

use super::utils::{exterior_ring, open_ring, ring_polygon, subtract, union_all};
use crate::config::DISC_SEGMENTS;

/// Rectangle of half-width `half_width` around the segment `start -> end`
/// # Returns `None` for zero-length segments
pub fn segment_corridor(start: DVec2, end: DVec2, half_width: f64) -> Option<Polygon<f64>> {
    let dir = (end - start).normalize_or_zero();
    if dir == DVec2::ZERO || half_width <= 0.0 {
        return None;
    }
    let perp = DVec2::new(-dir.y, dir.x) * half_width;

    Some(ring_polygon(&[
        start - perp,
        end - perp,
        end + perp,
        start + perp,
    ]))
}

/// Regular polygon approximating a circle
pub fn disc(center: DVec2, radius: f64, segments: usize) -> Polygon<f64> {
    let ring: Vec<DVec2> = (0..segments)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / segments as f64;
            center + DVec2::new(angle.cos(), angle.sin()) * radius
        })
        .collect();
    ring_polygon(&ring)
}

// corridors for every segment plus a disc on every vertex
fn stroke_pieces(line: &[DVec2], closed: bool, distance: f64, pieces: &mut Vec<Polygon<f64>>) {
    if line.is_empty() || distance <= 0.0 {
        return;
    }

    let segment_count = if closed { line.len() } else { line.len() - 1 };
    for i in 0..segment_count {
        let next = (i + 1) % line.len();
        if let Some(corridor) = segment_corridor(line[i], line[next], distance) {
            pieces.push(corridor);
        }
    }

    for vertex in line {
        pieces.push(disc(*vertex, distance, DISC_SEGMENTS));
    }
}

/// Buffers open polylines by `distance` with round joins and caps
///
/// # Returns
/// The dissolved buffer, empty for no lines or a non-positive distance
pub fn buffer_polylines(lines: &[Vec<DVec2>], distance: f64) -> MultiPolygon<f64> {
    let mut pieces = Vec::new();
    for line in lines {
        stroke_pieces(line, false, distance, &mut pieces);
    }
    union_all(pieces)
}

/// Erodes a polygon inward by `distance`
///
/// # Returns
/// Everything in `polygon` at least `distance` away from its boundary, possibly several
/// components, possibly empty when the polygon is too thin
pub fn erode(polygon: &Polygon<f64>, distance: f64) -> MultiPolygon<f64> {
    let original = MultiPolygon::new(vec![polygon.clone()]);
    if distance <= 0.0 {
        return original;
    }

    let mut pieces = Vec::new();
    stroke_pieces(&exterior_ring(polygon), true, distance, &mut pieces);
    for hole in polygon.interiors() {
        stroke_pieces(&open_ring(hole), true, distance, &mut pieces);
    }

    subtract(&original, &union_all(pieces))
}
