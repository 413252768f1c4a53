use bevy::math::DVec2;
use geo::{MultiPolygon, Polygon};

use super::utils::{bounds, components, intersect, rect_polygon};
use crate::systems::engine::Ring;

/// Find vertex that starts the longest edge of the ring
///
/// # Returns
/// (idx, edge direction, and edge length)
pub fn longest_edge(ring: &[DVec2]) -> Option<(usize, DVec2, f64)> {
    if ring.len() < 2 {
        return None;
    }

    let mut max_length = 0.0;
    let mut longest_idx = 0;

    for i in 0..ring.len() {
        let next = (i + 1) % ring.len();
        let length = ring[i].distance(ring[next]);

        if length > max_length {
            max_length = length;
            longest_idx = i;
        }
    }

    let next = (longest_idx + 1) % ring.len();
    let direction = (ring[next] - ring[longest_idx]).normalize_or_zero();
    Some((longest_idx, direction, max_length))
}

/// Interior angle in degrees at every vertex of a counter-clockwise ring
/// Reflex vertices come out above 180.
pub fn interior_angles(ring: &[DVec2]) -> Vec<f64> {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let prev = ring[(i + n - 1) % n];
            let next = ring[(i + 1) % n];
            let to_prev = (prev - ring[i]).normalize_or_zero();
            let to_next = (next - ring[i]).normalize_or_zero();

            let cos = to_prev.dot(to_next).clamp(-1.0, 1.0);
            let angle = cos.acos().to_degrees();

            // turning right on a ccw ring means the vertex is reflex
            let turn = (ring[i] - prev).perp_dot(next - ring[i]);
            if turn < 0.0 { 360.0 - angle } else { angle }
        })
        .collect()
}

/// Bisect a polygon across the longer side of its bounding box, at the midpoint
///
/// # Returns
/// The non-empty pieces on either side of the cut. A single piece means the cut
/// did not separate anything and the caller should treat the polygon as final.
pub fn bisect_longer_axis(polygon: &Polygon<f64>) -> Vec<Polygon<f64>> {
    let Some((min, max)) = bounds(polygon) else {
        return vec![polygon.clone()];
    };

    let size = max - min;
    let (first, second) = if size.x >= size.y {
        let mid = min.x + size.x / 2.0;
        (
            rect_polygon(min, DVec2::new(mid, max.y)),
            rect_polygon(DVec2::new(mid, min.y), max),
        )
    } else {
        let mid = min.y + size.y / 2.0;
        (
            rect_polygon(min, DVec2::new(max.x, mid)),
            rect_polygon(DVec2::new(min.x, mid), max),
        )
    };

    let whole = MultiPolygon::new(vec![polygon.clone()]);
    let mut pieces = Vec::new();
    for half in [first, second] {
        pieces.extend(components(
            intersect(&whole, &MultiPolygon::new(vec![half])),
            0.0,
        ));
    }

    if pieces.is_empty() {
        vec![polygon.clone()]
    } else {
        pieces
    }
}

/// Drops vertices that repeat their predecessor or sit on the line through their neighbours
pub fn clean_ring(ring: &[DVec2], tolerance: f64) -> Ring {
    let mut cleaned: Ring = Vec::with_capacity(ring.len());
    for v in ring {
        if cleaned.last().is_none_or(|last| last.distance(*v) > tolerance) {
            cleaned.push(*v);
        }
    }
    while cleaned.len() > 1 && cleaned[0].distance(cleaned[cleaned.len() - 1]) <= tolerance {
        cleaned.pop();
    }

    // collinear pass, repeated until stable
    loop {
        let n = cleaned.len();
        if n < 4 {
            break;
        }
        let Some(idx) = (0..n).find(|&i| {
            let prev = cleaned[(i + n - 1) % n];
            let next = cleaned[(i + 1) % n];
            super::utils::point_to_segment_distance(cleaned[i], prev, next) <= tolerance
        }) else {
            break;
        };
        cleaned.remove(idx);
    }

    cleaned
}
