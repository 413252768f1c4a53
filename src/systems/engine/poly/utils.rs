// UTILS

use bevy::math::DVec2;
use geo::orient::Direction;
use geo::{Area, BooleanOps, BoundingRect, Coord, LineString, MultiPolygon, Orient, Polygon};

use crate::config::SLIVER_AREA;
use crate::systems::engine::Ring;

pub fn to_coord(v: DVec2) -> Coord<f64> {
    Coord { x: v.x, y: v.y }
}

pub fn to_dvec(c: Coord<f64>) -> DVec2 {
    DVec2::new(c.x, c.y)
}

/// Builds a hole-free polygon from an open ring of vertices
pub fn ring_polygon(ring: &[DVec2]) -> Polygon<f64> {
    let coords: Vec<Coord<f64>> = ring.iter().map(|v| to_coord(*v)).collect();
    Polygon::new(LineString::from(coords), vec![])
}

/// Open vertex list of a closed line string (closing vertex dropped)
pub fn open_ring(line: &LineString<f64>) -> Ring {
    let mut ring: Ring = line.coords().map(|c| to_dvec(*c)).collect();
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

pub fn exterior_ring(polygon: &Polygon<f64>) -> Ring {
    open_ring(polygon.exterior())
}

/// find the intersection between two lines, lookup Cramer's rule
/// https://cp-algorithms.com/geometry/lines-intersection.html
/// # Returns `Some(DVec2)` if the segments intersect, 'None' otherwise
pub fn line_segment_intersection(p1: DVec2, p2: DVec2, p3: DVec2, p4: DVec2) -> Option<DVec2> {
    let s1 = p2 - p1; // direction vector of segment 1
    let s2 = p4 - p3; // direction vector of segment 2

    let denom = s1.x * s2.y - s2.x * s1.y; // determinant of 2x2 matrix

    // parallel lines
    if denom.abs() < 1e-12 {
        return None;
    }

    let s = (s1.x * (p1.y - p3.y) - s1.y * (p1.x - p3.x)) / denom;
    let t = (s2.x * (p1.y - p3.y) - s2.y * (p1.x - p3.x)) / denom;

    // check if intersection is within both segments
    if (0.0..=1.0).contains(&s) && (0.0..=1.0).contains(&t) {
        Some(p1 + t * s1)
    } else {
        None
    }
}

/// Computes the signed area of a ring, positive when counter-clockwise
/// # Returns 0.0 for rings with fewer than 3 vertices.
pub fn signed_area(ring: &[DVec2]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }

    let n = ring.len();
    let mut area = 0.0;

    for i in 0..n {
        let j = (i + 1) % n;
        area += ring[i].x * ring[j].y - ring[j].x * ring[i].y;
    }

    area / 2.0
}

/// Calculates the centroid of a ring
/// Returns `DVec2::ZERO` for degenerate rings.
pub fn ring_centroid(ring: &[DVec2], area: f64) -> DVec2 {
    if ring.len() < 3 || area == 0.0 {
        return DVec2::ZERO;
    }

    let n = ring.len();
    let mut centroid = DVec2::ZERO;

    for i in 0..n {
        let j = (i + 1) % n;
        let p = ring[i].x * ring[j].y - ring[j].x * ring[i].y;
        centroid.x += (ring[i].x + ring[j].x) * p;
        centroid.y += (ring[i].y + ring[j].y) * p;
    }

    centroid / (6.0 * area)
}

/// Determines whether a point is inside a ring using the ray-casting algorithm.
/// # Returns `true` if the point is strictly inside, boundary points may go either way.
pub fn point_in_polygon(point: DVec2, ring: &[DVec2]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;

    for i in 0..ring.len() {
        let (pi, pj) = (ring[i], ring[j]);

        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Calculates shortest distance from a point to a line segment 2D
pub fn point_to_segment_distance(point: DVec2, start: DVec2, end: DVec2) -> f64 {
    let line_vec = end - start;
    let point_vec = point - start;
    let len_sq = line_vec.length_squared();

    if len_sq < f64::EPSILON {
        return point_vec.length();
    }

    let t = (point_vec.dot(line_vec) / len_sq).clamp(0.0, 1.0);
    point.distance(start + line_vec * t)
}

/// Rotates a vector counter-clockwise by `angle` radians
pub fn rotate(v: DVec2, angle: f64) -> DVec2 {
    let (sin, cos) = angle.sin_cos();
    DVec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

pub fn is_finite_ring(ring: &[DVec2]) -> bool {
    ring.iter().all(|v| v.is_finite())
}

/// Axis-aligned bounds of a polygon as (min, max)
pub fn bounds(polygon: &Polygon<f64>) -> Option<(DVec2, DVec2)> {
    polygon
        .bounding_rect()
        .map(|rect| (to_dvec(rect.min()), to_dvec(rect.max())))
}

pub fn rect_polygon(min: DVec2, max: DVec2) -> Polygon<f64> {
    ring_polygon(&[
        min,
        DVec2::new(max.x, min.y),
        max,
        DVec2::new(min.x, max.y),
    ])
}

/// Exterior counter-clockwise, holes clockwise
pub fn orient_ccw(polygon: &Polygon<f64>) -> Polygon<f64> {
    polygon.orient(Direction::Default)
}

pub fn multi_area(polygons: &MultiPolygon<f64>) -> f64 {
    polygons.unsigned_area()
}

pub fn total_area(polygons: &[Polygon<f64>]) -> f64 {
    polygons.iter().map(|p| p.unsigned_area()).sum()
}

/// Unions a sequence of polygons one at a time
///
/// # Returns
/// The dissolved multi-polygon, empty when the input is empty
pub fn union_all<I>(polygons: I) -> MultiPolygon<f64>
where
    I: IntoIterator<Item = Polygon<f64>>,
{
    let mut iter = polygons.into_iter();
    let Some(first) = iter.next() else {
        return MultiPolygon::new(vec![]);
    };

    iter.fold(MultiPolygon::new(vec![first]), |acc, polygon| acc.union(&polygon))
}

/// `base - cut`, skipping the boolean op when there is nothing to cut
pub fn subtract(base: &MultiPolygon<f64>, cut: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    if cut.0.is_empty() || base.0.is_empty() {
        return base.clone();
    }
    base.difference(cut)
}

pub fn intersect(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    if a.0.is_empty() || b.0.is_empty() {
        return MultiPolygon::new(vec![]);
    }
    a.intersection(b)
}

/// Polygon components at or above `min_area`, boolean slivers always dropped
pub fn components(polygons: MultiPolygon<f64>, min_area: f64) -> Vec<Polygon<f64>> {
    let threshold = min_area.max(SLIVER_AREA);
    polygons
        .into_iter()
        .filter(|p| p.unsigned_area() >= threshold)
        .map(|p| orient_ccw(&p))
        .collect()
}

pub fn largest_component(polygons: MultiPolygon<f64>) -> Option<Polygon<f64>> {
    components(polygons, 0.0)
        .into_iter()
        .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))
}
