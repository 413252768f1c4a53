// road skeleton strategies and street buffering

use bevy::math::DVec2;
use bevy::prelude::*;
use geo::{
    Area, BooleanOps, Contains, Distance, Euclidean, LineString, MultiLineString, MultiPolygon,
    Point, Polygon,
};
use rand::rngs::StdRng;
use rand::Rng;

use super::poly::buffer::buffer_polylines;
use super::poly::subdivision::longest_edge;
use super::poly::utils::{
    components, exterior_ring, intersect, ring_centroid, rotate, signed_area, subtract,
    to_coord, to_dvec, union_all,
};
use crate::config::{
    MIN_ROAD_LENGTH, RANDOM_CHORD_THRESHOLD, RING_SEGMENTS, ROAD_LINE_EXTENSION,
};
use crate::systems::params::{Parameters, RoadShapeMode};

/// Open centreline, at least two vertices
pub type Polyline = Vec<DVec2>;

#[derive(Debug, Clone)]
pub struct RoadSkeleton {
    pub lines: Vec<Polyline>,
    pub strategy: RoadShapeMode,
    /// The strategy produced nothing and the centreline was used instead
    pub fallback: bool,
}

impl RoadSkeleton {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total_length(&self) -> f64 {
        self.lines.iter().map(|line| polyline_length(line)).sum()
    }
}

/// Road and sidewalk polygons, plus their union used for frontage tests
#[derive(Debug, Clone)]
pub struct Streets {
    pub roads: Vec<Polygon<f64>>,
    pub sidewalks: Vec<Polygon<f64>>,
    corridor: MultiPolygon<f64>,
}

impl Default for Streets {
    fn default() -> Self {
        Self {
            roads: Vec::new(),
            sidewalks: Vec::new(),
            corridor: MultiPolygon::new(Vec::new()),
        }
    }
}

impl Streets {
    pub fn is_empty(&self) -> bool {
        self.corridor.0.is_empty()
    }

    pub fn corridor(&self) -> &MultiPolygon<f64> {
        &self.corridor
    }

    /// Distance from a point to the nearest road or sidewalk, infinite with no streets
    pub fn distance_to_point(&self, point: DVec2) -> f64 {
        if self.is_empty() {
            return f64::INFINITY;
        }
        Euclidean::distance(&self.corridor, &Point::from(to_coord(point)))
    }

    pub fn distance_to_polygon(&self, polygon: &Polygon<f64>) -> f64 {
        if self.is_empty() {
            return f64::INFINITY;
        }
        Euclidean::distance(&self.corridor, polygon)
    }

    /// An edge fronts the street when both ends and its midpoint are within `tolerance`
    pub fn edge_fronts(&self, start: DVec2, end: DVec2, tolerance: f64) -> bool {
        [start, end, (start + end) / 2.0]
            .into_iter()
            .all(|p| self.distance_to_point(p) <= tolerance)
    }
}

pub fn polyline_length(line: &[DVec2]) -> f64 {
    line.windows(2).map(|w| w[0].distance(w[1])).sum()
}

// keep every piece of `line` inside `area`
fn clip_line(area: &Polygon<f64>, line: &[DVec2]) -> Vec<Polyline> {
    if line.len() < 2 {
        return Vec::new();
    }

    let coords: Vec<_> = line.iter().map(|v| to_coord(*v)).collect();
    let lines = MultiLineString::new(vec![LineString::from(coords)]);

    area.clip(&lines, false)
        .into_iter()
        .map(|piece| piece.coords().map(|c| to_dvec(*c)).collect::<Polyline>())
        .filter(|piece| piece.len() >= 2 && polyline_length(piece) > MIN_ROAD_LENGTH)
        .collect()
}

// frame rotation for the grid: fixed by preferred_axis, or the longest edge mod 90
fn grid_angle(internal: &Polygon<f64>, params: &Parameters) -> f64 {
    if let Some(angle) = params.preferred_axis.angle() {
        return angle.to_radians();
    }

    let quarter = std::f64::consts::FRAC_PI_2;
    let angle = longest_edge(&exterior_ring(internal))
        .map(|(_, dir, _)| dir.y.atan2(dir.x).rem_euclid(quarter))
        .unwrap_or(0.0);

    // boolean op noise on an axis-aligned edge lands just under a quarter turn
    if quarter - angle < 1e-9 { 0.0 } else { angle }
}

// (min, max) of the ring after rotating it by -angle
fn rotated_bounds(ring: &[DVec2], angle: f64) -> Option<(DVec2, DVec2)> {
    let mut iter = ring.iter().map(|v| rotate(*v, -angle));
    let first = iter.next()?;
    Some(iter.fold((first, first), |(min, max), v| (min.min(v), max.max(v))))
}

// lines at min + i * extent / (n + 1), n = floor(extent / max_block_depth)
fn grid_offsets(min: f64, max: f64, spacing: f64) -> Vec<f64> {
    let extent = max - min;
    let count = ((extent / spacing).floor() as usize).max(1);
    (1..=count)
        .map(|i| min + i as f64 * extent / (count + 1) as f64)
        .collect()
}

fn rectangular_lines(internal: &Polygon<f64>, params: &Parameters, diagonal: bool) -> Vec<Polyline> {
    let angle = grid_angle(internal, params);
    let Some((min, max)) = rotated_bounds(&exterior_ring(internal), angle) else {
        return Vec::new();
    };
    let ext = ROAD_LINE_EXTENSION;
    let spacing = params.max_block_depth;

    let mut raw = Vec::new();

    // lines of constant x in the rotated frame
    for x in grid_offsets(min.x, max.x, spacing) {
        raw.push(vec![DVec2::new(x, min.y - ext), DVec2::new(x, max.y + ext)]);
    }
    // lines of constant y
    for y in grid_offsets(min.y, max.y, spacing) {
        raw.push(vec![DVec2::new(min.x - ext, y), DVec2::new(max.x + ext, y)]);
    }
    if diagonal {
        raw.push(vec![min, max]);
    }

    raw.into_iter()
        .map(|line| line.into_iter().map(|v| rotate(v, angle)).collect::<Polyline>())
        .flat_map(|line| clip_line(internal, &line))
        .collect()
}

fn experimental_lines(internal: &Polygon<f64>, params: &Parameters) -> Vec<Polyline> {
    let ring = exterior_ring(internal);
    let Some((min, max)) = rotated_bounds(&ring, 0.0) else {
        return Vec::new();
    };
    let size = max - min;
    let center = (min + max) / 2.0;
    let freedom = params.creative_freedom.factor();

    let mut lines = Vec::new();

    let ray_count = 4 + (freedom * 4.0).floor() as usize;
    let ray_length = size.x.max(size.y);
    for i in 0..ray_count {
        let angle = std::f64::consts::TAU * i as f64 / ray_count as f64;
        let end = center + DVec2::new(angle.cos(), angle.sin()) * ray_length;
        lines.extend(clip_line(internal, &[center, end]));
    }

    let ring_count = 2 + (freedom * 2.0).floor() as usize;
    let max_radius = (size.x / 2.0).min(size.y / 2.0);
    for i in 1..=ring_count {
        let radius = i as f64 * max_radius / (ring_count + 1) as f64;
        let circle: Polyline = (0..=RING_SEGMENTS)
            .map(|k| {
                let angle = std::f64::consts::TAU * k as f64 / RING_SEGMENTS as f64;
                center + DVec2::new(angle.cos(), angle.sin()) * radius
            })
            .collect();
        lines.extend(clip_line(internal, &circle));
    }

    lines
}

fn fully_free_lines(internal: &Polygon<f64>, params: &Parameters, rng: &mut StdRng) -> Vec<Polyline> {
    let ring = exterior_ring(internal);
    let Some((min, max)) = rotated_bounds(&ring, 0.0) else {
        return Vec::new();
    };
    let inside = |p: DVec2| internal.contains(&Point::from(to_coord(p)));

    let mut lines = Vec::new();

    // symmetric vertex pairs
    let half = ring.len() / 2;
    for i in 0..half {
        lines.extend(clip_line(internal, &[ring[i], ring[i + half]]));
    }

    // centroid to the bbox extremum points that fall inside
    let centroid = ring_centroid(&ring, signed_area(&ring));
    let extremes = [
        min,
        DVec2::new(max.x, min.y),
        max,
        DVec2::new(min.x, max.y),
        DVec2::new(centroid.x, min.y),
        DVec2::new(centroid.x, max.y),
        DVec2::new(min.x, centroid.y),
        DVec2::new(max.x, centroid.y),
    ];
    for point in extremes.into_iter().filter(|p| inside(*p)) {
        lines.extend(clip_line(internal, &[centroid, point]));
    }

    let freedom = params.creative_freedom.factor();
    if freedom > RANDOM_CHORD_THRESHOLD {
        let attempts = (freedom * 5.0).floor() as usize;
        for _ in 0..attempts {
            let a = DVec2::new(rng.random_range(min.x..=max.x), rng.random_range(min.y..=max.y));
            let b = DVec2::new(rng.random_range(min.x..=max.x), rng.random_range(min.y..=max.y));
            if inside(a) && inside(b) {
                lines.extend(clip_line(internal, &[a, b]));
            }
        }
    }

    lines
}

// single line through the middle of the longer bbox axis
fn centreline(internal: &Polygon<f64>) -> Vec<Polyline> {
    let Some((min, max)) = rotated_bounds(&exterior_ring(internal), 0.0) else {
        return Vec::new();
    };
    let size = max - min;
    let center = (min + max) / 2.0;
    let ext = ROAD_LINE_EXTENSION;

    let line = if size.x >= size.y {
        [DVec2::new(min.x - ext, center.y), DVec2::new(max.x + ext, center.y)]
    } else {
        [DVec2::new(center.x, min.y - ext), DVec2::new(center.x, max.y + ext)]
    };
    clip_line(internal, &line)
}

/// Builds the road skeleton inside the internal perimeter
///
/// # Returns
/// The skeleton of the selected strategy, the centreline when the strategy yields nothing,
/// or an empty skeleton when even the centreline misses the polygon
pub fn generate_skeleton(internal: &Polygon<f64>, params: &Parameters, rng: &mut StdRng) -> RoadSkeleton {
    let strategy = params.road_shape_mode;
    let lines = match strategy {
        RoadShapeMode::Rectangular => rectangular_lines(internal, params, false),
        RoadShapeMode::Varied => rectangular_lines(internal, params, true),
        RoadShapeMode::Experimental => experimental_lines(internal, params),
        RoadShapeMode::FullyFree => fully_free_lines(internal, params, rng),
    };

    if !lines.is_empty() {
        return RoadSkeleton {
            lines,
            strategy,
            fallback: false,
        };
    }

    debug!("{strategy:?} produced no roads, trying centreline");
    RoadSkeleton {
        lines: centreline(internal),
        strategy,
        fallback: true,
    }
}

/// Buffers the skeleton into road and sidewalk polygons confined to the perimeter
pub fn derive_streets(skeleton: &RoadSkeleton, perimeter: &Polygon<f64>, params: &Parameters) -> Streets {
    if skeleton.is_empty() {
        return Streets::default();
    }

    let bound = MultiPolygon::new(vec![perimeter.clone()]);
    let half_road = params.road_width / 2.0;

    let roads = intersect(&buffer_polylines(&skeleton.lines, half_road), &bound);
    let outer = intersect(
        &buffer_polylines(&skeleton.lines, half_road + params.sidewalk_width),
        &bound,
    );
    let sidewalks = subtract(&outer, &roads);

    let roads = components(roads, 0.0);
    let sidewalks = components(sidewalks, 0.0);
    let corridor = union_all(roads.iter().chain(sidewalks.iter()).cloned());

    Streets {
        roads,
        sidewalks,
        corridor,
    }
}

impl Streets {
    pub fn road_area(&self) -> f64 {
        self.roads.iter().map(|p| p.unsigned_area()).sum()
    }

    pub fn sidewalk_area(&self) -> f64 {
        self.sidewalks.iter().map(|p| p.unsigned_area()).sum()
    }
}
