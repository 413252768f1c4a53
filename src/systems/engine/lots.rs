// lot subdivision per block
// corner lots, then border strips, then the residual interior
// every stage cuts from a shrinking residual so lots never overlap

use bevy::math::DVec2;
use geo::{Area, MultiPolygon, Polygon};

use super::poly::subdivision::{bisect_longer_axis, clean_ring, interior_angles};
use super::poly::triangulate::{shares_edge, triangle_area, triangulate_ring, TriangleIndices};
use super::poly::utils::{
    bounds, components, exterior_ring, intersect, largest_component, ring_polygon, subtract,
    union_all,
};
use super::roads::Streets;
use crate::config::{
    BLOCK_ACCESS_TOLERANCE, BORDER_DEPTH_FACTORS, CORNER_ANGLE_MAX, CORNER_LOT_ANGLE_MAX,
    FRONTAGE_TOLERANCE, MAX_RECURSION_DEPTH, MAX_TRIANGULATION_VERTICES, SINGLE_LOT_FACTOR,
    TERMINAL_PART_FACTOR, TRIANGLE_GROUP_TOLERANCE, VERTEX_MERGE_DISTANCE,
};
use crate::systems::params::Parameters;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LotKind {
    /// A small block taken whole
    Single,
    Corner,
    Border,
    Residual,
}

#[derive(Debug, Clone)]
pub struct Lot {
    pub polygon: Polygon<f64>,
    pub area: f64,
    pub frontage: f64,
    pub kind: LotKind,
    /// Index of the owning block
    pub block: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LotOutcome {
    pub lots: Vec<Lot>,
    /// Candidates that failed the area or frontage test
    pub rejected: usize,
    /// Blocks that produced no lot at all
    pub lotless_blocks: Vec<usize>,
}

// accepted lots of one block plus the rejection count
struct BlockLots<'a> {
    streets: &'a Streets,
    params: &'a Parameters,
    block: usize,
    lots: Vec<Lot>,
    rejected: usize,
}

impl<'a> BlockLots<'a> {
    fn new(streets: &'a Streets, params: &'a Parameters, block: usize) -> Self {
        Self {
            streets,
            params,
            block,
            lots: Vec::new(),
            rejected: 0,
        }
    }

    // final acceptance test, the only place a lot is created
    // residual pieces must also be deep enough, so slivers along a street stay unused
    fn offer(&mut self, polygon: Polygon<f64>, kind: LotKind) -> bool {
        let area = polygon.unsigned_area();
        let frontage = lot_frontage(&polygon, self.streets);

        let accepted = area >= self.params.min_lot_area
            && frontage >= self.params.min_lot_frontage
            && (kind != LotKind::Residual || area / frontage >= self.params.min_residual_depth());

        if accepted {
            self.lots.push(Lot {
                polygon,
                area,
                frontage,
                kind,
                block: self.block,
            });
            true
        } else {
            self.rejected += 1;
            false
        }
    }
}

/// Street frontage of a polygon
///
/// # Returns
/// The summed length of edges that front the street corridor, or the shorter side of the
/// bounding box for interior polygons with no fronting edge
pub fn lot_frontage(polygon: &Polygon<f64>, streets: &Streets) -> f64 {
    let ring = exterior_ring(polygon);
    let n = ring.len();

    let fronting: f64 = (0..n)
        .map(|i| (ring[i], ring[(i + 1) % n]))
        .filter(|(a, b)| streets.edge_fronts(*a, *b, FRONTAGE_TOLERANCE))
        .map(|(a, b)| a.distance(b))
        .sum();

    if fronting > 0.0 {
        return fronting;
    }

    bounds(polygon)
        .map(|(min, max)| {
            let size = max - min;
            size.x.min(size.y)
        })
        .unwrap_or(0.0)
}

// candidate clipped to the residual, largest piece only
fn clip_candidate(residual: &MultiPolygon<f64>, corners: &[DVec2]) -> Option<Polygon<f64>> {
    let candidate = MultiPolygon::new(vec![ring_polygon(corners)]);
    largest_component(intersect(residual, &candidate))
}

fn corner_lots(lots: &mut BlockLots, block: &Polygon<f64>, mut residual: MultiPolygon<f64>) -> MultiPolygon<f64> {
    let ring = exterior_ring(block);
    let n = ring.len();
    let (frontage, depth) = lots.params.corner_dimensions();
    let min_area = lots.params.min_lot_area;

    for (i, angle) in interior_angles(&ring).into_iter().enumerate() {
        let is_corner = angle < CORNER_ANGLE_MAX;
        if !is_corner || angle >= CORNER_LOT_ANGLE_MAX {
            continue;
        }

        let vertex = ring[i];
        let along_prev = (ring[(i + n - 1) % n] - vertex).normalize_or_zero();
        let along_next = (ring[(i + 1) % n] - vertex).normalize_or_zero();
        if along_prev == DVec2::ZERO || along_next == DVec2::ZERO {
            continue;
        }

        let corners = [
            vertex,
            vertex + along_next * depth,
            vertex + along_next * depth + along_prev * frontage,
            vertex + along_prev * frontage,
        ];

        let Some(piece) = clip_candidate(&residual, &corners) else {
            continue;
        };
        if piece.unsigned_area() < min_area {
            continue;
        }

        if lots.offer(piece.clone(), LotKind::Corner) {
            residual = subtract(&residual, &MultiPolygon::new(vec![piece]));
        }
    }

    residual
}

// lots per fronting edge: preferred frontage scaled by density, widened to min frontage if needed
fn strip_count(length: f64, params: &Parameters) -> usize {
    let by_preference = ((length / params.preferred_lot_frontage).floor() as usize).max(1);
    let count = ((by_preference as f64 * params.lot_density.factor()).floor() as usize).max(1);

    if length / (count as f64) < params.min_lot_frontage {
        ((length / params.min_lot_frontage).floor() as usize).max(1)
    } else {
        count
    }
}

fn border_lots(lots: &mut BlockLots, mut residual: MultiPolygon<f64>) -> MultiPolygon<f64> {
    let params = lots.params;
    let base_depth = params.preferred_lot_depth();

    // fronting edges of the residual as it stood after the corners
    let mut edges = Vec::new();
    for part in components(residual.clone(), 0.0) {
        let ring = exterior_ring(&part);
        let n = ring.len();
        for i in 0..n {
            let (a, b) = (ring[i], ring[(i + 1) % n]);
            if a.distance(b) > VERTEX_MERGE_DISTANCE
                && lots.streets.edge_fronts(a, b, FRONTAGE_TOLERANCE)
            {
                edges.push((a, b));
            }
        }
    }

    for (a, b) in edges {
        let length = a.distance(b);
        let dir = (b - a) / length;
        // interior lies to the left of a ccw edge
        let inward = dir.perp();
        let count = strip_count(length, params);
        let width = length / count as f64;

        for k in 0..count {
            let start = a + dir * (width * k as f64);
            let end = start + dir * width;

            let candidate = BORDER_DEPTH_FACTORS.iter().find_map(|factor| {
                let depth = (base_depth * factor).min(params.max_lot_depth);
                let corners = [start, end, end + inward * depth, start + inward * depth];
                clip_candidate(&residual, &corners)
                    .filter(|piece| piece.unsigned_area() >= params.min_lot_area)
            });

            if let Some(piece) = candidate {
                if lots.offer(piece.clone(), LotKind::Border) {
                    residual = subtract(&residual, &MultiPolygon::new(vec![piece]));
                }
            }
        }
    }

    residual
}

/// Triangulates a ring and greedily merges edge-adjacent triangles until each group reaches `min_area`
///
/// # Returns
/// (polygon, area) for every group, including an undersized last group; empty when the ring
/// cannot be triangulated
pub fn merge_triangles(ring: &[DVec2], min_area: f64) -> Vec<(Polygon<f64>, f64)> {
    let mut remaining: Vec<TriangleIndices> = triangulate_ring(ring);
    let mut groups = Vec::new();

    while !remaining.is_empty() {
        let seed = remaining.remove(0);
        let mut area = triangle_area(ring, &seed);
        let mut group = vec![seed];

        while area < min_area {
            let Some(pos) = remaining
                .iter()
                .position(|t| group.iter().any(|g| shares_edge(g, t)))
            else {
                break;
            };
            let tri = remaining.remove(pos);
            area += triangle_area(ring, &tri);
            group.push(tri);
        }

        let pieces = group
            .iter()
            .map(|t| ring_polygon(&[ring[t[0]], ring[t[1]], ring[t[2]]]));
        if let Some(polygon) = largest_component(union_all(pieces)) {
            groups.push((polygon, area));
        }
    }

    groups
}

fn residual_lots(lots: &mut BlockLots, part: Polygon<f64>, depth: usize) {
    let min_area = lots.params.min_lot_area;
    let area = part.unsigned_area();

    if area < min_area * SINGLE_LOT_FACTOR {
        if area >= min_area {
            lots.offer(part, LotKind::Residual);
        }
        return;
    }

    let ring = clean_ring(&exterior_ring(&part), VERTEX_MERGE_DISTANCE);
    if part.interiors().is_empty() && ring.len() <= MAX_TRIANGULATION_VERTICES {
        let groups = merge_triangles(&ring, min_area);
        if !groups.is_empty() {
            for (polygon, group_area) in groups {
                if group_area >= min_area * TRIANGLE_GROUP_TOLERANCE {
                    lots.offer(polygon, LotKind::Residual);
                }
            }
            return;
        }
    }

    let pieces = bisect_longer_axis(&part);
    if depth >= MAX_RECURSION_DEPTH || pieces.len() < 2 {
        lots.offer(part, LotKind::Residual);
        return;
    }

    for piece in pieces {
        let piece_area = piece.unsigned_area();
        if piece_area < min_area * TERMINAL_PART_FACTOR {
            if piece_area >= min_area {
                lots.offer(piece, LotKind::Residual);
            }
        } else {
            residual_lots(lots, piece, depth + 1);
        }
    }
}

/// Subdivides one block into lots
///
/// # Returns
/// The accepted lots and the number of rejected candidates
pub fn subdivide_block(
    block: &Polygon<f64>,
    index: usize,
    streets: &Streets,
    params: &Parameters,
) -> (Vec<Lot>, usize) {
    let mut lots = BlockLots::new(streets, params, index);
    let area = block.unsigned_area();

    if area < params.min_lot_area * SINGLE_LOT_FACTOR {
        // whole block or nothing, and only with street access
        if streets.distance_to_polygon(block) <= BLOCK_ACCESS_TOLERANCE {
            lots.offer(block.clone(), LotKind::Single);
        }
        return (lots.lots, lots.rejected);
    }

    let residual = MultiPolygon::new(vec![block.clone()]);
    let residual = corner_lots(&mut lots, block, residual);
    let residual = border_lots(&mut lots, residual);

    for part in components(residual, 0.0) {
        residual_lots(&mut lots, part, 0);
    }

    (lots.lots, lots.rejected)
}

/// Runs the lot engine over every block
pub fn subdivide_blocks(blocks: &[Polygon<f64>], streets: &Streets, params: &Parameters) -> LotOutcome {
    let mut outcome = LotOutcome::default();

    for (index, block) in blocks.iter().enumerate() {
        let (lots, rejected) = subdivide_block(block, index, streets, params);
        if lots.is_empty() {
            outcome.lotless_blocks.push(index);
        }
        outcome.lots.extend(lots);
        outcome.rejected += rejected;
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::engine::poly::utils::rect_polygon;
    use crate::systems::engine::roads::{derive_streets, RoadSkeleton};
    use crate::systems::params::{CornerStrategy, RoadShapeMode};

    // horizontal street along y = 50, corridor covers 44..56
    fn street() -> Streets {
        let skeleton = RoadSkeleton {
            lines: vec![vec![DVec2::new(0.0, 50.0), DVec2::new(100.0, 50.0)]],
            strategy: RoadShapeMode::Rectangular,
            fallback: false,
        };
        let perimeter = rect_polygon(DVec2::ZERO, DVec2::new(100.0, 100.0));
        derive_streets(&skeleton, &perimeter, &Parameters::default())
    }

    fn assert_lot_invariants(lots: &[Lot], block: &Polygon<f64>, params: &Parameters) {
        let block = MultiPolygon::new(vec![block.clone()]);
        for (i, lot) in lots.iter().enumerate() {
            assert!(lot.area >= params.min_lot_area, "lot {i} area {}", lot.area);
            assert!(lot.frontage >= params.min_lot_frontage, "lot {i} frontage {}", lot.frontage);

            let outside = subtract(&MultiPolygon::new(vec![lot.polygon.clone()]), &block);
            assert!(outside.unsigned_area() < 1e-3, "lot {i} leaves its block");

            for other in &lots[i + 1..] {
                let overlap = intersect(
                    &MultiPolygon::new(vec![lot.polygon.clone()]),
                    &MultiPolygon::new(vec![other.polygon.clone()]),
                );
                assert!(overlap.unsigned_area() < 1e-3, "lot {i} overlaps another");
            }
        }
    }

    #[test]
    fn block_just_under_twice_min_fronting_a_street_is_one_lot() {
        // 19 x 20 = 380 = 1.9 * 200, top edge on the corridor
        let block = rect_polygon(DVec2::new(10.0, 24.0), DVec2::new(29.0, 44.0));
        let (lots, rejected) = subdivide_block(&block, 0, &street(), &Parameters::default());
        assert_eq!(lots.len(), 1);
        assert_eq!(rejected, 0);
        assert_eq!(lots[0].kind, LotKind::Single);
        assert!((lots[0].frontage - 19.0).abs() < 1e-3);
    }

    #[test]
    fn block_just_under_twice_min_without_access_is_discarded() {
        let block = rect_polygon(DVec2::new(10.0, 0.0), DVec2::new(29.0, 20.0));
        let (lots, rejected) = subdivide_block(&block, 0, &street(), &Parameters::default());
        assert!(lots.is_empty());
        assert_eq!(rejected, 0);
    }

    #[test]
    fn large_block_lots_respect_invariants() {
        let block = rect_polygon(DVec2::new(6.0, 6.0), DVec2::new(94.0, 44.0));
        let params = Parameters::default();
        let (lots, _) = subdivide_block(&block, 3, &street(), &params);

        assert!(!lots.is_empty());
        assert!(lots.iter().all(|lot| lot.block == 3));
        assert!(lots.iter().any(|lot| lot.kind == LotKind::Corner));
        assert!(lots.iter().any(|lot| lot.kind == LotKind::Border));
        assert_lot_invariants(&lots, &block, &params);
    }

    #[test]
    fn lots_are_found_without_streets() {
        let block = rect_polygon(DVec2::ZERO, DVec2::new(60.0, 40.0));
        let params = Parameters::default();
        let (lots, _) = subdivide_block(&block, 0, &Streets::default(), &params);
        assert!(!lots.is_empty());
        assert!(lots.iter().all(|lot| lot.kind != LotKind::Border));
        assert_lot_invariants(&lots, &block, &params);
    }

    #[test]
    fn corner_strategy_changes_the_first_corner_lot() {
        let block = rect_polygon(DVec2::new(6.0, 6.0), DVec2::new(94.0, 44.0));
        let first_corner = |strategy| {
            let params = Parameters {
                corner_strategy: strategy,
                ..Parameters::default()
            };
            let (lots, _) = subdivide_block(&block, 0, &street(), &params);
            lots.into_iter()
                .find(|lot| lot.kind == LotKind::Corner)
                .map(|lot| lot.area)
        };

        // depth runs along the bottom edge: 30 x 12 for auto, 40 x 12 for larger area
        let auto = first_corner(CornerStrategy::Auto).unwrap();
        let larger = first_corner(CornerStrategy::LargerArea).unwrap();
        assert!((auto - 360.0).abs() < 1e-3);
        assert!((larger - 480.0).abs() < 1e-3);
    }

    #[test]
    fn strip_count_widens_to_min_frontage() {
        let params = Parameters::default();
        assert_eq!(strip_count(36.0, &params), 3);
        assert_eq!(strip_count(5.0, &params), 1);

        // maximum density packs 3 * 1.3 -> 3 lots on 36, still 12 wide
        let dense = Parameters {
            lot_density: crate::systems::params::LotDensity::Maximum,
            ..Parameters::default()
        };
        assert_eq!(strip_count(36.0, &dense), 3);
        assert_eq!(strip_count(100.0, &dense), 10);
    }

    #[test]
    fn triangles_merge_up_to_min_area() {
        let square = vec![
            DVec2::ZERO,
            DVec2::new(20.0, 0.0),
            DVec2::new(20.0, 20.0),
            DVec2::new(0.0, 20.0),
        ];
        let groups = merge_triangles(&square, 150.0);
        assert_eq!(groups.len(), 2);

        let groups = merge_triangles(&square, 300.0);
        assert_eq!(groups.len(), 1);
        assert!((groups[0].1 - 400.0).abs() < 1e-9);
    }

    // notched arrowhead, its only triangulation is a fan from the apex:
    // 1250 + 700 + 1250, and the two outer triangles do not touch
    fn arrowhead() -> Polygon<f64> {
        ring_polygon(&[
            DVec2::new(0.0, 0.0),
            DVec2::new(40.0, 30.0),
            DVec2::new(60.0, 30.0),
            DVec2::new(100.0, 0.0),
            DVec2::new(50.0, 100.0),
        ])
    }

    #[test]
    fn arrowhead_merges_into_one_full_group_and_a_leftover() {
        let ring = exterior_ring(&arrowhead());
        let mut areas: Vec<f64> = merge_triangles(&ring, 1500.0)
            .into_iter()
            .map(|(_, area)| area)
            .collect();
        areas.sort_by(f64::total_cmp);
        assert_eq!(areas.len(), 2);
        assert!((areas[0] - 1250.0).abs() < 1e-9);
        assert!((areas[1] - 1950.0).abs() < 1e-9);
    }

    #[test]
    fn short_triangle_group_is_offered_and_rejected() {
        // leftover 1250 is within 0.8 of 1500, offered, then fails the area test
        let params = Parameters {
            min_lot_area: 1500.0,
            ..Parameters::default()
        };
        let streets = Streets::default();
        let mut lots = BlockLots::new(&streets, &params, 0);
        residual_lots(&mut lots, arrowhead(), 0);

        assert_eq!(lots.lots.len(), 1);
        assert_eq!(lots.lots[0].kind, LotKind::Residual);
        assert!((lots.lots[0].area - 1950.0).abs() < 1e-3);
        assert_eq!(lots.rejected, 1);
    }

    #[test]
    fn triangle_group_below_tolerance_is_dropped() {
        // 1250 < 0.8 * 1580, never offered
        let params = Parameters {
            min_lot_area: 1580.0,
            ..Parameters::default()
        };
        let streets = Streets::default();
        let mut lots = BlockLots::new(&streets, &params, 0);
        residual_lots(&mut lots, arrowhead(), 0);

        assert_eq!(lots.lots.len(), 1);
        assert!((lots.lots[0].area - 1950.0).abs() < 1e-3);
        assert_eq!(lots.rejected, 0);
    }

    #[test]
    fn residual_sliver_along_the_street_is_rejected() {
        // 90 x 3 strip just below the corridor, every edge fronts it
        let params = Parameters::default();
        let streets = street();
        let mut lots = BlockLots::new(&streets, &params, 0);
        residual_lots(&mut lots, rect_polygon(DVec2::new(0.0, 41.0), DVec2::new(90.0, 44.0)), 0);

        assert!(lots.lots.is_empty());
        assert_eq!(lots.rejected, 1);
    }

    #[test]
    fn shape_tolerance_sets_the_residual_depth() {
        use crate::systems::params::ShapeTolerance;

        // 30 wide on the street, 10 deep
        let piece = rect_polygon(DVec2::new(0.0, 34.0), DVec2::new(30.0, 44.0));
        let streets = street();
        let accepted = |tolerance| {
            let params = Parameters {
                shape_tolerance: tolerance,
                ..Parameters::default()
            };
            let mut lots = BlockLots::new(&streets, &params, 0);
            residual_lots(&mut lots, piece.clone(), 0);
            lots.lots.len()
        };

        // high tolerance needs 15 * 0.2 = 3, low needs 15 * 0.8 = 12
        assert_eq!(accepted(ShapeTolerance::High), 1);
        assert_eq!(accepted(ShapeTolerance::Low), 0);
    }

    #[test]
    fn lotless_blocks_are_reported() {
        let params = Parameters::default();
        let blocks = vec![
            rect_polygon(DVec2::new(10.0, 24.0), DVec2::new(29.0, 44.0)),
            rect_polygon(DVec2::new(10.0, 0.0), DVec2::new(29.0, 20.0)),
        ];
        let outcome = subdivide_blocks(&blocks, &street(), &params);
        assert_eq!(outcome.lots.len(), 1);
        assert_eq!(outcome.lotless_blocks, vec![1]);
    }
}
