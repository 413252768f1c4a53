use bevy::math::DVec2;
use spade::{ConstrainedDelaunayTriangulation, Point2, Triangulation as _};

use super::utils::{point_in_polygon, signed_area};

/// One triangle as indices into the source ring
pub type TriangleIndices = [usize; 3];

/// Triangulates a simple ring, keeping its edges as constraints
///
/// # Returns
/// Triangles (vertex indices into `ring`) covering the ring's interior.
/// Empty when the ring is degenerate, repeats a vertex, or crosses itself.
pub fn triangulate_ring(ring: &[DVec2]) -> Vec<TriangleIndices> {
    if ring.len() < 3 || signed_area(ring).abs() < f64::EPSILON {
        return Vec::new();
    }

    let vertices: Vec<Point2<f64>> = ring.iter().map(|v| Point2::new(v.x, v.y)).collect();
    let edges: Vec<[usize; 2]> = (0..ring.len()).map(|i| [i, (i + 1) % ring.len()]).collect();

    let mut conflicts = 0;
    let Ok(cdt) = ConstrainedDelaunayTriangulation::<Point2<f64>>::try_bulk_load_cdt(
        vertices,
        edges,
        |_| conflicts += 1,
    ) else {
        return Vec::new();
    };

    // duplicates are merged by spade, which would shift our indices
    if conflicts > 0 || cdt.num_vertices() != ring.len() {
        return Vec::new();
    }

    let mut triangles = Vec::new();
    for face in cdt.inner_faces() {
        let [a, b, c] = face.vertices();
        let indices = [a.index(), b.index(), c.index()];

        // concave rings leave faces outside the boundary
        let center = (ring[indices[0]] + ring[indices[1]] + ring[indices[2]]) / 3.0;
        if point_in_polygon(center, ring) {
            triangles.push(indices);
        }
    }

    triangles
}

/// True when two triangles share an edge (two vertex indices)
pub fn shares_edge(a: &TriangleIndices, b: &TriangleIndices) -> bool {
    a.iter().filter(|i| b.contains(i)).count() >= 2
}

pub fn triangle_area(ring: &[DVec2], tri: &TriangleIndices) -> f64 {
    signed_area(&[ring[tri[0]], ring[tri[1]], ring[tri[2]]]).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_splits_into_two_triangles() {
        let ring = vec![
            DVec2::ZERO,
            DVec2::new(10.0, 0.0),
            DVec2::new(10.0, 10.0),
            DVec2::new(0.0, 10.0),
        ];
        let tris = triangulate_ring(&ring);
        assert_eq!(tris.len(), 2);
        let area: f64 = tris.iter().map(|t| triangle_area(&ring, t)).sum();
        assert!((area - 100.0).abs() < 1e-9);
        assert!(shares_edge(&tris[0], &tris[1]));
    }

    #[test]
    fn concave_ring_keeps_only_inner_faces() {
        // L-shape, area 75
        let ring = vec![
            DVec2::ZERO,
            DVec2::new(10.0, 0.0),
            DVec2::new(10.0, 5.0),
            DVec2::new(5.0, 5.0),
            DVec2::new(5.0, 10.0),
            DVec2::new(0.0, 10.0),
        ];
        let tris = triangulate_ring(&ring);
        assert_eq!(tris.len(), 4);
        let area: f64 = tris.iter().map(|t| triangle_area(&ring, t)).sum();
        assert!((area - 75.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_ring_yields_nothing() {
        let ring = vec![DVec2::ZERO, DVec2::X, DVec2::new(2.0, 0.0)];
        assert!(triangulate_ring(&ring).is_empty());
    }
}
