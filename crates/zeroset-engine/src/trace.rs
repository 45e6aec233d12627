//! Curve tracer: turns linked triangle chains into polylines.

use crate::triangulate::{Triangle, TriangleId};
use crate::types::{Point, Polyline};

/// Walk the `next`/`prev` chains of `triangles` and emit one polyline per
/// chain.
///
/// Chains are discovered in list order. Each is rewound to its first
/// triangle (or to the discovering triangle if the chain is a cycle),
/// then walked forward collecting every crossing point. Cycles repeat
/// their first point at the end. Chains whose crossings all coincide are
/// dropped: they arise around a lattice point where the field is exactly
/// zero and every other crossing of its fan was rejected. Every triangle
/// is visited at most once, and the `visited` flags are left set on
/// return.
pub fn trace(triangles: &mut [Triangle]) -> Vec<Polyline> {
    let mut curves = Vec::new();

    for start in 0..triangles.len() {
        if triangles[start].visited || triangles[start].next.is_none() {
            continue;
        }
        let (first, closed) = chain_start(triangles, start);

        let mut points = Vec::new();
        let mut current = Some(first);
        while let Some(index) = current {
            let triangle = &mut triangles[index];
            if triangle.visited {
                break;
            }
            triangle.visited = true;
            if let Some(crossing) = &triangle.next_bisect_point {
                points.push(crossing.pos.clone());
            }
            current = triangle.next.map(TriangleId::index);
        }

        if closed && let Some(head) = points.first().cloned() {
            points.push(head);
        }
        if is_degenerate(&points) {
            log::trace!("dropping zero-extent chain starting at triangle {first}");
        } else {
            curves.push(Polyline::new(points));
        }
    }

    log::debug!(
        "traced {} curves ({} closed)",
        curves.len(),
        curves.iter().filter(|c| c.is_closed()).count()
    );
    curves
}

/// Fewer than two distinct points.
fn is_degenerate(points: &[Point]) -> bool {
    points
        .split_first()
        .is_none_or(|(head, rest)| rest.iter().all(|p| p == head))
}

/// Follow `prev` links back from `start`.
///
/// Returns the first triangle of the chain and whether the chain is a
/// cycle through `start`. Stops before a triangle that is already
/// visited.
fn chain_start(triangles: &[Triangle], start: usize) -> (usize, bool) {
    let mut current = start;
    for _ in 0..triangles.len() {
        let Some(prev) = triangles[current].prev.map(TriangleId::index) else {
            return (current, false);
        };
        if prev == start {
            return (start, true);
        }
        if triangles[prev].visited {
            return (current, false);
        }
        current = prev;
    }
    (current, false)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Sample;

    fn blank(count: usize) -> Vec<Triangle> {
        (0..count)
            .map(|_| {
                let s = Sample::new(Point::xy(0.0, 0.0), 1.0);
                Triangle::new([s.clone(), s.clone(), s])
            })
            .collect()
    }

    fn link(triangles: &mut [Triangle], from: usize, to: usize) {
        #[allow(clippy::cast_precision_loss)]
        let at = Point::xy(from as f64, 0.0);
        link_at(triangles, from, to, at);
    }

    fn link_at(triangles: &mut [Triangle], from: usize, to: usize, at: Point) {
        let crossing = Sample::new(at, 0.0);
        triangles[from].next = Some(TriangleId(to));
        triangles[from].next_bisect_point = Some(crossing);
        triangles[to].prev = Some(TriangleId(from));
    }

    fn xs(curve: &Polyline) -> Vec<f64> {
        curve.points().iter().map(Point::x).collect()
    }

    #[test]
    fn no_links_no_curves() {
        let mut triangles = blank(5);
        assert!(trace(&mut triangles).is_empty());
    }

    #[test]
    fn open_chain_is_rewound_to_its_start() {
        let mut triangles = blank(4);
        link(&mut triangles, 2, 0);
        link(&mut triangles, 0, 3);
        let curves = trace(&mut triangles);
        assert_eq!(curves.len(), 1);
        assert_eq!(xs(&curves[0]), vec![2.0, 0.0]);
        assert!(!curves[0].is_closed());
    }

    #[test]
    fn cycle_is_closed() {
        let mut triangles = blank(3);
        link(&mut triangles, 0, 1);
        link(&mut triangles, 1, 2);
        link(&mut triangles, 2, 0);
        let curves = trace(&mut triangles);
        assert_eq!(curves.len(), 1);
        assert_eq!(xs(&curves[0]), vec![0.0, 1.0, 2.0, 0.0]);
        assert!(curves[0].is_closed());
    }

    #[test]
    fn separate_chains_give_separate_curves() {
        let mut triangles = blank(6);
        link(&mut triangles, 0, 1);
        link(&mut triangles, 1, 2);
        link(&mut triangles, 3, 4);
        link(&mut triangles, 4, 5);
        let curves = trace(&mut triangles);
        assert_eq!(curves.len(), 2);
        assert_eq!(xs(&curves[0]), vec![0.0, 1.0]);
        assert_eq!(xs(&curves[1]), vec![3.0, 4.0]);
    }

    #[test]
    fn every_linked_triangle_is_visited_once() {
        let mut triangles = blank(5);
        link(&mut triangles, 0, 1);
        link(&mut triangles, 1, 2);
        link(&mut triangles, 2, 0);
        link(&mut triangles, 3, 4);
        let curves = trace(&mut triangles);
        let total: usize = curves.iter().map(Polyline::len).sum();
        // Three crossings plus the repeated head. The lone crossing of
        // 3 -> 4 is not a curve.
        assert_eq!(total, 4);
        assert!(triangles.iter().all(Triangle::is_visited));

        // A second pass finds nothing left.
        assert!(trace(&mut triangles).is_empty());
    }

    #[test]
    fn zero_extent_fan_cycle_is_dropped() {
        // Four triangles around a lattice point with an exact zero, all
        // reporting that point as their crossing.
        let mut triangles = blank(6);
        for (from, to) in [(0, 1), (1, 2), (2, 3), (3, 0)] {
            link_at(&mut triangles, from, to, Point::xy(-1.0, 0.0));
        }
        link(&mut triangles, 4, 5);
        link_at(&mut triangles, 5, 4, Point::xy(7.0, 0.0));
        let curves = trace(&mut triangles);
        assert_eq!(curves.len(), 1);
        assert_eq!(xs(&curves[0]), vec![4.0, 7.0, 4.0]);
        assert!(triangles.iter().all(Triangle::is_visited));
    }
}
