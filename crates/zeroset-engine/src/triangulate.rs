//! Dual triangulation of a refined [`Quadtree`] and curve-chain linking.
//!
//! Every pair of face-adjacent leaves is bridged by a fan of four
//! triangles around an *edge dual* on their shared face: one triangle per
//! side of the quad formed by the two face duals and the two endpoints of
//! the shared face. When the leaves differ in depth the finer leaf's face
//! endpoints are used, so a coarse leaf next to several fine ones gets one
//! fan per fine leaf and no T-junction cracks appear.
//!
//! While the fans are emitted, triangles whose shared edge crosses the
//! zero level are linked `prev -> next` so that walking the links follows
//! the curve. Edges shared between fans emitted from different recursive
//! branches are matched through a table keyed by the quantized edge
//! midpoint ([`EdgeKey`]).

use std::collections::HashMap;

use crate::config::check_tolerance;
use crate::field::ScalarField;
use crate::locate::{bisect, edge_dual, midpoint};
use crate::tree::{CellId, Quadtree};
use crate::types::{IsolineError, Point, Sample};

/// Quantization scale for [`EdgeKey`]: coordinates relative to the box are
/// rounded to multiples of `2^-40`.
const EDGE_KEY_SCALE: f64 = 1_099_511_627_776.0;

/// Index of a triangle in a [`Triangulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriangleId(pub(crate) usize);

impl TriangleId {
    /// Position of the triangle in the list.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// One triangle of the dual mesh.
///
/// Vertices are `[x, y, center]`, where `center` is the edge dual of the
/// fan. When the zero level leaves this triangle, `next` names the
/// triangle it enters and `next_bisect_point` is the crossing on the
/// shared edge.
#[derive(Debug, Clone)]
pub struct Triangle {
    pub(crate) vertices: [Sample; 3],
    pub(crate) next: Option<TriangleId>,
    pub(crate) prev: Option<TriangleId>,
    pub(crate) next_bisect_point: Option<Sample>,
    pub(crate) visited: bool,
}

impl Triangle {
    pub(crate) const fn new(vertices: [Sample; 3]) -> Self {
        Self {
            vertices,
            next: None,
            prev: None,
            next_bisect_point: None,
            visited: false,
        }
    }

    /// The three vertices, edge dual last.
    #[must_use]
    pub const fn vertices(&self) -> &[Sample; 3] {
        &self.vertices
    }

    /// Triangle the curve continues into.
    #[must_use]
    pub const fn next(&self) -> Option<TriangleId> {
        self.next
    }

    /// Triangle the curve arrives from.
    #[must_use]
    pub const fn prev(&self) -> Option<TriangleId> {
        self.prev
    }

    /// Zero crossing on the edge shared with [`next`](Self::next).
    #[must_use]
    pub const fn next_bisect_point(&self) -> Option<&Sample> {
        self.next_bisect_point.as_ref()
    }

    /// Whether the curve tracer has consumed this triangle.
    #[must_use]
    pub const fn is_visited(&self) -> bool {
        self.visited
    }
}

/// Identity of a triangle edge, derived from its midpoint.
///
/// Midpoint coordinates are taken relative to the box, scaled to
/// `[0, 1]`, multiplied by `2^40` and rounded. Tree cells are dyadic
/// sub-boxes, so two triangles sharing an edge produce the same key and
/// distinct edges never collide until cells are about `2^-38` of the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeKey([i64; 2]);

impl EdgeKey {
    /// Key for the edge from `a` to `b` inside the box starting at
    /// `origin` with edge lengths `span`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(a: &Point, b: &Point, origin: &Point, span: &Point) -> Self {
        let mid = a.midpoint(b);
        let quantize = |axis: usize| {
            ((mid[axis] - origin[axis]) / span[axis] * EDGE_KEY_SCALE).round() as i64
        };
        Self([quantize(0), quantize(1)])
    }
}

/// Output of [`triangulate`].
#[derive(Debug, Clone)]
pub struct Triangulation {
    /// All triangles, four per bridged leaf pair, in emission order.
    pub triangles: Vec<Triangle>,
    /// Hanging edges that never found their partner (box boundary or
    /// non-manifold configurations). Dropped, only counted.
    pub unmatched_edges: usize,
}

impl Triangulation {
    /// Number of triangles with a `next` link.
    #[must_use]
    pub fn linked_count(&self) -> usize {
        self.triangles.iter().filter(|t| t.next.is_some()).count()
    }
}

/// Triangulate `tree` and link the triangles along the zero level.
///
/// # Errors
///
/// Returns [`IsolineError::UnsupportedDimension`] unless the tree is 2D,
/// and [`IsolineError::ToleranceLength`] or
/// [`IsolineError::InvalidTolerance`] for a malformed `tolerance`.
pub fn triangulate<F: ScalarField + ?Sized>(
    tree: &Quadtree,
    field: &F,
    tolerance: &[f64],
) -> Result<Triangulation, IsolineError> {
    if tree.dim() != 2 {
        return Err(IsolineError::UnsupportedDimension(tree.dim()));
    }
    check_tolerance(tolerance, tree.dim())?;

    let root = tree.cell(tree.root());
    let mut triangulator = Triangulator {
        tree,
        field,
        tolerance,
        origin: root.min_corner().pos.clone(),
        span: root.span(),
        triangles: Vec::new(),
        face_duals: HashMap::new(),
        hanging: HashMap::new(),
    };
    triangulator.triangulate_inside(tree.root());

    for (key, id) in &triangulator.hanging {
        log::trace!("dropping unmatched edge {key:?} of triangle {}", id.index());
    }
    let unmatched_edges = triangulator.hanging.len();
    let triangulation = Triangulation {
        triangles: triangulator.triangles,
        unmatched_edges,
    };
    log::debug!(
        "triangulated: {} triangles, {} linked, {unmatched_edges} unmatched edges",
        triangulation.triangles.len(),
        triangulation.linked_count()
    );
    Ok(triangulation)
}

struct Triangulator<'a, F: ?Sized> {
    tree: &'a Quadtree,
    field: &'a F,
    tolerance: &'a [f64],
    origin: Point,
    span: Point,
    triangles: Vec<Triangle>,
    face_duals: HashMap<CellId, Sample>,
    hanging: HashMap<EdgeKey, TriangleId>,
}

impl<F: ScalarField + ?Sized> Triangulator<'_, F> {
    /// Triangulate the subtree at `id`: children first, then the four
    /// faces between them.
    fn triangulate_inside(&mut self, id: CellId) {
        let children: Vec<CellId> = self.tree.children(id).collect();
        let &[c0, c1, c2, c3] = children.as_slice() else {
            return;
        };
        for &child in &children {
            self.triangulate_inside(child);
        }
        self.bridge(c0, c1, 0);
        self.bridge(c2, c3, 0);
        self.bridge(c0, c2, 1);
        self.bridge(c1, c3, 1);
    }

    /// Bridge `a` and `b`, with `b` on the max side of `a` along `axis`.
    ///
    /// Internal nodes are replaced by their children on the shared face
    /// until both sides are leaves.
    fn bridge(&mut self, a: CellId, b: CellId, axis: usize) {
        if self.tree.cell(a).is_leaf() && self.tree.cell(b).is_leaf() {
            self.fan(a, b, axis);
            return;
        }
        let m = 1 << axis;
        let other = 1 << (1 - axis);
        for k in [0, other] {
            let a_side = self.tree.child(a, k | m).unwrap_or(a);
            let b_side = self.tree.child(b, k).unwrap_or(b);
            self.bridge(a_side, b_side, axis);
        }
    }

    /// Emit the four triangles around the shared face of leaves `a` and
    /// `b` and link them.
    fn fan(&mut self, a: CellId, b: CellId, axis: usize) {
        let m = 1 << axis;
        let other = 1 << (1 - axis);
        let (finer, base) = if self.tree.cell(a).depth() < self.tree.cell(b).depth() {
            (b, 0)
        } else {
            (a, m)
        };
        // Endpoint order keeps every fan wound the same way.
        let (first, second) = if axis == 0 {
            (base | other, base)
        } else {
            (base, base | other)
        };
        let corners = self.tree.cell(finer).corners();
        let e1 = corners[first].clone();
        let e2 = corners[second].clone();

        let face_a = self.face_dual(a);
        let face_b = self.face_dual(b);
        let center = edge_dual(&e1, &e2, self.field);

        let start = self.triangles.len();
        self.triangles.extend([
            Triangle::new([e1.clone(), face_b.clone(), center.clone()]),
            Triangle::new([face_b, e2.clone(), center.clone()]),
            Triangle::new([e2, face_a.clone(), center.clone()]),
            Triangle::new([face_a, e1, center]),
        ]);
        for i in 0..4 {
            self.sandwich(
                TriangleId(start + i),
                TriangleId(start + (i + 1) % 4),
                TriangleId(start + (i + 2) % 4),
            );
        }
    }

    fn face_dual(&mut self, id: CellId) -> Sample {
        if let Some(dual) = self.face_duals.get(&id) {
            return dual.clone();
        }
        let cell = self.tree.cell(id);
        let dual = midpoint(cell.min_corner(), cell.max_corner(), self.field);
        self.face_duals.insert(id, dual.clone());
        dual
    }

    /// Link `b` to its fan neighbors `a` and `c` across the edges it
    /// shares with them, and to a triangle of another fan across its
    /// outer edge.
    fn sandwich(&mut self, a: TriangleId, b: TriangleId, c: TriangleId) {
        let [x, y, center] = self.triangles[b.0].vertices.clone();

        if center.is_positive() && y.is_non_positive() {
            self.set_next(b, c, &center, &y);
        }
        if x.is_positive() && center.is_non_positive() {
            self.set_next(b, a, &x, &center);
        }

        let key = EdgeKey::new(&x.pos, &y.pos, &self.origin, &self.span);
        if y.is_positive() && x.is_non_positive() {
            match self.hanging.remove(&key) {
                Some(other) => self.set_next(b, other, &y, &x),
                None => {
                    self.hanging.insert(key, b);
                }
            }
        } else if y.is_non_positive() && x.is_positive() {
            match self.hanging.remove(&key) {
                Some(other) => self.set_next(other, b, &x, &y),
                None => {
                    self.hanging.insert(key, b);
                }
            }
        }
    }

    /// Link `from -> to` through the crossing between `outside` and
    /// `inside`, if bisection finds one.
    fn set_next(&mut self, from: TriangleId, to: TriangleId, outside: &Sample, inside: &Sample) {
        if !(outside.is_positive() && inside.is_non_positive()) {
            return;
        }
        if self.triangles[from.0].next.is_some() || self.triangles[to.0].prev.is_some() {
            log::trace!(
                "triangle {} or {} already linked, skipping",
                from.index(),
                to.index()
            );
            return;
        }
        let crossing = bisect(outside, inside, self.field, self.tolerance);
        if !crossing.is_zero {
            return;
        }
        let source = &mut self.triangles[from.0];
        source.next_bisect_point = Some(crossing.sample);
        source.next = Some(to);
        self.triangles[to.0].prev = Some(from);
    }
}
