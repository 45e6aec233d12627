//! Adaptive refinement tree over the search box.
//!
//! Cells live in a flat arena ([`Quadtree`]) and refer to each other by
//! [`CellId`]. A split cell stores the id of its first child; the `2^dim`
//! children are contiguous in the arena, so child `i` is `first + i`.
//!
//! Corner ordering is fixed for every cell: corner `i` takes coordinate
//! `d` from the maximum bound iff bit `d` of `i` is set. Child `i` of a
//! cell is the sub-box that contains the parent's corner `i`.

use std::collections::VecDeque;

use crate::config::{check_min_depth, check_tolerance};
use crate::field::ScalarField;
use crate::types::{Bounds, IsolineError, Point, Sample, sign};

/// Cells whose span is below `SMALL_CELL_FACTOR * tol` on every axis are
/// not refined any further.
pub const SMALL_CELL_FACTOR: f64 = 10.0;

/// Index of a cell in its [`Quadtree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(usize);

impl CellId {
    /// Position of the cell in the arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// An axis-aligned box with its `2^dim` evaluated corners.
#[derive(Debug, Clone)]
pub struct Cell {
    corners: Vec<Sample>,
    depth: u32,
    first_child: Option<CellId>,
    parent: Option<CellId>,
    child_index: usize,
}

impl Cell {
    /// Corner samples in the fixed bit order.
    #[must_use]
    pub fn corners(&self) -> &[Sample] {
        &self.corners
    }

    /// Corner with every coordinate at its minimum.
    #[must_use]
    pub fn min_corner(&self) -> &Sample {
        &self.corners[0]
    }

    /// Corner with every coordinate at its maximum.
    #[must_use]
    pub fn max_corner(&self) -> &Sample {
        &self.corners[self.corners.len() - 1]
    }

    /// Edge length along every axis.
    #[must_use]
    pub fn span(&self) -> Point {
        &self.max_corner().pos - &self.min_corner().pos
    }

    /// Refinement level; the root is at depth 0.
    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// Parent cell, `None` for the root.
    #[must_use]
    pub const fn parent(&self) -> Option<CellId> {
        self.parent
    }

    /// Which child of its parent this cell is (`0` for the root).
    #[must_use]
    pub const fn child_index(&self) -> usize {
        self.child_index
    }

    /// Returns `true` if the cell has not been split.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.first_child.is_none()
    }
}

/// Arena of cells forming a `2^dim`-ary refinement tree.
///
/// Cells are never removed; children, once created, never change.
#[derive(Debug, Clone)]
pub struct Quadtree {
    dim: usize,
    cells: Vec<Cell>,
}

impl Quadtree {
    /// Create a single-cell tree covering `bounds`.
    pub fn new<F: ScalarField + ?Sized>(bounds: &Bounds, field: &F) -> Self {
        let dim = bounds.dim();
        let corners = (0..1usize << dim)
            .map(|i| {
                let coords = (0..dim)
                    .map(|d| {
                        if (i >> d) & 1 == 1 {
                            bounds.max()[d]
                        } else {
                            bounds.min()[d]
                        }
                    })
                    .collect();
                Sample::evaluate(Point::new(coords), field)
            })
            .collect();
        Self {
            dim,
            cells: vec![Cell {
                corners,
                depth: 0,
                first_child: None,
                parent: None,
                child_index: 0,
            }],
        }
    }

    /// Number of axes.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Children per split cell (`2^dim`).
    #[must_use]
    pub const fn branching_factor(&self) -> usize {
        1 << self.dim
    }

    /// The root cell.
    #[must_use]
    pub const fn root(&self) -> CellId {
        CellId(0)
    }

    /// Look up a cell.
    ///
    /// # Panics
    ///
    /// Ids are only handed out by this tree, so an out-of-range id
    /// indicates it came from a different tree.
    #[must_use]
    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.0]
    }

    /// Total number of cells, internal nodes included.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always `false`: a tree has at least its root.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Child `index` of `id`, or `None` if `id` is a leaf.
    #[must_use]
    pub fn child(&self, id: CellId, index: usize) -> Option<CellId> {
        self.cells[id.0]
            .first_child
            .map(|first| CellId(first.0 + index))
    }

    /// All children of `id` in index order (empty for a leaf).
    pub fn children(&self, id: CellId) -> impl Iterator<Item = CellId> + use<> {
        let count = if self.cells[id.0].is_leaf() {
            0
        } else {
            self.branching_factor()
        };
        let first = self.cells[id.0].first_child.map_or(0, CellId::index);
        (first..first + count).map(CellId)
    }

    /// All leaf cells in arena order.
    pub fn leaves(&self) -> impl Iterator<Item = CellId> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_leaf())
            .map(|(i, _)| CellId(i))
    }

    /// Number of leaf cells.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    /// Deepest refinement level present.
    #[must_use]
    pub fn max_depth(&self) -> u32 {
        self.cells.iter().map(Cell::depth).max().unwrap_or(0)
    }

    /// Split a leaf into `2^dim` equal sub-boxes.
    ///
    /// Samples the `3^dim` lattice spanned by the cell's corners, edge
    /// midpoints and center once; the parent's corners are reused and
    /// only the new lattice points are evaluated. Splitting a cell that
    /// already has children does nothing.
    pub fn split<F: ScalarField + ?Sized>(&mut self, id: CellId, field: &F) {
        let parent = &self.cells[id.0];
        if !parent.is_leaf() {
            return;
        }
        let dim = self.dim;
        let lo = parent.min_corner().pos.clone();
        let hi = parent.max_corner().pos.clone();
        let depth = parent.depth + 1;

        let lattice_len = 3usize.pow(dim_u32(dim));
        let mut lattice = Vec::with_capacity(lattice_len);
        for t in 0..lattice_len {
            let digits = ternary_digits(t, dim);
            if digits.iter().all(|&digit| digit != 1) {
                let corner = digits
                    .iter()
                    .enumerate()
                    .fold(0, |acc, (d, &digit)| acc | (usize::from(digit == 2) << d));
                lattice.push(parent.corners[corner].clone());
            } else {
                let coords = digits
                    .iter()
                    .enumerate()
                    .map(|(d, &digit)| match digit {
                        0 => lo[d],
                        1 => (lo[d] + hi[d]) / 2.0,
                        _ => hi[d],
                    })
                    .collect();
                lattice.push(Sample::evaluate(Point::new(coords), field));
            }
        }

        let first = CellId(self.cells.len());
        let branching = self.branching_factor();
        for i in 0..branching {
            let corners = (0..branching)
                .map(|j| {
                    let t = (0..dim).rev().fold(0, |acc, d| {
                        acc * 3 + ((i >> d) & 1) + ((j >> d) & 1)
                    });
                    lattice[t].clone()
                })
                .collect();
            self.cells.push(Cell {
                corners,
                depth,
                first_child: None,
                parent: Some(id),
                child_index: i,
            });
        }
        self.cells[id.0].first_child = Some(first);
    }
}

/// Build the refinement tree for `field` over `bounds`.
///
/// Cells are processed breadth-first. A cell is split while its depth is
/// below `min_depth`, or while [`should_descend`] holds, as long as the
/// leaf count stays under `max_cells` (raised to `2^(dim * min_depth)`
/// if smaller). The check happens before each split, so the final leaf
/// count may overshoot by up to `2^dim - 1`.
///
/// # Errors
///
/// Returns [`IsolineError::InvalidConfig`] if `min_depth` exceeds
/// [`IsolineConfig::MAX_MIN_DEPTH`](crate::config::IsolineConfig::MAX_MIN_DEPTH), and
/// [`IsolineError::ToleranceLength`] or
/// [`IsolineError::InvalidTolerance`] if `tolerance` does not have one
/// finite positive entry per axis.
pub fn build<F: ScalarField + ?Sized>(
    field: &F,
    bounds: &Bounds,
    min_depth: u32,
    max_cells: usize,
    tolerance: &[f64],
) -> Result<Quadtree, IsolineError> {
    check_min_depth(min_depth)?;
    check_tolerance(tolerance, bounds.dim())?;

    let mut tree = Quadtree::new(bounds, field);
    let branching = tree.branching_factor();
    let leaf_budget = leaf_budget(branching, min_depth, max_cells);

    let mut queue = VecDeque::from([tree.root()]);
    let mut leaf_count = 1usize;

    while leaf_count < leaf_budget {
        let Some(id) = queue.pop_front() else {
            break;
        };
        let cell = tree.cell(id);
        if cell.depth() < min_depth || should_descend(cell, tolerance) {
            tree.split(id, field);
            queue.extend(tree.children(id));
            leaf_count += branching - 1;
        }
    }

    if !queue.is_empty() {
        log::debug!("leaf budget of {leaf_budget} reached with {} cells queued", queue.len());
    }
    log::debug!(
        "built tree: {} cells, {leaf_count} leaves, max depth {}",
        tree.len(),
        tree.max_depth()
    );
    Ok(tree)
}

/// Leaf count at which [`build`] stops splitting: `max_cells`, raised to
/// `branching^min_depth` so the forced depth is always reached.
#[must_use]
pub fn leaf_budget(branching: usize, min_depth: u32, max_cells: usize) -> usize {
    branching
        .checked_pow(min_depth)
        .unwrap_or(usize::MAX)
        .max(max_cells)
}

/// Whether a cell beyond `min_depth` still needs refining.
///
/// In order: no if the cell is already small on every axis; no if the
/// field is undefined at every corner; yes if it is undefined at some
/// corner; otherwise yes iff the corner values do not all share a sign.
#[must_use]
pub fn should_descend(cell: &Cell, tolerance: &[f64]) -> bool {
    let span = cell.span();
    let small = span
        .coords()
        .iter()
        .zip(tolerance)
        .all(|(s, t)| *s < SMALL_CELL_FACTOR * t);
    if small {
        return false;
    }

    let corners = cell.corners();
    if corners.iter().all(Sample::is_undefined) {
        return false;
    }
    if corners.iter().any(Sample::is_undefined) {
        return true;
    }

    let first = sign(corners[0].value);
    corners[1..].iter().any(|c| sign(c.value) != first)
}

#[allow(clippy::cast_possible_truncation)]
const fn dim_u32(dim: usize) -> u32 {
    dim as u32
}

/// Base-3 digits of `t`, least significant (axis 0) first.
#[allow(clippy::cast_possible_truncation)]
fn ternary_digits(mut t: usize, dim: usize) -> Vec<u8> {
    let mut digits = Vec::with_capacity(dim);
    for _ in 0..dim {
        digits.push((t % 3) as u8);
        t /= 3;
    }
    digits
}
