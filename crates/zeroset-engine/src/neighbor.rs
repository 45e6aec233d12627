//! Face-adjacency queries on a [`Quadtree`] with cells of unequal depth.
//!
//! [`Quadtree::walk`] steps from a cell to the node of equal or shallower
//! depth across one of its faces: up through the parents until an
//! ancestor can step sideways, then back down mirroring the path.
//! [`Quadtree::leaves_in_direction`] expands that node into the leaves
//! touching the shared face, so the result is exact even when the two
//! sides are refined to different depths.

use serde::{Deserialize, Serialize};

use crate::tree::{CellId, Quadtree};

/// Side of a cell along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward the minimum bound.
    Min,
    /// Toward the maximum bound.
    Max,
}

impl Direction {
    /// The other side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Min => Self::Max,
            Self::Max => Self::Min,
        }
    }

    /// Returns `true` for [`Direction::Max`].
    #[must_use]
    pub const fn is_max(self) -> bool {
        matches!(self, Self::Max)
    }

    /// Whether child/corner index `index` lies on this side along `axis`.
    #[must_use]
    pub const fn contains(self, index: usize, axis: usize) -> bool {
        (index & (1 << axis) != 0) == self.is_max()
    }
}

impl Quadtree {
    /// Node adjacent to `id` across its `direction` face along `axis`.
    ///
    /// The result has the same depth as `id` when the tree is refined
    /// that far on the other side, otherwise it is the deepest leaf that
    /// covers the face. Returns `None` at the boundary of the box.
    #[must_use]
    pub fn walk(&self, id: CellId, axis: usize, direction: Direction) -> Option<CellId> {
        let cell = self.cell(id);
        let parent = cell.parent()?;
        let index = cell.child_index();
        let flipped = index ^ (1 << axis);

        if direction.contains(index, axis) {
            // Already on the far side of the parent: the neighbor belongs
            // to the parent's neighbor.
            let walked = self.walk(parent, axis, direction)?;
            Some(self.child(walked, flipped).unwrap_or(walked))
        } else {
            self.child(parent, flipped)
        }
    }

    /// Leaves of the subtree at `id` that lie on its `direction` face
    /// along `axis`. A leaf yields just itself.
    #[must_use]
    pub fn leaves_on_face(&self, id: CellId, axis: usize, direction: Direction) -> FaceLeaves<'_> {
        FaceLeaves {
            tree: self,
            stack: vec![id],
            axis,
            direction,
        }
    }

    /// Leaves on the other side of the `direction` face of `id` along
    /// `axis` that touch that face.
    ///
    /// Empty at the boundary of the box.
    #[must_use]
    pub fn leaves_in_direction(
        &self,
        id: CellId,
        axis: usize,
        direction: Direction,
    ) -> FaceLeaves<'_> {
        let stack = self.walk(id, axis, direction).into_iter().collect();
        FaceLeaves {
            tree: self,
            stack,
            axis,
            direction: direction.opposite(),
        }
    }

    /// Largest depth difference between two face-adjacent leaves.
    ///
    /// Zero for a uniformly refined tree.
    #[must_use]
    pub fn max_depth_jump(&self) -> u32 {
        let mut jump = 0;
        for id in self.leaves() {
            let depth = self.cell(id).depth();
            for axis in 0..self.dim() {
                for neighbor in self.leaves_in_direction(id, axis, Direction::Max) {
                    jump = jump.max(depth.abs_diff(self.cell(neighbor).depth()));
                }
            }
        }
        jump
    }
}

/// Lazy depth-first iterator over the leaves on one face of a subtree.
///
/// Leaves are yielded in ascending child-index order.
#[derive(Debug, Clone)]
pub struct FaceLeaves<'a> {
    tree: &'a Quadtree,
    stack: Vec<CellId>,
    axis: usize,
    direction: Direction,
}

impl Iterator for FaceLeaves<'_> {
    type Item = CellId;

    fn next(&mut self) -> Option<CellId> {
        while let Some(id) = self.stack.pop() {
            if self.tree.cell(id).is_leaf() {
                return Some(id);
            }
            let face_children: Vec<CellId> = self
                .tree
                .children(id)
                .enumerate()
                .filter(|&(i, _)| self.direction.contains(i, self.axis))
                .map(|(_, child)| child)
                .collect();
            self.stack.extend(face_children.into_iter().rev());
        }
        None
    }
}
