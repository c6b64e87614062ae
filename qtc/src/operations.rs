//! Turning a tree back into pixels.

use crate::quadtree::QuadTree;

/// Sample written on grid borders and leaves.
pub const GRID_BORDER: u8 = 200;

/// Sample written inside uniform blocks of the grid.
pub const GRID_FILL: u8 = 255;

/// A square region of the output owned by one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quadrant {
    pub x: usize,
    pub y: usize,
    pub size: usize,
}

/// What to do after visiting a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Descend,
    Stop,
}

/// Walk the tree from the root, handing each node and the quadrant it owns
/// to `visit`. Children are visited in split order (top-left, top-right,
/// bottom-right, bottom-left) when `visit` asks to descend.
pub fn descend<F>(tree: &QuadTree, visit: &mut F)
where
    F: FnMut(usize, u8, Quadrant) -> Visit,
{
    let root = Quadrant {
        x: 0,
        y: 0,
        size: tree.side(),
    };
    descend_node(tree, 0, 0, root, visit);
}

fn descend_node<F>(tree: &QuadTree, index: usize, level: u8, quadrant: Quadrant, visit: &mut F)
where
    F: FnMut(usize, u8, Quadrant) -> Visit,
{
    if visit(index, level, quadrant) == Visit::Stop || tree.is_leaf_level(level) {
        return;
    }

    let Quadrant { x, y, size } = quadrant;
    let half = size / 2;
    let first = 4 * index + 1;
    let sub = [(x, y), (x + half, y), (x + half, y + half), (x, y + half)];
    for (i, (sx, sy)) in sub.into_iter().enumerate() {
        let child = Quadrant { x: sx, y: sy, size: half };
        descend_node(tree, first + i, level + 1, child, visit);
    }
}

/// The `2^n × 2^n` row-major samples held by the leaves of the tree.
pub fn render_samples(tree: &QuadTree) -> Vec<u8> {
    let side = tree.side();
    let mut bitmap = vec![0u8; side * side];

    descend(tree, &mut |index, level, q| {
        if !tree.is_leaf_level(level) {
            return Visit::Descend;
        }

        bitmap[q.y * side + q.x] = tree.node(index).mean;
        Visit::Stop
    });

    bitmap
}

/// A diagnostic picture of the segmentation: every uniform block is drawn
/// as a flat square with a border, everything else is split further.
pub fn render_grid(tree: &QuadTree) -> Vec<u8> {
    let side = tree.side();
    let mut bitmap = vec![0u8; side * side];

    descend(tree, &mut |index, level, q| {
        if tree.is_leaf_level(level) {
            bitmap[q.y * side + q.x] = GRID_BORDER;
            return Visit::Stop;
        }

        if !tree.node(index).uniform {
            return Visit::Descend;
        }

        for row in 0..q.size {
            for col in 0..q.size {
                let edge = row == 0 || col == 0 || row == q.size - 1 || col == q.size - 1;
                bitmap[(q.y + row) * side + q.x + col] = if edge { GRID_BORDER } else { GRID_FILL };
            }
        }
        Visit::Stop
    });

    bitmap
}
