//! The flat, index-addressed quaternary tree that every encode and decode
//! operation works on.
//!
//! A tree of depth `n` is stored as a complete quaternary tree in a single
//! vector: node `i` has children `4i+1 ..= 4i+4` and level `l` starts at
//! index `(4^l - 1) / 3`. Array order is therefore also level order.

use std::ops::Range;

use crate::picture::Error;

/// Deepest tree that can be allocated, 4096×4096 pixels.
pub const MAX_DEPTH: u8 = 12;

/// A single node of the tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    /// Mean sample value of the quadrant.
    pub mean: u8,

    /// Sum of the four children's means, modulo 4. Always 0 on leaves.
    pub error: u8,

    /// Whether the whole quadrant holds a single sample value.
    pub uniform: bool,

    /// Only used while filtering, never stored in a container.
    pub variance: f32,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            mean: 0,
            error: 0,
            uniform: true,
            variance: 0.0,
        }
    }
}

impl Node {
    /// A leaf covering a single pixel
    pub fn leaf(sample: u8) -> Self {
        Self {
            mean: sample,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuadTree {
    nodes: Vec<Node>,
    depth: u8,
}

impl QuadTree {
    /// Allocate a tree of the given depth with every node at its default.
    pub fn new(depth: u8) -> Result<Self, Error> {
        if depth > MAX_DEPTH {
            return Err(Error::DepthTooLarge {
                depth: depth as u32,
                max: MAX_DEPTH,
            });
        }

        Ok(Self {
            nodes: vec![Node::default(); node_count(depth)],
            depth,
        })
    }

    /// Depth `n` of the tree; leaves live on level `n`.
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Side length in pixels of the square the tree covers.
    pub fn side(&self) -> usize {
        1 << self.depth
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn node_mut(&mut self, index: usize) -> &mut Node {
        &mut self.nodes[index]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Whether nodes on `level` are leaves.
    pub fn is_leaf_level(&self, level: u8) -> bool {
        level == self.depth
    }

    /// Indices of all nodes on `level`.
    pub fn level(&self, level: u8) -> Range<usize> {
        level_start(level)..level_start(level + 1)
    }

    /// Mean of the last child of `parent`, recovered from the parent's mean
    /// and error term and the means of the three other children.
    ///
    /// Returns `None` if the result does not fit a sample, which can only
    /// happen if the tree does not satisfy the aggregation invariant.
    pub fn interpolate(&self, parent: usize) -> Option<u8> {
        let p = &self.nodes[parent];
        let first = 4 * parent + 1;

        let total = 4 * p.mean as i32 + p.error as i32;
        let known: i32 = self.nodes[first..first + 3]
            .iter()
            .map(|n| n.mean as i32)
            .sum();

        u8::try_from(total - known).ok()
    }
}

/// Number of nodes in a complete quaternary tree of the given depth,
/// `(4^(depth+1) - 1) / 3`.
pub fn node_count(depth: u8) -> usize {
    level_start(depth + 1)
}

/// Index of the first node on `level`.
pub fn level_start(level: u8) -> usize {
    ((1usize << (2 * level as usize)) - 1) / 3
}

/// Indices of the four children of a node.
pub fn children(index: usize) -> Range<usize> {
    4 * index + 1..4 * index + 5
}

/// Parent of a node, `None` for the root.
pub fn parent(index: usize) -> Option<usize> {
    if index == 0 {
        None
    } else {
        Some((index - 1) / 4)
    }
}

/// Whether a node is the last of its group of siblings.
pub fn is_fourth_child(index: usize) -> bool {
    index != 0 && index % 4 == 0
}

/// Smallest depth `n` such that a `2^n × 2^n` square covers the image.
pub fn depth_for(width: u32, height: u32) -> u32 {
    let largest = width.max(height).max(1);
    largest.next_power_of_two().trailing_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_counts() {
        assert_eq!(node_count(0), 1);
        assert_eq!(node_count(1), 5);
        assert_eq!(node_count(2), 21);
        assert_eq!(node_count(3), 85);
        assert_eq!(QuadTree::new(4).unwrap().len(), (4usize.pow(5) - 1) / 3);
    }

    #[test]
    fn index_arithmetic() {
        assert_eq!(children(0), 1..5);
        assert_eq!(children(2), 9..13);
        assert_eq!(parent(0), None);
        assert_eq!(parent(4), Some(0));
        assert_eq!(parent(12), Some(2));
        assert!(is_fourth_child(4));
        assert!(is_fourth_child(8));
        assert!(!is_fourth_child(5));
        assert!(!is_fourth_child(0));
    }

    #[test]
    fn levels() {
        let tree = QuadTree::new(2).unwrap();
        assert_eq!(tree.level(0), 0..1);
        assert_eq!(tree.level(1), 1..5);
        assert_eq!(tree.level(2), 5..21);
        assert!(tree.is_leaf_level(2));
        assert_eq!(tree.side(), 4);
    }

    #[test]
    fn depth_derivation() {
        assert_eq!(depth_for(1, 1), 0);
        assert_eq!(depth_for(2, 2), 1);
        assert_eq!(depth_for(3, 1), 2);
        assert_eq!(depth_for(4, 4), 2);
        assert_eq!(depth_for(5, 4), 3);
        assert_eq!(depth_for(512, 512), 9);
        assert_eq!(depth_for(513, 7), 10);

        for h in 1..70 {
            for w in 1..70 {
                let d = depth_for(h, w);
                assert_eq!(d, depth_for(w, h));
                assert!(1u32 << d >= h.max(w));
                if d > 0 {
                    assert!(h.max(w) > 1u32 << (d - 1));
                }
            }
        }
    }

    #[test]
    fn rejects_excessive_depth() {
        assert!(matches!(
            QuadTree::new(MAX_DEPTH + 1),
            Err(Error::DepthTooLarge { .. })
        ));
    }

    #[test]
    fn interpolates_last_child() {
        let mut tree = QuadTree::new(1).unwrap();
        let means = [10u8, 20, 40, 31];
        for (i, m) in means.iter().enumerate() {
            *tree.node_mut(i + 1) = Node::leaf(*m);
        }
        let sum: u32 = means.iter().map(|&m| m as u32).sum();
        let root = tree.node_mut(0);
        root.mean = (sum / 4) as u8;
        root.error = (sum % 4) as u8;
        root.uniform = false;

        assert_eq!(tree.interpolate(0), Some(31));

        tree.node_mut(0).mean = 0;
        assert_eq!(tree.interpolate(0), None);
    }
}
