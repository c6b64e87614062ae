use tracing::debug;

use crate::{
    binio::{BitCounter, BitSink},
    picture::{Error, QtcPicture},
    quadtree::{children, depth_for, is_fourth_child, parent, QuadTree, MAX_DEPTH},
};

/// Build the full tree for a picture.
///
/// The picture is covered by a `2^n × 2^n` square; samples outside the
/// picture repeat the nearest edge sample.
pub fn build_tree(picture: &QtcPicture) -> Result<QuadTree, Error> {
    let depth = depth_for(picture.width(), picture.height());
    if depth > MAX_DEPTH as u32 {
        return Err(Error::DepthTooLarge {
            depth,
            max: MAX_DEPTH,
        });
    }

    let mut tree = QuadTree::new(depth as u8)?;
    let side = tree.side();
    build_node(&mut tree, picture, 0, 0, 0, 0, side);

    debug!(
        depth,
        nodes = tree.len(),
        uniform = tree.root().uniform,
        "built quadtree"
    );

    Ok(tree)
}

fn build_node(
    tree: &mut QuadTree,
    picture: &QtcPicture,
    index: usize,
    level: u8,
    x: usize,
    y: usize,
    size: usize,
) {
    if tree.is_leaf_level(level) {
        tree.node_mut(index).mean = picture.sample_clamped(x, y);
        tree.node_mut(index).error = 0;
        tree.node_mut(index).uniform = true;
        return;
    }

    let half = size / 2;
    let first = 4 * index + 1;
    build_node(tree, picture, first, level + 1, x, y, half);
    build_node(tree, picture, first + 1, level + 1, x + half, y, half);
    build_node(tree, picture, first + 2, level + 1, x + half, y + half, half);
    build_node(tree, picture, first + 3, level + 1, x, y + half, half);

    aggregate(tree, index);
}

/// Derive a node's statistics from its four children.
fn aggregate(tree: &mut QuadTree, index: usize) {
    let kids = &tree.nodes()[children(index)];

    let sum: u32 = kids.iter().map(|c| c.mean as u32).sum();
    let first = kids[0].mean;
    let flat = kids.iter().all(|c| c.uniform && c.mean == first);

    let node = tree.node_mut(index);
    node.mean = (sum / 4) as u8;
    if flat {
        node.uniform = true;
        node.error = 0;
    } else {
        node.uniform = false;
        node.error = (sum % 4) as u8;
    }
}

/// Serialize every transmitted node of the tree in level order.
pub fn write_tree<S: BitSink>(tree: &QuadTree, sink: &mut S) -> Result<(), S::Error> {
    for level in 0..=tree.depth() {
        for index in tree.level(level) {
            write_node(tree, index, level, sink)?;
        }
    }

    Ok(())
}

fn write_node<S: BitSink>(
    tree: &QuadTree,
    index: usize,
    level: u8,
    sink: &mut S,
) -> Result<(), S::Error> {
    let node = tree.node(index);

    if let Some(p) = parent(index) {
        if tree.node(p).uniform {
            return Ok(());
        }
    }

    let fourth = is_fourth_child(index);
    let leaf = tree.is_leaf_level(level);

    if level == 0 || !fourth {
        sink.write_bits(node.mean as u32, 8)?;
    }

    // Leaves never carry an error term; the root always does, even when
    // it is also a leaf.
    if level == 0 || !leaf {
        sink.write_bits(node.error as u32, 2)?;
        if node.error == 0 {
            sink.write_bits(node.uniform as u32, 1)?;
        }
    }

    Ok(())
}

/// Number of bits [`write_tree`] would produce, without producing them.
pub fn count_bits(tree: &QuadTree) -> u64 {
    let mut counter = BitCounter::new();
    match write_tree(tree, &mut counter) {
        Ok(()) => counter.bits_written(),
        Err(never) => match never {},
    }
}
