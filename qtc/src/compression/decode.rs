use std::io::Read;

use byteorder::ReadBytesExt;
use tracing::debug;

use crate::{
    binio::BitReader,
    picture::Error,
    quadtree::{is_fourth_child, parent, QuadTree},
};

/// Rebuild a tree of the given depth from a bit stream written by
/// [`write_tree`](super::encode::write_tree).
pub fn read_tree<I: Read + ReadBytesExt>(
    reader: &mut BitReader<I>,
    depth: u8,
) -> Result<QuadTree, Error> {
    let mut tree = QuadTree::new(depth)?;

    for level in 0..=depth {
        for index in tree.level(level) {
            read_node(&mut tree, index, level, reader)?;
        }
    }

    debug!(
        depth,
        bytes = reader.bytes_read(),
        "read quadtree"
    );

    Ok(tree)
}

fn read_node<I: Read + ReadBytesExt>(
    tree: &mut QuadTree,
    index: usize,
    level: u8,
    reader: &mut BitReader<I>,
) -> Result<(), Error> {
    if let Some(p) = parent(index) {
        let parent_node = *tree.node(p);
        if parent_node.uniform {
            let node = tree.node_mut(index);
            node.mean = parent_node.mean;
            node.error = 0;
            node.uniform = true;
            return Ok(());
        }
    }

    let fourth = is_fourth_child(index);
    let leaf = tree.is_leaf_level(level);

    let mean = if level == 0 || !fourth {
        reader.read_bits(8)? as u8
    } else {
        let p = (index - 1) / 4;
        tree.interpolate(p).ok_or_else(|| Error::BadInterpolation {
            index,
            value: interpolated_value(tree, p),
        })?
    };

    let (error, uniform) = if level == 0 || !leaf {
        let error = reader.read_bits(2)? as u8;
        let uniform = error == 0 && reader.read_bit()?;
        (error, uniform)
    } else {
        (0, true)
    };

    let node = tree.node_mut(index);
    node.mean = mean;
    node.error = error;
    node.uniform = uniform;

    Ok(())
}

/// The raw out-of-range value, for reporting.
fn interpolated_value(tree: &QuadTree, parent: usize) -> i32 {
    let p = tree.node(parent);
    let first = 4 * parent + 1;
    let known: i32 = (first..first + 3).map(|i| tree.node(i).mean as i32).sum();

    4 * p.mean as i32 + p.error as i32 - known
}
