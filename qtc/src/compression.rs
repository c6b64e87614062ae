//! The quadtree codec proper: building a tree from pixels, pruning it, and
//! moving it in and out of a bit stream.

pub mod decode;
pub mod encode;
pub mod filter;
