//! Lossy pruning of subtrees whose variance is small compared to the rest
//! of the picture.
//!
//! `alpha` scales the acceptance threshold of every level and `beta`
//! controls how `alpha` itself evolves going down the tree
//! (`alpha' = alpha^beta`). Larger values merge more subtrees.

use tracing::debug;

use crate::{
    picture::Error,
    quadtree::{children, QuadTree},
};

/// Both filter parameters must be finite and non-negative.
pub fn check_parameters(alpha: f64, beta: f64) -> Result<(), Error> {
    let ok = |v: f64| v.is_finite() && v >= 0.0;
    if !ok(alpha) || !ok(beta) {
        return Err(Error::InvalidConfig { alpha, beta });
    }

    Ok(())
}

/// Prune the tree in place. Does nothing when `alpha` is zero.
///
/// Pruned nodes become uniform with a zero error term. Their children are
/// left in the tree but are no longer serialized. Parameters rejected by
/// [`check_parameters`] leave the tree untouched.
pub fn filter(tree: &mut QuadTree, alpha: f64, beta: f64) -> Result<(), Error> {
    check_parameters(alpha, beta)?;
    if alpha == 0.0 {
        return Ok(());
    }

    update_variances(tree);

    let Some((max, average)) = variance_stats(tree) else {
        return Ok(());
    };
    if max == 0.0 {
        return Ok(());
    }

    let collapsed = prune(tree, 0, 0, average / max, alpha, beta, max);
    debug!(
        alpha,
        beta,
        max_variance = max,
        average_variance = average,
        root_collapsed = collapsed,
        "filtered quadtree"
    );

    Ok(())
}

/// Compute the variance of every node above the leaf level, deepest level
/// first so children are always ready before their parent.
fn update_variances(tree: &mut QuadTree) {
    if tree.depth() == 0 {
        return;
    }

    let inner_end = tree.level(tree.depth()).start;
    for index in (0..inner_end).rev() {
        let mean = tree.node(index).mean as f32;

        let mut spread = 0.0f32;
        let mut inherited = 0.0f32;
        for child in children(index) {
            let c = tree.node(child);
            let diff = mean - c.mean as f32;
            spread += diff * diff;
            inherited += c.variance * c.variance;
        }

        tree.node_mut(index).variance = ((spread + inherited) / 4.0).sqrt();
    }
}

/// Largest and average variance over the nodes above the leaf level.
fn variance_stats(tree: &QuadTree) -> Option<(f64, f64)> {
    if tree.depth() == 0 {
        return None;
    }

    let inner = &tree.nodes()[..tree.level(tree.depth()).start];
    let max = inner.iter().map(|n| n.variance as f64).fold(0.0, f64::max);
    let average = inner.iter().map(|n| n.variance as f64).sum::<f64>() / inner.len() as f64;

    Some((max, average))
}

/// Returns whether the subtree at `index` ends up uniform.
fn prune(
    tree: &mut QuadTree,
    index: usize,
    level: u8,
    sigma: f64,
    alpha: f64,
    beta: f64,
    max_variance: f64,
) -> bool {
    let node = tree.node(index);
    if node.error == 0 && node.uniform {
        return true;
    }

    // A non-uniform leaf cannot exist, but never step past the last level
    if tree.is_leaf_level(level) {
        return false;
    }

    let mut uniformize = true;
    for child in children(index) {
        uniformize &= prune(
            tree,
            child,
            level + 1,
            sigma * alpha,
            alpha.powf(beta),
            beta,
            max_variance,
        );
    }

    let relative = tree.node(index).variance as f64 / max_variance;
    if !uniformize || relative > sigma * alpha {
        return false;
    }

    let node = tree.node_mut(index);
    node.error = 0;
    node.uniform = true;
    true
}
