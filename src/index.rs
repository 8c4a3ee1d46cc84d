//! Locating live nodes by position.
//!
//! Positions are assigned in one depth-first, in-order walk of a node-model tree: the root is 0 and
//! each child follows the complete subtrees of its preceding siblings. The differ, this indexer and
//! the patch applier all share this coordinate system.

use crate::{document::Document, vnode::VNode};
use hashbrown::HashMap;
use tracing::{instrument, trace};

/// Maps each of `positions` to its live node below `root`, using `tree` (the node-model tree `root`
/// was rendered from) to find its way.
///
/// Subtrees that don't contain any requested position are skipped without touching the live tree.
#[instrument(skip(document, tree))]
pub fn dom_index<D: Document>(document: &D, root: &D::Node, tree: &VNode<D>, positions: &[usize]) -> HashMap<usize, D::Node> {
	let mut nodes = HashMap::new();
	if positions.is_empty() {
		return nodes;
	}

	let mut sorted = positions.to_vec();
	sorted.sort_unstable();
	recurse(document, Some(root.clone()), tree, &sorted, &mut nodes, 0);
	nodes
}

fn recurse<D: Document>(document: &D, node: Option<D::Node>, tree: &VNode<D>, positions: &[usize], nodes: &mut HashMap<usize, D::Node>, mut position: usize) {
	let node = match node {
		Some(node) => node,
		None => return trace!(position, "Live node missing."),
	};

	if index_in_range(positions, position, position) {
		nodes.insert(position, node.clone());
	}

	if let VNode::Element(element) = tree {
		for (i, child) in element.children().iter().enumerate() {
			position += 1;
			let next = position + child.count();
			if index_in_range(positions, position, next) {
				recurse(document, document.child_node(&node, i), child, positions, nodes, position);
			}
			position = next;
		}
	}
}

/// Whether any of the sorted `positions` lies within `left..=right`.
fn index_in_range(positions: &[usize], left: usize, right: usize) -> bool {
	let first = positions.partition_point(|&position| position < left);
	positions.get(first).map_or(false, |&position| position <= right)
}
