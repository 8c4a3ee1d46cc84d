//! Applying patch maps to a live tree.

use crate::{
	diff::{Moves, Patch, Patches},
	document::Document,
	error::Result,
	index::dom_index,
	materialize::materialize,
	properties,
	vnode::{VNode, Widget},
};
use core::fmt::{self, Debug, Formatter};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{error, instrument, trace, trace_span, warn};

pub type RenderFn<D> = fn(&VNode<D>, &mut RenderContext<'_, D>) -> Result<Option<<D as Document>::Node>>;
pub type PatchFn<D> = fn(&<D as Document>::Node, &Patches<D>, &mut RenderContext<'_, D>) -> Result<Option<<D as Document>::Node>>;

/// Everything a render or patch pass needs besides the trees themselves.
pub struct RenderContext<'a, D: Document> {
	pub document: &'a mut D,
	/// Receives nodes that can't be materialized.
	pub warn: Option<&'a dyn Fn(&str, &VNode<D>)>,
	/// Replaces [`patch_recursive`], also for thunk sub-patches.
	pub patch_fn: Option<PatchFn<D>>,
	/// Replaces [`materialize`] for nodes created while patching.
	pub render_fn: Option<RenderFn<D>>,
}

impl<'a, D: Document> RenderContext<'a, D> {
	pub fn new(document: &'a mut D) -> Self {
		Self {
			document,
			warn: None,
			patch_fn: None,
			render_fn: None,
		}
	}

	#[must_use]
	pub fn with_warn(mut self, warn: &'a dyn Fn(&str, &VNode<D>)) -> Self {
		self.warn = Some(warn);
		self
	}

	#[must_use]
	pub fn with_patch_fn(mut self, patch_fn: PatchFn<D>) -> Self {
		self.patch_fn = Some(patch_fn);
		self
	}

	#[must_use]
	pub fn with_render_fn(mut self, render_fn: RenderFn<D>) -> Self {
		self.render_fn = Some(render_fn);
		self
	}

	/// Creates a live node through the configured render function.
	///
	/// # Errors
	///
	/// Whatever the render function returns.
	pub fn render(&mut self, node: &VNode<D>) -> Result<Option<D::Node>> {
		(self.render_fn.unwrap_or(materialize))(node, self)
	}

	/// Applies `patches` through the configured patch function.
	///
	/// # Errors
	///
	/// Whatever the patch function returns.
	pub fn patch(&mut self, root: &D::Node, patches: &Patches<D>) -> Result<Option<D::Node>> {
		(self.patch_fn.unwrap_or(patch_recursive))(root, patches, self)
	}
}

impl<'a, D: Document> Debug for RenderContext<'a, D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("RenderContext")
			.field("warn", &self.warn.is_some())
			.field("patch_fn", &self.patch_fn.is_some())
			.field("render_fn", &self.render_fn.is_some())
			.finish_non_exhaustive()
	}
}

/// Applies `patches` to the live tree at `root`, which must have been rendered from
/// [`Patches::old_tree`].
///
/// Returns the new root, which differs from `root` if it was replaced, and is [`None`] if it was removed.
///
/// # Errors
///
/// Live tree failures and failing hook or widget callbacks abort at once.
/// Positions before the failing one stay patched.
#[instrument(skip_all)]
pub fn apply<D: Document>(root: &D::Node, patches: &Patches<D>, context: &mut RenderContext<'_, D>) -> Result<Option<D::Node>> {
	context.patch(root, patches)
}

/// The default patch function: Indexes all patched positions, then patches them in ascending order.
///
/// # Errors
///
/// See [`apply`].
pub fn patch_recursive<D: Document>(root: &D::Node, patches: &Patches<D>, context: &mut RenderContext<'_, D>) -> Result<Option<D::Node>> {
	let positions = patches.positions();
	if positions.is_empty() {
		return Ok(Some(root.clone()));
	}

	let index = dom_index(&*context.document, root, patches.old_tree(), &positions);
	let mut root = Some(root.clone());
	for position in positions {
		let span = trace_span!("Patching position", position);
		let _enter = span.enter();

		let dom_node = match index.get(&position) {
			Some(dom_node) => dom_node,
			None => {
				warn!(position, "No live node at this position. Skipping its patches.");
				continue;
			}
		};
		for patch in patches.get(position) {
			let new_node = patch_op(patch, dom_node, context)?;
			// Later patches at this position still target the original node.
			if root.as_ref() == Some(dom_node) {
				root = new_node;
			}
		}
	}
	Ok(root)
}

fn patch_op<D: Document>(patch: &Patch<D>, dom_node: &D::Node, context: &mut RenderContext<'_, D>) -> Result<Option<D::Node>> {
	trace!(kind = ?patch.kind(), "Applying patch.");
	match patch {
		Patch::RemoveNode { previous } => remove_node(context.document, dom_node, previous).map(|()| None),
		Patch::InsertNode { node } => insert_node(dom_node, node, context).map(Some),
		Patch::ReplaceText { next, .. } => string_patch(dom_node, &VNode::Text(next.clone()), context).map(Some),
		Patch::ReplaceWidget { previous, next } => widget_patch(dom_node, previous, next, context).map(Some),
		Patch::ReplaceNode { next, .. } => vnode_patch(dom_node, next, context).map(Some),
		Patch::ReorderChildren { moves } => {
			reorder_children(context.document, dom_node, moves)?;
			Ok(Some(dom_node.clone()))
		}
		Patch::UpdateProperties { previous, patch } => {
			properties::apply(context.document, dom_node, patch, previous.properties())?;
			Ok(Some(dom_node.clone()))
		}
		Patch::DescendIntoThunk { patches } => {
			let new_root = context.patch(dom_node, patches)?;
			replace_root(context.document, dom_node, new_root)
		}
	}
}

fn remove_node<D: Document>(document: &mut D, dom_node: &D::Node, previous: &VNode<D>) -> Result<()> {
	if let Some(parent) = document.parent_node(dom_node) {
		document.remove_child(&parent, dom_node)?;
	}
	destroy_widget(document, dom_node, previous)
}

fn insert_node<D: Document>(parent: &D::Node, node: &VNode<D>, context: &mut RenderContext<'_, D>) -> Result<D::Node> {
	if let Some(new_node) = context.render(node)? {
		context.document.append_child(parent, &new_node)?;
	}
	Ok(parent.clone())
}

fn string_patch<D: Document>(dom_node: &D::Node, text: &VNode<D>, context: &mut RenderContext<'_, D>) -> Result<D::Node> {
	if let VNode::Text(v_text) = text {
		if context.document.is_text(dom_node) {
			context.document.set_text(dom_node, v_text.text())?;
			return Ok(dom_node.clone());
		}
	}
	render_replacement(dom_node, text, context)
}

fn widget_patch<D: Document>(dom_node: &D::Node, previous: &VNode<D>, widget: &Rc<Widget<D>>, context: &mut RenderContext<'_, D>) -> Result<D::Node> {
	let updated = match previous {
		VNode::Widget(previous) if widget.same_kind(previous) => match widget.update(previous, context.document, dom_node) {
			Some(updated) => Some(updated?.unwrap_or_else(|| dom_node.clone())),
			None => None,
		},
		_ => None,
	};

	let updating = updated.is_some();
	trace!(updating, name = widget.name(), "Patching widget.");
	let new_node = match updated {
		Some(new_node) => new_node,
		None => match context.render(&VNode::Widget(widget.clone()))? {
			Some(new_node) => new_node,
			None => {
				error!("Widget rendered no live node. Keeping the previous one.");
				return Ok(dom_node.clone());
			}
		},
	};

	if new_node != *dom_node {
		if let Some(parent) = context.document.parent_node(dom_node) {
			context.document.replace_child(&parent, &new_node, dom_node)?;
		}
	}
	if !updating {
		destroy_widget(context.document, dom_node, previous)?;
	}
	Ok(new_node)
}

fn vnode_patch<D: Document>(dom_node: &D::Node, node: &VNode<D>, context: &mut RenderContext<'_, D>) -> Result<D::Node> {
	render_replacement(dom_node, node, context)
}

/// Renders `node` and swaps it in for `dom_node`.
fn render_replacement<D: Document>(dom_node: &D::Node, node: &VNode<D>, context: &mut RenderContext<'_, D>) -> Result<D::Node> {
	let new_node = match context.render(node)? {
		Some(new_node) => new_node,
		None => {
			error!("Replacement rendered no live node. Keeping the previous one.");
			return Ok(dom_node.clone());
		}
	};
	if new_node != *dom_node {
		if let Some(parent) = context.document.parent_node(dom_node) {
			context.document.replace_child(&parent, &new_node, dom_node)?;
		}
	}
	Ok(new_node)
}

fn destroy_widget<D: Document>(document: &mut D, dom_node: &D::Node, node: &VNode<D>) -> Result<()> {
	match node {
		VNode::Widget(widget) => widget.destroy(document, dom_node),
		_ => Ok(()),
	}
}

fn reorder_children<D: Document>(document: &mut D, dom_node: &D::Node, moves: &Moves) -> Result<()> {
	let mut key_map = HashMap::new();
	for remove in &moves.removes {
		let node = match document.child_node(dom_node, remove.from) {
			Some(node) => node,
			None => {
				error!(from = remove.from, "Expected a child to move beyond the end of the live child list.");
				continue;
			}
		};
		if let Some(key) = &remove.key {
			key_map.insert(key.clone(), node.clone());
		}
		document.remove_child(dom_node, &node)?;
	}

	let mut length = document.child_count(dom_node);
	for insert in &moves.inserts {
		let node = match key_map.get(&insert.key) {
			Some(node) => node,
			None => {
				error!(key = &*insert.key, "Expected a removed child to reinsert.");
				continue;
			}
		};
		// Compared against the tail length before this insert, which also covers targets past the end.
		let reference = if insert.to >= length { None } else { document.child_node(dom_node, insert.to) };
		length += 1;
		document.insert_before(dom_node, node, reference.as_ref())?;
	}
	Ok(())
}

fn replace_root<D: Document>(document: &mut D, old_root: &D::Node, new_root: Option<D::Node>) -> Result<Option<D::Node>> {
	if let Some(new_root) = &new_root {
		if new_root != old_root {
			if let Some(parent) = document.parent_node(old_root) {
				document.replace_child(&parent, new_root, old_root)?;
			}
		}
	}
	Ok(new_root)
}
