//! Computing patch maps between two node-model trees.

use crate::{
	document::Document,
	error::Result,
	vnode::{handle_thunk, Field, Object, PropValue, Props, VElement, VNode, VText, Widget},
};
use core::fmt::{self, Debug, Formatter};
use hashbrown::{hash_map::Entry, HashMap};
use smallvec::SmallVec;
use std::{collections::BTreeMap, rc::Rc};
use tracing::{instrument, trace, trace_span, warn};

/// Sparse map from position to the patches to apply there, in order.
///
/// Also carries the old tree, which is needed to locate the live nodes the positions refer to.
pub struct Patches<D: Document> {
	old: VNode<D>,
	entries: HashMap<usize, SmallVec<[Patch<D>; 1]>>,
}

impl<D: Document> Patches<D> {
	fn new(old: VNode<D>) -> Self {
		Self { old, entries: HashMap::new() }
	}

	/// The tree the positions refer to.
	#[must_use]
	pub fn old_tree(&self) -> &VNode<D> {
		&self.old
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Number of patched positions.
	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Patched positions in ascending order.
	#[must_use]
	pub fn positions(&self) -> Vec<usize> {
		let mut positions: Vec<_> = self.entries.keys().copied().collect();
		positions.sort_unstable();
		positions
	}

	#[must_use]
	pub fn get(&self, position: usize) -> &[Patch<D>] {
		match self.entries.get(&position) {
			Some(patches) => patches,
			None => &[],
		}
	}

	/// Iterates in ascending position order.
	pub fn iter(&self) -> impl Iterator<Item = (usize, &[Patch<D>])> + '_ {
		self.positions().into_iter().map(move |position| (position, self.get(position)))
	}

	fn push(&mut self, position: usize, patch: Patch<D>) {
		self.entries.entry(position).or_default().push(patch);
	}

	/// Replaces anything recorded at `position`.
	fn set(&mut self, position: usize, patch: Patch<D>) {
		self.entries.insert(position, SmallVec::from_buf([patch]));
	}
}

impl<D: Document> Debug for Patches<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.iter()).finish()
	}
}

/// One mutation of the live tree, at the position it's recorded under.
pub enum Patch<D: Document> {
	ReplaceText { previous: VNode<D>, next: Rc<VText> },
	ReplaceNode { previous: VNode<D>, next: VNode<D> },
	/// Updates the widget in place if possible, otherwise replaces it.
	ReplaceWidget { previous: VNode<D>, next: Rc<Widget<D>> },
	UpdateProperties { previous: Rc<VElement<D>>, patch: PropPatch<D> },
	ReorderChildren { moves: Moves },
	/// Appends a new child to the patched node.
	InsertNode { node: VNode<D> },
	/// Detaches the patched node and destroys it if it's a widget.
	RemoveNode { previous: VNode<D> },
	/// Applies a thunk's own patch map to the patched node.
	DescendIntoThunk { patches: Patches<D> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchKind {
	ReplaceText,
	ReplaceNode,
	ReplaceWidget,
	UpdateProperties,
	ReorderChildren,
	InsertNode,
	RemoveNode,
	DescendIntoThunk,
}

impl<D: Document> Patch<D> {
	#[must_use]
	pub fn kind(&self) -> PatchKind {
		match self {
			Patch::ReplaceText { .. } => PatchKind::ReplaceText,
			Patch::ReplaceNode { .. } => PatchKind::ReplaceNode,
			Patch::ReplaceWidget { .. } => PatchKind::ReplaceWidget,
			Patch::UpdateProperties { .. } => PatchKind::UpdateProperties,
			Patch::ReorderChildren { .. } => PatchKind::ReorderChildren,
			Patch::InsertNode { .. } => PatchKind::InsertNode,
			Patch::RemoveNode { .. } => PatchKind::RemoveNode,
			Patch::DescendIntoThunk { .. } => PatchKind::DescendIntoThunk,
		}
	}
}

impl<D: Document> Debug for Patch<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Patch::ReplaceText { next, .. } => f.debug_struct("ReplaceText").field("next", next).finish_non_exhaustive(),
			Patch::ReplaceNode { next, .. } => f.debug_struct("ReplaceNode").field("next", next).finish_non_exhaustive(),
			Patch::ReplaceWidget { next, .. } => f.debug_struct("ReplaceWidget").field("next", next).finish_non_exhaustive(),
			Patch::UpdateProperties { patch, .. } => f.debug_struct("UpdateProperties").field("patch", patch).finish_non_exhaustive(),
			Patch::ReorderChildren { moves } => f.debug_struct("ReorderChildren").field("moves", moves).finish(),
			Patch::InsertNode { node } => f.debug_struct("InsertNode").field("node", node).finish(),
			Patch::RemoveNode { previous } => f.debug_struct("RemoveNode").field("previous", previous).finish(),
			Patch::DescendIntoThunk { patches } => f.debug_struct("DescendIntoThunk").field("patches", patches).finish(),
		}
	}
}

/// Property changes by name.
pub type PropPatch<D> = BTreeMap<Rc<str>, PropChange<D>>;

/// Object field changes by name.
pub type ObjectPatch = BTreeMap<Rc<str>, FieldChange>;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
	Remove,
	/// Replaces the field wholesale.
	Set(Field),
	/// Changes only some fields of a nested object.
	Object(ObjectPatch),
}

pub enum PropChange<D: Document> {
	Remove,
	/// Replaces the value wholesale.
	Set(PropValue<D>),
	/// Changes only some fields of an object value.
	Object(ObjectPatch),
}

impl<D: Document> Clone for PropChange<D> {
	fn clone(&self) -> Self {
		match self {
			PropChange::Remove => PropChange::Remove,
			PropChange::Set(value) => PropChange::Set(value.clone()),
			PropChange::Object(patch) => PropChange::Object(patch.clone()),
		}
	}
}

impl<D: Document> Debug for PropChange<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			PropChange::Remove => f.write_str("Remove"),
			PropChange::Set(value) => f.debug_tuple("Set").field(value).finish(),
			PropChange::Object(patch) => f.debug_tuple("Object").field(patch).finish(),
		}
	}
}

/// Child moves of one parent. Removes run first, then inserts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Moves {
	pub removes: Vec<Remove>,
	pub inserts: Vec<Insert>,
}

/// Detach the child currently at `from`. Keyed children are kept for reinsertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remove {
	pub from: usize,
	pub key: Option<Rc<str>>,
}

/// Reattach the child removed under `key` at index `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insert {
	pub key: Rc<str>,
	pub to: usize,
}

/// Computes the patches that turn `old` into `new`.
///
/// Neither tree is modified, but unrendered thunks are rendered (and cache their result).
///
/// # Errors
///
/// [`Error::InvalidThunkResult`](`crate::Error::InvalidThunkResult`) if a thunk renders a thunk.
#[instrument(skip_all)]
pub fn diff<D: Document>(old: &VNode<D>, new: &VNode<D>) -> Result<Patches<D>> {
	diff_optional(old, Some(new))
}

fn diff_optional<D: Document>(old: &VNode<D>, new: Option<&VNode<D>>) -> Result<Patches<D>> {
	let mut patches = Patches::new(old.clone());
	walk(old, new, &mut patches, 0)?;
	Ok(patches)
}

fn walk<D: Document>(a: &VNode<D>, b: Option<&VNode<D>>, patches: &mut Patches<D>, index: usize) -> Result<()> {
	if b.map_or(false, |b| a.ptr_eq(b)) {
		return Ok(());
	}

	let mut clear = false;
	match (a, b) {
		(VNode::Thunk(_), _) | (_, Some(VNode::Thunk(_))) => thunks(a, b, patches, index)?,

		(_, None) => {
			// A widget's remove record destroys it already.
			if !matches!(a, VNode::Widget(_)) {
				clear_state(a, patches, index)?;
			}
			trace!(index, "Removing node.");
			patches.push(index, Patch::RemoveNode { previous: a.clone() });
		}

		(VNode::Element(a_element), Some(VNode::Element(b_element)))
			if a_element.tag_name() == b_element.tag_name() && a_element.namespace() == b_element.namespace() && a_element.key() == b_element.key() =>
		{
			let span = trace_span!("Diffing element", index, tag = a_element.tag_name(), key = ?a_element.key());
			let _enter = span.enter();

			if let Some(patch) = diff_props(a_element.properties(), b_element.properties()) {
				patches.push(index, Patch::UpdateProperties { previous: a_element.clone(), patch });
			}
			diff_children(a_element, b_element, patches, index)?;
		}

		(_, Some(b @ VNode::Element(_))) => {
			trace!(index, "Replacing node.");
			patches.push(index, Patch::ReplaceNode { previous: a.clone(), next: b.clone() });
			clear = true;
		}

		(VNode::Text(a_text), Some(VNode::Text(b_text))) => {
			if a_text.text() != b_text.text() {
				if cfg!(feature = "dangerous-logging") {
					trace!(index, from = a_text.text(), to = b_text.text(), "Text changed.");
				} else {
					trace!(index, "Text changed.");
				}
				patches.push(index, Patch::ReplaceText { previous: a.clone(), next: b_text.clone() });
			}
		}

		(_, Some(VNode::Text(b_text))) => {
			patches.push(index, Patch::ReplaceText { previous: a.clone(), next: b_text.clone() });
			clear = true;
		}

		(_, Some(VNode::Widget(b_widget))) => {
			clear = !matches!(a, VNode::Widget(_));
			patches.push(index, Patch::ReplaceWidget { previous: a.clone(), next: b_widget.clone() });
		}
	}

	if clear {
		clear_state(a, patches, index)?;
	}
	Ok(())
}

fn diff_children<D: Document>(a: &Rc<VElement<D>>, b: &VElement<D>, patches: &mut Patches<D>, parent: usize) -> Result<()> {
	let a_children = a.children();
	let reordered = reorder(a_children, b.children());

	let mut index = parent;
	for i in 0..a_children.len().max(reordered.children.len()) {
		let left = a_children.get(i);
		let right = reordered.children.get(i).copied().flatten();
		index += 1;

		match left {
			None => {
				if let Some(right) = right {
					patches.push(parent, Patch::InsertNode { node: right.clone() });
				}
			}
			Some(left) => {
				walk(left, right, patches, index)?;
				index += left.count();
			}
		}
	}

	// Reordering is always the last patch of its parent.
	if let Some(moves) = reordered.moves {
		trace!(parent, removes = moves.removes.len(), inserts = moves.inserts.len(), "Reordering children.");
		patches.push(parent, Patch::ReorderChildren { moves });
	}
	Ok(())
}

/// Records teardown for a discarded subtree: hooks are unhooked and destroyable widgets removed.
fn clear_state<D: Document>(node: &VNode<D>, patches: &mut Patches<D>, index: usize) -> Result<()> {
	match node {
		VNode::Element(element) => {
			if !element.hooks().is_empty() {
				let patch = element.hooks().iter().map(|name| (name.clone(), PropChange::Remove)).collect();
				patches.push(index, Patch::UpdateProperties { previous: element.clone(), patch });
			}

			if element.has_descendant_hooks() || element.has_widgets() || element.has_thunks() {
				let mut index = index;
				for child in element.children() {
					index += 1;
					clear_state(child, patches, index)?;
					index += child.count();
				}
			}
		}
		VNode::Widget(widget) => {
			if widget.can_destroy() {
				patches.push(index, Patch::RemoveNode { previous: node.clone() });
			}
		}
		VNode::Thunk(_) => thunks(node, None, patches, index)?,
		VNode::Text(_) => (),
	}
	Ok(())
}

fn thunks<D: Document>(a: &VNode<D>, b: Option<&VNode<D>>, patches: &mut Patches<D>, index: usize) -> Result<()> {
	let (a, b) = handle_thunk(a, b)?;
	let thunk_patches = diff_optional(a, b)?;
	if !thunk_patches.is_empty() {
		trace!(index, positions = thunk_patches.len(), "Descending into thunk.");
		patches.set(index, Patch::DescendIntoThunk { patches: thunk_patches });
	}
	Ok(())
}

/// Structural property diff. [`None`] if nothing changed.
///
/// Objects are diffed field by field, hooks and everything else are replaced wholesale.
#[must_use]
pub fn diff_props<D: Document>(a: &Props<D>, b: &Props<D>) -> Option<PropPatch<D>> {
	let mut diff = PropPatch::new();

	for (name, a_value) in a {
		let b_value = match b.get(name) {
			Some(b_value) => b_value,
			None => {
				diff.insert(name.clone(), PropChange::Remove);
				continue;
			}
		};

		match (a_value, b_value) {
			(a_value, b_value) if a_value.is_identical(b_value) => (),
			(PropValue::Object(a_object), PropValue::Object(b_object)) => {
				if let Some(object_diff) = diff_objects(a_object, b_object) {
					diff.insert(name.clone(), PropChange::Object(object_diff));
				}
			}
			(_, b_value) => {
				diff.insert(name.clone(), PropChange::Set(b_value.clone()));
			}
		}
	}

	for (name, b_value) in b {
		if !a.contains_key(name) {
			diff.insert(name.clone(), PropChange::Set(b_value.clone()));
		}
	}

	if diff.is_empty() {
		None
	} else {
		Some(diff)
	}
}

/// Recurses into fields that hold objects on both sides. [`None`] if no level changed.
fn diff_objects(a: &Object, b: &Object) -> Option<ObjectPatch> {
	let mut diff = ObjectPatch::new();
	for (field, a_value) in a {
		let b_value = match b.get(field) {
			Some(b_value) => b_value,
			None => {
				diff.insert(field.clone(), FieldChange::Remove);
				continue;
			}
		};

		match (a_value, b_value) {
			(a_value, b_value) if a_value.is_identical(b_value) => (),
			(Field::Object(a_object), Field::Object(b_object)) => {
				if let Some(object_diff) = diff_objects(a_object, b_object) {
					diff.insert(field.clone(), FieldChange::Object(object_diff));
				}
			}
			(_, b_value) => {
				diff.insert(field.clone(), FieldChange::Set(b_value.clone()));
			}
		}
	}
	for (field, b_value) in b {
		if !a.contains_key(field) {
			diff.insert(field.clone(), FieldChange::Set(b_value.clone()));
		}
	}

	if diff.is_empty() {
		None
	} else {
		Some(diff)
	}
}

struct KeyIndex<'a> {
	keys: HashMap<&'a str, usize>,
	free: Vec<usize>,
}

impl<'a> KeyIndex<'a> {
	/// [`None`] if `children` contains duplicate keys.
	fn new<D: Document>(children: &'a [VNode<D>]) -> Option<Self> {
		let mut keys = HashMap::new();
		let mut free = Vec::new();
		for (i, child) in children.iter().enumerate() {
			match child.key() {
				Some(key) => match keys.entry(&**key) {
					Entry::Occupied(_) => {
						warn!(key = &**key, "Duplicate sibling key. Matching these children by position instead.");
						return None;
					}
					Entry::Vacant(vacant) => {
						vacant.insert(i);
					}
				},
				None => free.push(i),
			}
		}
		Some(Self { keys, free })
	}

	fn is_unkeyed(&self) -> bool {
		self.keys.is_empty()
	}
}

struct Reordered<'a, D: Document> {
	/// One slot per old child (`None` where it's deleted), followed by new children without a match.
	children: Vec<Option<&'a VNode<D>>>,
	moves: Option<Moves>,
}

/// Matches new children to old ones by key, and unkeyed ones in order.
///
/// O(M + N) for the matching, the move simulation is quadratic in the worst case.
fn reorder<'a, D: Document>(a: &'a [VNode<D>], b: &'a [VNode<D>]) -> Reordered<'a, D> {
	let positional = || Reordered {
		children: b.iter().map(Some).collect(),
		moves: None,
	};

	let b_index = match KeyIndex::new(b) {
		Some(b_index) if !b_index.is_unkeyed() => b_index,
		_ => return positional(),
	};
	let a_index = match KeyIndex::new(a) {
		Some(a_index) if !a_index.is_unkeyed() => a_index,
		_ => return positional(),
	};

	let mut children = Vec::with_capacity(a.len().max(b.len()));
	let mut free_index = 0;
	let mut deleted = 0;

	for a_item in a {
		let matched = match a_item.key() {
			Some(key) => b_index.keys.get(&**key).map(|&i| &b[i]),
			None => b_index.free.get(free_index).map(|&i| {
				free_index += 1;
				&b[i]
			}),
		};
		if matched.is_none() {
			deleted += 1;
		}
		children.push(matched);
	}

	// New keys, and unkeyed children the old list had no counterpart for.
	let last_free_index = b_index.free.get(free_index).copied().unwrap_or(b.len());
	for (j, b_item) in b.iter().enumerate() {
		let unmatched = match b_item.key() {
			Some(key) => !a_index.keys.contains_key(&**key),
			None => j >= last_free_index,
		};
		if unmatched {
			children.push(Some(b_item));
		}
	}

	let moves = simulate(&children, b, &b_index);
	if moves.removes.len() == deleted && moves.inserts.is_empty() {
		// Deletions are covered by the children's remove records.
		return Reordered { children, moves: None };
	}
	Reordered { children, moves: Some(moves) }
}

/// Finds the moves that bring `children` into the order of `b`.
fn simulate<D: Document>(children: &[Option<&VNode<D>>], b: &[VNode<D>], b_index: &KeyIndex<'_>) -> Moves {
	fn remove<D: Document>(simulate: &mut Vec<Option<&VNode<D>>>, from: usize, key: Option<&Rc<str>>) -> Remove {
		simulate.remove(from);
		Remove { from, key: key.cloned() }
	}

	let mut simulate = children.to_vec();
	let mut simulate_index = 0;
	let mut moves = Moves::default();

	let mut k = 0;
	while k < b.len() {
		let wanted = &b[k];

		while let Some(None) = simulate.get(simulate_index) {
			moves.removes.push(remove(&mut simulate, simulate_index, None));
		}
		let simulate_item = simulate.get(simulate_index).copied().flatten();

		if simulate_item.map_or(false, |item| item.key() == wanted.key()) {
			simulate_index += 1;
			k += 1;
			continue;
		}

		match (wanted.key(), simulate_item.and_then(VNode::key)) {
			(Some(wanted_key), Some(simulate_key)) => {
				if b_index.keys.get(&**simulate_key) == Some(&(k + 1)) {
					// Inserting the wanted item puts this one in place.
					moves.inserts.push(Insert { key: wanted_key.clone(), to: k });
				} else {
					moves.removes.push(remove(&mut simulate, simulate_index, Some(simulate_key)));
					match simulate.get(simulate_index).copied().flatten() {
						Some(item) if item.key() == Some(wanted_key) => simulate_index += 1,
						_ => moves.inserts.push(Insert { key: wanted_key.clone(), to: k }),
					}
				}
				k += 1;
			}
			(Some(wanted_key), None) => {
				moves.inserts.push(Insert { key: wanted_key.clone(), to: k });
				k += 1;
			}
			(None, Some(simulate_key)) => moves.removes.push(remove(&mut simulate, simulate_index, Some(simulate_key))),
			// Only reachable if the matching pass dropped an unkeyed child.
			(None, None) => break,
		}
	}

	while simulate_index < simulate.len() {
		let key = simulate[simulate_index].and_then(VNode::key);
		moves.removes.push(remove(&mut simulate, simulate_index, key));
	}

	moves
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{arena::ArenaDocument, vnode::VElement};

	fn keyed(keys: &str) -> Vec<VNode<ArenaDocument>> {
		keys.chars()
			.map(|key| match key {
				'_' => VElement::new("LI", Props::new(), vec![]).into(),
				key => VElement::new("LI", Props::new(), vec![]).with_key(key.to_string()).into(),
			})
			.collect()
	}

	fn keys(children: &[Option<&VNode<ArenaDocument>>]) -> String {
		children
			.iter()
			.map(|child| match child {
				None => '-',
				Some(child) => child.key().and_then(|key| key.chars().next()).unwrap_or('_'),
			})
			.collect()
	}

	#[test]
	fn unkeyed_lists_are_positional() {
		let (a, b) = (keyed("___"), keyed("__"));
		let reordered = reorder(&a, &b);
		assert_eq!(keys(&reordered.children), "__");
		assert!(reordered.moves.is_none());
	}

	#[test]
	fn reverse() {
		let (a, b) = (keyed("abc"), keyed("cba"));
		let reordered = reorder(&a, &b);
		assert_eq!(keys(&reordered.children), "abc");
		assert_eq!(
			reordered.moves,
			Some(Moves {
				removes: vec![Remove { from: 0, key: Some("a".into()) }, Remove { from: 1, key: Some("c".into()) }],
				inserts: vec![Insert { key: "c".into(), to: 0 }, Insert { key: "a".into(), to: 2 }],
			})
		);
	}

	#[test]
	fn plain_deletion_needs_no_moves() {
		let (a, b) = (keyed("abc"), keyed("ac"));
		let reordered = reorder(&a, &b);
		assert_eq!(keys(&reordered.children), "a-c");
		assert!(reordered.moves.is_none());
	}

	#[test]
	fn new_keys_are_appended_then_moved() {
		let (a, b) = (keyed("ab"), keyed("xab"));
		let reordered = reorder(&a, &b);
		assert_eq!(keys(&reordered.children), "abx");
		let moves = reordered.moves.unwrap();
		assert_eq!(moves.inserts, vec![Insert { key: "x".into(), to: 0 }]);
		assert_eq!(moves.removes, vec![Remove { from: 2, key: Some("x".into()) }]);
	}

	#[test]
	fn mixed_keyed_and_free() {
		let (a, b) = (keyed("a_b"), keyed("b_a_"));
		let reordered = reorder(&a, &b);
		assert_eq!(keys(&reordered.children), "a_b_");
		assert!(reordered.moves.is_some());
	}

	#[test]
	fn duplicate_keys_fall_back_to_positions() {
		let (a, b) = (keyed("aa"), keyed("ba"));
		let reordered = reorder(&a, &b);
		assert_eq!(keys(&reordered.children), "ba");
		assert!(reordered.moves.is_none());
	}
}
