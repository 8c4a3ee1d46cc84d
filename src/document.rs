use crate::{error::Result, vnode::Value};
use core::fmt::Debug;

/// The live tree that patches are applied to.
///
/// Implementations hand out cheap [`Document::Node`] handles. Two handles compare equal exactly
/// if they refer to the same live node, which is how node identity is tracked across patches.
///
/// [`ArenaDocument`](`crate::arena::ArenaDocument`) is an in-memory implementation.
/// With the `"web"` feature, [`web_sys::Document`](https://docs.rs/web-sys/0.3/web_sys/struct.Document.html) implements this trait too.
pub trait Document {
	type Node: Clone + PartialEq + Debug;

	/// Creates a detached element, in `namespace` if one is given.
	fn create_element(&mut self, tag_name: &str, namespace: Option<&str>) -> Result<Self::Node>;
	fn create_text_node(&mut self, text: &str) -> Result<Self::Node>;

	fn is_text(&self, node: &Self::Node) -> bool;
	/// Replaces the character data of a text node in place.
	fn set_text(&mut self, node: &Self::Node, text: &str) -> Result<()>;

	fn parent_node(&self, node: &Self::Node) -> Option<Self::Node>;
	fn child_node(&self, parent: &Self::Node, index: usize) -> Option<Self::Node>;
	fn child_count(&self, parent: &Self::Node) -> usize;

	/// Appends `child`, detaching it from its current parent first.
	fn append_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<()>;
	/// Inserts `child` before `reference`, or appends it if `reference` is [`None`].
	fn insert_before(&mut self, parent: &Self::Node, child: &Self::Node, reference: Option<&Self::Node>) -> Result<()>;
	fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<()>;
	fn replace_child(&mut self, parent: &Self::Node, new_child: &Self::Node, old_child: &Self::Node) -> Result<()>;

	fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &Value) -> Result<()>;
	fn remove_attribute(&mut self, node: &Self::Node, name: &str) -> Result<()>;

	/// Sets one inline style declaration. [`None`] resets it to the empty string.
	fn set_style(&mut self, node: &Self::Node, name: &str, value: Option<&Value>) -> Result<()>;

	/// Assigns a plain property. [`None`] assigns `null`.
	fn set_property(&mut self, node: &Self::Node, name: &str, value: Option<&Value>) -> Result<()>;
	fn property(&self, node: &Self::Node, name: &str) -> Option<Value>;

	/// Assigns `node[path[0]]…[path[n]][field]`, creating each object on `path` that doesn't exist yet.
	/// `path` is never empty. [`None`] assigns `undefined`.
	fn set_object_field(&mut self, node: &Self::Node, path: &[&str], field: &str, value: Option<&Value>) -> Result<()>;
}
