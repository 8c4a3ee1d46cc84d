//! An in-memory live tree.
//!
//! Nodes live in a flat arena and are addressed by [`NodeId`] handles, which stay valid (and
//! keep their identity) for the lifetime of the [`ArenaDocument`], even after being detached.

use crate::{
	document::Document,
	error::{Error, Result},
	vnode::Value,
};
use core::cell::Cell;
use hashbrown::HashMap;

/// Handle to a node in an [`ArenaDocument`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
	#[must_use]
	pub fn index(self) -> usize {
		self.0
	}
}

#[derive(Debug)]
struct Slot {
	parent: Option<NodeId>,
	children: Vec<NodeId>,
	data: NodeData,
}

#[derive(Debug)]
enum NodeData {
	Element(ElementData),
	Text(String),
}

#[derive(Debug, Default)]
struct ElementData {
	tag_name: String,
	namespace: Option<String>,
	attributes: HashMap<String, String>,
	properties: HashMap<String, Value>,
	style: HashMap<String, String>,
	/// Plain fields of property objects, by object path.
	objects: HashMap<Vec<String>, HashMap<String, Value>>,
}

#[derive(Debug, Default)]
pub struct ArenaDocument {
	nodes: Vec<Slot>,
	child_reads: Cell<usize>,
}

impl ArenaDocument {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of nodes ever created, attached or not.
	#[must_use]
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// How often [`Document::child_node`] was called since creation or the last [`reset_child_reads`](`ArenaDocument::reset_child_reads`).
	#[must_use]
	pub fn child_reads(&self) -> usize {
		self.child_reads.get()
	}

	pub fn reset_child_reads(&self) {
		self.child_reads.set(0);
	}

	#[must_use]
	pub fn parent(&self, node: NodeId) -> Option<NodeId> {
		self.nodes.get(node.0).and_then(|slot| slot.parent)
	}

	#[must_use]
	pub fn children(&self, node: NodeId) -> &[NodeId] {
		match self.nodes.get(node.0) {
			Some(slot) => &slot.children,
			None => &[],
		}
	}

	#[must_use]
	pub fn tag_name(&self, node: NodeId) -> Option<&str> {
		self.element(node).map(|element| element.tag_name.as_str())
	}

	#[must_use]
	pub fn namespace(&self, node: NodeId) -> Option<&str> {
		self.element(node).and_then(|element| element.namespace.as_deref())
	}

	#[must_use]
	pub fn text(&self, node: NodeId) -> Option<&str> {
		match self.nodes.get(node.0).map(|slot| &slot.data) {
			Some(NodeData::Text(text)) => Some(text),
			_ => None,
		}
	}

	#[must_use]
	pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
		self.element(node).and_then(|element| element.attributes.get(name)).map(String::as_str)
	}

	#[must_use]
	pub fn style(&self, node: NodeId, name: &str) -> Option<&str> {
		self.element(node).and_then(|element| element.style.get(name)).map(String::as_str)
	}

	#[must_use]
	pub fn object_field(&self, node: NodeId, path: &[&str], field: &str) -> Option<&Value> {
		let path: Vec<String> = path.iter().map(|&segment| segment.to_owned()).collect();
		self.element(node).and_then(|element| element.objects.get(&path)).and_then(|object| object.get(field))
	}

	/// Serializes the subtree at `node` as markup. Attributes are sorted by name, properties and styles are left out.
	#[must_use]
	pub fn to_html(&self, node: NodeId) -> String {
		let mut html = String::new();
		self.write_html(node, &mut html);
		html
	}

	fn write_html(&self, node: NodeId, html: &mut String) {
		let slot = match self.nodes.get(node.0) {
			Some(slot) => slot,
			None => return,
		};
		match &slot.data {
			NodeData::Text(text) => html.push_str(&escape(text)),
			NodeData::Element(element) => {
				let mut attributes: Vec<_> = element.attributes.iter().collect();
				attributes.sort();
				html.push('<');
				html.push_str(&element.tag_name);
				for (name, value) in attributes {
					html.push_str(&format!(" {}=\"{}\"", name, escape(value).replace('"', "&quot;")));
				}
				html.push('>');
				for &child in &slot.children {
					self.write_html(child, html);
				}
				html.push_str(&format!("</{}>", element.tag_name));
			}
		}
	}

	fn element(&self, node: NodeId) -> Option<&ElementData> {
		match self.nodes.get(node.0).map(|slot| &slot.data) {
			Some(NodeData::Element(element)) => Some(element),
			_ => None,
		}
	}

	fn element_mut(&mut self, node: NodeId, operation: &'static str) -> Result<&mut ElementData> {
		match self.nodes.get_mut(node.0).map(|slot| &mut slot.data) {
			Some(NodeData::Element(element)) => Ok(element),
			Some(NodeData::Text(_)) => Err(Error::host(operation, format!("{:?} is a text node", node))),
			None => Err(unknown(operation, node)),
		}
	}

	fn slot(&self, node: NodeId, operation: &'static str) -> Result<&Slot> {
		self.nodes.get(node.0).ok_or_else(|| unknown(operation, node))
	}

	fn slot_mut(&mut self, node: NodeId, operation: &'static str) -> Result<&mut Slot> {
		self.nodes.get_mut(node.0).ok_or_else(|| unknown(operation, node))
	}

	fn push(&mut self, data: NodeData) -> NodeId {
		let id = NodeId(self.nodes.len());
		self.nodes.push(Slot {
			parent: None,
			children: Vec::new(),
			data,
		});
		id
	}

	fn detach(&mut self, node: NodeId) {
		if let Some(parent) = self.nodes.get_mut(node.0).and_then(|slot| slot.parent.take()) {
			self.nodes[parent.0].children.retain(|&child| child != node);
		}
	}

	/// Checks that `child` may become a child of `parent`.
	fn check_insertable(&self, parent: NodeId, child: NodeId, operation: &'static str) -> Result<()> {
		if let NodeData::Text(_) = self.slot(parent, operation)?.data {
			return Err(Error::host(operation, format!("text node {:?} can't have children", parent)));
		}
		self.slot(child, operation)?;

		let mut ancestor = Some(parent);
		while let Some(current) = ancestor {
			if current == child {
				return Err(Error::host(operation, format!("{:?} is an ancestor of {:?}", child, parent)));
			}
			ancestor = self.nodes[current.0].parent;
		}
		Ok(())
	}

	fn position(&self, parent: NodeId, child: NodeId, operation: &'static str) -> Result<usize> {
		self.slot(parent, operation)?
			.children
			.iter()
			.position(|&c| c == child)
			.ok_or_else(|| Error::host(operation, format!("{:?} is not a child of {:?}", child, parent)))
	}
}

fn unknown(operation: &'static str, node: NodeId) -> Error {
	Error::host(operation, format!("unknown node {:?}", node))
}

fn escape(text: &str) -> String {
	text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

impl Document for ArenaDocument {
	type Node = NodeId;

	fn create_element(&mut self, tag_name: &str, namespace: Option<&str>) -> Result<NodeId> {
		Ok(self.push(NodeData::Element(ElementData {
			tag_name: tag_name.to_owned(),
			namespace: namespace.map(ToOwned::to_owned),
			..ElementData::default()
		})))
	}

	fn create_text_node(&mut self, text: &str) -> Result<NodeId> {
		Ok(self.push(NodeData::Text(text.to_owned())))
	}

	fn is_text(&self, node: &NodeId) -> bool {
		self.text(*node).is_some()
	}

	fn set_text(&mut self, node: &NodeId, text: &str) -> Result<()> {
		match &mut self.slot_mut(*node, "set_text")?.data {
			NodeData::Text(data) => {
				data.clear();
				data.push_str(text);
				Ok(())
			}
			NodeData::Element(_) => Err(Error::host("set_text", format!("{:?} is not a text node", node))),
		}
	}

	fn parent_node(&self, node: &NodeId) -> Option<NodeId> {
		self.parent(*node)
	}

	fn child_node(&self, parent: &NodeId, index: usize) -> Option<NodeId> {
		self.child_reads.set(self.child_reads.get() + 1);
		self.children(*parent).get(index).copied()
	}

	fn child_count(&self, parent: &NodeId) -> usize {
		self.children(*parent).len()
	}

	fn append_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<()> {
		self.insert_before(parent, child, None)
	}

	fn insert_before(&mut self, parent: &NodeId, child: &NodeId, reference: Option<&NodeId>) -> Result<()> {
		const OPERATION: &str = "insert_before";
		let (parent, child) = (*parent, *child);
		if reference == Some(&child) {
			return Ok(());
		}
		self.check_insertable(parent, child, OPERATION)?;
		if let Some(&reference) = reference {
			self.position(parent, reference, OPERATION)?;
		}

		self.detach(child);
		let index = match reference {
			Some(&reference) => self.position(parent, reference, OPERATION)?,
			None => self.nodes[parent.0].children.len(),
		};
		self.nodes[parent.0].children.insert(index, child);
		self.nodes[child.0].parent = Some(parent);
		Ok(())
	}

	fn remove_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<()> {
		let index = self.position(*parent, *child, "remove_child")?;
		self.nodes[parent.0].children.remove(index);
		self.nodes[child.0].parent = None;
		Ok(())
	}

	fn replace_child(&mut self, parent: &NodeId, new_child: &NodeId, old_child: &NodeId) -> Result<()> {
		const OPERATION: &str = "replace_child";
		let (parent, new_child, old_child) = (*parent, *new_child, *old_child);
		if new_child == old_child {
			return self.position(parent, old_child, OPERATION).map(drop);
		}
		self.check_insertable(parent, new_child, OPERATION)?;
		self.position(parent, old_child, OPERATION)?;

		self.detach(new_child);
		let index = self.position(parent, old_child, OPERATION)?;
		self.nodes[parent.0].children[index] = new_child;
		self.nodes[new_child.0].parent = Some(parent);
		self.nodes[old_child.0].parent = None;
		Ok(())
	}

	fn set_attribute(&mut self, node: &NodeId, name: &str, value: &Value) -> Result<()> {
		self.element_mut(*node, "set_attribute")?.attributes.insert(name.to_owned(), value.to_string());
		Ok(())
	}

	fn remove_attribute(&mut self, node: &NodeId, name: &str) -> Result<()> {
		self.element_mut(*node, "remove_attribute")?.attributes.remove(name);
		Ok(())
	}

	fn set_style(&mut self, node: &NodeId, name: &str, value: Option<&Value>) -> Result<()> {
		let style = &mut self.element_mut(*node, "set_style")?.style;
		match value.map(ToString::to_string) {
			Some(value) if !value.is_empty() => {
				style.insert(name.to_owned(), value);
			}
			_ => {
				style.remove(name);
			}
		}
		Ok(())
	}

	fn set_property(&mut self, node: &NodeId, name: &str, value: Option<&Value>) -> Result<()> {
		let properties = &mut self.element_mut(*node, "set_property")?.properties;
		match value {
			Some(value) => properties.insert(name.to_owned(), value.clone()),
			None => properties.remove(name),
		};
		Ok(())
	}

	fn property(&self, node: &NodeId, name: &str) -> Option<Value> {
		self.element(*node).and_then(|element| element.properties.get(name)).cloned()
	}

	fn set_object_field(&mut self, node: &NodeId, path: &[&str], field: &str, value: Option<&Value>) -> Result<()> {
		let objects = &mut self.element_mut(*node, "set_object_field")?.objects;
		let mut target: Vec<String> = path.iter().map(|&segment| segment.to_owned()).collect();

		// Objects along the path replace plain values of the same name.
		for depth in 1..target.len() {
			if let Some(parent) = objects.get_mut(&target[..depth]) {
				parent.remove(&target[depth]);
			}
		}

		// Whatever `field` held before goes away, including nested objects.
		target.push(field.to_owned());
		objects.retain(|path, _| !path.starts_with(&target));
		target.pop();

		let object = objects.entry(target).or_default();
		match value {
			Some(value) => object.insert(field.to_owned(), value.clone()),
			None => object.remove(field),
		};
		Ok(())
	}
}
