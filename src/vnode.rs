//! The node model: immutable, reference-counted descriptions of the desired tree.
//!
//! Cloning a [`VNode`] is cheap and keeps its identity, which the differ uses as a fast path:
//! diffing a node against (a clone of) itself produces no patches and skips the whole subtree.

use crate::{
	document::Document,
	error::{Error, Result},
};
use core::{
	cell::OnceCell,
	fmt::{self, Debug, Display, Formatter},
};
use std::{collections::BTreeMap, rc::Rc};

/// A plain property or attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
	Bool(bool),
	Number(f64),
	String(Rc<str>),
}

impl Display for Value {
	#[allow(clippy::cast_possible_truncation)]
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Value::Bool(bool) => Display::fmt(bool, f),
			Value::Number(number) if number.fract() == 0.0 && number.abs() < 1e15 => Display::fmt(&(*number as i64), f),
			Value::Number(number) => Display::fmt(number, f),
			Value::String(string) => f.write_str(string),
		}
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Self::String(value.into())
	}
}
impl From<String> for Value {
	fn from(value: String) -> Self {
		Self::String(value.into())
	}
}
impl From<Rc<str>> for Value {
	fn from(value: Rc<str>) -> Self {
		Self::String(value)
	}
}
impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}
impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Self::Number(value)
	}
}
impl From<i32> for Value {
	fn from(value: i32) -> Self {
		Self::Number(value.into())
	}
}

/// Nested property object, like an inline style or an attribute set.
pub type Object = BTreeMap<Rc<str>, Field>;

/// One entry of an [`Object`]. Objects nest to any depth.
#[derive(Clone, Debug, PartialEq)]
pub enum Field {
	Value(Value),
	Object(Rc<Object>),
}

impl Field {
	pub fn object<K: Into<Rc<str>>, V: Into<Field>>(fields: impl IntoIterator<Item = (K, V)>) -> Self {
		Self::Object(Rc::new(fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect()))
	}

	/// Primitive equality, or reference equality for objects.
	pub(crate) fn is_identical(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Value(a), Self::Value(b)) => a == b,
			(Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
			_ => false,
		}
	}
}

macro_rules! field_from {
	($($source:ty),*$(,)?) => {$(
		impl From<$source> for Field {
			fn from(value: $source) -> Self {
				Self::Value(value.into())
			}
		}
	)*};
}
field_from!(Value, &str, String, Rc<str>, bool, f64, i32);

impl From<Rc<Object>> for Field {
	fn from(object: Rc<Object>) -> Self {
		Self::Object(object)
	}
}
impl From<Object> for Field {
	fn from(object: Object) -> Self {
		Self::Object(Rc::new(object))
	}
}

/// An element's property bag.
///
/// Two names are treated specially when applied: `"attributes"` (an [`Object`] of HTML attributes)
/// and `"style"` (an [`Object`] of inline style declarations).
pub type Props<D> = BTreeMap<Rc<str>, PropValue<D>>;

pub enum PropValue<D: Document> {
	Value(Value),
	Object(Rc<Object>),
	/// Applied through custom side effects instead of assignment. Never diffed internally.
	Hook(Rc<dyn Hook<D>>),
}

impl<D: Document> PropValue<D> {
	pub fn object<K: Into<Rc<str>>, V: Into<Field>>(fields: impl IntoIterator<Item = (K, V)>) -> Self {
		Self::Object(Rc::new(fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect()))
	}

	pub fn hook(hook: impl Hook<D> + 'static) -> Self {
		Self::Hook(Rc::new(hook))
	}

	/// Reference or primitive equality. Structurally equal objects that aren't shared are not identical.
	pub(crate) fn is_identical(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Value(a), Self::Value(b)) => a == b,
			(Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
			(Self::Hook(a), Self::Hook(b)) => Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>(),
			_ => false,
		}
	}
}

impl<D: Document> Clone for PropValue<D> {
	fn clone(&self) -> Self {
		match self {
			Self::Value(value) => Self::Value(value.clone()),
			Self::Object(object) => Self::Object(object.clone()),
			Self::Hook(hook) => Self::Hook(hook.clone()),
		}
	}
}

impl<D: Document> Debug for PropValue<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
			Self::Object(object) => f.debug_tuple("Object").field(object).finish(),
			Self::Hook(hook) => f.debug_tuple("Hook").field(&Rc::as_ptr(hook).cast::<()>()).finish(),
		}
	}
}

macro_rules! prop_value_from {
	($($source:ty),*$(,)?) => {$(
		impl<D: Document> From<$source> for PropValue<D> {
			fn from(value: $source) -> Self {
				Self::Value(value.into())
			}
		}
	)*};
}
prop_value_from!(Value, &str, String, Rc<str>, bool, f64, i32);

/// A property value with custom apply and teardown side effects.
pub trait Hook<D: Document> {
	/// Runs when the property is set on `node`, including on creation (where `previous` is [`None`]).
	fn hook(&self, document: &mut D, node: &D::Node, name: &str, previous: Option<&PropValue<D>>) -> Result<()>;

	/// Whether [`Hook::unhook`] has side effects.
	///
	/// Only hooks that report `true` here are unhooked when their element is discarded.
	fn can_unhook(&self) -> bool {
		false
	}

	/// Runs when the property is removed or replaced. `next` is the replacing value, if any.
	fn unhook(&self, document: &mut D, node: &D::Node, name: &str, next: Option<&PropValue<D>>) -> Result<()> {
		let _ = (document, node, name, next);
		Ok(())
	}
}

/// A text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VText {
	text: Rc<str>,
}

impl VText {
	pub fn new(text: impl Into<Rc<str>>) -> Self {
		Self { text: text.into() }
	}

	#[must_use]
	pub fn text(&self) -> &str {
		&self.text
	}
}

/// An element node with its derived subtree summary.
pub struct VElement<D: Document> {
	tag_name: Rc<str>,
	namespace: Option<Rc<str>>,
	key: Option<Rc<str>>,
	properties: Props<D>,
	children: Vec<VNode<D>>,
	count: usize,
	has_widgets: bool,
	has_thunks: bool,
	hooks: Vec<Rc<str>>,
	descendant_hooks: bool,
}

impl<D: Document> VElement<D> {
	pub fn new(tag_name: impl Into<Rc<str>>, properties: Props<D>, children: Vec<VNode<D>>) -> Self {
		let hooks = properties
			.iter()
			.filter(|(_, value)| matches!(value, PropValue::Hook(hook) if hook.can_unhook()))
			.map(|(name, _)| name.clone())
			.collect();

		let mut descendants = 0;
		let mut has_widgets = false;
		let mut has_thunks = false;
		let mut descendant_hooks = false;
		for child in &children {
			match child {
				VNode::Element(element) => {
					descendants += element.count;
					has_widgets |= element.has_widgets;
					has_thunks |= element.has_thunks;
					descendant_hooks |= !element.hooks.is_empty() || element.descendant_hooks;
				}
				VNode::Widget(widget) => has_widgets |= widget.can_destroy(),
				VNode::Thunk(_) => has_thunks = true,
				VNode::Text(_) => (),
			}
		}

		Self {
			tag_name: tag_name.into(),
			namespace: None,
			key: None,
			properties,
			count: children.len() + descendants,
			children,
			has_widgets,
			has_thunks,
			hooks,
			descendant_hooks,
		}
	}

	#[must_use]
	pub fn with_key(mut self, key: impl Into<Rc<str>>) -> Self {
		self.key = Some(key.into());
		self
	}

	#[must_use]
	pub fn with_namespace(mut self, namespace: impl Into<Rc<str>>) -> Self {
		self.namespace = Some(namespace.into());
		self
	}

	#[must_use]
	pub fn tag_name(&self) -> &str {
		&self.tag_name
	}

	#[must_use]
	pub fn namespace(&self) -> Option<&str> {
		self.namespace.as_deref()
	}

	#[must_use]
	pub fn key(&self) -> Option<&Rc<str>> {
		self.key.as_ref()
	}

	#[must_use]
	pub fn properties(&self) -> &Props<D> {
		&self.properties
	}

	#[must_use]
	pub fn children(&self) -> &[VNode<D>] {
		&self.children
	}

	/// Total number of descendants.
	#[must_use]
	pub fn count(&self) -> usize {
		self.count
	}

	/// Whether any descendant is a widget with a destroy capability.
	#[must_use]
	pub fn has_widgets(&self) -> bool {
		self.has_widgets
	}

	#[must_use]
	pub fn has_thunks(&self) -> bool {
		self.has_thunks
	}

	/// Names of this element's hook properties that need unhooking.
	#[must_use]
	pub fn hooks(&self) -> &[Rc<str>] {
		&self.hooks
	}

	#[must_use]
	pub fn has_descendant_hooks(&self) -> bool {
		self.descendant_hooks
	}
}

impl<D: Document> Debug for VElement<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("VElement")
			.field("tag_name", &self.tag_name)
			.field("namespace", &self.namespace)
			.field("key", &self.key)
			.field("properties", &self.properties)
			.field("children", &self.children)
			.field("count", &self.count)
			.finish_non_exhaustive()
	}
}

pub type InitFn<D> = dyn Fn(&mut D) -> Result<<D as Document>::Node>;
pub type UpdateFn<D> = dyn Fn(&Widget<D>, &mut D, &<D as Document>::Node) -> Result<Option<<D as Document>::Node>>;
pub type DestroyFn<D> = dyn Fn(&mut D, &<D as Document>::Node) -> Result<()>;

/// An externally managed live node with its own lifecycle.
///
/// Two widgets are of the same kind (and so [updatable](`Widget::on_update`) in place) if both are
/// [named](`Widget::named`) and their names and ids match, or otherwise if they share the same
/// `init` function (see [`Widget::from_init`]).
pub struct Widget<D: Document> {
	name: Option<Rc<str>>,
	id: Option<Rc<str>>,
	key: Option<Rc<str>>,
	init: Rc<InitFn<D>>,
	update: Option<Rc<UpdateFn<D>>>,
	destroy: Option<Rc<DestroyFn<D>>>,
}

impl<D: Document> Widget<D> {
	pub fn new(init: impl Fn(&mut D) -> Result<D::Node> + 'static) -> Self {
		Self::from_init(Rc::new(init))
	}

	#[must_use]
	pub fn from_init(init: Rc<InitFn<D>>) -> Self {
		Self {
			name: None,
			id: None,
			key: None,
			init,
			update: None,
			destroy: None,
		}
	}

	#[must_use]
	pub fn named(mut self, name: impl Into<Rc<str>>, id: impl Into<Rc<str>>) -> Self {
		self.name = Some(name.into());
		self.id = Some(id.into());
		self
	}

	#[must_use]
	pub fn with_key(mut self, key: impl Into<Rc<str>>) -> Self {
		self.key = Some(key.into());
		self
	}

	/// `update(previous, document, node)` may return a replacement live node, or [`None`] to keep `node`.
	#[must_use]
	pub fn on_update(mut self, update: impl Fn(&Widget<D>, &mut D, &D::Node) -> Result<Option<D::Node>> + 'static) -> Self {
		self.update = Some(Rc::new(update));
		self
	}

	#[must_use]
	pub fn on_destroy(mut self, destroy: impl Fn(&mut D, &D::Node) -> Result<()> + 'static) -> Self {
		self.destroy = Some(Rc::new(destroy));
		self
	}

	#[must_use]
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	#[must_use]
	pub fn id(&self) -> Option<&str> {
		self.id.as_deref()
	}

	#[must_use]
	pub fn key(&self) -> Option<&Rc<str>> {
		self.key.as_ref()
	}

	#[must_use]
	pub fn init_fn(&self) -> &Rc<InitFn<D>> {
		&self.init
	}

	#[must_use]
	pub fn can_update(&self) -> bool {
		self.update.is_some()
	}

	#[must_use]
	pub fn can_destroy(&self) -> bool {
		self.destroy.is_some()
	}

	/// Whether `self` can take over the live node created for `previous`.
	#[must_use]
	pub fn same_kind(&self, previous: &Widget<D>) -> bool {
		match (&previous.name, &self.name) {
			(Some(previous_name), Some(name)) => previous_name == name && previous.id == self.id,
			_ => Rc::as_ptr(&previous.init).cast::<()>() == Rc::as_ptr(&self.init).cast::<()>(),
		}
	}

	pub(crate) fn init(&self, document: &mut D) -> Result<D::Node> {
		(self.init)(document)
	}

	/// [`None`] if this widget can't update.
	pub(crate) fn update(&self, previous: &Widget<D>, document: &mut D, node: &D::Node) -> Option<Result<Option<D::Node>>> {
		self.update.as_ref().map(|update| update(previous, document, node))
	}

	pub(crate) fn destroy(&self, document: &mut D, node: &D::Node) -> Result<()> {
		match &self.destroy {
			Some(destroy) => destroy(document, node),
			None => Ok(()),
		}
	}
}

impl<D: Document> Clone for Widget<D> {
	fn clone(&self) -> Self {
		Self {
			name: self.name.clone(),
			id: self.id.clone(),
			key: self.key.clone(),
			init: self.init.clone(),
			update: self.update.clone(),
			destroy: self.destroy.clone(),
		}
	}
}

impl<D: Document> Debug for Widget<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Widget")
			.field("name", &self.name)
			.field("id", &self.id)
			.field("key", &self.key)
			.field("can_update", &self.can_update())
			.field("can_destroy", &self.can_destroy())
			.finish_non_exhaustive()
	}
}

pub type RenderThunkFn<D> = dyn Fn(Option<&VNode<D>>) -> VNode<D>;

/// A lazily rendered subtree.
///
/// The render function runs at most once per thunk. Its result is cached on the thunk itself.
pub struct Thunk<D: Document> {
	render: Box<RenderThunkFn<D>>,
	rendered: OnceCell<VNode<D>>,
	key: Option<Rc<str>>,
}

impl<D: Document> Thunk<D> {
	/// `render` receives the node this thunk replaces, if any, which lets it reuse or skip work.
	pub fn new(render: impl Fn(Option<&VNode<D>>) -> VNode<D> + 'static) -> Self {
		Self {
			render: Box::new(render),
			rendered: OnceCell::new(),
			key: None,
		}
	}

	#[must_use]
	pub fn with_key(mut self, key: impl Into<Rc<str>>) -> Self {
		self.key = Some(key.into());
		self
	}

	#[must_use]
	pub fn key(&self) -> Option<&Rc<str>> {
		self.key.as_ref()
	}

	/// The cached result, if this thunk was rendered already.
	#[must_use]
	pub fn rendered(&self) -> Option<&VNode<D>> {
		self.rendered.get()
	}

	/// Renders this thunk or returns the cached result.
	///
	/// # Errors
	///
	/// [`Error::InvalidThunkResult`] if the render function returns another thunk.
	pub fn resolve(&self, previous: Option<&VNode<D>>) -> Result<&VNode<D>> {
		if let Some(rendered) = self.rendered.get() {
			return Ok(rendered);
		}

		let rendered = (self.render)(previous);
		if let VNode::Thunk(_) = rendered {
			return Err(Error::InvalidThunkResult);
		}
		Ok(self.rendered.get_or_init(|| rendered))
	}
}

impl<D: Document> Debug for Thunk<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Thunk").field("key", &self.key).field("rendered", &self.rendered.get()).finish_non_exhaustive()
	}
}

pub enum VNode<D: Document> {
	Element(Rc<VElement<D>>),
	Text(Rc<VText>),
	Widget(Rc<Widget<D>>),
	Thunk(Rc<Thunk<D>>),
}

impl<D: Document> VNode<D> {
	pub fn text(text: impl Into<Rc<str>>) -> Self {
		Self::Text(Rc::new(VText::new(text)))
	}

	/// The reconciliation key. Text nodes are never keyed.
	#[must_use]
	pub fn key(&self) -> Option<&Rc<str>> {
		match self {
			VNode::Element(element) => element.key(),
			VNode::Widget(widget) => widget.key(),
			VNode::Thunk(thunk) => thunk.key(),
			VNode::Text(_) => None,
		}
	}

	/// Number of positions the subtree below this node occupies. Only elements have any.
	#[must_use]
	pub fn count(&self) -> usize {
		match self {
			VNode::Element(element) => element.count(),
			_ => 0,
		}
	}

	#[must_use]
	pub fn as_element(&self) -> Option<&Rc<VElement<D>>> {
		match self {
			VNode::Element(element) => Some(element),
			_ => None,
		}
	}

	/// Whether both are the very same node-model object.
	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		match (self, other) {
			(VNode::Element(a), VNode::Element(b)) => Rc::ptr_eq(a, b),
			(VNode::Text(a), VNode::Text(b)) => Rc::ptr_eq(a, b),
			(VNode::Widget(a), VNode::Widget(b)) => Rc::ptr_eq(a, b),
			(VNode::Thunk(a), VNode::Thunk(b)) => Rc::ptr_eq(a, b),
			_ => false,
		}
	}

	/// Renders a thunk without a previous node. Other nodes are returned as is.
	///
	/// # Errors
	///
	/// See [`Thunk::resolve`].
	pub fn resolve(&self) -> Result<&VNode<D>> {
		match self {
			VNode::Thunk(thunk) => thunk.resolve(None),
			other => Ok(other),
		}
	}
}

impl<D: Document> Clone for VNode<D> {
	fn clone(&self) -> Self {
		match self {
			VNode::Element(element) => VNode::Element(element.clone()),
			VNode::Text(text) => VNode::Text(text.clone()),
			VNode::Widget(widget) => VNode::Widget(widget.clone()),
			VNode::Thunk(thunk) => VNode::Thunk(thunk.clone()),
		}
	}
}

impl<D: Document> Debug for VNode<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			VNode::Element(element) => Debug::fmt(element, f),
			VNode::Text(text) => Debug::fmt(text, f),
			VNode::Widget(widget) => Debug::fmt(widget, f),
			VNode::Thunk(thunk) => Debug::fmt(thunk, f),
		}
	}
}

impl<D: Document> From<VElement<D>> for VNode<D> {
	fn from(element: VElement<D>) -> Self {
		Self::Element(Rc::new(element))
	}
}
impl<D: Document> From<VText> for VNode<D> {
	fn from(text: VText) -> Self {
		Self::Text(Rc::new(text))
	}
}
impl<D: Document> From<Widget<D>> for VNode<D> {
	fn from(widget: Widget<D>) -> Self {
		Self::Widget(Rc::new(widget))
	}
}
impl<D: Document> From<Thunk<D>> for VNode<D> {
	fn from(thunk: Thunk<D>) -> Self {
		Self::Thunk(Rc::new(thunk))
	}
}

/// Resolves the thunks among an old/new pair.
///
/// A new-side thunk renders with the old node as its previous node, an old-side thunk without one.
pub(crate) fn handle_thunk<'a, D: Document>(a: &'a VNode<D>, b: Option<&'a VNode<D>>) -> Result<(&'a VNode<D>, Option<&'a VNode<D>>)> {
	let b = match b {
		Some(VNode::Thunk(thunk)) => Some(thunk.resolve(Some(a))?),
		other => other,
	};
	let a = a.resolve()?;
	Ok((a, b))
}
