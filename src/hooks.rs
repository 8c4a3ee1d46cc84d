//! Ready-made [`Hook`]s.

use crate::{
	document::Document,
	error::Result,
	vnode::{Hook, PropValue, Value},
};
use core::fmt::{self, Debug, Formatter};

/// Assigns a property only if the live node doesn't hold that value already.
///
/// Useful for properties like an input's `value`, where a redundant assignment moves the caret.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftSetHook {
	value: Value,
}

impl SoftSetHook {
	pub fn new(value: impl Into<Value>) -> Self {
		Self { value: value.into() }
	}
}

impl<D: Document> Hook<D> for SoftSetHook {
	fn hook(&self, document: &mut D, node: &D::Node, name: &str, _previous: Option<&PropValue<D>>) -> Result<()> {
		if document.property(node, name).as_ref() != Some(&self.value) {
			document.set_property(node, name, Some(&self.value))?;
		}
		Ok(())
	}
}

pub type HookFn<D> = dyn Fn(&mut D, &<D as Document>::Node, &str, Option<&PropValue<D>>) -> Result<()>;

/// A hook made from closures.
pub struct FnHook<D: Document> {
	hook: Box<HookFn<D>>,
	unhook: Option<Box<HookFn<D>>>,
}

impl<D: Document> FnHook<D> {
	/// `hook(document, node, name, previous)`
	pub fn new(hook: impl Fn(&mut D, &D::Node, &str, Option<&PropValue<D>>) -> Result<()> + 'static) -> Self {
		Self { hook: Box::new(hook), unhook: None }
	}

	/// `unhook(document, node, name, next)`
	#[must_use]
	pub fn with_unhook(mut self, unhook: impl Fn(&mut D, &D::Node, &str, Option<&PropValue<D>>) -> Result<()> + 'static) -> Self {
		self.unhook = Some(Box::new(unhook));
		self
	}
}

impl<D: Document> Hook<D> for FnHook<D> {
	fn hook(&self, document: &mut D, node: &D::Node, name: &str, previous: Option<&PropValue<D>>) -> Result<()> {
		(self.hook)(document, node, name, previous)
	}

	fn can_unhook(&self) -> bool {
		self.unhook.is_some()
	}

	fn unhook(&self, document: &mut D, node: &D::Node, name: &str, next: Option<&PropValue<D>>) -> Result<()> {
		match &self.unhook {
			Some(unhook) => unhook(document, node, name, next),
			None => Ok(()),
		}
	}
}

impl<D: Document> Debug for FnHook<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("FnHook").field("can_unhook", &self.unhook.is_some()).finish_non_exhaustive()
	}
}
