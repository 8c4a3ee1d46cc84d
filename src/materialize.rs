//! Creating live trees from scratch.

use crate::{
	document::Document,
	error::{Error, Result},
	patch::RenderContext,
	properties,
	vnode::VNode,
};
use tracing::{instrument, trace_span, warn};

/// Creates a live tree for `node`, rendering thunks as needed.
///
/// Returns [`None`] for an element whose tag name isn't valid, after reporting it through
/// [`RenderContext::with_warn`] if a callback is set. Children that fail this way are skipped.
///
/// # Errors
///
/// Live tree failures, failing hooks or widget `init`s, and [`Error::InvalidThunkResult`].
#[instrument(skip_all)]
pub fn materialize<D: Document>(node: &VNode<D>, context: &mut RenderContext<'_, D>) -> Result<Option<D::Node>> {
	let node = node.resolve()?;
	match node {
		VNode::Widget(widget) => widget.init(context.document).map(Some),
		VNode::Text(text) => context.document.create_text_node(text.text()).map(Some),
		VNode::Element(element) if !is_valid_tag_name(element.tag_name()) => {
			warn!(tag = element.tag_name(), "Invalid tag name. Skipping the element.");
			if let Some(warn) = context.warn {
				warn("Item is not a valid virtual dom node", node);
			}
			Ok(None)
		}
		VNode::Element(element) => {
			let span = trace_span!("Creating element", tag = element.tag_name(), namespace = element.namespace());
			let _enter = span.enter();

			let live = context.document.create_element(element.tag_name(), element.namespace())?;
			properties::initialize(context.document, &live, element.properties())?;
			for child in element.children() {
				if let Some(child) = materialize(child, context)? {
					context.document.append_child(&live, &child)?;
				}
			}
			Ok(Some(live))
		}
		VNode::Thunk(_) => Err(Error::InvalidThunkResult),
	}
}

fn is_valid_tag_name(tag_name: &str) -> bool {
	!tag_name.is_empty() && !tag_name.contains(|c: char| c.is_whitespace() || c == '<' || c == '>' || c == '/')
}
