use std::{cell::Cell, rc::Rc};
use vdom_reconcile::{
	arena::ArenaDocument,
	diff,
	diff::{Patch, PatchKind},
	materialize,
	vnode::{Thunk, VNode},
	Error, RenderContext,
};

use arena_support_::{el, init_tracing, render, update, Node};

fn counted(text: &'static str, renders: &Rc<Cell<usize>>) -> Node {
	let renders = renders.clone();
	Thunk::new(move |_previous: Option<&Node>| {
		renders.set(renders.get() + 1);
		el("SPAN", vec![VNode::text(text)])
	})
	.into()
}

#[test]
fn thunks_render_once() {
	init_tracing();

	let (old_renders, new_renders) = (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)));
	let old = el("DIV", vec![counted("a", &old_renders)]);
	let new = el("DIV", vec![counted("b", &new_renders)]);

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &old);
	assert_eq!(old_renders.get(), 1);

	let patches = diff(&old, &new).unwrap();
	let kinds: Vec<_> = patches.get(1).iter().map(Patch::kind).collect();
	assert_eq!(kinds, vec![PatchKind::DescendIntoThunk]);

	vdom_reconcile::apply(&root, &patches, &mut RenderContext::new(&mut document)).unwrap();
	assert_eq!((old_renders.get(), new_renders.get()), (1, 1));
	assert_eq!(document.to_html(root), "<DIV><SPAN>b</SPAN></DIV>");
}

#[test]
fn thunks_see_the_node_they_replace() {
	init_tracing();

	let old = el("DIV", vec![counted("a", &Rc::new(Cell::new(0)))]);
	let reuse: Node = Thunk::new(|previous: Option<&Node>| match previous {
		Some(VNode::Thunk(previous)) => previous.rendered().cloned().unwrap_or_else(|| VNode::text("missing")),
		_ => VNode::text("missing"),
	})
	.into();
	let new = el("DIV", vec![reuse]);

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &old);
	assert!(diff(&old, &new).unwrap().is_empty());
	assert_eq!(update(&mut document, root, &old, &new), Some(root));
	assert_eq!(document.to_html(root), "<DIV><SPAN>a</SPAN></DIV>");
}

#[test]
fn thunk_root_replacement() {
	init_tracing();

	let old: Node = Thunk::new(|_: Option<&Node>| el("DIV", vec![])).into();
	let new: Node = Thunk::new(|_: Option<&Node>| el("P", vec![])).into();

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &old);
	let new_root = update(&mut document, root, &old, &new).unwrap();
	assert_ne!(new_root, root);
	assert_eq!(document.to_html(new_root), "<P></P>");
}

#[test]
fn thunks_must_not_render_thunks() {
	init_tracing();

	let nested: Node = Thunk::new(|_: Option<&Node>| Thunk::new(|_: Option<&Node>| VNode::text("x")).into()).into();

	let mut document = ArenaDocument::new();
	let result = materialize(&nested, &mut RenderContext::new(&mut document));
	assert!(matches!(result, Err(Error::InvalidThunkResult)));

	let old = el("DIV", vec![]);
	assert!(matches!(diff(&old, &nested), Err(Error::InvalidThunkResult)));
}

#[test]
fn removed_thunks_are_cleared() {
	init_tracing();

	let renders = Rc::new(Cell::new(0));
	let old = el("DIV", vec![counted("a", &renders), VNode::text("b")]);
	let new = el("DIV", vec![VNode::text("b")]);

	let (document, root) = arena_support_::assert_converges(&old, &new);
	assert_eq!(document.to_html(root), "<DIV>b</DIV>");
	assert_eq!(renders.get(), 1);
}

#[test]
fn repeated_diffs_reuse_the_rendered_thunk() {
	init_tracing();

	let (old_renders, new_renders) = (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)));
	let old = el("DIV", vec![counted("a", &old_renders)]);
	let new = el("DIV", vec![counted("b", &new_renders)]);

	let first = diff(&old, &new).unwrap();
	let second = diff(&old, &new).unwrap();
	assert_eq!(first.positions(), second.positions());
	assert_eq!((old_renders.get(), new_renders.get()), (1, 1));
}
