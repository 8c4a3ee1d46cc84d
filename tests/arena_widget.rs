use std::{cell::Cell, rc::Rc};
use vdom_reconcile::{
	arena::{ArenaDocument, NodeId},
	vnode::{InitFn, Widget},
	Document as _,
};

use arena_support_::{el, init_tracing, render, update, Node};

#[derive(Default)]
struct Counts {
	updated: Cell<usize>,
	destroyed: Cell<usize>,
}

fn canvas() -> Rc<InitFn<ArenaDocument>> {
	Rc::new(|document: &mut ArenaDocument| document.create_element("CANVAS", None))
}

fn widget(init: &Rc<InitFn<ArenaDocument>>, counts: &Rc<Counts>) -> Widget<ArenaDocument> {
	let (update_counts, destroy_counts) = (counts.clone(), counts.clone());
	Widget::from_init(init.clone())
		.on_update(move |_previous: &Widget<ArenaDocument>, _document: &mut ArenaDocument, _node: &NodeId| {
			update_counts.updated.set(update_counts.updated.get() + 1);
			Ok(None)
		})
		.on_destroy(move |_document: &mut ArenaDocument, _node: &NodeId| {
			destroy_counts.destroyed.set(destroy_counts.destroyed.get() + 1);
			Ok(())
		})
}

fn host(widget: Widget<ArenaDocument>) -> Node {
	el("DIV", vec![widget.into()])
}

#[test]
fn same_kind_updates_in_place() {
	init_tracing();

	let (init, counts) = (canvas(), Rc::new(Counts::default()));
	let old = host(widget(&init, &counts));
	let new = host(widget(&init, &counts));

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &old);
	let live = document.children(root)[0];

	update(&mut document, root, &old, &new);
	assert_eq!(document.children(root), &[live]);
	assert_eq!((counts.updated.get(), counts.destroyed.get()), (1, 0));
}

#[test]
fn other_kind_is_recreated() {
	init_tracing();

	let counts = Rc::new(Counts::default());
	let old = host(widget(&canvas(), &counts));
	let new = host(widget(&canvas(), &counts));

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &old);
	let live = document.children(root)[0];

	update(&mut document, root, &old, &new);
	assert_ne!(document.children(root), &[live]);
	assert_eq!(document.to_html(root), "<DIV><CANVAS></CANVAS></DIV>");
	assert_eq!((counts.updated.get(), counts.destroyed.get()), (0, 1));
}

#[test]
fn names_and_ids_decide_kind() {
	init_tracing();

	let counts = Rc::new(Counts::default());
	let old = host(widget(&canvas(), &counts).named("chart", "1"));
	let same = host(widget(&canvas(), &counts).named("chart", "1"));
	let other = host(widget(&canvas(), &counts).named("chart", "2"));

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &old);
	update(&mut document, root, &old, &same);
	assert_eq!((counts.updated.get(), counts.destroyed.get()), (1, 0));

	update(&mut document, root, &same, &other);
	assert_eq!((counts.updated.get(), counts.destroyed.get()), (1, 1));
}

#[test]
fn removed_widgets_are_destroyed() {
	init_tracing();

	let counts = Rc::new(Counts::default());
	let old = host(widget(&canvas(), &counts));

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &old);
	update(&mut document, root, &old, &el("DIV", vec![]));
	assert_eq!(counts.destroyed.get(), 1);
	assert_eq!(document.to_html(root), "<DIV></DIV>");
}

#[test]
fn widgets_in_discarded_subtrees_are_destroyed() {
	init_tracing();

	let counts = Rc::new(Counts::default());
	let old = el("DIV", vec![el("SECTION", vec![widget(&canvas(), &counts).into()])]);
	let new = el("DIV", vec![el("P", vec![])]);

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &old);
	update(&mut document, root, &old, &new);
	assert_eq!(counts.destroyed.get(), 1);
	assert_eq!(document.to_html(root), "<DIV><P></P></DIV>");
}

#[test]
fn widget_replacing_an_element() {
	init_tracing();

	let counts = Rc::new(Counts::default());
	let old = el("DIV", vec![el("P", vec![])]);
	let new = host(widget(&canvas(), &counts));

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &old);
	update(&mut document, root, &old, &new);
	assert_eq!(document.to_html(root), "<DIV><CANVAS></CANVAS></DIV>");
	assert_eq!((counts.updated.get(), counts.destroyed.get()), (0, 0));
}

#[test]
fn same_kind_without_update_is_recreated() {
	init_tracing();

	let (init, counts) = (canvas(), Rc::new(Counts::default()));
	let without_update = |counts: &Rc<Counts>| {
		let counts = counts.clone();
		Widget::from_init(init.clone()).on_destroy(move |_document: &mut ArenaDocument, _node: &NodeId| {
			counts.destroyed.set(counts.destroyed.get() + 1);
			Ok(())
		})
	};
	let old = host(without_update(&counts));
	let new = host(without_update(&counts));

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &old);
	let live = document.children(root)[0];

	update(&mut document, root, &old, &new);
	assert_ne!(document.children(root), &[live]);
	assert_eq!(document.to_html(root), "<DIV><CANVAS></CANVAS></DIV>");
	assert_eq!((counts.updated.get(), counts.destroyed.get()), (0, 1));
}

#[test]
fn root_widget_update_can_swap_the_root() {
	init_tracing();

	let init = canvas();
	let swapping = || -> Node {
		Widget::from_init(init.clone())
			.on_update(|_previous: &Widget<ArenaDocument>, document: &mut ArenaDocument, _node: &NodeId| {
				document.create_element("SVG", None).map(Some)
			})
			.into()
	};
	let (old, new) = (swapping(), swapping());

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &old);
	assert_eq!(document.to_html(root), "<CANVAS></CANVAS>");

	let new_root = update(&mut document, root, &old, &new).unwrap();
	assert_ne!(new_root, root);
	assert_eq!(document.to_html(new_root), "<SVG></SVG>");
}
