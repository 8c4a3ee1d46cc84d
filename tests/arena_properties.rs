use std::{cell::Cell, rc::Rc};
use vdom_reconcile::{
	arena::{ArenaDocument, NodeId},
	diff,
	diff::{FieldChange, Patch, PropChange},
	hooks::{FnHook, SoftSetHook},
	vnode::{Field, PropValue, Props, VElement, Value},
	Document as _, Error, RenderContext,
};

use arena_support_::{el, el_with, init_tracing, render, update, Node};

#[derive(Default)]
struct Counts {
	hooked: Cell<usize>,
	unhooked: Cell<usize>,
}

fn counting_hook(counts: &Rc<Counts>) -> PropValue<ArenaDocument> {
	let (hook_counts, unhook_counts) = (counts.clone(), counts.clone());
	PropValue::hook(
		FnHook::<ArenaDocument>::new(move |_, _, _, _| {
			hook_counts.hooked.set(hook_counts.hooked.get() + 1);
			Ok(())
		})
		.with_unhook(move |_, _, _, _| {
			unhook_counts.unhooked.set(unhook_counts.unhooked.get() + 1);
			Ok(())
		}),
	)
}

#[test]
fn style_is_merged_per_declaration() {
	init_tracing();

	let old = el_with("DIV", [("style", PropValue::object([("color", "red"), ("width", "1px")]))], vec![]);
	let new = el_with("DIV", [("style", PropValue::object([("color", "blue"), ("height", "2px")]))], vec![]);

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &old);
	assert_eq!(document.style(root, "width"), Some("1px"));

	update(&mut document, root, &old, &new);
	assert_eq!(document.style(root, "color"), Some("blue"));
	assert_eq!(document.style(root, "width"), None);
	assert_eq!(document.style(root, "height"), Some("2px"));
}

#[test]
fn removing_style_clears_its_declarations() {
	init_tracing();

	let old = el_with("DIV", [("style", PropValue::object([("color", "red")]))], vec![]);
	let new = el("DIV", vec![]);

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &old);
	update(&mut document, root, &old, &new);
	assert_eq!(document.style(root, "color"), None);
}

#[test]
fn attributes() {
	init_tracing();

	let old = el_with("A", [("attributes", PropValue::object([("href", "/a"), ("title", "A")]))], vec![]);
	let new = el_with("A", [("attributes", PropValue::object([("href", "/b")]))], vec![]);

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &old);
	assert_eq!(document.to_html(root), r#"<A href="/a" title="A"></A>"#);

	update(&mut document, root, &old, &new);
	assert_eq!(document.to_html(root), r#"<A href="/b"></A>"#);
}

#[test]
fn other_objects_are_patched_field_by_field() {
	init_tracing();

	let old = el_with("DIV", [("dataset", PropValue::object([("a", 1), ("b", 2)]))], vec![]);
	let new = el_with("DIV", [("dataset", PropValue::object([("a", 1), ("b", 3)]))], vec![]);

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &old);
	update(&mut document, root, &old, &new);
	assert_eq!(document.object_field(root, &["dataset"], "a"), Some(&Value::Number(1.0)));
	assert_eq!(document.object_field(root, &["dataset"], "b"), Some(&Value::Number(3.0)));
}

fn dataset(a: i32, b: i32) -> Node {
	el_with("DIV", [("dataset", PropValue::object([("inner", Field::object([("a", a), ("b", b)]))]))], vec![])
}

#[test]
fn nested_objects_are_patched_leaf_by_leaf() {
	init_tracing();

	let (old, new) = (dataset(1, 2), dataset(1, 3));
	assert!(diff(&old, &dataset(1, 2)).unwrap().is_empty());

	let patches = diff(&old, &new).unwrap();
	let patch = match patches.get(0) {
		[Patch::UpdateProperties { patch, .. }] => patch,
		other => panic!("unexpected patches: {:?}", other),
	};
	let inner = match &patch["dataset"] {
		PropChange::Object(fields) => &fields["inner"],
		other => panic!("unexpected change: {:?}", other),
	};
	let expected = [("b".into(), FieldChange::Set(Field::from(3)))].into_iter().collect();
	assert_eq!(inner, &FieldChange::Object(expected));

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &old);
	assert_eq!(document.object_field(root, &["dataset", "inner"], "b"), Some(&Value::Number(2.0)));

	update(&mut document, root, &old, &new);
	assert_eq!(document.object_field(root, &["dataset", "inner"], "a"), Some(&Value::Number(1.0)));
	assert_eq!(document.object_field(root, &["dataset", "inner"], "b"), Some(&Value::Number(3.0)));
}

#[test]
fn nested_object_replacing_a_value() {
	init_tracing();

	let old = el_with("DIV", [("dataset", PropValue::object([("inner", 1)]))], vec![]);
	let new = dataset(4, 5);

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &old);
	update(&mut document, root, &old, &new);
	assert_eq!(document.object_field(root, &["dataset"], "inner"), None);
	assert_eq!(document.object_field(root, &["dataset", "inner"], "a"), Some(&Value::Number(4.0)));

	update(&mut document, root, &new, &old);
	assert_eq!(document.object_field(root, &["dataset"], "inner"), Some(&Value::Number(1.0)));
	assert_eq!(document.object_field(root, &["dataset", "inner"], "a"), None);
}

#[test]
fn removed_properties_are_reset() {
	init_tracing();

	let old = el_with("INPUT", [("value", PropValue::from("text")), ("tabIndex", PropValue::from(2))], vec![]);
	let new = el("INPUT", vec![]);

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &old);
	assert_eq!(document.property(&root, "tabIndex"), Some(Value::Number(2.0)));

	update(&mut document, root, &old, &new);
	assert_eq!(document.property(&root, "value"), Some(Value::from("")));
	assert_eq!(document.property(&root, "tabIndex"), None);
}

#[test]
fn namespaces_are_kept() {
	init_tracing();

	const SVG: &str = "http://www.w3.org/2000/svg";
	let tree: Node = VElement::new("svg", Props::new(), vec![]).with_namespace(SVG).into();

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &tree);
	assert_eq!(document.namespace(root), Some(SVG));
}

#[test]
fn hooks_run_once_per_instance() {
	init_tracing();

	let counts = Rc::new(Counts::default());
	let hook = counting_hook(&counts);
	let old = el_with("DIV", [("focus", hook.clone())], vec![]);
	let same = el_with("DIV", [("focus", hook)], vec![]);

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &old);
	assert_eq!(counts.hooked.get(), 1);

	update(&mut document, root, &old, &same);
	assert_eq!((counts.hooked.get(), counts.unhooked.get()), (1, 0));

	let replaced = el_with("DIV", [("focus", counting_hook(&counts))], vec![]);
	update(&mut document, root, &same, &replaced);
	assert_eq!((counts.hooked.get(), counts.unhooked.get()), (2, 1));

	let plain = el_with("DIV", [("focus", PropValue::from(true))], vec![]);
	update(&mut document, root, &replaced, &plain);
	assert_eq!((counts.hooked.get(), counts.unhooked.get()), (2, 2));
	assert_eq!(document.property(&root, "focus"), Some(Value::Bool(true)));
}

#[test]
fn discarded_subtrees_are_unhooked() {
	init_tracing();

	let counts = Rc::new(Counts::default());
	let old = el("DIV", vec![el("SECTION", vec![el_with("SPAN", [("focus", counting_hook(&counts))], vec![])])]);

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &old);
	assert_eq!(counts.hooked.get(), 1);

	update(&mut document, root, &old, &el("DIV", vec![]));
	assert_eq!(counts.unhooked.get(), 1);
	assert_eq!(document.to_html(root), "<DIV></DIV>");
}

#[test]
fn replaced_nodes_are_unhooked() {
	init_tracing();

	let counts = Rc::new(Counts::default());
	let old = el("DIV", vec![el_with("SPAN", [("focus", counting_hook(&counts))], vec![])]);
	let new = el("DIV", vec![el("P", vec![])]);

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &old);
	update(&mut document, root, &old, &new);
	assert_eq!((counts.hooked.get(), counts.unhooked.get()), (1, 1));
	assert_eq!(document.to_html(root), "<DIV><P></P></DIV>");
}

#[test]
fn soft_set_assigns_only_changes() {
	init_tracing();

	let old = el_with("INPUT", [("value", PropValue::hook(SoftSetHook::new("a")))], vec![]);
	let new = el_with("INPUT", [("value", PropValue::hook(SoftSetHook::new("b")))], vec![]);

	let mut document = ArenaDocument::new();
	let root: NodeId = render(&mut document, &old);
	assert_eq!(document.property(&root, "value"), Some(Value::from("a")));

	update(&mut document, root, &old, &new);
	assert_eq!(document.property(&root, "value"), Some(Value::from("b")));
}

#[test]
fn hook_errors_abort_apply() {
	init_tracing();

	let failing = PropValue::hook(FnHook::<ArenaDocument>::new(|_, _, _, _| Err(Error::callback("focus failed"))));
	let old = el("DIV", vec![]);
	let new = el_with("DIV", [("focus", failing)], vec![]);

	let mut document = ArenaDocument::new();
	let root = render(&mut document, &old);
	let patches = diff(&old, &new).unwrap();
	let result = vdom_reconcile::apply(&root, &patches, &mut RenderContext::new(&mut document));
	match result {
		Err(Error::Callback(error)) => assert_eq!(error.to_string(), "focus failed"),
		other => panic!("unexpected result: {:?}", other.map(|_| ())),
	}
}
