//! Patching a real browser DOM.

use crate::{
	document::Document,
	error::{Error, Result},
	vnode::Value,
};
use js_sys::{Object, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CharacterData, Element, Node};

fn host_error(operation: &'static str) -> impl FnOnce(JsValue) -> Error {
	move |error| Error::host(operation, format!("{:?}", error))
}

fn to_js(value: Option<&Value>) -> JsValue {
	match value {
		None => JsValue::NULL,
		Some(Value::Bool(bool)) => JsValue::from_bool(*bool),
		Some(Value::Number(number)) => JsValue::from_f64(*number),
		Some(Value::String(string)) => JsValue::from_str(string),
	}
}

fn element<'a>(node: &'a Node, operation: &'static str) -> Result<&'a Element> {
	node.dyn_ref::<Element>().ok_or_else(|| Error::host(operation, format!("Expected element but found {:?}", node)))
}

impl Document for web_sys::Document {
	type Node = Node;

	fn create_element(&mut self, tag_name: &str, namespace: Option<&str>) -> Result<Node> {
		let element = match namespace {
			None => web_sys::Document::create_element(self, tag_name),
			Some(namespace) => self.create_element_ns(Some(namespace), tag_name),
		}
		.map_err(host_error("create_element"))?;
		Ok(element.into())
	}

	fn create_text_node(&mut self, text: &str) -> Result<Node> {
		Ok(web_sys::Document::create_text_node(self, text).into())
	}

	fn is_text(&self, node: &Node) -> bool {
		node.node_type() == Node::TEXT_NODE
	}

	fn set_text(&mut self, node: &Node, text: &str) -> Result<()> {
		let character_data = node
			.dyn_ref::<CharacterData>()
			.ok_or_else(|| Error::host("set_text", format!("Expected `CharacterData` but found {:?}", node)))?;
		character_data.replace_data(0, character_data.length(), text).map_err(host_error("set_text"))
	}

	fn parent_node(&self, node: &Node) -> Option<Node> {
		node.parent_node()
	}

	fn child_node(&self, parent: &Node, index: usize) -> Option<Node> {
		parent.child_nodes().get(u32::try_from(index).ok()?)
	}

	fn child_count(&self, parent: &Node) -> usize {
		parent.child_nodes().length() as usize
	}

	fn append_child(&mut self, parent: &Node, child: &Node) -> Result<()> {
		parent.append_child(child).map(drop).map_err(host_error("append_child"))
	}

	fn insert_before(&mut self, parent: &Node, child: &Node, reference: Option<&Node>) -> Result<()> {
		parent.insert_before(child, reference).map(drop).map_err(host_error("insert_before"))
	}

	fn remove_child(&mut self, parent: &Node, child: &Node) -> Result<()> {
		parent.remove_child(child).map(drop).map_err(host_error("remove_child"))
	}

	fn replace_child(&mut self, parent: &Node, new_child: &Node, old_child: &Node) -> Result<()> {
		parent.replace_child(new_child, old_child).map(drop).map_err(host_error("replace_child"))
	}

	fn set_attribute(&mut self, node: &Node, name: &str, value: &Value) -> Result<()> {
		element(node, "set_attribute")?.set_attribute(name, &value.to_string()).map_err(host_error("set_attribute"))
	}

	fn remove_attribute(&mut self, node: &Node, name: &str) -> Result<()> {
		element(node, "remove_attribute")?.remove_attribute(name).map_err(host_error("remove_attribute"))
	}

	fn set_style(&mut self, node: &Node, name: &str, value: Option<&Value>) -> Result<()> {
		let style = Reflect::get(node, &JsValue::from_str("style")).map_err(host_error("set_style"))?;
		let value = value.map_or_else(String::new, ToString::to_string);
		Reflect::set(&style, &JsValue::from_str(name), &JsValue::from_str(&value))
			.map(drop)
			.map_err(host_error("set_style"))
	}

	fn set_property(&mut self, node: &Node, name: &str, value: Option<&Value>) -> Result<()> {
		Reflect::set(node, &JsValue::from_str(name), &to_js(value)).map(drop).map_err(host_error("set_property"))
	}

	fn property(&self, node: &Node, name: &str) -> Option<Value> {
		let value = Reflect::get(node, &JsValue::from_str(name)).ok()?;
		if let Some(bool) = value.as_bool() {
			Some(Value::Bool(bool))
		} else if let Some(number) = value.as_f64() {
			Some(Value::Number(number))
		} else {
			value.as_string().map(Value::from)
		}
	}

	fn set_object_field(&mut self, node: &Node, path: &[&str], field: &str, value: Option<&Value>) -> Result<()> {
		let mut target: JsValue = node.clone().into();
		for segment in path {
			let key = JsValue::from_str(segment);
			let mut object = Reflect::get(&target, &key).map_err(host_error("set_object_field"))?;
			if !object.is_object() {
				object = Object::new().into();
				Reflect::set(&target, &key, &object).map_err(host_error("set_object_field"))?;
			}
			target = object;
		}
		let value = match value {
			Some(value) => to_js(Some(value)),
			None => JsValue::UNDEFINED,
		};
		Reflect::set(&target, &JsValue::from_str(field), &value).map(drop).map_err(host_error("set_object_field"))
	}
}
