use crate::{
	diff::{FieldChange, ObjectPatch, PropChange, PropPatch},
	document::Document,
	error::Result,
	vnode::{Field, Object, PropValue, Props, Value},
};
use tracing::{trace, warn};

const ATTRIBUTES: &str = "attributes";
const STYLE: &str = "style";

/// Sets every property of a freshly created node.
pub(crate) fn initialize<D: Document>(document: &mut D, node: &D::Node, properties: &Props<D>) -> Result<()> {
	for (name, value) in properties {
		set(document, node, name, value, None)?;
	}
	Ok(())
}

/// Applies a property patch. `previous` are the properties the node was last rendered with.
pub(crate) fn apply<D: Document>(document: &mut D, node: &D::Node, patch: &PropPatch<D>, previous: &Props<D>) -> Result<()> {
	for (name, change) in patch {
		if cfg!(feature = "dangerous-logging") {
			trace!(name = &**name, ?change, "Applying property change.");
		} else {
			trace!(name = &**name, "Applying property change.");
		}

		match change {
			PropChange::Remove => remove(document, node, name, None, previous.get(name))?,
			PropChange::Set(value) => set(document, node, name, value, previous.get(name))?,
			PropChange::Object(fields) => patch_object(document, node, &[&**name], fields)?,
		}
	}
	Ok(())
}

fn set<D: Document>(document: &mut D, node: &D::Node, name: &str, value: &PropValue<D>, previous: Option<&PropValue<D>>) -> Result<()> {
	match value {
		PropValue::Hook(hook) => {
			remove(document, node, name, Some(value), previous)?;
			hook.hook(document, node, name, previous)
		}
		PropValue::Object(object) => {
			unhook_previous(document, node, name, value, previous)?;
			set_fields(document, node, &[name], object)
		}
		PropValue::Value(plain) => {
			unhook_previous(document, node, name, value, previous)?;
			document.set_property(node, name, Some(plain))
		}
	}
}

fn unhook_previous<D: Document>(document: &mut D, node: &D::Node, name: &str, next: &PropValue<D>, previous: Option<&PropValue<D>>) -> Result<()> {
	match previous {
		Some(PropValue::Hook(hook)) if hook.can_unhook() => hook.unhook(document, node, name, Some(next)),
		_ => Ok(()),
	}
}

/// Clears what `previous` set. Hooks are unhooked instead.
fn remove<D: Document>(document: &mut D, node: &D::Node, name: &str, next: Option<&PropValue<D>>, previous: Option<&PropValue<D>>) -> Result<()> {
	match previous {
		None => Ok(()),
		Some(PropValue::Hook(hook)) => {
			if hook.can_unhook() {
				hook.unhook(document, node, name, next)
			} else {
				Ok(())
			}
		}
		Some(PropValue::Object(object)) => match name {
			ATTRIBUTES => object.keys().try_for_each(|attribute| document.remove_attribute(node, attribute)),
			STYLE => object.keys().try_for_each(|declaration| document.set_style(node, declaration, None)),
			_ => document.set_property(node, name, None),
		},
		Some(PropValue::Value(Value::String(_))) => document.set_property(node, name, Some(&Value::String("".into()))),
		Some(PropValue::Value(_)) => document.set_property(node, name, None),
	}
}

/// Whether `path` names an object whose fields map onto attributes or inline style.
fn is_flat(path: &[&str]) -> bool {
	matches!(path, [ATTRIBUTES] | [STYLE])
}

fn patch_object<D: Document>(document: &mut D, node: &D::Node, path: &[&str], patch: &ObjectPatch) -> Result<()> {
	for (field, change) in patch {
		let field: &str = field;
		match change {
			FieldChange::Remove => assign(document, node, path, field, None)?,
			FieldChange::Set(value) => set_field(document, node, path, field, value)?,
			FieldChange::Object(_) if is_flat(path) => warn!(object = path[0], field, "Skipping nested object."),
			FieldChange::Object(patch) => patch_object(document, node, &[path, &[field][..]].concat(), patch)?,
		}
	}
	Ok(())
}

fn set_fields<D: Document>(document: &mut D, node: &D::Node, path: &[&str], object: &Object) -> Result<()> {
	for (field, value) in object {
		set_field(document, node, path, field, value)?;
	}
	Ok(())
}

fn set_field<D: Document>(document: &mut D, node: &D::Node, path: &[&str], field: &str, value: &Field) -> Result<()> {
	match value {
		Field::Value(value) => assign(document, node, path, field, Some(value)),
		Field::Object(_) if is_flat(path) => {
			warn!(object = path[0], field, "Skipping nested object.");
			Ok(())
		}
		Field::Object(object) => {
			// Starts from an empty object so no stale fields survive.
			assign(document, node, path, field, None)?;
			set_fields(document, node, &[path, &[field][..]].concat(), object)
		}
	}
}

fn assign<D: Document>(document: &mut D, node: &D::Node, path: &[&str], field: &str, value: Option<&Value>) -> Result<()> {
	match (path, value) {
		([ATTRIBUTES], Some(value)) => document.set_attribute(node, field, value),
		([ATTRIBUTES], None) => document.remove_attribute(node, field),
		([STYLE], value) => document.set_style(node, field, value),
		(path, value) => document.set_object_field(node, path, field, value),
	}
}
