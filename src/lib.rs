#![doc(html_root_url = "https://docs.rs/vdom-reconcile/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! A virtual DOM differ and patcher.
//!
//! [`diff`] compares two immutable node trees and produces a sparse [`Patches`](`diff::Patches`) map,
//! keyed by in-order position in the old tree. [`apply`] resolves those positions against a live
//! [`Document`] and mutates it in place, moving keyed children instead of recreating them.
//!
//! [`arena::ArenaDocument`] is an in-memory live tree. With the `"web"` feature,
//! [`web_sys::Document`](https://docs.rs/web-sys/0.3/web_sys/struct.Document.html) implements [`Document`] too.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod arena;
pub mod diff;
pub mod document;
pub mod error;
pub mod hooks;
pub mod index;
pub mod materialize;
pub mod patch;
mod properties;
pub mod vnode;

#[cfg(feature = "web")]
pub mod web;

pub use crate::{
	diff::diff,
	document::Document,
	error::{Error, Result},
	materialize::materialize,
	patch::{apply, RenderContext},
};
