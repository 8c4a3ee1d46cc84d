use thiserror::Error;

/// Failures surfaced by diffing, materializing or patching.
///
/// Reconciliation never retries. Every variant describes a programming error or a live tree
/// that refused an operation, and aborts the current render.
#[derive(Debug, Error)]
pub enum Error {
	/// A [`Thunk`](`crate::vnode::Thunk`) rendered another thunk instead of an element, text or widget node.
	#[error("thunk did not return a valid node")]
	InvalidThunkResult,

	/// The live tree rejected an operation.
	#[error("live tree rejected `{operation}`: {message}")]
	Host {
		operation: &'static str,
		message: String,
	},

	/// A hook or widget callback failed. The error is passed through unchanged.
	#[error("callback failed: {0}")]
	Callback(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
	pub fn host(operation: &'static str, message: impl Into<String>) -> Self {
		Self::Host {
			operation,
			message: message.into(),
		}
	}

	pub fn callback(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
		Self::Callback(error.into())
	}
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
