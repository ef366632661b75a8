use std::any::Any;

use thiserror::Error;

use crate::config;

/// Failures reported to [`Settings::on_error`](crate::Settings::on_error).
///
/// Panics of computed values are not reported here; they propagate to the
/// code reading the value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
	#[error("reaction `{name}` panicked: {message}")]
	ReactionPanicked { name: &'static str, message: String },

	#[error("flush did not settle after {rounds} rounds, pending reactions were dropped")]
	FlushLimitExceeded { rounds: usize },
}

impl Error {
	pub(crate) fn panicked(name: &'static str, payload: Box<dyn Any + Send>) -> Self {
		let message = match payload.downcast::<String>() {
			Ok(message) => *message,
			Err(payload) => match payload.downcast_ref::<&'static str>() {
				Some(message) => message.to_string(),
				None => "non-string panic payload".to_string(),
			},
		};

		Error::ReactionPanicked { name, message }
	}
}

pub(crate) fn report(error: Error) {
	match config::error_hook() {
		Some(hook) => hook(&error),
		None => tracing::error!(%error, "reactive graph error"),
	}
}
