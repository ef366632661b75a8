use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::Error;

/// When reactions pending after a write made outside of [`batch`](crate::batch)
/// are run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flush {
	/// Before the write returns: every unbatched write is its own tick.
	/// Use [`batch`](crate::batch) or [`Flush::Manual`] to coalesce.
	Sync,
	/// When the host calls [`flush`](crate::flush). All writes between two
	/// calls are committed together.
	Manual,
	/// In a microtask queued by the first write of the current tick.
	#[cfg(target_arch = "wasm32")]
	Microtask,
}

impl Default for Flush {
	#[cfg(not(target_arch = "wasm32"))]
	fn default() -> Self {
		Flush::Sync
	}

	#[cfg(target_arch = "wasm32")]
	fn default() -> Self {
		Flush::Microtask
	}
}

pub type ErrorHook = Rc<dyn Fn(&Error)>;

/// Per-thread runtime settings, changed with [`configure`].
#[derive(Clone)]
pub struct Settings {
	pub flush: Flush,
	/// Rounds a single flush may take before the pending reactions are
	/// dropped with [`Error::FlushLimitExceeded`].
	pub max_flush_rounds: usize,
	/// Receives reaction failures. Errors are logged when unset.
	pub on_error: Option<ErrorHook>,
}

impl Default for Settings {
	fn default() -> Self {
		Settings {
			flush: Flush::default(),
			max_flush_rounds: 1000,
			on_error: None,
		}
	}
}

impl fmt::Debug for Settings {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Settings")
			.field("flush", &self.flush)
			.field("max_flush_rounds", &self.max_flush_rounds)
			.field("on_error", &self.on_error.is_some())
			.finish()
	}
}

thread_local! {
	static SETTINGS: RefCell<Settings> = RefCell::new(Settings::default());
}

/// Changes the settings of the current thread.
///
/// ```
/// ripple::configure(|settings| settings.flush = ripple::Flush::Manual);
/// ```
pub fn configure(func: impl FnOnce(&mut Settings)) {
	SETTINGS.with(|settings| func(&mut settings.borrow_mut()))
}

pub(crate) fn flush_mode() -> Flush {
	SETTINGS.with(|settings| settings.borrow().flush)
}

pub(crate) fn max_flush_rounds() -> usize {
	SETTINGS.with(|settings| settings.borrow().max_flush_rounds)
}

pub(crate) fn error_hook() -> Option<ErrorHook> {
	SETTINGS.with(|settings| settings.borrow().on_error.clone())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn configure_changes_current_thread_only() {
		configure(|settings| {
			settings.flush = Flush::Manual;
			settings.max_flush_rounds = 3;
		});
		assert_eq!(flush_mode(), Flush::Manual);
		assert_eq!(max_flush_rounds(), 3);

		let other = std::thread::spawn(|| (flush_mode(), max_flush_rounds()))
			.join()
			.unwrap();
		assert_eq!(other, (Flush::default(), 1000));
	}
}
