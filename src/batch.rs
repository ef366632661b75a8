use std::cell::Cell;

use crate::config::{self, Flush};
use crate::error::{report, Error};
use crate::reaction::PENDING;

thread_local! {
	static DEPTH: Cell<usize> = const { Cell::new(0) };
	static FLUSHING: Cell<bool> = const { Cell::new(false) };
	static EPOCH: Cell<u64> = const { Cell::new(0) };
}

pub fn in_batch() -> bool {
	DEPTH.with(|depth| depth.get() > 0)
}

/// Runs `func` and defers every reaction it triggers until the outermost
/// batch returns. Each affected reaction then runs once.
///
/// If `func` panics the pending reactions are kept for the next flush.
pub fn batch<R>(func: impl FnOnce() -> R) -> R {
	let scope = BatchScope::enter();
	let result = func();

	let is_root = scope.is_root;
	drop(scope);
	if is_root {
		flush();
	}

	result
}

struct BatchScope {
	is_root: bool,
}

impl BatchScope {
	fn enter() -> Self {
		let depth = DEPTH.with(|depth| {
			depth.set(depth.get() + 1);
			depth.get()
		});

		BatchScope { is_root: depth == 1 }
	}
}

impl Drop for BatchScope {
	fn drop(&mut self) {
		DEPTH.with(|depth| depth.set(depth.get() - 1));
	}
}

/// Whether some reactions wait for the next flush.
pub fn has_pending() -> bool {
	PENDING.with(|pending| !pending.borrow().is_empty())
}

/// Current mark pass. Every write starts a new one.
pub(crate) fn epoch() -> u64 {
	EPOCH.with(Cell::get)
}

/// Runs the mark phase of a write and schedules the commit phase.
pub(crate) fn propagate(mark: impl FnOnce()) {
	EPOCH.with(|epoch| epoch.set(epoch.get() + 1));
	mark();

	if in_batch() || FLUSHING.with(Cell::get) || !has_pending() {
		return;
	}

	match config::flush_mode() {
		Flush::Sync => flush(),
		Flush::Manual => {}
		#[cfg(target_arch = "wasm32")]
		Flush::Microtask => crate::microtask::queue_flush(),
	}
}

struct Flushing;

impl Drop for Flushing {
	fn drop(&mut self) {
		FLUSHING.with(|flushing| flushing.set(false));
	}
}

/// Runs pending reactions until none are left.
///
/// Reactions triggered while flushing run in a following round of the same
/// flush. Calling `flush` from a reaction does nothing.
pub fn flush() {
	if FLUSHING.with(|flushing| flushing.replace(true)) {
		return;
	}
	let _flushing = Flushing;

	let limit = config::max_flush_rounds();
	let mut rounds = 0;

	loop {
		let changed = PENDING.with(|pending| std::mem::take(&mut *pending.borrow_mut()));
		if changed.is_empty() {
			break;
		}

		rounds += 1;
		if rounds > limit {
			tracing::warn!(rounds = limit, dropped = changed.len(), "reactions keep triggering each other");
			report(Error::FlushLimitExceeded { rounds: limit });
			break;
		}

		tracing::trace!(round = rounds, reactions = changed.len(), "flush");
		for (_, reaction) in changed {
			if let Some(reaction) = reaction.upgrade() {
				reaction.update();
			}
		}
	}
}
