use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::reaction::ReactionBody;
use crate::{Observable, Subscriber};

thread_local! {
	static OBSERVER: RefCell<Option<Rc<dyn Subscriber>>> = const { RefCell::new(None) };
	static OWNER: RefCell<Option<Weak<ReactionBody>>> = const { RefCell::new(None) };
}

/// Scope in which reads are attributed to an observer.
///
/// Dropping the scope restores whatever was installed before it, so nested
/// evaluations compose and unwinding leaves the slots intact.
pub(crate) struct Evaluation {
	observer: Option<Rc<dyn Subscriber>>,
	owner: Option<Option<Weak<ReactionBody>>>,
}

impl Evaluation {
	/// Evaluation of a computed value: it tracks but owns nothing.
	pub fn new(observer: Rc<dyn Subscriber>) -> Self {
		Evaluation {
			observer: OBSERVER.with(|slot| slot.replace(Some(observer))),
			owner: Some(OWNER.with(|slot| slot.replace(None))),
		}
	}

	/// Evaluation of a reaction: reactions and cleanups created inside
	/// belong to it.
	pub fn owned(reaction: &Rc<ReactionBody>) -> Self {
		Evaluation {
			observer: OBSERVER.with(|slot| slot.replace(Some(reaction.clone() as Rc<dyn Subscriber>))),
			owner: Some(OWNER.with(|slot| slot.replace(Some(Rc::downgrade(reaction))))),
		}
	}

	pub fn untracked() -> Self {
		Evaluation {
			observer: OBSERVER.with(|slot| slot.replace(None)),
			owner: None,
		}
	}

	/// Registers `source` with the current observer, in both directions.
	pub fn track(source: Rc<dyn Observable>) {
		let Some(observer) = OBSERVER.with(|slot| slot.borrow().clone()) else {
			return;
		};

		if observer.based_on(&source) {
			source.used_by(observer.id(), Rc::downgrade(&observer));
		}
	}

	pub fn owner() -> Option<Rc<ReactionBody>> {
		OWNER.with(|slot| slot.borrow().as_ref().and_then(Weak::upgrade))
	}
}

impl Drop for Evaluation {
	fn drop(&mut self) {
		// The replaced values are dropped after the slot borrow ends: dropping
		// the last handle of a node may run cleanups that read the slots.
		let observer = OBSERVER.with(|slot| slot.replace(self.observer.take()));
		drop(observer);

		if let Some(owner) = self.owner.take() {
			let owner = OWNER.with(|slot| slot.replace(owner));
			drop(owner);
		}
	}
}

/// Whether reads made right now would be recorded as dependencies.
pub fn is_tracking() -> bool {
	OBSERVER.with(|slot| slot.borrow().is_some())
}

/// Runs `func` without recording any of its reads as dependencies.
pub fn untracked<R>(func: impl FnOnce() -> R) -> R {
	let _untracked = Evaluation::untracked();
	func()
}

/// Registers `func` to run before the current reaction runs again and when
/// it is disposed.
pub fn on_cleanup(func: impl FnOnce() + 'static) {
	match Evaluation::owner() {
		Some(owner) => owner.add_cleanup(Box::new(func)),
		None => tracing::warn!("on_cleanup called outside of a reaction, the callback is dropped"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use std::panic::{catch_unwind, AssertUnwindSafe};

	use crate::{Invalid, NodeId};

	struct Probe(NodeId);

	impl Subscriber for Probe {
		fn id(&self) -> NodeId {
			self.0
		}

		fn invalidate(self: Rc<Self>, _: Invalid) {}

		fn based_on(&self, _: &Rc<dyn Observable>) -> bool {
			false
		}
	}

	fn current() -> Option<NodeId> {
		OBSERVER.with(|slot| slot.borrow().as_ref().map(|observer| observer.id()))
	}

	#[test]
	fn nested_evaluations_restore_observer() {
		let outer = Rc::new(Probe(NodeId::next()));
		let inner = Rc::new(Probe(NodeId::next()));

		assert!(!is_tracking());
		{
			let _outer = Evaluation::new(outer.clone());
			assert_eq!(current(), Some(outer.0));
			{
				let _inner = Evaluation::new(inner.clone());
				assert_eq!(current(), Some(inner.0));
			}
			assert_eq!(current(), Some(outer.0));
		}
		assert_eq!(current(), None);
	}

	#[test]
	fn untracked_clears_and_restores() {
		let probe = Rc::new(Probe(NodeId::next()));
		let _evaluation = Evaluation::new(probe.clone());

		let inside = untracked(is_tracking);
		assert!(!inside);
		assert_eq!(current(), Some(probe.0));
	}

	#[test]
	fn observer_restored_after_panic() {
		let probe = Rc::new(Probe(NodeId::next()));

		let result = catch_unwind(AssertUnwindSafe(|| {
			let _evaluation = Evaluation::new(probe.clone());
			panic!("boom");
		}));

		assert!(result.is_err());
		assert!(!is_tracking());
	}

	#[test]
	fn cleanup_outside_reaction_is_ignored() {
		on_cleanup(|| unreachable!());
		assert!(Evaluation::owner().is_none());
	}
}
