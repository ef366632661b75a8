//! Fine-grained reactive values.
//!
//! A [`Var`] holds mutable state, a [`Computed`] derives a memoized value
//! from other reactive values, and a [`Reaction`] runs a side effect whenever
//! something it read changes. Dependencies are recorded automatically while a
//! computed or a reaction runs.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let a = ripple::cell(2);
//! let b = ripple::derived({
//! 	let a = a.clone();
//! 	move || a.get() * 10
//! });
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let _log = ripple::reaction({
//! 	let b = b.clone();
//! 	let seen = seen.clone();
//! 	move || seen.borrow_mut().push(b.get())
//! });
//!
//! ripple::batch(|| {
//! 	a.set(3);
//! 	a.set(4);
//! });
//!
//! assert_eq!(*seen.borrow(), vec![20, 40]);
//! ```
//!
//! Propagation happens in two phases. A write synchronously marks every
//! reachable computed as stale and collects the reached reactions; the
//! pending reactions then run once each, pulling the computed values they
//! read. Computed values are recomputed at most once per change and a
//! recomputation that produces an equal value stops propagation there.
//!
//! All state is thread-local: each thread owns an independent graph.

pub mod equality;
pub mod macros;

mod batch;
mod computed;
mod config;
mod dependencies;
mod error;
mod evaluation;
#[cfg(target_arch = "wasm32")]
mod microtask;
mod node;
mod reaction;
mod value;
mod var;

use std::rc::{Rc, Weak};

pub use batch::{batch, flush, has_pending, in_batch};
pub use computed::Computed;
pub use config::{configure, ErrorHook, Flush, Settings};
pub use equality::{Equals, Identity};
pub use error::Error;
pub use evaluation::{is_tracking, on_cleanup, untracked};
pub use node::NodeId;
pub use reaction::{Reaction, Reactions};
pub use value::Value;
pub use var::Var;

/// A node that records what it reads and gets invalidated when any of it
/// changes.
pub(crate) trait Subscriber: 'static {
	fn id(&self) -> NodeId;

	/// Mark phase entry point. Must not run user code.
	fn invalidate(self: Rc<Self>, invalid: Invalid);

	/// Record that `source` was read during the current run.
	/// Returns `true` when the edge is new.
	fn based_on(&self, source: &Rc<dyn Observable>) -> bool;
}

/// A node that can be read by subscribers.
pub(crate) trait Observable: 'static {
	fn id(&self) -> NodeId;

	/// Bring the value up to date and return its version.
	fn update(self: Rc<Self>) -> Version;

	fn version(&self) -> Version;

	fn used_by(&self, id: NodeId, subscriber: Weak<dyn Subscriber>);

	fn not_used_by(&self, id: NodeId);
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum State {
	Valid,
	Invalid(Invalid),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Invalid {
	/// Something upstream changed, the node may still be up to date.
	Maybe,
	/// A direct dependency changed.
	Definitely,
}

impl State {
	pub(crate) fn invalidated(self, invalid: Invalid) -> State {
		match self {
			State::Invalid(Invalid::Definitely) => self,
			_ => State::Invalid(invalid),
		}
	}
}

/// Change counter of an observable value.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Version(u64);

impl Version {
	pub(crate) fn next(self) -> Version {
		Version(self.0.wrapping_add(1))
	}
}

/// Creates a [`Var`] compared with [`equality::identical`].
pub fn cell<T>(value: T) -> Var<T>
where
	T: Identity + 'static,
{
	Var::new(value)
}

pub fn cell_with_equals<T: 'static>(value: T, equals: Equals<T>) -> Var<T> {
	Var::with_equals(value, equals)
}

/// Creates a lazily evaluated [`Computed`].
pub fn derived<T, F>(func: F) -> Computed<T>
where
	T: Identity + 'static,
	F: Fn() -> T + 'static,
{
	Computed::new(func)
}

pub fn derived_with_equals<T, F>(func: F, equals: Equals<T>) -> Computed<T>
where
	T: 'static,
	F: Fn() -> T + 'static,
{
	Computed::with_equals(func, equals)
}

/// Creates a [`Reaction`] and runs it once.
///
/// The reaction lives until it is disposed or its last handle is dropped.
/// Reactions created while another reaction runs are also owned by that
/// reaction.
#[must_use]
pub fn reaction<F>(func: F) -> Reaction
where
	F: Fn() + 'static,
{
	Reaction::new(func)
}
