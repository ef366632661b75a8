use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::batch::batch;
use crate::dependencies::Dependencies;
use crate::error::{report, Error};
use crate::evaluation::{untracked, Evaluation};
use crate::{Invalid, NodeId, Observable, State, Subscriber};

type Cleanup = Box<dyn FnOnce()>;

thread_local! {
	/// Reactions reached by a mark pass, in the order they were reached.
	pub(crate) static PENDING: RefCell<IndexMap<NodeId, Weak<ReactionBody>, FxBuildHasher>> =
		RefCell::new(IndexMap::default());
}

/// A group of reactions disposed together.
#[derive(Default, Clone)]
pub struct Reactions<const N: usize> {
	vec: SmallVec<[Reaction; N]>,
}

impl<const N: usize> Reactions<N> {
	pub fn new() -> Self {
		Reactions { vec: SmallVec::new() }
	}

	pub fn add(&mut self, reaction: Reaction) {
		self.vec.push(reaction);
	}

	pub fn len(&self) -> usize {
		self.vec.len()
	}

	pub fn is_empty(&self) -> bool {
		self.vec.is_empty()
	}

	pub fn dispose(&mut self) {
		for reaction in self.vec.drain(..) {
			reaction.dispose();
		}
	}
}

/// An eager subscriber: runs once when created and again after every change
/// of something it read.
///
/// Handles are shared. The reaction is disposed by [`Reaction::dispose`], by
/// the disposal or next run of the reaction that created it, or when its last
/// handle is dropped.
#[derive(Clone)]
pub struct Reaction {
	pub(crate) body: Rc<ReactionBody>,
}

pub(crate) struct ReactionBody {
	id: NodeId,
	name: &'static str,
	func: Box<dyn Fn()>,
	inner: RefCell<ReactionInner>,
}

struct ReactionInner {
	state: State,
	disposed: bool,
	/// Set while running, cleared when the run returns normally.
	failed: bool,
	runs: usize,
	dependencies: Dependencies,
	children: Reactions<4>,
	cleanups: SmallVec<[Cleanup; 1]>,
}

impl Reaction {
	#[must_use]
	pub fn new(func: impl Fn() + 'static) -> Self {
		Self::new_with_name("<unnamed>", func)
	}

	/// The name shows up in logs and in [`Error::ReactionPanicked`].
	#[must_use]
	pub fn new_with_name(name: &'static str, func: impl Fn() + 'static) -> Self {
		let reaction = Reaction {
			body: Rc::new(ReactionBody {
				id: NodeId::next(),
				name,
				func: Box::new(func),
				inner: RefCell::new(ReactionInner {
					state: State::Invalid(Invalid::Definitely),
					disposed: false,
					failed: false,
					runs: 0,
					dependencies: Dependencies::new(),
					children: Reactions::new(),
					cleanups: SmallVec::new(),
				}),
			}),
		};

		if let Some(owner) = Evaluation::owner() {
			owner.adopt(reaction.clone());
		}

		// Writes made by the first run are committed once it returns.
		batch(|| reaction.body.update());

		reaction
	}

	pub fn id(&self) -> NodeId {
		self.body.id
	}

	pub fn name(&self) -> &'static str {
		self.body.name
	}

	/// Stops the reaction and the reactions it created. Disposing twice is a
	/// no-op.
	pub fn dispose(&self) {
		self.body.dispose();
	}

	pub fn is_disposed(&self) -> bool {
		self.body.inner.borrow().disposed
	}

	/// How many times the reaction function was called.
	pub fn run_count(&self) -> usize {
		self.body.inner.borrow().runs
	}

	pub fn dependency_count(&self) -> usize {
		self.body.inner.borrow().dependencies.len()
	}
}

impl ReactionBody {
	/// Commit phase entry point. Panics are reported, never propagated.
	pub(crate) fn update(self: &Rc<Self>) {
		if let Err(payload) = catch_unwind(AssertUnwindSafe(|| self.update_unchecked())) {
			report(Error::panicked(self.name, payload));
		}
	}

	fn update_unchecked(self: &Rc<Self>) {
		let dependencies = {
			let inner = self.inner.borrow();
			match inner.state {
				_ if inner.disposed => return,
				State::Valid => return,
				State::Invalid(Invalid::Definitely) => None,
				State::Invalid(Invalid::Maybe) => Some(inner.dependencies.snapshot()),
			}
		};

		match dependencies {
			Some(dependencies) if dependencies.are_valid() => {
				self.inner.borrow_mut().state = State::Valid;
			}
			_ => self.run(),
		}
	}

	fn run(self: &Rc<Self>) {
		let (mut children, cleanups, dependencies) = {
			let mut inner = self.inner.borrow_mut();
			if inner.disposed {
				return;
			}

			inner.state = State::Valid;
			inner.failed = true;
			inner.runs += 1;
			(
				std::mem::take(&mut inner.children),
				std::mem::take(&mut inner.cleanups),
				inner.dependencies.take(),
			)
		};

		tracing::trace!(name = self.name, id = ?self.id, "reaction run");

		dependencies.release(self.id);
		children.dispose();
		run_cleanups(cleanups);

		{
			let _evaluation = Evaluation::owned(self);
			(self.func)();
		}

		self.inner.borrow_mut().failed = false;
	}

	fn dispose(&self) {
		let (mut children, cleanups, dependencies) = {
			let mut inner = self.inner.borrow_mut();
			if inner.disposed {
				return;
			}

			inner.disposed = true;
			(
				std::mem::take(&mut inner.children),
				std::mem::take(&mut inner.cleanups),
				inner.dependencies.take(),
			)
		};

		tracing::debug!(name = self.name, id = ?self.id, "reaction disposed");

		dependencies.release(self.id);
		children.dispose();
		run_cleanups(cleanups);
	}

	fn adopt(&self, child: Reaction) {
		let mut inner = self.inner.borrow_mut();
		if inner.disposed {
			drop(inner);
			child.dispose();
		} else {
			inner.children.add(child);
		}
	}

	pub(crate) fn add_cleanup(&self, cleanup: Cleanup) {
		let mut inner = self.inner.borrow_mut();
		if inner.disposed {
			drop(inner);
			untracked(cleanup);
		} else {
			inner.cleanups.push(cleanup);
		}
	}
}

fn run_cleanups(cleanups: SmallVec<[Cleanup; 1]>) {
	if cleanups.is_empty() {
		return;
	}

	untracked(|| {
		for cleanup in cleanups {
			cleanup();
		}
	});
}

impl Subscriber for ReactionBody {
	fn id(&self) -> NodeId {
		self.id
	}

	fn invalidate(self: Rc<Self>, invalid: Invalid) {
		{
			let mut inner = self.inner.borrow_mut();
			if inner.disposed {
				return;
			}

			// A reaction that panicked last time must run again even if
			// its sources settle to the versions it saw.
			let invalid = if inner.failed {
				Invalid::Definitely
			} else {
				invalid
			};
			inner.state = inner.state.invalidated(invalid);
		}

		PENDING.with(|pending| {
			pending
				.borrow_mut()
				.entry(self.id)
				.or_insert_with(|| Rc::downgrade(&self));
		});
	}

	fn based_on(&self, source: &Rc<dyn Observable>) -> bool {
		let mut inner = self.inner.borrow_mut();
		!inner.disposed && inner.dependencies.based_on(source)
	}
}

impl Drop for ReactionBody {
	fn drop(&mut self) {
		self.dispose();
	}
}

impl std::fmt::Debug for Reaction {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let inner = self.body.inner.borrow();
		f.debug_struct("Reaction")
			.field("name", &self.body.name)
			.field("id", &self.body.id)
			.field("runs", &inner.runs)
			.field("disposed", &inner.disposed)
			.finish()
	}
}
