use std::cell::{Cell, RefCell};
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use crate::batch;
use crate::dependencies::{self, Dependencies, Dependents};
use crate::equality::{self, Equals, Identity};
use crate::evaluation::{is_tracking, Evaluation};
use crate::value::{Access, Value};
use crate::{Invalid, NodeId, Observable, State, Subscriber, Version};

/// A lazily evaluated, memoized value derived from other reactive values.
///
/// The function runs on the first read and afterwards only when something it
/// read during its previous run changed. A result equal to the cached one
/// (according to the equality policy) does not count as a change, so nodes
/// reading this value are not rerun.
pub struct Computed<T>
where
	T: 'static,
{
	body: Rc<ComputedBody<T>>,
}

impl<T> Clone for Computed<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

pub(crate) struct ComputedBody<T>
where
	T: 'static,
{
	id: NodeId,
	func: Box<dyn Fn() -> T>,
	equals: Equals<T>,
	/// Shared so readers can hold the value while the node recomputes.
	value: RefCell<Option<Rc<T>>>,
	computing: Cell<bool>,
	inner: RefCell<ComputedInner>,
}

struct ComputedInner {
	state: State,
	version: Version,
	/// Last mark pass that reached this node.
	epoch: u64,
	used_by: Dependents,
	dependencies: Dependencies,
}

impl<T> Drop for ComputedBody<T> {
	fn drop(&mut self) {
		let dependencies = self.inner.get_mut().dependencies.take();
		dependencies.release(self.id);
	}
}

/// Resets the cycle guard on every exit path.
struct Computing<'a>(&'a Cell<bool>);

impl Drop for Computing<'_> {
	fn drop(&mut self) {
		self.0.set(false);
	}
}

impl<T> Computed<T>
where
	T: 'static,
{
	pub fn new(func: impl Fn() -> T + 'static) -> Self
	where
		T: Identity,
	{
		Self::with_equals(func, equality::identical)
	}

	pub fn with_equals(func: impl Fn() -> T + 'static, equals: Equals<T>) -> Self {
		Computed {
			body: Rc::new(ComputedBody {
				id: NodeId::next(),
				func: Box::new(func),
				equals,
				value: RefCell::new(None),
				computing: Cell::new(false),
				inner: RefCell::new(ComputedInner {
					state: State::Invalid(Invalid::Definitely),
					version: Version::default(),
					epoch: 0,
					used_by: Dependents::default(),
					dependencies: Dependencies::new(),
				}),
			}),
		}
	}

	#[inline]
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.with(T::clone)
	}

	/// Reads the value, recomputing it first if it is stale.
	///
	/// A panic of the function propagates to the caller and leaves the value
	/// stale, so the next read tries again.
	pub fn with<R>(&self, func: impl FnOnce(&T) -> R) -> R {
		if self.body.computing.get() {
			panic!("cycle detected: computed {:?} read itself", self.body.id);
		}

		if is_tracking() {
			// The edge must exist even if the update below panics.
			Evaluation::track(self.body.clone());
			self.body.clone().update();
			Evaluation::track(self.body.clone());
		} else {
			self.body.clone().update();
		}

		self.body.with_value(func)
	}

	#[inline]
	pub fn get_untracked(&self) -> T
	where
		T: Clone,
	{
		self.body.clone().update();
		self.body.with_value(T::clone)
	}

	pub fn state(&self) -> State {
		self.body.inner.borrow().state
	}

	/// Whether the next read may run the function.
	pub fn is_dirty(&self) -> bool {
		self.state() != State::Valid
	}

	pub fn id(&self) -> NodeId {
		self.body.id
	}

	pub fn dependency_count(&self) -> usize {
		self.body.inner.borrow().dependencies.len()
	}

	pub fn subscriber_count(&self) -> usize {
		self.body.inner.borrow().used_by.len()
	}
}

impl<T> ComputedBody<T>
where
	T: 'static,
{
	fn with_value<R>(&self, func: impl FnOnce(&T) -> R) -> R {
		// Released before `func` runs: it may write and trigger a recompute.
		let value = self.value.borrow().clone();
		match value {
			Some(value) => func(&*value),
			None => unreachable!("computed value is read only after a successful update"),
		}
	}

	fn recompute(self: &Rc<Self>) {
		if self.computing.replace(true) {
			panic!("cycle detected: computed {:?} depends on itself", self.id);
		}
		let _computing = Computing(&self.computing);

		let previous = {
			let mut inner = self.inner.borrow_mut();
			// Stays like this if the function panics.
			inner.state = State::Invalid(Invalid::Definitely);
			inner.dependencies.take()
		};
		previous.release(self.id);

		let value = {
			let _evaluation = Evaluation::new(self.clone());
			(self.func)()
		};

		let changed = match &*self.value.borrow() {
			Some(cached) => !(self.equals)(&**cached, &value),
			None => true,
		};

		if changed {
			let previous = self.value.replace(Some(Rc::new(value)));
			drop(previous);
		}

		let mut inner = self.inner.borrow_mut();
		inner.state = State::Valid;
		if changed {
			inner.version = inner.version.next();
		}

		tracing::trace!(id = ?self.id, changed, "computed recomputed");
	}
}

impl<T> Observable for ComputedBody<T>
where
	T: 'static,
{
	fn id(&self) -> NodeId {
		self.id
	}

	fn update(self: Rc<Self>) -> Version {
		let dependencies = {
			let inner = self.inner.borrow();
			match inner.state {
				State::Valid => None,
				State::Invalid(Invalid::Maybe) => Some(Some(inner.dependencies.snapshot())),
				State::Invalid(Invalid::Definitely) => Some(None),
			}
		};

		match dependencies {
			None => {}
			Some(Some(dependencies)) if dependencies.are_valid() => {
				self.inner.borrow_mut().state = State::Valid;
			}
			Some(_) => self.recompute(),
		}

		self.version()
	}

	fn version(&self) -> Version {
		self.inner.borrow().version
	}

	fn used_by(&self, id: NodeId, subscriber: Weak<dyn Subscriber>) {
		self.inner.borrow_mut().used_by.insert(id, subscriber);
	}

	fn not_used_by(&self, id: NodeId) {
		self.inner.borrow_mut().used_by.remove(id);
	}
}

impl<T> Subscriber for ComputedBody<T>
where
	T: 'static,
{
	fn id(&self) -> NodeId {
		self.id
	}

	fn invalidate(self: Rc<Self>, invalid: Invalid) {
		let dependents = {
			let mut inner = self.inner.borrow_mut();
			inner.state = inner.state.invalidated(invalid);

			let epoch = batch::epoch();
			if inner.epoch == epoch {
				return;
			}
			inner.epoch = epoch;
			inner.used_by.snapshot()
		};

		dependencies::invalidate(dependents, Invalid::Maybe);
	}

	fn based_on(&self, source: &Rc<dyn Observable>) -> bool {
		self.inner.borrow_mut().dependencies.based_on(source)
	}
}

impl<T> Access<T> for Computed<T>
where
	T: Clone + 'static,
{
	fn get(&self) -> T {
		Computed::get(self)
	}

	fn get_untracked(&self) -> T {
		Computed::get_untracked(self)
	}
}

impl<T> From<Computed<T>> for Value<T>
where
	T: Clone + 'static,
{
	fn from(computed: Computed<T>) -> Self {
		Value::new(Rc::new(computed))
	}
}

impl<T> Debug for Computed<T>
where
	T: Debug + 'static,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Computed")
			.field("id", &self.body.id)
			.field("state", &self.state())
			.field("value", &*self.body.value.borrow())
			.finish()
	}
}
