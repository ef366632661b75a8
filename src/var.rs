use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use crate::batch;
use crate::dependencies::{self, Dependents};
use crate::equality::{self, Equals, Identity};
use crate::evaluation::{is_tracking, Evaluation};
use crate::value::{Access, Value};
use crate::{Computed, Invalid, NodeId, Observable, Subscriber, Version};

/// A mutable reactive value, the leaf of the graph.
pub struct Var<T>
where
	T: 'static,
{
	body: Rc<VarBody<T>>,
}

pub(crate) struct VarBody<T> {
	id: NodeId,
	equals: Equals<T>,
	value: RefCell<T>,
	inner: RefCell<VarInner>,
}

struct VarInner {
	version: Version,
	used_by: Dependents,
}

impl<T> Clone for Var<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T> Default for Var<T>
where
	T: Default + Identity + 'static,
{
	fn default() -> Self {
		Var::new(Default::default())
	}
}

impl<T> Var<T>
where
	T: 'static,
{
	pub fn new(value: T) -> Self
	where
		T: Identity,
	{
		Self::with_equals(value, equality::identical)
	}

	pub fn with_equals(value: T, equals: Equals<T>) -> Self {
		Var {
			body: Rc::new(VarBody {
				id: NodeId::next(),
				equals,
				value: RefCell::new(value),
				inner: RefCell::new(VarInner {
					version: Version::default(),
					used_by: Dependents::default(),
				}),
			}),
		}
	}

	/// A computed value reading this var through `func`.
	pub fn map<F, R>(&self, func: F) -> Computed<R>
	where
		F: Fn(&T) -> R + 'static,
		R: Identity + 'static,
	{
		let this = self.clone();
		Computed::new(move || this.with(&func))
	}

	#[inline]
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.with(T::clone)
	}

	pub fn with<R>(&self, func: impl FnOnce(&T) -> R) -> R {
		if is_tracking() {
			Evaluation::track(self.body.clone());
		}

		func(&*self.body.value.borrow())
	}

	#[inline]
	pub fn get_untracked(&self) -> T
	where
		T: Clone,
	{
		self.body.value.borrow().clone()
	}

	/// Stores `value` unless the equality policy considers it equal to the
	/// current one, in which case nothing happens.
	pub fn set(&self, value: T) {
		let previous = {
			let mut current = self.body.value.borrow_mut();
			if (self.body.equals)(&*current, &value) {
				return;
			}
			std::mem::replace(&mut *current, value)
		};

		drop(previous);
		self.body.changed();
	}

	/// Stores `value` and returns the previous one. Subscribers are only
	/// notified when the two differ.
	pub fn replace(&self, value: T) -> T {
		let (previous, changed) = {
			let mut current = self.body.value.borrow_mut();
			let changed = !(self.body.equals)(&*current, &value);
			(std::mem::replace(&mut *current, value), changed)
		};

		if changed {
			self.body.changed();
		}

		previous
	}

	pub fn update(&self, func: impl FnOnce(&T) -> T) {
		let next = func(&*self.body.value.borrow());
		self.set(next);
	}

	pub fn id(&self) -> NodeId {
		self.body.id
	}

	pub fn subscriber_count(&self) -> usize {
		self.body.inner.borrow().used_by.len()
	}
}

impl<T> VarBody<T> {
	fn changed(&self) {
		let dependents = {
			let mut inner = self.inner.borrow_mut();
			inner.version = inner.version.next();
			inner.used_by.snapshot()
		};

		batch::propagate(|| dependencies::invalidate(dependents, Invalid::Definitely));
	}
}

impl<T: 'static> Observable for VarBody<T> {
	fn id(&self) -> NodeId {
		self.id
	}

	fn update(self: Rc<Self>) -> Version {
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

impl<T> Access<T> for Var<T>
where
	T: Clone + 'static,
{
	fn get(&self) -> T {
		Var::get(self)
	}

	fn get_untracked(&self) -> T {
		Var::get_untracked(self)
	}
}

impl<T> From<Var<T>> for Value<T>
where
	T: Clone + 'static,
{
	fn from(var: Var<T>) -> Self {
		Value::new(Rc::new(var))
	}
}

impl<T> Debug for Var<T>
where
	T: 'static + Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.body.value.borrow().fmt(f)
	}
}
