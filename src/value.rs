use std::fmt::Debug;
use std::rc::Rc;

/// A read-only handle to any reactive value: a [`Var`](crate::Var), a
/// [`Computed`](crate::Computed) or a constant.
pub struct Value<T> {
	value: Rc<dyn Access<T>>,
}

impl<T> Clone for Value<T> {
	fn clone(&self) -> Self {
		Value {
			value: self.value.clone(),
		}
	}
}

impl<T> Value<T>
where
	T: 'static,
{
	pub(crate) fn new(value: Rc<dyn Access<T>>) -> Self {
		Value { value }
	}

	/// A value that never changes and is never tracked.
	pub fn constant(value: T) -> Self
	where
		T: Clone,
	{
		Value::new(Rc::new(Const(value)))
	}

	#[inline]
	pub fn get(&self) -> T {
		self.value.get()
	}

	#[inline]
	pub fn get_untracked(&self) -> T {
		self.value.get_untracked()
	}
}

pub(crate) trait Access<T> {
	fn get(&self) -> T;
	fn get_untracked(&self) -> T;
}

struct Const<T>(T);

impl<T: Clone> Access<T> for Const<T> {
	fn get(&self) -> T {
		self.0.clone()
	}

	fn get_untracked(&self) -> T {
		self.0.clone()
	}
}

impl<T> Debug for Value<T>
where
	T: Debug + 'static,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.get_untracked().fmt(f)
	}
}
