//! Equality policies deciding whether a write or a recomputation is a change.
//!
//! An equal value stops propagation: subscribers are not invalidated by a
//! [`Var`](crate::Var) write and are not rerun after a
//! [`Computed`](crate::Computed) recomputation.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::rc::Rc;
use std::sync::Arc;

pub type Equals<T> = fn(&T, &T) -> bool;

/// Identity comparison, the default policy.
///
/// Scalars and strings compare by value. `NaN` is never identical to itself,
/// so writing it always notifies. Shared pointers compare by address. Owned
/// containers are never identical: every write moves in a fresh value, use
/// [`structural`] to compare their contents.
pub trait Identity {
	fn identical(&self, other: &Self) -> bool;
}

pub fn identical<T: Identity>(a: &T, b: &T) -> bool {
	a.identical(b)
}

/// Deep comparison through `PartialEq`, element-wise for containers.
pub fn structural<T: PartialEq>(a: &T, b: &T) -> bool {
	a == b
}

/// Compares 64-bit fxhash digests. Cheap for large values that are hashed
/// anyway, at the price of treating colliding values as equal.
pub fn hashed<T: Hash>(a: &T, b: &T) -> bool {
	fxhash::hash64(a) == fxhash::hash64(b)
}

/// Every write and every recomputation is a change.
pub fn never<T>(_: &T, _: &T) -> bool {
	false
}

macro_rules! by_value {
	($($ty:ty),* $(,)?) => {
		$(
			impl Identity for $ty {
				#[inline]
				fn identical(&self, other: &Self) -> bool {
					self == other
				}
			}
		)*
	};
}

by_value!(
	(),
	bool,
	char,
	u8,
	u16,
	u32,
	u64,
	u128,
	usize,
	i8,
	i16,
	i32,
	i64,
	i128,
	isize,
	f32,
	f64,
	String,
	&'static str,
);

macro_rules! never_identical {
	($($ty:ident<$($param:ident),*>),* $(,)?) => {
		$(
			impl<$($param),*> Identity for $ty<$($param),*> {
				#[inline]
				fn identical(&self, _: &Self) -> bool {
					false
				}
			}
		)*
	};
}

never_identical!(
	Vec<T>,
	VecDeque<T>,
	Box<T>,
	HashMap<K, V, S>,
	HashSet<T, S>,
	BTreeMap<K, V>,
	BTreeSet<T>,
);

impl<T: ?Sized> Identity for Rc<T> {
	fn identical(&self, other: &Self) -> bool {
		Rc::ptr_eq(self, other)
	}
}

impl<T: ?Sized> Identity for Arc<T> {
	fn identical(&self, other: &Self) -> bool {
		Arc::ptr_eq(self, other)
	}
}

impl<T: ?Sized> Identity for std::rc::Weak<T> {
	fn identical(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}

impl<T: Identity> Identity for Option<T> {
	fn identical(&self, other: &Self) -> bool {
		match (self, other) {
			(Some(a), Some(b)) => a.identical(b),
			(None, None) => true,
			_ => false,
		}
	}
}

impl<A: Identity, B: Identity> Identity for (A, B) {
	fn identical(&self, other: &Self) -> bool {
		self.0.identical(&other.0) && self.1.identical(&other.1)
	}
}

impl<A: Identity, B: Identity, C: Identity> Identity for (A, B, C) {
	fn identical(&self, other: &Self) -> bool {
		self.0.identical(&other.0) && self.1.identical(&other.1) && self.2.identical(&other.2)
	}
}
