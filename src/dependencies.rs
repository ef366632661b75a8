use std::rc::{Rc, Weak};

use fxhash::FxBuildHasher;
use indexmap::map::Entry;
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::{Invalid, NodeId, Observable, Subscriber, Version};

type Edges<V> = IndexMap<NodeId, V, FxBuildHasher>;

/// Sources a subscriber read during its last run, with the version it saw.
#[derive(Default)]
pub(crate) struct Dependencies {
	based_on: Edges<(Weak<dyn Observable>, Version)>,
}

impl Dependencies {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn based_on(&mut self, source: &Rc<dyn Observable>) -> bool {
		let version = source.version();
		match self.based_on.entry(source.id()) {
			Entry::Occupied(mut entry) => {
				entry.get_mut().1 = version;
				false
			}
			Entry::Vacant(entry) => {
				entry.insert((Rc::downgrade(source), version));
				true
			}
		}
	}

	pub fn len(&self) -> usize {
		self.based_on.len()
	}

	pub fn take(&mut self) -> Dependencies {
		std::mem::take(self)
	}

	/// Removes `subscriber` from every source it was subscribed to.
	pub fn release(self, subscriber: NodeId) {
		for (_, (source, _)) in self.based_on {
			if let Some(source) = source.upgrade() {
				source.not_used_by(subscriber);
			}
		}
	}

	pub fn snapshot(&self) -> Snapshot {
		Snapshot {
			based_on: self
				.based_on
				.values()
				.map(|(source, version)| (source.clone(), *version))
				.collect(),
		}
	}
}

/// Copy of the dependency edges, checked without holding any borrow.
pub(crate) struct Snapshot {
	based_on: SmallVec<[(Weak<dyn Observable>, Version); 4]>,
}

impl Snapshot {
	/// Brings every source up to date, in the order they were read, and
	/// stops at the first one whose version moved. May run user code.
	pub fn are_valid(&self) -> bool {
		for (source, version) in &self.based_on {
			let Some(source) = source.upgrade() else {
				return false;
			};

			if source.update() != *version {
				return false;
			}
		}

		true
	}
}

/// Subscribers of an observable, in subscription order.
#[derive(Default)]
pub(crate) struct Dependents {
	used_by: Edges<Weak<dyn Subscriber>>,
}

impl Dependents {
	pub fn insert(&mut self, id: NodeId, subscriber: Weak<dyn Subscriber>) {
		self.used_by.entry(id).or_insert(subscriber);
	}

	pub fn remove(&mut self, id: NodeId) {
		self.used_by.shift_remove(&id);
	}

	pub fn len(&self) -> usize {
		self.used_by.len()
	}

	pub fn snapshot(&self) -> SmallVec<[Weak<dyn Subscriber>; 4]> {
		self.used_by.values().cloned().collect()
	}
}

/// Mark phase step over a snapshot taken with [`Dependents::snapshot`].
pub(crate) fn invalidate(subscribers: SmallVec<[Weak<dyn Subscriber>; 4]>, invalid: Invalid) {
	for subscriber in subscribers {
		if let Some(subscriber) = subscriber.upgrade() {
			subscriber.invalidate(invalid);
		}
	}
}
