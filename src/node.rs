use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a node in the reactive graph.
///
/// Edges are keyed by id instead of by pointer, so removing an edge never
/// needs the other node to be alive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
	pub(crate) fn next() -> Self {
		static COUNTER: AtomicU64 = AtomicU64::new(1);
		NodeId(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

impl fmt::Debug for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ids_are_unique_and_increasing() {
		let a = NodeId::next();
		let b = NodeId::next();
		let c = NodeId::next();

		assert_ne!(a, b);
		assert!(a < b && b < c);
		assert_eq!(format!("{:?}", a), format!("#{}", a.0));
	}
}
