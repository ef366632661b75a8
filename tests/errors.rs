use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use ripple::{cell, derived, reaction, Error, Reaction};


use mock::{capture_errors, Log};

#[test]
fn failing_computed_leaves_siblings_working() {
	let a = cell(1);
	let fragile = derived({
		let a = a.clone();
		move || {
			let value = a.get();
			if value == 2 {
				panic!("two is not allowed");
			}
			value
		}
	});
	let sturdy = derived({
		let a = a.clone();
		move || a.get() * 10
	});

	assert_eq!(fragile.get(), 1);

	a.set(2);
	let result = catch_unwind(AssertUnwindSafe(|| fragile.get()));
	assert!(result.is_err());
	assert!(fragile.is_dirty());
	assert_eq!(sturdy.get(), 20);

	// The edge read before the panic is kept, so the next change retries.
	assert_eq!(fragile.dependency_count(), 1);
	a.set(3);
	assert_eq!(fragile.get(), 3);
	assert_eq!(sturdy.get(), 30);
}

#[test]
fn reaction_panics_are_reported_and_contained() {
	let errors = capture_errors();
	let a = cell(0);
	let log = Log::default();

	let _flaky = Reaction::new_with_name("flaky", {
		let (a, log) = (a.clone(), log.clone());
		move || {
			let value = a.get();
			if value == 1 {
				panic!("boom at {}", value);
			}
			log.push(format!("flaky {}", value));
		}
	});
	let _steady = reaction({
		let (a, log) = (a.clone(), log.clone());
		move || log.push(format!("steady {}", a.get()))
	});

	a.set(1);
	assert_eq!(log.take(), vec!["flaky 0", "steady 0", "steady 1"]);
	assert_eq!(
		*errors.borrow(),
		vec![Error::ReactionPanicked {
			name: "flaky",
			message: "boom at 1".into(),
		}]
	);

	a.set(2);
	assert_eq!(log.take(), vec!["flaky 2", "steady 2"]);
	assert_eq!(errors.borrow().len(), 1);

	ripple::configure(|settings| settings.on_error = None);
}

#[test]
fn failed_reaction_reruns_when_sources_settle() {
	let errors = capture_errors();
	let a = cell(0);
	let parity = derived({
		let a = a.clone();
		move || a.get() % 2
	});

	let fail = Rc::new(Cell::new(false));
	let effect = reaction({
		let (parity, fail) = (parity.clone(), fail.clone());
		move || {
			parity.get();
			if fail.get() {
				panic!("failing on purpose");
			}
		}
	});

	fail.set(true);
	a.set(1);
	assert_eq!(effect.run_count(), 2);
	assert_eq!(errors.borrow().len(), 1);

	// Parity stays 1, yet the failed run is retried.
	fail.set(false);
	a.set(3);
	assert_eq!(effect.run_count(), 3);

	// Back to normal: an unchanged parity skips the run.
	a.set(5);
	assert_eq!(effect.run_count(), 3);
	assert_eq!(errors.borrow().len(), 1);

	ripple::configure(|settings| settings.on_error = None);
}

#[test]
fn first_run_panic_is_reported() {
	let errors = capture_errors();

	let effect = Reaction::new_with_name("broken", || panic!("{}", "static message"));

	assert_eq!(effect.run_count(), 1);
	assert!(!effect.is_disposed());
	assert!(matches!(
		errors.borrow().as_slice(),
		[Error::ReactionPanicked { name: "broken", .. }]
	));

	ripple::configure(|settings| settings.on_error = None);
}

#[test]
fn unhandled_errors_are_logged() {
	mock::init_tracing();

	let a = cell(0);
	let _effect = reaction({
		let a = a.clone();
		move || {
			if a.get() > 0 {
				panic!("logged, not propagated");
			}
		}
	});

	a.set(1);
	assert_eq!(a.get(), 1);
}
