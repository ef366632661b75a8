use std::cell::Cell;
use std::rc::Rc;

use ripple::{batch, cell, configure, derived, flush, has_pending, in_batch, reaction, Error, Flush};


use mock::{capture_errors, Log};

#[test]
fn batch_runs_each_reaction_once() {
	let first = cell("John".to_string());
	let last = cell("Doe".to_string());
	let full = derived({
		let (first, last) = (first.clone(), last.clone());
		move || format!("{} {}", first.get(), last.get())
	});

	let log = Log::default();
	let _effect = reaction({
		let (full, log) = (full.clone(), log.clone());
		move || log.push(full.get())
	});

	batch(|| {
		first.set("Jane".into());
		last.set("Roe".into());
		// Reads inside the batch already see the new values.
		assert_eq!(full.get(), "Jane Roe");
		assert!(has_pending());
	});

	assert!(!has_pending());
	assert_eq!(log.take(), vec!["John Doe", "Jane Roe"]);
}

#[test]
fn batch_returns_the_value() {
	let a = cell(1);
	let doubled = batch(|| {
		a.set(21);
		a.get() * 2
	});

	assert_eq!(doubled, 42);
}

#[test]
fn nested_batches_flush_at_the_outermost() {
	let a = cell(0);
	let runs = Rc::new(Cell::new(0));
	let _effect = reaction({
		let (a, runs) = (a.clone(), runs.clone());
		move || {
			a.get();
			runs.set(runs.get() + 1);
		}
	});

	batch(|| {
		a.set(1);
		batch(|| a.set(2));
		assert_eq!(runs.get(), 1);
		a.set(3);
	});

	assert!(!in_batch());
	assert_eq!(runs.get(), 2);
}

#[test]
fn writes_back_to_the_initial_value_still_rerun_once() {
	let a = cell(0);
	let runs = Rc::new(Cell::new(0));
	let _effect = reaction({
		let (a, runs) = (a.clone(), runs.clone());
		move || {
			a.get();
			runs.set(runs.get() + 1);
		}
	});

	batch(|| {
		a.set(1);
		a.set(0);
	});

	assert_eq!(runs.get(), 2);
}

#[test]
fn manual_flush_coalesces_writes() {
	configure(|settings| settings.flush = Flush::Manual);

	let a = cell(0);
	let log = Log::default();
	let _effect = reaction({
		let (a, log) = (a.clone(), log.clone());
		move || log.push(a.get().to_string())
	});

	a.set(1);
	a.set(2);
	a.set(3);
	assert!(has_pending());
	assert_eq!(log.take(), vec!["0"]);

	flush();
	assert!(!has_pending());
	assert_eq!(log.take(), vec!["3"]);

	flush();
	assert!(log.take().is_empty());

	configure(|settings| settings.flush = Flush::Sync);
}

#[test]
fn writes_from_reactions_run_in_the_same_flush() {
	let source = cell(1);
	let doubled = cell(0);

	let _writer = reaction({
		let (source, doubled) = (source.clone(), doubled.clone());
		move || doubled.set(source.get() * 2)
	});

	let log = Log::default();
	let _reader = reaction({
		let (doubled, log) = (doubled.clone(), log.clone());
		move || log.push(doubled.get().to_string())
	});

	assert_eq!(log.take(), vec!["2"]);

	source.set(3);
	assert_eq!(doubled.get(), 6);
	assert_eq!(log.take(), vec!["6"]);
}

#[test]
fn runaway_reactions_hit_the_round_limit() {
	let errors = capture_errors();
	configure(|settings| settings.max_flush_rounds = 10);

	let a = cell(0);
	let runaway = reaction({
		let a = a.clone();
		move || {
			let next = a.get() + 1;
			a.set(next);
		}
	});

	assert_eq!(*errors.borrow(), vec![Error::FlushLimitExceeded { rounds: 10 }]);
	assert_eq!(a.get(), 11);
	assert!(!has_pending());

	runaway.dispose();
	a.set(0);
	assert_eq!(a.get(), 0);
	assert_eq!(errors.borrow().len(), 1);

	configure(|settings| {
		settings.max_flush_rounds = 1000;
		settings.on_error = None;
	});
}

#[test]
fn unbatched_writes_in_one_tick_commit_once() {
	configure(|settings| settings.flush = Flush::Manual);

	let a = cell(0);
	let runs = Rc::new(Cell::new(0));
	let _effect = reaction({
		let (a, runs) = (a.clone(), runs.clone());
		move || {
			a.get();
			runs.set(runs.get() + 1);
		}
	});

	a.set(1);
	a.set(2);
	a.set(3);
	assert_eq!(runs.get(), 1);

	// End of the host tick.
	flush();
	assert_eq!(runs.get(), 2);

	configure(|settings| settings.flush = Flush::Sync);
}

#[test]
fn sync_mode_commits_every_write() {
	assert_eq!(ripple::Settings::default().flush, Flush::Sync);

	let a = cell(0);
	let runs = Rc::new(Cell::new(0));
	let _effect = reaction({
		let (a, runs) = (a.clone(), runs.clone());
		move || {
			a.get();
			runs.set(runs.get() + 1);
		}
	});

	a.set(1);
	a.set(2);
	a.set(3);
	assert_eq!(runs.get(), 4);
}
