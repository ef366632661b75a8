#![cfg(target_arch = "wasm32")]

use std::cell::Cell;

use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
	#[wasm_bindgen(js_name = queueMicrotask)]
	fn queue_microtask(closure: &JsValue);
}

thread_local! {
	static SCHEDULED: Cell<bool> = const { Cell::new(false) };
}

/// Queues a single flush for the current tick.
pub(crate) fn queue_flush() {
	if SCHEDULED.with(|scheduled| scheduled.replace(true)) {
		return;
	}

	let flush = Closure::once_into_js(|| {
		SCHEDULED.with(|scheduled| scheduled.set(false));
		crate::flush();
	});
	queue_microtask(&flush);
}
