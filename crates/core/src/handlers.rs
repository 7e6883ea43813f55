//! Client-side "element not found" handlers.
//!
//! Handlers stand in for agent-side watchers: when a call fails because a
//! selector matched nothing, the device runs its handlers in registration
//! order. The first handler returning `true` stops the run and the failed
//! call is issued once more. Handlers may use the device themselves; calls
//! they make on the handler's thread never trigger the handlers again. Other
//! threads sharing the device still get their own handler runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::device::Device;

/// Identifies a registered handler for [`Handlers::off`].
pub type HandlerId = u64;

/// Handler callback. Returns `true` to request a retry of the failed call.
pub type HandlerFn = Arc<dyn Fn(&Device) -> bool + Send + Sync>;

/// Handler storage: [`IndexMap`] for O(1) removal with stable insertion order.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
	entries: Mutex<IndexMap<HandlerId, HandlerFn>>,
	next_id: AtomicU64,
	/// Threads currently inside [`HandlerRegistry::run`].
	running: Mutex<Vec<ThreadId>>,
}

struct RunGuard<'a> {
	running: &'a Mutex<Vec<ThreadId>>,
	thread: ThreadId,
}

impl Drop for RunGuard<'_> {
	fn drop(&mut self) {
		self.running.lock().retain(|t| *t != self.thread);
	}
}

impl HandlerRegistry {
	pub(crate) fn add(&self, handler: HandlerFn) -> HandlerId {
		let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
		self.entries.lock().insert(id, handler);
		id
	}

	pub(crate) fn remove(&self, id: HandlerId) -> bool {
		self.entries.lock().shift_remove(&id).is_some()
	}

	pub(crate) fn len(&self) -> usize {
		self.entries.lock().len()
	}

	/// Runs the handlers; true if one asked for a retry. Returns false
	/// without running anything when called from inside a handler on the
	/// same thread.
	pub(crate) fn run(&self, device: &Device) -> bool {
		let thread = thread::current().id();
		{
			let mut running = self.running.lock();
			if running.contains(&thread) {
				return false;
			}
			running.push(thread);
		}
		let _guard = RunGuard {
			running: &self.running,
			thread,
		};

		// Snapshot so handlers can register or remove handlers.
		let handlers: Vec<HandlerFn> = self.entries.lock().values().cloned().collect();
		if handlers.is_empty() {
			return false;
		}
		debug!(target = "uia", serial = device.serial(), count = handlers.len(), "running not-found handlers");
		handlers.iter().any(|handler| handler(device))
	}
}

/// Handler registration view returned by [`Device::handlers`].
pub struct Handlers<'d> {
	pub(crate) device: &'d Device,
}

impl Handlers<'_> {
	/// Registers `handler`.
	pub fn on<F>(&self, handler: F) -> HandlerId
	where
		F: Fn(&Device) -> bool + Send + Sync + 'static,
	{
		self.device.handler_registry().add(Arc::new(handler))
	}

	/// Unregisters a handler. Returns false if `id` was not registered.
	pub fn off(&self, id: HandlerId) -> bool {
		self.device.handler_registry().remove(id)
	}

	pub fn len(&self) -> usize {
		self.device.handler_registry().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
