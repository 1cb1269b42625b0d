//! Shadow levels: nesting depth for speculative flow exploration.
//!
//! Pushing a level opens an empty list of pop callbacks. Popping runs that
//! list in reverse registration order, each callback exactly once, and then
//! drops back one level. Push and pop must be strictly nested; the caller is
//! responsible for balancing them.

use std::cell::{Cell, RefCell};
use std::fmt;

/// Cleanup run when its shadow level is popped.
pub type PopCallback = Box<dyn FnOnce()>;

/// Identifies a registered pop callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PopHandle {
    level: u32,
    serial: u64,
}

impl PopHandle {
    /// The level the callback was registered at.
    pub fn level(self) -> u32 {
        self.level
    }
}

/// Tracks the current shadow level and notifies listeners on pop.
pub trait ShadowStateManager {
    /// Current nesting depth; `0` is the authoritative state.
    fn shadow_level(&self) -> u32;

    /// Run `callback` once when the current level is popped.
    fn register_on_pop_state(&self, callback: PopCallback) -> PopHandle;

    /// Drop a callback before it fires. Returns whether it was still pending.
    fn unregister_on_pop_state(&self, handle: PopHandle) -> bool;
}

/// The standard [`ShadowStateManager`] implementation.
///
/// Uses interior mutability so owners can register callbacks while lending
/// themselves out by shared reference.
#[derive(Default)]
pub struct ShadowState {
    level: Cell<u32>,
    next_serial: Cell<u64>,
    callbacks: RefCell<Vec<Vec<(u64, PopCallback)>>>,
}

impl fmt::Debug for ShadowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowState")
            .field("level", &self.level.get())
            .field("pending", &self.pending_callbacks())
            .finish()
    }
}

impl ShadowState {
    /// Start at level 0 with no callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a deeper shadow level.
    pub fn push_state(&self) {
        self.callbacks.borrow_mut().push(Vec::new());
        self.level.set(self.level.get() + 1);
        tracing::trace!(level = self.level.get(), "pushed shadow state");
    }

    /// Leave the current shadow level, running its callbacks.
    ///
    /// Popping at level 0 is logged and ignored.
    pub fn pop_state(&self) {
        let level = self.level.get();
        if level == 0 {
            tracing::error!("pop_state called at shadow level 0");
            return;
        }

        // Release the borrow before running callbacks; they may inspect us.
        let pending = self.callbacks.borrow_mut().pop().unwrap_or_default();
        for (_, callback) in pending.into_iter().rev() {
            callback();
        }

        self.level.set(level - 1);
        tracing::trace!(level = level - 1, "popped shadow state");
    }

    /// Number of callbacks waiting across all levels.
    pub fn pending_callbacks(&self) -> usize {
        self.callbacks.borrow().iter().map(Vec::len).sum()
    }
}

impl ShadowStateManager for ShadowState {
    fn shadow_level(&self) -> u32 {
        self.level.get()
    }

    fn register_on_pop_state(&self, callback: PopCallback) -> PopHandle {
        let serial = self.next_serial.get();
        self.next_serial.set(serial + 1);
        let handle = PopHandle {
            level: self.level.get(),
            serial,
        };

        match self.callbacks.borrow_mut().last_mut() {
            Some(list) => list.push((serial, callback)),
            None => tracing::error!("pop callback registered at shadow level 0; it will never run"),
        }
        handle
    }

    fn unregister_on_pop_state(&self, handle: PopHandle) -> bool {
        if handle.level == 0 || handle.level > self.level.get() {
            return false;
        }
        let mut callbacks = self.callbacks.borrow_mut();
        let Some(list) = callbacks.get_mut(handle.level as usize - 1) else {
            return false;
        };
        let before = list.len();
        list.retain(|(serial, _)| *serial != handle.serial);
        list.len() != before
    }
}
