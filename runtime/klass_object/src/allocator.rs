//! Storage providers for handles.

use std::cell::Cell;

use klass_types::{ClassInfo, Object};
use klass_value::ObjectCell;

/// Produces zero-initialized objects and takes them back at teardown.
pub trait Allocator {
    /// A zero-initialized instance of `class`, or `None` to decline.
    fn allocate(&self, class: &'static ClassInfo) -> Option<Box<dyn Object>>;

    /// Take back the storage of a deinitialized object.
    ///
    /// Other pointers to the same cell may still exist; the allocator only
    /// gives up its own reference.
    fn destroy(&self, class: &'static ClassInfo, cell: ObjectCell);
}

/// Allocates from the descriptor's zero constructor.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    fn allocate(&self, class: &'static ClassInfo) -> Option<Box<dyn Object>> {
        class.new_zeroed()
    }

    fn destroy(&self, class: &'static ClassInfo, cell: ObjectCell) {
        tracing::trace!(class = class.name(), "object released");
        drop(cell);
    }
}

/// Counts allocations and releases. Can be told to decline.
#[derive(Debug, Default)]
pub struct TrackingAllocator {
    allocated: Cell<usize>,
    destroyed: Cell<usize>,
    declining: Cell<bool>,
}

impl TrackingAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocated(&self) -> usize {
        self.allocated.get()
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.get()
    }

    /// Allocated and not yet destroyed.
    pub fn live(&self) -> usize {
        self.allocated().saturating_sub(self.destroyed())
    }

    /// Make every later `allocate` call decline (or succeed again).
    pub fn set_declining(&self, declining: bool) {
        self.declining.set(declining);
    }
}

impl Allocator for TrackingAllocator {
    fn allocate(&self, class: &'static ClassInfo) -> Option<Box<dyn Object>> {
        if self.declining.get() {
            tracing::debug!(class = class.name(), "allocation declined");
            return None;
        }
        let object = class.new_zeroed()?;
        self.allocated.set(self.allocated.get() + 1);
        Some(object)
    }

    fn destroy(&self, class: &'static ClassInfo, cell: ObjectCell) {
        self.destroyed.set(self.destroyed.get() + 1);
        tracing::trace!(class = class.name(), live = self.live(), "object released");
        drop(cell);
    }
}
