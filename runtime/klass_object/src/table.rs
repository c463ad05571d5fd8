//! Per-thread side table from object address to live handle.
//!
//! Entries are weak, so the table never keeps a handle alive. They are
//! inserted at construction and erased at deinit or when the last handle
//! clone is dropped.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use klass_value::Address;
use rustc_hash::FxHashMap;

use crate::handle::Klass;

thread_local! {
    static LIVE: RefCell<FxHashMap<Address, Weak<Klass>>> = RefCell::new(FxHashMap::default());
}

/// Record `klass` as the live handle at `address`.
pub(crate) fn insert(address: Address, klass: &Rc<Klass>) {
    let result = LIVE.try_with(|live| {
        let previous = live.borrow_mut().insert(address, Rc::downgrade(klass));
        if previous.is_some_and(|previous| previous.strong_count() > 0) {
            tracing::warn!(%address, "address re-registered, earlier handle is no longer recoverable");
        }
    });
    if result.is_err() {
        tracing::trace!(%address, "side table already torn down");
    }
}

/// The live handle at `address`, if any.
pub(crate) fn get(address: Address) -> Option<Rc<Klass>> {
    LIVE.try_with(|live| live.borrow().get(&address).and_then(Weak::upgrade))
        .ok()
        .flatten()
}

/// Erase the entry at `address` if it belongs to `klass`.
pub(crate) fn remove(address: Address, klass: &Rc<Klass>) -> bool {
    let owner = Rc::downgrade(klass);
    LIVE.try_with(|live| {
        let mut live = live.borrow_mut();
        if live.get(&address).is_some_and(|entry| entry.ptr_eq(&owner)) {
            live.remove(&address);
            true
        } else {
            false
        }
    })
    .unwrap_or(false)
}

/// Erase the entry at `address` if its handle is gone.
pub(crate) fn remove_dead(address: Address) {
    // Ignored during thread teardown: the table is going away anyway.
    let _ = LIVE.try_with(|live| {
        let mut live = live.borrow_mut();
        if live.get(&address).is_some_and(|entry| entry.strong_count() == 0) {
            live.remove(&address);
        }
    });
}

/// Number of entries, dead or alive.
#[cfg(test)]
pub(crate) fn len() -> usize {
    LIVE.with(|live| live.borrow().len())
}
