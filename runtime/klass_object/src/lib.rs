//! Object lifecycle for klass.
//!
//! A [`Handle`] owns one addressable object from construction until
//! [`Handle::deinit`], which runs the type's deinit hook and hands the
//! storage back to the [`Allocator`] that produced it. Live handles can be
//! recovered from their object's address with [`Handle::from_address`].
//!
//! Handles are `!Send`: each thread has its own side table of live objects.

mod allocator;
mod handle;
mod table;

pub use allocator::{Allocator, SystemAllocator, TrackingAllocator};
pub use handle::{Handle, State};
