//! Object identity as an integer.

use std::fmt;
use std::rc::Rc;

/// Address of a heap object.
///
/// Only ever compared and used as a lookup key; never dereferenced.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(usize);

impl Address {
    /// The address of nothing.
    pub const NULL: Address = Address(0);

    /// Address of the allocation behind `rc`.
    #[inline]
    pub fn of<T: ?Sized>(rc: &Rc<T>) -> Self {
        Address(Rc::as_ptr(rc).cast::<()>() as usize)
    }

    #[inline]
    pub const fn from_raw(raw: usize) -> Self {
        Address(raw)
    }

    #[inline]
    pub const fn raw(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Address(NULL)")
        } else {
            write!(f, "Address({:#x})", self.0)
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
