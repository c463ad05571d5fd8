//! Stable numeric type identity.
//!
//! Every descriptor created by the registry receives a `TypeKey` that is
//! unique for the lifetime of the process. Keys are handed out densely in
//! creation order, so a key doubles as an index into the registry's
//! descriptor table.

use std::fmt;

/// A 32-bit identity key for a registered type.
///
/// Two descriptors are the same type if and only if their keys are equal.
/// Comparison is O(1) and never structural.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct TypeKey(u32);

impl TypeKey {
    /// Sentinel value indicating no type.
    pub const NONE: Self = Self(u32::MAX);

    /// Create a key from a raw u32 value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check if this is the NONE sentinel.
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    /// Position of this key in the registry's descriptor table.
    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "TypeKey(NONE)")
        } else {
            write!(f, "TypeKey({})", self.0)
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests;
