//! Type kinds and pre-computed kind flags.
//!
//! `TypeFlags` are computed once when a descriptor is created, so the nil
//! factory and the casting engine can ask "is this reference-like?" without
//! matching on the kind every time.

use bitflags::bitflags;

/// The shape of a registered type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TypeKind {
    /// A concrete Rust type stored by value.
    Concrete,
    /// A capability set (a trait used as `dyn Trait`).
    Capability,
    /// A pointer to an addressable object of the element type.
    Pointer,
    /// A growable sequence of dynamic values.
    Slice,
    /// A string-keyed associative mapping.
    Map,
    /// A buffered channel of dynamic values.
    Chan,
    /// A dynamically callable function.
    Func,
}

impl TypeKind {
    /// Flags implied by this kind.
    pub const fn flags(self) -> TypeFlags {
        match self {
            TypeKind::Concrete => TypeFlags::IS_CONCRETE,
            TypeKind::Capability => TypeFlags::IS_CAPABILITY.union(TypeFlags::NILLABLE),
            TypeKind::Pointer => TypeFlags::IS_POINTER
                .union(TypeFlags::NILLABLE)
                .union(TypeFlags::REFERENCE),
            TypeKind::Slice => TypeFlags::IS_SLICE
                .union(TypeFlags::NILLABLE)
                .union(TypeFlags::REFERENCE),
            TypeKind::Map => TypeFlags::IS_MAP
                .union(TypeFlags::NILLABLE)
                .union(TypeFlags::REFERENCE),
            TypeKind::Chan => TypeFlags::IS_CHAN
                .union(TypeFlags::NILLABLE)
                .union(TypeFlags::REFERENCE),
            TypeKind::Func => TypeFlags::IS_FUNC
                .union(TypeFlags::NILLABLE)
                .union(TypeFlags::REFERENCE),
        }
    }

    /// Lower-case name used in log fields and fault messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            TypeKind::Concrete => "concrete",
            TypeKind::Capability => "capability",
            TypeKind::Pointer => "pointer",
            TypeKind::Slice => "slice",
            TypeKind::Map => "map",
            TypeKind::Chan => "chan",
            TypeKind::Func => "func",
        }
    }
}

bitflags! {
    /// Pre-computed type properties for O(1) queries.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct TypeFlags: u16 {
        // === Kind Flags (bits 0-7) ===

        /// Concrete value type.
        const IS_CONCRETE = 1 << 0;
        /// Capability set.
        const IS_CAPABILITY = 1 << 1;
        /// Pointer type.
        const IS_POINTER = 1 << 2;
        /// Slice type.
        const IS_SLICE = 1 << 3;
        /// Map type.
        const IS_MAP = 1 << 4;
        /// Channel type.
        const IS_CHAN = 1 << 5;
        /// Function type.
        const IS_FUNC = 1 << 6;

        // === Behaviour Flags (bits 8-15) ===

        /// Values of this type can be nil.
        const NILLABLE = 1 << 8;
        /// Values of this type have an address of their own.
        const REFERENCE = 1 << 9;
    }
}

impl TypeFlags {
    /// Can values of this type be nil?
    #[inline]
    pub const fn is_nillable(self) -> bool {
        self.contains(TypeFlags::NILLABLE)
    }

    /// Do values of this type carry an address?
    #[inline]
    pub const fn is_reference(self) -> bool {
        self.contains(TypeFlags::REFERENCE)
    }
}
