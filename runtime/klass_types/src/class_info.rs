//! Per-type runtime descriptors.
//!
//! A `ClassInfo` is created exactly once per type by the registry and then
//! leaked, so every holder shares the same `&'static ClassInfo`. Pointer
//! identity and `TypeKey` equality are therefore interchangeable.
//!
//! # Mutable State
//!
//! Descriptors are read-only after creation except for two slots:
//! - the deinit hook, which can be installed at most once;
//! - the capability membership cache, filled lazily by
//!   [`TypeRegistry::implements`](crate::TypeRegistry::implements) and
//!   invalidated by the registry's implementation generation.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::flags::{TypeFlags, TypeKind};
use crate::key::TypeKey;
use crate::object::Object;

/// Teardown callback run by a handle's `deinit` before the allocator releases it.
pub type DeinitHook = Box<dyn Fn(&mut dyn Object) + Send + Sync>;

/// Cached answer to "does this type satisfy that capability?".
#[derive(Copy, Clone, Debug)]
struct Membership {
    /// Registry implementation generation the answer was computed at.
    generation: u64,
    satisfied: bool,
}

/// Everything needed to create a descriptor, minus its key.
pub(crate) struct ClassSeed {
    pub name: String,
    pub kind: TypeKind,
    pub rust_type: Option<TypeId>,
    pub elem: Option<&'static ClassInfo>,
    pub zero: Option<fn() -> Box<dyn Object>>,
}

/// Runtime metadata for one type.
pub struct ClassInfo {
    name: Box<str>,
    key: TypeKey,
    kind: TypeKind,
    flags: TypeFlags,
    /// The Rust type behind concrete and capability descriptors.
    rust_type: Option<TypeId>,
    /// Element type of pointers, slices, maps (value type) and channels.
    elem: Option<&'static ClassInfo>,
    zero: Option<fn() -> Box<dyn Object>>,
    deinit: OnceLock<DeinitHook>,
    memberships: RwLock<FxHashMap<TypeKey, Membership>>,
}

impl ClassInfo {
    pub(crate) fn from_seed(seed: ClassSeed, key: TypeKey) -> Self {
        Self {
            name: seed.name.into_boxed_str(),
            key,
            kind: seed.kind,
            flags: seed.kind.flags(),
            rust_type: seed.rust_type,
            elem: seed.elem,
            zero: seed.zero,
            deinit: OnceLock::new(),
            memberships: RwLock::new(FxHashMap::default()),
        }
    }

    /// Short display name (`Dog`, `Animal`, `*Dog`, `[Dog]`).
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stable identity key.
    #[inline]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    #[inline]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    #[inline]
    pub fn flags(&self) -> TypeFlags {
        self.flags
    }

    #[inline]
    pub fn is_capability(&self) -> bool {
        self.kind == TypeKind::Capability
    }

    #[inline]
    pub fn is_concrete(&self) -> bool {
        self.kind == TypeKind::Concrete
    }

    /// Element descriptor for composite kinds.
    #[inline]
    pub fn elem(&self) -> Option<&'static ClassInfo> {
        self.elem
    }

    /// The `TypeId` of the Rust type this descriptor was created from.
    #[inline]
    pub fn rust_type(&self) -> Option<TypeId> {
        self.rust_type
    }

    /// Was this descriptor created for the Rust type `T`?
    #[inline]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.rust_type == Some(TypeId::of::<T>())
    }

    /// Allocate the zero value of a concrete type.
    ///
    /// Returns `None` for every non-concrete kind.
    pub fn new_zeroed(&self) -> Option<Box<dyn Object>> {
        self.zero.map(|zero| zero())
    }

    /// Is a deinit hook installed?
    #[inline]
    pub fn has_deinit_hook(&self) -> bool {
        self.deinit.get().is_some()
    }

    /// Run the deinit hook on `object`, if one is installed.
    ///
    /// Returns whether a hook ran.
    pub fn run_deinit_hook(&self, object: &mut dyn Object) -> bool {
        match self.deinit.get() {
            Some(hook) => {
                hook(object);
                true
            }
            None => false,
        }
    }

    /// Install the deinit hook. Fails if one is already installed.
    pub(crate) fn set_deinit_hook(&self, hook: DeinitHook) -> bool {
        self.deinit.set(hook).is_ok()
    }

    pub(crate) fn cached_membership(&self, capability: TypeKey, generation: u64) -> Option<bool> {
        let guard = self.memberships.read();
        guard
            .get(&capability)
            .filter(|m| m.generation == generation)
            .map(|m| m.satisfied)
    }

    pub(crate) fn cache_membership(&self, capability: TypeKey, generation: u64, satisfied: bool) {
        self.memberships.write().insert(
            capability,
            Membership {
                generation,
                satisfied,
            },
        );
    }

    /// Number of cached capability answers (valid or stale).
    pub fn cached_membership_count(&self) -> usize {
        self.memberships.read().len()
    }
}

impl PartialEq for ClassInfo {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ClassInfo {}

impl Hash for ClassInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassInfo")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("elem", &self.elem.map(ClassInfo::key))
            .field("has_deinit_hook", &self.has_deinit_hook())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests;
