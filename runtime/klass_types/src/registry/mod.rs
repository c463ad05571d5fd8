//! The process-wide type registry.
//!
//! Maps a type's static identity to its memoized [`ClassInfo`]. Follows the
//! sharded double-checked pattern of a string interner: lookups take a shard
//! read lock, and creation re-checks under the write lock so concurrent first
//! use of a type never produces two descriptors.
//!
//! # Identity
//!
//! Concrete and capability descriptors are keyed by `std::any::TypeId`, in
//! separate key spaces: asking for `capability::<T>()` never changes what
//! `class::<T>()` returns.
//! Composite kinds (pointer, slice, map, channel) are keyed structurally by
//! their element's `TypeKey`, so `pointer_to(Dog)` is interned once just like
//! `Dog` itself.
//!
//! Descriptors are leaked on creation and live until process exit.

mod impls;

use std::any::{type_name, TypeId};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::class_info::{ClassInfo, ClassSeed};
use crate::fault::Fault;
use crate::flags::TypeKind;
use crate::key::TypeKey;
use crate::name::short_type_name;
use crate::object::{zero_object, Object};

pub use impls::{CapabilityView, ImplEntry, Receiver};

use impls::ImplTable;

/// Structural identity of a descriptor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum DescriptorKey {
    Class(TypeId),
    Capability(TypeId),
    Pointer(TypeKey),
    Slice(TypeKey),
    Map(TypeKey),
    Chan(TypeKey),
    Func,
}

/// Per-shard storage of created descriptors.
#[derive(Default)]
struct RegistryShard {
    map: FxHashMap<DescriptorKey, &'static ClassInfo>,
}

/// Number of shards for descriptor lookup.
const NUM_SHARDS: usize = 16;

/// Registry of type descriptors and capability implementations.
///
/// # Thread Safety
/// Uses `RwLock` per shard for concurrent lookup and creation. The
/// implementation table is a `DashMap`. The whole registry is `Sync` and is
/// normally reached through [`registry()`].
pub struct TypeRegistry {
    shards: [RwLock<RegistryShard>; NUM_SHARDS],
    /// Descriptors indexed by `TypeKey`.
    by_key: RwLock<Vec<&'static ClassInfo>>,
    impls: ImplTable,
}

static REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();

/// The process-wide registry, created on first use.
pub fn registry() -> &'static TypeRegistry {
    REGISTRY.get_or_init(TypeRegistry::new)
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            shards: std::array::from_fn(|_| RwLock::new(RegistryShard::default())),
            by_key: RwLock::new(Vec::with_capacity(64)),
            impls: ImplTable::default(),
        }
    }

    /// Compute shard index for a descriptor key based on its hash.
    #[inline]
    fn shard_for(key: &DescriptorKey) -> usize {
        let mut hasher = rustc_hash::FxHasher::default();
        key.hash(&mut hasher);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "truncation is fine for hash-based shard selection"
        )]
        let hash_usize = hasher.finish() as usize;
        hash_usize % NUM_SHARDS
    }

    /// Key for the next descriptor when `len` already exist.
    fn next_key(len: usize) -> Result<TypeKey, Fault> {
        u32::try_from(len)
            .ok()
            .filter(|&raw| raw != TypeKey::NONE.raw())
            .map(TypeKey::from_raw)
            .ok_or_else(|| {
                tracing::error!(len, "type registry is full");
                Fault::RegistryFull { count: len }
            })
    }

    /// Return the descriptor for `key`, creating it from `seed` on first use.
    ///
    /// # Errors
    /// [`Fault::RegistryFull`] when the key space is exhausted.
    fn try_get_or_create(
        &self,
        key: DescriptorKey,
        seed: impl FnOnce() -> ClassSeed,
    ) -> Result<&'static ClassInfo, Fault> {
        let shard = &self.shards[Self::shard_for(&key)];

        // Fast path: already created
        {
            let guard = shard.read();
            if let Some(&info) = guard.map.get(&key) {
                return Ok(info);
            }
        }

        // Slow path: need to create
        let mut guard = shard.write();

        // Double-check after acquiring write lock
        if let Some(&info) = guard.map.get(&key) {
            return Ok(info);
        }

        let seed = seed();
        let info: &'static ClassInfo = {
            let mut table = self.by_key.write();
            let type_key = Self::next_key(table.len())?;
            let info: &'static ClassInfo =
                Box::leak(Box::new(ClassInfo::from_seed(seed, type_key)));
            table.push(info);
            info
        };
        guard.map.insert(key, info);

        tracing::debug!(
            name = info.name(),
            key = %info.key(),
            kind = info.kind().as_str(),
            "descriptor created"
        );
        Ok(info)
    }

    /// Infallible form of [`try_get_or_create`](Self::try_get_or_create).
    ///
    /// # Panics
    /// Panics when the key space is exhausted (over 4 billion descriptors).
    fn get_or_create(
        &self,
        key: DescriptorKey,
        seed: impl FnOnce() -> ClassSeed,
    ) -> &'static ClassInfo {
        self.try_get_or_create(key, seed).unwrap_or_else(|fault| panic!("{fault}"))
    }

    /// Descriptor of the concrete type `T`, or a fault if the registry is full.
    ///
    /// # Errors
    /// [`Fault::RegistryFull`] when the key space is exhausted.
    pub fn try_class<T: Object + Default>(&self) -> Result<&'static ClassInfo, Fault> {
        self.try_get_or_create(DescriptorKey::Class(TypeId::of::<T>()), Self::class_seed::<T>)
    }

    /// Descriptor of the concrete type `T`.
    ///
    /// Idempotent: every call for the same `T` returns the same descriptor,
    /// and its kind is always [`TypeKind::Concrete`].
    /// Use `try_class` for fallible creation.
    pub fn class<T: Object + Default>(&self) -> &'static ClassInfo {
        self.get_or_create(DescriptorKey::Class(TypeId::of::<T>()), Self::class_seed::<T>)
    }

    fn class_seed<T: Object + Default>() -> ClassSeed {
        ClassSeed {
            name: short_type_name(type_name::<T>()),
            kind: TypeKind::Concrete,
            rust_type: Some(TypeId::of::<T>()),
            elem: None,
            zero: Some(zero_object::<T>),
        }
    }

    /// Descriptor of the capability set `C`, normally a `dyn Trait`.
    ///
    /// Capability descriptors live apart from class descriptors, so even a
    /// sized `C` leaves `class::<C>()` concrete.
    pub fn capability<C: ?Sized + 'static>(&self) -> &'static ClassInfo {
        self.get_or_create(DescriptorKey::Capability(TypeId::of::<C>()), || ClassSeed {
            name: short_type_name(type_name::<C>()),
            kind: TypeKind::Capability,
            rust_type: Some(TypeId::of::<C>()),
            elem: None,
            zero: None,
        })
    }

    /// Descriptor of a pointer to `elem`.
    pub fn pointer_to(&self, elem: &'static ClassInfo) -> &'static ClassInfo {
        self.get_or_create(DescriptorKey::Pointer(elem.key()), || {
            Self::composite_seed(format!("*{}", elem.name()), TypeKind::Pointer, Some(elem))
        })
    }

    /// Descriptor of a pointer to the concrete type `T`.
    pub fn pointer<T: Object + Default>(&self) -> &'static ClassInfo {
        self.pointer_to(self.class::<T>())
    }

    /// Descriptor of a slice of `elem`.
    pub fn slice_of(&self, elem: &'static ClassInfo) -> &'static ClassInfo {
        self.get_or_create(DescriptorKey::Slice(elem.key()), || {
            Self::composite_seed(format!("[{}]", elem.name()), TypeKind::Slice, Some(elem))
        })
    }

    /// Descriptor of a string-keyed map with `value` values.
    pub fn map_of(&self, value: &'static ClassInfo) -> &'static ClassInfo {
        self.get_or_create(DescriptorKey::Map(value.key()), || {
            Self::composite_seed(format!("map[String]{}", value.name()), TypeKind::Map, Some(value))
        })
    }

    /// Descriptor of a channel of `elem`.
    pub fn chan_of(&self, elem: &'static ClassInfo) -> &'static ClassInfo {
        self.get_or_create(DescriptorKey::Chan(elem.key()), || {
            Self::composite_seed(format!("chan {}", elem.name()), TypeKind::Chan, Some(elem))
        })
    }

    /// Descriptor of the dynamic function type.
    pub fn func(&self) -> &'static ClassInfo {
        self.get_or_create(DescriptorKey::Func, || {
            Self::composite_seed("fn".to_owned(), TypeKind::Func, None)
        })
    }

    fn composite_seed(name: String, kind: TypeKind, elem: Option<&'static ClassInfo>) -> ClassSeed {
        ClassSeed {
            name,
            kind,
            rust_type: None,
            elem,
            zero: None,
        }
    }

    /// Look up a descriptor by key.
    pub fn lookup(&self, key: TypeKey) -> Option<&'static ClassInfo> {
        self.by_key.read().get(key.index()).copied()
    }

    /// Number of descriptors created so far.
    pub fn len(&self) -> usize {
        self.by_key.read().len()
    }

    /// Has no descriptor been created yet?
    pub fn is_empty(&self) -> bool {
        self.by_key.read().is_empty()
    }

    /// Record that `T` satisfies capability `C`.
    ///
    /// `as_ref`/`as_mut` are the unsizing conversions, normally `|v| v`; the
    /// [`implements!`](crate::implements) macro writes them for you.
    /// Registering the same pair again replaces the earlier entry.
    pub fn implement<T, C>(
        &self,
        receiver: Receiver,
        as_ref: fn(&T) -> &C,
        as_mut: fn(&mut T) -> &mut C,
    ) -> Arc<ImplEntry>
    where
        T: Object + Default,
        C: ?Sized + 'static,
    {
        let concrete = self.class::<T>();
        let capability = self.capability::<C>();
        self.impls.insert(
            concrete,
            capability,
            receiver,
            CapabilityView::new(as_ref, as_mut),
        )
    }

    /// The registered implementation of `capability` for `concrete`, if any.
    pub fn implementation(
        &self,
        concrete: &'static ClassInfo,
        capability: &'static ClassInfo,
    ) -> Option<Arc<ImplEntry>> {
        self.impls.get(concrete.key(), capability.key())
    }

    /// Does the method set of `ty` cover `capability`?
    ///
    /// - a concrete type satisfies it through a value-receiver implementation;
    /// - a pointer type satisfies it through any implementation of its pointee;
    /// - no other kind satisfies a capability.
    ///
    /// The answer is cached on `ty`'s descriptor.
    pub fn implements(&self, ty: &'static ClassInfo, capability: &'static ClassInfo) -> bool {
        if !capability.is_capability() {
            return false;
        }

        let generation = self.impls.generation();
        if let Some(hit) = ty.cached_membership(capability.key(), generation) {
            return hit;
        }

        let satisfied = match ty.kind() {
            TypeKind::Concrete => self
                .implementation(ty, capability)
                .is_some_and(|entry| entry.receiver() == Receiver::Value),
            TypeKind::Pointer => ty
                .elem()
                .and_then(|elem| self.implementation(elem, capability))
                .is_some(),
            _ => false,
        };

        ty.cache_membership(capability.key(), generation, satisfied);
        tracing::trace!(
            ty = ty.name(),
            capability = capability.name(),
            satisfied,
            "membership computed"
        );
        satisfied
    }

    /// Capabilities registered for `concrete`, ordered by key.
    pub fn capabilities_of(&self, concrete: &'static ClassInfo) -> SmallVec<[&'static ClassInfo; 4]> {
        self.impls.capabilities_of(concrete.key())
    }

    /// Number of registered implementations.
    pub fn implementation_count(&self) -> usize {
        self.impls.len()
    }

    /// Install the deinit hook of `T`'s descriptor.
    ///
    /// Returns `false` if a hook was already installed; the first hook stays.
    pub fn on_deinit<T, F>(&self, hook: F) -> bool
    where
        T: Object + Default,
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        let info = self.class::<T>();
        let installed = info.set_deinit_hook(Box::new(move |object: &mut dyn Object| {
            if let Some(value) = object.downcast_mut::<T>() {
                hook(value);
            }
        }));
        if !installed {
            tracing::warn!(name = info.name(), "deinit hook already installed");
        }
        installed
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
