//! Capability implementation table.
//!
//! Rust has no runtime query for "does `T` implement `Trait`?", so every
//! satisfying pair is registered explicitly, together with the two conversions
//! that turn a type-erased object into a `&dyn Trait` / `&mut dyn Trait`. The
//! pair of (data, conversion) is exactly a capability reference.
//!
//! # Design
//!
//! - Entries keyed by `(concrete key, capability key)` in a `DashMap`
//! - Conversions stored type-erased, recovered by downcasting to
//!   `CapabilityView<C>` when the caller names the capability type
//! - A generation counter bumps on every registration so cached membership
//!   answers on descriptors never go stale

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use smallvec::SmallVec;

use crate::class_info::ClassInfo;
use crate::key::TypeKey;

/// How a capability's methods reach the concrete value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Receiver {
    /// Methods work on the plain value. Plain values and pointers both satisfy
    /// the capability.
    Value,
    /// Methods need an addressable object. Only pointers satisfy the
    /// capability; plain values reach it through a materialized copy.
    Pointer,
}

type GetFn<C> = Box<dyn Fn(&dyn Any) -> Option<&C> + Send + Sync>;
type GetMutFn<C> = Box<dyn Fn(&mut dyn Any) -> Option<&mut C> + Send + Sync>;

/// Typed conversions from an erased object to capability `C`.
pub struct CapabilityView<C: ?Sized + 'static> {
    get: GetFn<C>,
    get_mut: GetMutFn<C>,
}

fn boxed_get<C, F>(f: F) -> GetFn<C>
where
    C: ?Sized + 'static,
    F: Fn(&dyn Any) -> Option<&C> + Send + Sync + 'static,
{
    Box::new(f)
}

fn boxed_get_mut<C, F>(f: F) -> GetMutFn<C>
where
    C: ?Sized + 'static,
    F: Fn(&mut dyn Any) -> Option<&mut C> + Send + Sync + 'static,
{
    Box::new(f)
}

impl<C: ?Sized + 'static> CapabilityView<C> {
    /// Build the conversions for concrete type `T`.
    pub fn new<T: Any>(as_ref: fn(&T) -> &C, as_mut: fn(&mut T) -> &mut C) -> Self {
        Self {
            get: boxed_get(move |object| object.downcast_ref::<T>().map(as_ref)),
            get_mut: boxed_get_mut(move |object| object.downcast_mut::<T>().map(as_mut)),
        }
    }

    /// View `object` as `C`. `None` if `object` is not the registered type.
    #[inline]
    pub fn get<'a>(&self, object: &'a dyn Any) -> Option<&'a C> {
        (self.get)(object)
    }

    /// Mutably view `object` as `C`.
    #[inline]
    pub fn get_mut<'a>(&self, object: &'a mut dyn Any) -> Option<&'a mut C> {
        (self.get_mut)(object)
    }
}

/// One registered "concrete type satisfies capability" fact.
pub struct ImplEntry {
    concrete: &'static ClassInfo,
    capability: &'static ClassInfo,
    receiver: Receiver,
    /// A `CapabilityView<C>` for the capability's Rust type `C`.
    view: Box<dyn Any + Send + Sync>,
}

impl ImplEntry {
    #[inline]
    pub fn concrete(&self) -> &'static ClassInfo {
        self.concrete
    }

    #[inline]
    pub fn capability(&self) -> &'static ClassInfo {
        self.capability
    }

    #[inline]
    pub fn receiver(&self) -> Receiver {
        self.receiver
    }

    /// Recover the typed conversions. `None` if `C` is not this entry's capability.
    pub fn view<C: ?Sized + 'static>(&self) -> Option<&CapabilityView<C>> {
        (*self.view).downcast_ref::<CapabilityView<C>>()
    }
}

impl fmt::Debug for ImplEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImplEntry")
            .field("concrete", &self.concrete.name())
            .field("capability", &self.capability.name())
            .field("receiver", &self.receiver)
            .finish_non_exhaustive()
    }
}

/// All registered implementations.
#[derive(Default)]
pub(crate) struct ImplTable {
    entries: DashMap<(TypeKey, TypeKey), Arc<ImplEntry>>,
    generation: AtomicU64,
}

impl ImplTable {
    pub(crate) fn insert<C: ?Sized + 'static>(
        &self,
        concrete: &'static ClassInfo,
        capability: &'static ClassInfo,
        receiver: Receiver,
        view: CapabilityView<C>,
    ) -> Arc<ImplEntry> {
        let entry = Arc::new(ImplEntry {
            concrete,
            capability,
            receiver,
            view: Box::new(view),
        });
        let previous = self
            .entries
            .insert((concrete.key(), capability.key()), Arc::clone(&entry));
        self.generation.fetch_add(1, Ordering::AcqRel);

        if previous.is_some() {
            tracing::debug!(
                concrete = concrete.name(),
                capability = capability.name(),
                ?receiver,
                "implementation replaced"
            );
        } else {
            tracing::debug!(
                concrete = concrete.name(),
                capability = capability.name(),
                ?receiver,
                "implementation registered"
            );
        }
        entry
    }

    pub(crate) fn get(&self, concrete: TypeKey, capability: TypeKey) -> Option<Arc<ImplEntry>> {
        self.entries
            .get(&(concrete, capability))
            .map(|entry| Arc::clone(entry.value()))
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub(crate) fn capabilities_of(&self, concrete: TypeKey) -> SmallVec<[&'static ClassInfo; 4]> {
        let mut out: SmallVec<[&'static ClassInfo; 4]> = self
            .entries
            .iter()
            .filter(|entry| entry.key().0 == concrete)
            .map(|entry| entry.value().capability)
            .collect();
        out.sort_by_key(|info| info.key());
        out
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
