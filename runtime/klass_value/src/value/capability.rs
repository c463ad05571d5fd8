//! Capability references.
//!
//! A non-nil capability reference binds data to the [`ImplEntry`] of its
//! concrete type. Dispatch goes through the entry's typed view, so calling a
//! capability method never needs to know the concrete type.

use std::cell::{Ref, RefMut};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use klass_types::{registry, ClassInfo, ImplEntry};

use super::{Address, Instance, Ptr, Value};

/// The data bound into a capability reference.
#[derive(Clone, Debug)]
pub enum Data {
    /// A plain value, shared with whatever it was cast from.
    Value(Instance),
    /// An addressable object.
    Ptr(Ptr),
}

impl Data {
    /// The dynamic type of the bound data.
    pub fn class(&self) -> &'static ClassInfo {
        match self {
            Data::Value(instance) => instance.class(),
            Data::Ptr(ptr) => ptr.class(),
        }
    }
}

#[derive(Clone)]
struct Binding {
    data: Data,
    dispatch: Arc<ImplEntry>,
}

/// A reference of capability type, nil or bound.
#[derive(Clone)]
pub struct CapabilityValue {
    capability: &'static ClassInfo,
    binding: Option<Binding>,
}

/// Shared access to bound data through a capability.
pub enum View<'a, C: ?Sized> {
    /// Into a plain value.
    Direct(&'a C),
    /// Into an object cell, holding its borrow.
    Cell(Ref<'a, C>),
}

impl<C: ?Sized> Deref for View<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        match self {
            View::Direct(target) => target,
            View::Cell(target) => target,
        }
    }
}

impl CapabilityValue {
    /// The nil reference of `capability`.
    #[inline]
    pub fn nil(capability: &'static ClassInfo) -> Self {
        CapabilityValue {
            capability,
            binding: None,
        }
    }

    /// The nil reference of the capability `C`.
    pub fn nil_of<C: ?Sized + 'static>() -> Self {
        Self::nil(registry().capability::<C>())
    }

    pub(crate) fn bind(capability: &'static ClassInfo, data: Data, dispatch: Arc<ImplEntry>) -> Self {
        CapabilityValue {
            capability,
            binding: Some(Binding { data, dispatch }),
        }
    }

    /// The capability type.
    #[inline]
    pub fn capability(&self) -> &'static ClassInfo {
        self.capability
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        self.binding.is_none()
    }

    /// The dynamic type of the bound data. `None` when nil.
    pub fn concrete(&self) -> Option<&'static ClassInfo> {
        self.binding.as_ref().map(|binding| binding.data.class())
    }

    pub fn data(&self) -> Option<&Data> {
        self.binding.as_ref().map(|binding| &binding.data)
    }

    /// The implementation used for dispatch.
    pub fn dispatch(&self) -> Option<&ImplEntry> {
        self.binding.as_ref().map(|binding| &*binding.dispatch)
    }

    /// The bound data as a standalone value.
    pub fn underlying(&self) -> Option<Value> {
        self.data().map(|data| match data {
            Data::Value(instance) => Value::Concrete(instance.clone()),
            Data::Ptr(ptr) => Value::Ptr(ptr.clone()),
        })
    }

    /// Is the bound data an addressable object?
    pub fn is_pointer_backed(&self) -> bool {
        matches!(self.data(), Some(Data::Ptr(_)))
    }

    /// Address of pointer-backed data.
    pub fn address(&self) -> Option<Address> {
        match self.data()? {
            Data::Ptr(ptr) => Some(ptr.address()),
            Data::Value(_) => None,
        }
    }

    /// Borrow the bound data as `C`.
    ///
    /// `None` when nil, when `C` is not this reference's capability, or when
    /// the object is mutably borrowed.
    pub fn view<C: ?Sized + 'static>(&self) -> Option<View<'_, C>> {
        let binding = self.binding.as_ref()?;
        let view = binding.dispatch.view::<C>()?;
        match &binding.data {
            Data::Value(instance) => view.get(instance.object().as_any()).map(View::Direct),
            Data::Ptr(ptr) => {
                let guard = ptr.cell()?.try_borrow().ok()?;
                Ref::filter_map(guard, |object| view.get(object.as_any()))
                    .ok()
                    .map(View::Cell)
            }
        }
    }

    /// Mutably borrow the bound data as `C`.
    ///
    /// Only pointer-backed references can mutate; a reference to a plain
    /// value yields `None`.
    pub fn view_mut<C: ?Sized + 'static>(&self) -> Option<RefMut<'_, C>> {
        let binding = self.binding.as_ref()?;
        let view = binding.dispatch.view::<C>()?;
        let Data::Ptr(ptr) = &binding.data else {
            return None;
        };
        let guard = ptr.cell()?.try_borrow_mut().ok()?;
        RefMut::filter_map(guard, |object| view.get_mut(object.as_any_mut())).ok()
    }
}

impl fmt::Debug for CapabilityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.binding {
            None => write!(f, "{}(nil)", self.capability.name()),
            Some(binding) => write!(f, "{}({:?})", self.capability.name(), binding.data),
        }
    }
}
