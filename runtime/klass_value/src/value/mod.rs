//! Runtime values.
//!
//! # Ownership
//!
//! - [`Instance`]: an immutable plain value behind an `Rc`. Cloning shares
//!   storage; [`Instance::update`] copies on write.
//! - [`Ptr`]: a reference to an addressable, mutable object cell. Cloning a
//!   pointer aliases the same object.
//! - Slices, maps, channels and functions are reference kinds with a nil
//!   state.
//! - [`CapabilityValue`]: bound data plus the implementation entry used for
//!   dispatch.
//!
//! Values are single-threaded (`Rc`/`RefCell`); descriptors are shared
//! process-wide.

mod address;
mod capability;
mod composite;

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use klass_types::{registry, ClassInfo, Object, TypeKind};

pub use address::Address;
pub use capability::{CapabilityValue, Data, View};
pub use composite::{Chan, Func, MapValue, Slice};

/// Shared, mutable storage of an addressable object.
pub type ObjectCell = Rc<RefCell<Box<dyn Object>>>;

/// A dynamically typed runtime value.
#[derive(Clone)]
pub enum Value {
    /// The untyped nil: no type, no data.
    Nil,
    /// A plain value of a concrete type.
    Concrete(Instance),
    /// A pointer to a concrete object, possibly null.
    Ptr(Ptr),
    Slice(Slice),
    Map(MapValue),
    Chan(Chan),
    Func(Func),
    /// A capability reference, possibly nil.
    Capability(CapabilityValue),
}

impl Value {
    /// A plain value.
    pub fn of<T: Object>(value: T) -> Self {
        Value::Concrete(Instance::new(value))
    }

    /// A pointer to a fresh object holding `value`.
    pub fn ptr<T: Object>(value: T) -> Self {
        Value::Ptr(Ptr::new(value))
    }

    /// A typed null pointer to `T`.
    pub fn null<T: Object + Default>() -> Self {
        Value::Ptr(Ptr::null(registry().class::<T>()))
    }

    /// The static runtime type of this value. `None` for untyped nil.
    ///
    /// For a capability reference this is the capability itself; see
    /// [`Value::concrete_class`] for the bound type.
    pub fn class(&self) -> Option<&'static ClassInfo> {
        match self {
            Value::Nil => None,
            Value::Concrete(instance) => Some(instance.class()),
            Value::Ptr(ptr) => Some(ptr.class()),
            Value::Slice(slice) => Some(slice.class()),
            Value::Map(map) => Some(map.class()),
            Value::Chan(chan) => Some(chan.class()),
            Value::Func(_) => Some(registry().func()),
            Value::Capability(cap) => Some(cap.capability()),
        }
    }

    /// The dynamic type, looking through capability references.
    pub fn concrete_class(&self) -> Option<&'static ClassInfo> {
        match self {
            Value::Capability(cap) => cap.concrete(),
            other => other.class(),
        }
    }

    pub fn kind(&self) -> Option<TypeKind> {
        self.class().map(ClassInfo::kind)
    }

    /// Is this a reference kind whose reference is empty?
    ///
    /// `false` for untyped nil and plain values.
    pub(crate) fn is_empty_reference(&self) -> bool {
        match self {
            Value::Nil | Value::Concrete(_) => false,
            Value::Ptr(ptr) => ptr.is_null(),
            Value::Slice(slice) => slice.is_nil(),
            Value::Map(map) => map.is_nil(),
            Value::Chan(chan) => chan.is_nil(),
            Value::Func(func) => func.is_nil(),
            Value::Capability(cap) => cap.is_nil(),
        }
    }

    /// Storage address of a reference kind. `None` for other kinds.
    pub(crate) fn reference_address(&self) -> Option<Address> {
        match self {
            Value::Ptr(ptr) => Some(ptr.address()),
            Value::Slice(slice) => Some(slice.address()),
            Value::Map(map) => Some(map.address()),
            Value::Chan(chan) => Some(chan.address()),
            Value::Func(func) => Some(func.address()),
            Value::Nil | Value::Concrete(_) | Value::Capability(_) => None,
        }
    }

    /// Borrow the plain value as `T`.
    pub fn get<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Concrete(instance) => instance.get(),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Concrete(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_ptr(&self) -> Option<&Ptr> {
        match self {
            Value::Ptr(ptr) => Some(ptr),
            _ => None,
        }
    }

    pub fn as_capability(&self) -> Option<&CapabilityValue> {
        match self {
            Value::Capability(cap) => Some(cap),
            _ => None,
        }
    }

    pub fn into_capability(self) -> Option<CapabilityValue> {
        match self {
            Value::Capability(cap) => Some(cap),
            _ => None,
        }
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::Concrete(instance)
    }
}

impl From<Ptr> for Value {
    fn from(ptr: Ptr) -> Self {
        Value::Ptr(ptr)
    }
}

impl From<CapabilityValue> for Value {
    fn from(cap: CapabilityValue) -> Self {
        Value::Capability(cap)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Concrete(instance) => fmt::Debug::fmt(instance, f),
            Value::Ptr(ptr) => fmt::Debug::fmt(ptr, f),
            Value::Slice(slice) => fmt::Debug::fmt(slice, f),
            Value::Map(map) => fmt::Debug::fmt(map, f),
            Value::Chan(chan) => fmt::Debug::fmt(chan, f),
            Value::Func(func) => fmt::Debug::fmt(func, f),
            Value::Capability(cap) => fmt::Debug::fmt(cap, f),
        }
    }
}

/// A plain, immutable value of a concrete type.
#[derive(Clone)]
pub struct Instance {
    data: Rc<dyn Object>,
}

impl Instance {
    pub fn new<T: Object>(value: T) -> Self {
        Instance {
            data: Rc::new(value),
        }
    }

    /// Take ownership of a boxed object.
    pub fn from_box(object: Box<dyn Object>) -> Self {
        Instance {
            data: Rc::from(object),
        }
    }

    #[inline]
    pub fn class(&self) -> &'static ClassInfo {
        self.data.class()
    }

    #[inline]
    pub fn object(&self) -> &dyn Object {
        &*self.data
    }

    /// Borrow as `T` if that is the dynamic type.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    /// Mutate through copy-on-write.
    ///
    /// Storage shared with other clones is copied first, so they never see
    /// the change. `None` if the dynamic type is not `T`.
    pub fn update<T: Any, R>(&mut self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        if !self.data.is::<T>() {
            return None;
        }
        if Rc::get_mut(&mut self.data).is_none() {
            self.data = Rc::from(self.data.clone_object());
        }
        Rc::get_mut(&mut self.data)
            .and_then(|object| object.downcast_mut::<T>())
            .map(f)
    }

    /// Deep copy into a fresh box.
    pub fn to_box(&self) -> Box<dyn Object> {
        self.data.clone_object()
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.data.is_zero()
    }

    /// Do both instances share one allocation?
    #[inline]
    pub fn shares_storage(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.data.equals(other.object())
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.data, f)
    }
}

/// A pointer to an addressable concrete object.
#[derive(Clone)]
pub struct Ptr {
    /// Pointee type. Known even when the pointer is null.
    elem: &'static ClassInfo,
    cell: Option<ObjectCell>,
}

impl Ptr {
    /// Allocate a fresh object holding `value`.
    pub fn new<T: Object>(value: T) -> Self {
        Ptr::from_box(Box::new(value))
    }

    /// Allocate a fresh cell around an owned object.
    pub fn from_box(object: Box<dyn Object>) -> Self {
        Ptr {
            elem: object.class(),
            cell: Some(Rc::new(RefCell::new(object))),
        }
    }

    /// Point at an existing cell.
    pub fn from_cell(cell: ObjectCell) -> Self {
        let elem = cell.borrow().class();
        Ptr {
            elem,
            cell: Some(cell),
        }
    }

    /// A null pointer to `elem`.
    #[inline]
    pub fn null(elem: &'static ClassInfo) -> Self {
        Ptr { elem, cell: None }
    }

    #[inline]
    pub fn elem(&self) -> &'static ClassInfo {
        self.elem
    }

    /// The pointer type, `*elem`.
    pub fn class(&self) -> &'static ClassInfo {
        registry().pointer_to(self.elem)
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.cell.is_none()
    }

    #[inline]
    pub fn cell(&self) -> Option<&ObjectCell> {
        self.cell.as_ref()
    }

    /// Give up this pointer, keeping its cell.
    #[inline]
    pub fn into_cell(self) -> Option<ObjectCell> {
        self.cell
    }

    pub fn address(&self) -> Address {
        self.cell.as_ref().map_or(Address::NULL, Address::of)
    }

    /// Borrow the pointee as `T`.
    ///
    /// `None` if null, already mutably borrowed, or not a `T`.
    pub fn borrow<T: Any>(&self) -> Option<Ref<'_, T>> {
        let guard = self.cell.as_ref()?.try_borrow().ok()?;
        Ref::filter_map(guard, |object| object.downcast_ref::<T>()).ok()
    }

    /// Mutably borrow the pointee as `T`.
    pub fn borrow_mut<T: Any>(&self) -> Option<RefMut<'_, T>> {
        let guard = self.cell.as_ref()?.try_borrow_mut().ok()?;
        RefMut::filter_map(guard, |object| object.downcast_mut::<T>()).ok()
    }

    /// Copy the pointee out as a plain value.
    pub fn load(&self) -> Option<Instance> {
        let guard = self.cell.as_ref()?.try_borrow().ok()?;
        Some(Instance::from_box(guard.clone_object()))
    }

    /// Do both pointers refer to the same object? Two nulls are equal.
    pub fn ptr_eq(&self, other: &Ptr) -> bool {
        match (&self.cell, &other.cell) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Ptr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.as_ref().map(|cell| cell.try_borrow()) {
            None => write!(f, "(*{})(nil)", self.elem.name()),
            Some(Ok(object)) => write!(f, "&{object:?}"),
            Some(Err(_)) => write!(f, "&<borrowed {}>", self.elem.name()),
        }
    }
}
