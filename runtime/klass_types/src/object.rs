//! The object-safe view of a concrete value.
//!
//! Every `'static` type that is `Clone + Default + PartialEq + Debug` is an
//! `Object` through the blanket impl below. `Default` supplies the zero value,
//! `PartialEq` against that default answers "is this value zero?", and
//! `Clone` lets the casting engine materialize independent copies.

use std::any::Any;
use std::fmt;

use crate::class_info::ClassInfo;

/// A concrete value the runtime can describe, copy and compare to zero.
pub trait Object: Any + fmt::Debug {
    /// Upcast for `TypeId`-checked downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for `TypeId`-checked downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Deep copy into a fresh allocation.
    fn clone_object(&self) -> Box<dyn Object>;

    /// Is this value equal to its type's zero (default) value?
    fn is_zero(&self) -> bool;

    /// Reset a currently-zero value to its zero value.
    ///
    /// Run once on freshly allocated instances. This is a default-initialization
    /// pass, not a type check.
    fn clear_zero_fields(&mut self);

    /// Structural equality against another object of any type.
    fn equals(&self, other: &dyn Object) -> bool;

    /// The descriptor of this value's dynamic type.
    fn class(&self) -> &'static ClassInfo;
}

impl<T> Object for T
where
    T: Any + Clone + Default + PartialEq + fmt::Debug,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_object(&self) -> Box<dyn Object> {
        Box::new(self.clone())
    }

    fn is_zero(&self) -> bool {
        *self == T::default()
    }

    fn clear_zero_fields(&mut self) {
        if self.is_zero() {
            *self = T::default();
        }
    }

    fn equals(&self, other: &dyn Object) -> bool {
        other.as_any().downcast_ref::<T>() == Some(self)
    }

    fn class(&self) -> &'static ClassInfo {
        crate::registry().class::<T>()
    }
}

impl dyn Object {
    /// Is the dynamic type of this object `T`?
    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Borrow as `T` if that is the dynamic type.
    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Mutably borrow as `T` if that is the dynamic type.
    #[inline]
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

impl Clone for Box<dyn Object> {
    fn clone(&self) -> Self {
        self.clone_object()
    }
}

/// Zero-value constructor stored on concrete descriptors.
pub(crate) fn zero_object<T: Object + Default>() -> Box<dyn Object> {
    Box::new(T::default())
}
