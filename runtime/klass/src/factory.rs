//! Create, cast and destroy objects without touching handles directly.

use std::rc::Rc;

use klass_object::{Allocator, Handle, SystemAllocator};
use klass_types::{registry, ClassInfo, Object};
use klass_value::{cast_to_capability, cast_to_concrete, CapabilityValue, Ptr, Value};

use crate::error::WrapperError;

/// Builds [`ObjectWrapper`]s from initial values.
#[derive(Clone)]
pub struct ObjectFactory {
    allocator: Rc<dyn Allocator>,
}

impl ObjectFactory {
    /// A factory backed by [`SystemAllocator`].
    pub fn new() -> Self {
        Self::with_allocator(Rc::new(SystemAllocator))
    }

    pub fn with_allocator(allocator: Rc<dyn Allocator>) -> Self {
        ObjectFactory { allocator }
    }

    /// Wrap a new object initialized from `init`.
    ///
    /// The object's type is that of `init`, looking through pointers and
    /// capability references. `None` for nil and for values that cannot back
    /// an object.
    pub fn create_object(&self, init: Value) -> Option<ObjectWrapper> {
        let init = match init {
            Value::Capability(cap) => cap.underlying()?,
            other => other,
        };
        let class = match &init {
            Value::Ptr(ptr) if !ptr.is_null() => ptr.elem(),
            Value::Concrete(instance) => instance.class(),
            _ => {
                tracing::debug!(?init, "no object to create");
                return None;
            }
        };
        let handle = Handle::construct(Rc::clone(&self.allocator), class, Some(init)).ok()?;
        Some(ObjectWrapper::new(handle))
    }
}

impl Default for ObjectFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// An owned object with casting shortcuts.
#[derive(Debug, Default)]
pub struct ObjectWrapper {
    handle: Option<Handle>,
}

impl ObjectWrapper {
    pub fn new(handle: Handle) -> Self {
        ObjectWrapper {
            handle: Some(handle),
        }
    }

    /// The live handle. `None` once destroyed.
    pub fn handle(&self) -> Option<&Handle> {
        self.handle.as_ref()
    }

    fn live(&self) -> Result<&Handle, WrapperError> {
        self.handle.as_ref().ok_or(WrapperError::NotInitialized)
    }

    /// The wrapped object, as a pointer.
    pub fn underlying(&self) -> Result<Value, WrapperError> {
        Ok(self.live()?.value()?)
    }

    /// Cast the object to `capability`.
    ///
    /// `Ok(None)` if the object's type does not satisfy it.
    pub fn cast(&self, capability: &'static ClassInfo) -> Result<Option<Value>, WrapperError> {
        let handle = self.live()?;
        if !capability.is_capability() {
            return Err(WrapperError::NotACapability {
                name: capability.name().to_owned(),
            });
        }
        Ok(cast_to_capability(&handle.value()?, capability))
    }

    /// Cast the object to capability `C`.
    pub fn as_capability<C: ?Sized + 'static>(
        &self,
    ) -> Result<Option<CapabilityValue>, WrapperError> {
        let cast = self.cast(registry().capability::<C>())?;
        Ok(cast.and_then(Value::into_capability))
    }

    /// Pointer to the object if it is a `T`.
    pub fn as_concrete<T: Object + Default>(&self) -> Result<Option<Ptr>, WrapperError> {
        let value = self.live()?.value()?;
        Ok(cast_to_concrete(&value, registry().class::<T>()))
    }

    /// Deinitialize the object. The wrapper is empty afterwards.
    pub fn destroy(&mut self) -> Result<(), WrapperError> {
        let handle = self.handle.take().ok_or(WrapperError::NotInitialized)?;
        handle.deinit()?;
        Ok(())
    }
}
