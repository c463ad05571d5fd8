//! Object handles.
//!
//! # Lifecycle
//!
//! ```text
//! construct ──► Initialized ──deinit──► Deinitialized
//!                                            │
//!                                  deinit ───┴──► Fault::DoubleRelease
//! ```
//!
//! Handle clones, including those recovered with [`Handle::from_address`],
//! share one lifecycle: deinitializing any of them deinitializes all.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::ptr;
use std::rc::Rc;

use klass_types::{ClassInfo, Fault};
use klass_value::{Address, Ptr, Value};

use crate::allocator::Allocator;
use crate::table;

/// Lifecycle state of a handle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    Initialized,
    Deinitialized,
}

/// Shared state behind every clone of a handle.
pub(crate) struct Klass {
    info: &'static ClassInfo,
    allocator: Rc<dyn Allocator>,
    state: Cell<State>,
    object: RefCell<Option<Ptr>>,
    /// Fixed at construction, reported in faults after release.
    address: Address,
}

impl Drop for Klass {
    fn drop(&mut self) {
        if self.state.get() == State::Initialized {
            tracing::warn!(
                class = self.info.name(),
                address = %self.address,
                "handle dropped without deinit"
            );
            table::remove_dead(self.address);
        }
    }
}

/// Owner of one addressable object.
#[derive(Clone)]
pub struct Handle {
    inner: Rc<Klass>,
}

impl Handle {
    /// Construct a handle of type `class`.
    ///
    /// With a value, the handle adopts it as given: a pointer shares its
    /// object, a plain value is copied into a fresh object. Without one (or
    /// with nil or a null pointer) a zero instance is allocated.
    ///
    /// # Errors
    /// - [`Fault::InvalidArgument`] for other value kinds, or when allocating
    ///   a type that is not concrete.
    /// - [`Fault::AllocationFailed`] when the allocator declines.
    #[tracing::instrument(level = "debug", skip_all, fields(class = class.name()))]
    pub fn construct(
        allocator: Rc<dyn Allocator>,
        class: &'static ClassInfo,
        init: Option<Value>,
    ) -> Result<Handle, Fault> {
        let object = match init {
            Some(Value::Ptr(ptr)) if !ptr.is_null() => ptr,
            Some(Value::Concrete(instance)) => Ptr::from_box(instance.to_box()),
            None | Some(Value::Nil | Value::Ptr(_)) => Self::allocate(&*allocator, class)?,
            Some(other) => {
                return Err(Fault::invalid_argument(
                    "construct",
                    format!(
                        "cannot adopt a `{}` value",
                        other.class().map_or("nil", ClassInfo::name)
                    ),
                ))
            }
        };

        let address = object.address();
        let inner = Rc::new(Klass {
            info: class,
            allocator,
            state: Cell::new(State::Initialized),
            object: RefCell::new(Some(object)),
            address,
        });
        table::insert(address, &inner);
        tracing::debug!(%address, "handle constructed");
        Ok(Handle { inner })
    }

    fn allocate(allocator: &dyn Allocator, class: &'static ClassInfo) -> Result<Ptr, Fault> {
        if !class.is_concrete() {
            return Err(Fault::invalid_argument(
                "construct",
                format!("cannot allocate `{}`, a {} type", class.name(), class.kind().as_str()),
            ));
        }
        let Some(mut object) = allocator.allocate(class) else {
            tracing::error!(class = class.name(), "allocation failed");
            return Err(Fault::AllocationFailed {
                type_name: class.name().to_owned(),
            });
        };
        object.clear_zero_fields();
        Ok(Ptr::from_box(object))
    }

    /// Recover the live handle of type `class` whose object is at `address`.
    ///
    /// `None` for unknown addresses, released handles and other types.
    pub fn from_address(address: Address, class: &'static ClassInfo) -> Option<Handle> {
        let inner = table::get(address)?;
        if !ptr::eq(inner.info, class) {
            tracing::debug!(
                %address,
                expected = class.name(),
                found = inner.info.name(),
                "address belongs to another type"
            );
            return None;
        }
        (inner.state.get() == State::Initialized).then_some(Handle { inner })
    }

    /// Release the object: run the deinit hook, forget the address, and hand
    /// the storage back to the allocator.
    ///
    /// # Errors
    /// - [`Fault::DoubleRelease`] if already released.
    /// - [`Fault::InvalidArgument`] if the object is borrowed elsewhere. The
    ///   handle stays initialized and `deinit` can be retried.
    ///
    /// Nothing else happens in either case.
    #[tracing::instrument(level = "debug", skip_all, fields(class = self.inner.info.name()))]
    pub fn deinit(&self) -> Result<(), Fault> {
        let klass = &*self.inner;
        if klass.state.get() == State::Deinitialized {
            tracing::error!(address = %klass.address, "double release");
            return Err(Fault::DoubleRelease {
                type_name: klass.info.name().to_owned(),
                address: klass.address.raw(),
            });
        }
        // The hook needs exclusive access. Refuse while the object is borrowed
        // so a later retry still runs it.
        let object = klass.object.borrow().clone();
        let Ok(mut guard) = object
            .as_ref()
            .and_then(Ptr::cell)
            .map(|cell| cell.try_borrow_mut())
            .transpose()
        else {
            return Err(Fault::invalid_argument(
                "deinit",
                format!(
                    "`{}` object at {} is borrowed",
                    klass.info.name(),
                    klass.address
                ),
            ));
        };
        klass.state.set(State::Deinitialized);
        if let Some(object) = guard.as_deref_mut() {
            if klass.info.run_deinit_hook(&mut **object) {
                tracing::trace!("deinit hook ran");
            }
        }
        drop(guard);
        drop(object);

        let cell = klass.object.borrow_mut().take().and_then(Ptr::into_cell);
        table::remove(klass.address, &self.inner);
        if let Some(cell) = cell {
            klass.allocator.destroy(klass.info, cell);
        }
        tracing::debug!(address = %klass.address, "handle deinitialized");
        Ok(())
    }

    /// Pointer to the owned object.
    ///
    /// # Errors
    /// [`Fault::UseAfterRelease`] after `deinit`.
    pub fn value(&self) -> Result<Value, Fault> {
        self.object("value").map(Value::Ptr)
    }

    /// Address of the owned object.
    ///
    /// # Errors
    /// [`Fault::UseAfterRelease`] after `deinit`.
    pub fn address(&self) -> Result<Address, Fault> {
        self.object("address").map(|_| self.inner.address)
    }

    /// Read the object as `T`. `Ok(None)` if it is not a `T`.
    ///
    /// # Errors
    /// [`Fault::UseAfterRelease`] after `deinit`.
    pub fn with<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Result<Option<R>, Fault> {
        let object = self.object("with")?;
        let result = object.borrow::<T>().map(|value| f(&value));
        Ok(result)
    }

    /// Mutate the object as `T`. `Ok(None)` if it is not a `T`.
    ///
    /// # Errors
    /// [`Fault::UseAfterRelease`] after `deinit`.
    pub fn with_mut<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<Option<R>, Fault> {
        let object = self.object("with_mut")?;
        let result = object.borrow_mut::<T>().map(|mut value| f(&mut value));
        Ok(result)
    }

    fn object(&self, operation: &'static str) -> Result<Ptr, Fault> {
        let object = self.inner.object.borrow().clone();
        object.ok_or_else(|| {
            tracing::error!(operation, class = self.inner.info.name(), "use after release");
            Fault::UseAfterRelease {
                type_name: self.inner.info.name().to_owned(),
                operation,
            }
        })
    }

    #[inline]
    pub fn class(&self) -> &'static ClassInfo {
        self.inner.info
    }

    #[inline]
    pub fn state(&self) -> State {
        self.inner.state.get()
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.state() == State::Initialized
    }

    /// Do both handles share one lifecycle?
    #[inline]
    pub fn same_handle(&self, other: &Handle) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("class", &self.inner.info.name())
            .field("state", &self.inner.state.get())
            .field("address", &self.inner.address)
            .finish_non_exhaustive()
    }
}
