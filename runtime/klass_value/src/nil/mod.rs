//! Zero values and nil checks.
//!
//! Every type has a zero value. For the reference kinds and capabilities the
//! zero value is a typed nil that keeps the type; for concrete types it is the
//! type's `Default`.

use klass_types::{registry, ClassInfo, Fault, TypeKind};

use crate::value::{Address, CapabilityValue, Chan, Func, Instance, MapValue, Ptr, Slice, Value};

/// The zero value of `class`.
pub fn zero_of(class: &'static ClassInfo) -> Value {
    let elem = || {
        class.elem().unwrap_or_else(|| {
            tracing::warn!(class = class.name(), "composite descriptor without element type");
            registry().class::<()>()
        })
    };
    match class.kind() {
        TypeKind::Concrete => class
            .new_zeroed()
            .map_or(Value::Nil, |zero| Value::Concrete(Instance::from_box(zero))),
        TypeKind::Capability => Value::Capability(CapabilityValue::nil(class)),
        TypeKind::Pointer => Value::Ptr(Ptr::null(elem())),
        TypeKind::Slice => Value::Slice(Slice::nil(elem())),
        TypeKind::Map => Value::Map(MapValue::nil(elem())),
        TypeKind::Chan => Value::Chan(Chan::nil(elem())),
        TypeKind::Func => Value::Func(Func::nil()),
    }
}

/// The zero value of `value`'s type; untyped nil stays untyped nil.
///
/// A capability reference yields the nil reference of the same capability,
/// whatever it is bound to.
pub fn zero_or_nil_of(value: &Value) -> Value {
    value.class().map_or(Value::Nil, zero_of)
}

/// The nil reference of `value`'s capability type.
///
/// # Errors
/// [`Fault::InvalidArgument`] unless `value` is a capability reference.
pub fn nil_of_capability(value: &Value) -> Result<Value, Fault> {
    match value {
        Value::Capability(cap) => Ok(Value::Capability(CapabilityValue::nil(cap.capability()))),
        other => Err(Fault::invalid_argument(
            "nil_of_capability",
            match other.class() {
                Some(class) => format!("`{}` is not a capability type", class.name()),
                None => "untyped nil has no capability type".to_owned(),
            },
        )),
    }
}

/// Is `value` nil?
///
/// True for untyped nil and for nillable kinds whose reference is empty.
/// Plain values are never nil, even when zero.
pub fn is_nil(value: &Value) -> bool {
    match value.class() {
        None => true,
        Some(class) => class.flags().is_nillable() && value.is_empty_reference(),
    }
}

/// Is `value` its type's zero value?
pub fn is_zero(value: &Value) -> bool {
    match value {
        Value::Concrete(instance) => instance.is_zero(),
        other => is_nil(other),
    }
}

/// Shorthand for the nil constants.
#[derive(Copy, Clone, Debug)]
pub struct Nil;

impl Nil {
    /// Address reported for nil references.
    pub const ADDRESS: Address = Address::NULL;

    /// The nil reference of `value`'s capability type.
    ///
    /// # Errors
    /// See [`nil_of_capability`].
    pub fn of(value: &Value) -> Result<Value, Fault> {
        nil_of_capability(value)
    }

    /// The nil reference of capability `C`.
    pub fn capability<C: ?Sized + 'static>() -> Value {
        Value::Capability(CapabilityValue::nil_of::<C>())
    }
}
