//! Capability casting.
//!
//! Converting a value to a capability type tries, in order:
//!
//! 1. [`CastRule::Direct`]: the value's own type satisfies the capability.
//!    Plain values keep sharing their storage; pointers are bound as-is.
//! 2. [`CastRule::Referent`]: the value is a pointer whose pointee satisfies
//!    the capability through a value-receiver implementation.
//! 3. [`CastRule::Materialized`]: the value is plain, but only a pointer to its
//!    type satisfies the capability. A fresh, independent copy is allocated
//!    and bound by pointer.
//!
//! A non-capability target only accepts values already of exactly that type
//! ([`CastRule::Converted`]).
//!
//! Capability references passed in are unwrapped to their bound data first.
//! Untyped nil, nil capability references and null pointers never cast.

use std::ptr;

use klass_types::{registry, ClassInfo, Fault, Object, Receiver};

use crate::value::{Address, CapabilityValue, Data, Instance, Ptr, Value};

/// Which rule produced a cast.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CastRule {
    Direct,
    Referent,
    Materialized,
    Converted,
}

impl CastRule {
    pub fn as_str(self) -> &'static str {
        match self {
            CastRule::Direct => "direct",
            CastRule::Referent => "referent",
            CastRule::Materialized => "materialized",
            CastRule::Converted => "converted",
        }
    }
}

/// A value with capability references looked through.
enum Source<'a> {
    Plain(&'a Instance),
    Pointer(&'a Ptr),
    Other(#[allow(dead_code)] &'a Value),
}

/// Unwrap `value` to its underlying data. `None` for nil of any flavor.
fn source(value: &Value) -> Option<Source<'_>> {
    match value {
        Value::Nil => None,
        Value::Concrete(instance) => Some(Source::Plain(instance)),
        Value::Ptr(ptr) if ptr.is_null() => None,
        Value::Ptr(ptr) => Some(Source::Pointer(ptr)),
        Value::Capability(cap) => match cap.data()? {
            Data::Value(instance) => Some(Source::Plain(instance)),
            Data::Ptr(ptr) => Some(Source::Pointer(ptr)),
        },
        other => Some(Source::Other(other)),
    }
}

/// Convert `value` to type `target`.
///
/// For a capability target the result is a [`Value::Capability`] bound
/// according to the rules in the module docs. For any other target the
/// result is the unwrapped value itself, when its type is exactly `target`.
#[tracing::instrument(level = "trace", skip_all, fields(to = target.name()))]
pub fn cast_to_capability(value: &Value, target: &'static ClassInfo) -> Option<Value> {
    if target.is_capability() {
        resolve(value, target).map(|(cap, rule)| {
            tracing::trace!(
                concrete = cap.concrete().map(ClassInfo::name),
                rule = rule.as_str(),
                "capability cast"
            );
            Value::Capability(cap)
        })
    } else {
        convert(value, target)
    }
}

/// Cast to capability `C`, typed.
pub fn cast<C: ?Sized + 'static>(value: &Value) -> Option<CapabilityValue> {
    let target = registry().capability::<C>();
    if !target.is_capability() {
        return None;
    }
    resolve(value, target).map(|(cap, _)| cap)
}

/// Bind `value` to capability `target`, reporting the rule used.
pub fn resolve(value: &Value, target: &'static ClassInfo) -> Option<(CapabilityValue, CastRule)> {
    let registry = registry();
    match source(value)? {
        Source::Plain(instance) => {
            let class = instance.class();
            let entry = registry.implementation(class, target)?;
            if registry.implements(class, target) {
                let data = Data::Value(instance.clone());
                return Some((CapabilityValue::bind(target, data, entry), CastRule::Direct));
            }
            if registry.implements(registry.pointer_to(class), target) {
                let copy = Ptr::from_box(instance.to_box());
                let data = Data::Ptr(copy);
                return Some((CapabilityValue::bind(target, data, entry), CastRule::Materialized));
            }
            None
        }
        Source::Pointer(ptr) => {
            let entry = registry.implementation(ptr.elem(), target)?;
            let rule = match entry.receiver() {
                Receiver::Pointer => CastRule::Direct,
                Receiver::Value => CastRule::Referent,
            };
            Some((CapabilityValue::bind(target, Data::Ptr(ptr.clone()), entry), rule))
        }
        Source::Other(_) => None,
    }
}

/// Identity conversion to a non-capability type.
fn convert(value: &Value, target: &'static ClassInfo) -> Option<Value> {
    let underlying = match value {
        Value::Capability(cap) => cap.underlying()?,
        other => other.clone(),
    };
    let class = underlying.class()?;
    if ptr::eq(class, target) {
        tracing::trace!(to = target.name(), rule = CastRule::Converted.as_str(), "cast");
        Some(underlying)
    } else {
        None
    }
}

/// Recover a pointer to the concrete type `target`.
///
/// Pointers to `target` come back as the same pointer. Plain `target` values
/// come back as a pointer to a fresh copy. Everything else is `None`.
#[tracing::instrument(level = "trace", skip_all, fields(to = target.name()))]
pub fn cast_to_concrete(value: &Value, target: &'static ClassInfo) -> Option<Ptr> {
    match source(value)? {
        Source::Pointer(ptr) if ptr::eq(ptr.elem(), target) => Some(ptr.clone()),
        Source::Plain(instance) if ptr::eq(instance.class(), target) => {
            Some(Ptr::from_box(instance.to_box()))
        }
        _ => None,
    }
}

/// Recover a pointer to `T`.
pub fn as_concrete<T: Object + Default>(value: &Value) -> Option<Ptr> {
    cast_to_concrete(value, registry().class::<T>())
}

/// The address of the object `value` refers to.
///
/// Pointers and the reference kinds report their storage; nil references
/// report [`Address::NULL`]. A capability reference reports the address of
/// its bound object when that object is addressable.
///
/// # Errors
/// [`Fault::InvalidArgument`] for plain values, untyped nil, nil capability
/// references and capability references bound to plain values.
pub fn address_of(value: &Value) -> Result<Address, Fault> {
    match value {
        Value::Capability(cap) => match cap.data() {
            Some(Data::Ptr(ptr)) => Ok(ptr.address()),
            Some(Data::Value(instance)) => Err(Fault::invalid_argument(
                "address_of",
                format!(
                    "`{}` reference holds a plain `{}`, which has no address",
                    cap.capability().name(),
                    instance.class().name()
                ),
            )),
            None => Err(Fault::invalid_argument(
                "address_of",
                format!("nil `{}` reference", cap.capability().name()),
            )),
        },
        other => match other.class() {
            Some(class) if class.flags().is_reference() => {
                Ok(other.reference_address().unwrap_or(Address::NULL))
            }
            Some(class) => Err(Fault::invalid_argument(
                "address_of",
                format!("plain `{}` value is not addressable", class.name()),
            )),
            None => Err(Fault::invalid_argument("address_of", "untyped nil")),
        },
    }
}
