//! Dynamic values and capability casting for klass.
//!
//! A [`Value`] carries its runtime type with it: a plain concrete instance, a
//! reference of one of the composite kinds, or a capability reference pairing
//! bound data with the implementation that dispatches to it.
//!
//! - [`cast`]: rule-based conversion into capability references and back to
//!   concrete pointers, plus [`address_of`]
//! - [`nil`]: zero/nil values and nil checks per type

pub mod cast;
pub mod nil;
mod value;

pub use cast::{address_of, as_concrete, cast, cast_to_capability, cast_to_concrete, CastRule};
pub use nil::{is_nil, is_zero, nil_of_capability, zero_of, zero_or_nil_of, Nil};
pub use value::{
    Address, CapabilityValue, Chan, Data, Func, Instance, MapValue, ObjectCell, Ptr, Slice, Value,
    View,
};
