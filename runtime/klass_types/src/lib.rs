//! Runtime type identity for klass.
//!
//! Rust knows a value's type statically; this crate makes that knowledge
//! available at runtime:
//! - [`ClassInfo`]: one leaked, process-unique descriptor per type
//! - [`TypeRegistry`]: the memoizing map from a type to its descriptor,
//!   plus the table of capability implementations
//! - [`Object`]: the object-safe view of a concrete value (copy, zero check,
//!   dynamic descriptor)
//!
//! # Capabilities
//!
//! A capability set is a trait used as `dyn Trait`. Which concrete types
//! satisfy it is recorded with [`TypeRegistry::implement`] or the
//! [`implements!`] macro:
//!
//! ```text
//! implements!(registry(), Dog => dyn Animal);        // value receiver
//! implements!(registry(), &mut Counter => dyn Tally); // pointer receiver
//! ```

mod class_info;
mod fault;
mod flags;
mod key;
mod macros;
mod name;
mod object;
mod registry;

pub use class_info::{ClassInfo, DeinitHook};
pub use fault::Fault;
pub use flags::{TypeFlags, TypeKind};
pub use key::TypeKey;
pub use name::short_type_name;
pub use object::Object;
pub use registry::{registry, CapabilityView, ImplEntry, Receiver, TypeRegistry};
