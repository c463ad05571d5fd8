//! klass: runtime type identity, capability casting and object handles.
//!
//! # Crates
//!
//! - `klass_types`: descriptors, the registry, implementation table, faults
//! - `klass_value`: dynamic values, casting, zero/nil values
//! - `klass_object`: handles, allocators, address recovery
//!
//! This crate re-exports all three and adds [`ObjectFactory`] /
//! [`ObjectWrapper`] for the common create, cast, destroy sequence.
//!
//! # Example
//!
//! ```text
//! implements!(registry(), &mut Dog => dyn Animal);
//!
//! let factory = ObjectFactory::new();
//! let dog = factory.create_object(Value::ptr(Dog { name: "Rex".into() }))?;
//! let animal = dog.as_capability::<dyn Animal>()?;
//! ```

mod error;
mod factory;

use std::sync::Once;

pub use error::WrapperError;
pub use factory::{ObjectFactory, ObjectWrapper};

pub use klass_object::{Allocator, Handle, State, SystemAllocator, TrackingAllocator};
pub use klass_types::{
    implements, registry, short_type_name, CapabilityView, ClassInfo, DeinitHook, Fault,
    ImplEntry, Object, Receiver, TypeFlags, TypeKey, TypeKind, TypeRegistry,
};
pub use klass_value::{
    address_of, as_concrete, cast, cast_to_capability, cast_to_concrete, is_nil, is_zero,
    nil_of_capability, zero_of, zero_or_nil_of, Address, CapabilityValue, CastRule, Chan, Data,
    Func, Instance, MapValue, Nil, ObjectCell, Ptr, Slice, Value, View,
};

static TRACING_INIT: Once = Once::new();

/// Initialize the tracing subscriber.
///
/// Call once at startup. Enable with `RUST_LOG`:
/// - `RUST_LOG=klass_value=trace` - trace every cast and the rule that fired
/// - `RUST_LOG=klass_object=debug` - handle construction and teardown
/// - `RUST_LOG=klass_types=debug` - descriptor creation and registrations
///
/// Does nothing when `RUST_LOG` is unset.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
