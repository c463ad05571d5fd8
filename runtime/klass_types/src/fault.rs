//! Programming-error faults raised by the runtime.
//!
//! Ordinary dynamic-typing outcomes (a cast that does not apply, an address
//! with no live handle) are `None`, not faults. A `Fault` means the caller broke
//! one of the engine's contracts, so it is always an `Err` and always logged.

use thiserror::Error;

/// A contract violation detected by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// An operation received a value that static typing should have ruled out.
    #[error("invalid argument to `{operation}`: {reason}")]
    InvalidArgument {
        /// The operation that rejected its argument.
        operation: &'static str,
        /// What was wrong with the argument.
        reason: String,
    },

    /// `deinit` was called on a handle that was already deinitialized.
    #[error("double release of `{type_name}` object at {address:#x}")]
    DoubleRelease {
        /// Name of the handle's type.
        type_name: String,
        /// Address of the released value.
        address: usize,
    },

    /// A deinitialized handle was used.
    #[error("use of released `{type_name}` object in `{operation}`")]
    UseAfterRelease {
        /// Name of the handle's type.
        type_name: String,
        /// The operation attempted on the released handle.
        operation: &'static str,
    },

    /// The allocator declined to produce an instance.
    #[error("allocator could not produce an instance of `{type_name}`")]
    AllocationFailed {
        /// Name of the requested type.
        type_name: String,
    },

    /// The type registry ran out of descriptor keys.
    #[error("type registry is full ({count} descriptors)")]
    RegistryFull {
        /// Descriptors created before the failure.
        count: usize,
    },
}

impl Fault {
    /// Build an `InvalidArgument` fault and log it.
    pub fn invalid_argument(operation: &'static str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::error!(operation, %reason, "invalid argument");
        Fault::InvalidArgument { operation, reason }
    }
}
