//! Errors of the object facade.

use klass_types::Fault;
use thiserror::Error;

/// Why an [`ObjectWrapper`](crate::ObjectWrapper) operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WrapperError {
    /// The wrapper holds no live object (never created, or destroyed).
    #[error("object is not initialized")]
    NotInitialized,

    /// The cast target is not a capability type.
    #[error("`{name}` is not a capability type")]
    NotACapability { name: String },

    #[error(transparent)]
    Fault(#[from] Fault),
}
