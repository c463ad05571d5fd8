//! Registration shorthand.

/// Register that a concrete type satisfies a capability.
///
/// `implements!(registry, Ty => dyn Trait)` registers a value-receiver
/// implementation; `implements!(registry, &mut Ty => dyn Trait)` registers a
/// pointer-receiver one. Evaluates to the registered `Arc<ImplEntry>`.
#[macro_export]
macro_rules! implements {
    ($registry:expr, &mut $ty:ty => $cap:ty) => {
        $registry.implement::<$ty, $cap>($crate::Receiver::Pointer, |v| v, |v| v)
    };
    ($registry:expr, $ty:ty => $cap:ty) => {
        $registry.implement::<$ty, $cap>($crate::Receiver::Value, |v| v, |v| v)
    };
}
