//! Property tests for casting, nil values and handles.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]
#![allow(
    clippy::doc_markdown,
    clippy::redundant_closure_for_method_calls,
    reason = "Proptest macros generate code with these patterns"
)]

use std::rc::Rc;
use std::sync::Once;

use klass::{
    as_concrete, cast, implements, is_nil, is_zero, registry, zero_or_nil_of, Handle,
    SystemAllocator, Value,
};
use proptest::prelude::*;

#[derive(Clone, Debug, Default, PartialEq)]
struct Sample {
    label: String,
    weight: i32,
}

trait Weighed {
    fn weight(&self) -> i32;
    fn scale(&mut self, factor: i32);
}

impl Weighed for Sample {
    fn weight(&self) -> i32 {
        self.weight
    }

    fn scale(&mut self, factor: i32) {
        self.weight = self.weight.wrapping_mul(factor);
    }
}

fn setup() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        implements!(registry(), &mut Sample => dyn Weighed);
    });
}

fn sample_strategy() -> impl Strategy<Value = Sample> {
    ("[a-z]{0,8}", any::<i32>()).prop_map(|(label, weight)| Sample { label, weight })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        ..ProptestConfig::default()
    })]

    /// Methods behave the same on the cast reference as on the value.
    #[test]
    fn prop_cast_preserves_behavior(sample in sample_strategy()) {
        setup();
        let cap = cast::<dyn Weighed>(&Value::of(sample.clone())).unwrap();
        let weight = cap.view::<dyn Weighed>().unwrap().weight();
        prop_assert_eq!(weight, sample.weight());
    }

    /// A materialized copy and its original never see each other's changes.
    #[test]
    fn prop_materialized_copy_is_independent(sample in sample_strategy(), factor in 2..10_i32) {
        setup();
        let original = Value::of(sample.clone());
        let cap = cast::<dyn Weighed>(&original).unwrap();
        cap.view_mut::<dyn Weighed>().unwrap().scale(factor);

        prop_assert_eq!(original.get::<Sample>(), Some(&sample));
        let scaled = cap.view::<dyn Weighed>().unwrap().weight();
        prop_assert_eq!(scaled, sample.weight.wrapping_mul(factor));
    }

    /// Zero and nil are tracked independently.
    #[test]
    fn prop_zero_is_not_nil(sample in sample_strategy()) {
        let value = Value::of(sample.clone());
        prop_assert!(!is_nil(&value));
        prop_assert_eq!(is_zero(&value), sample == Sample::default());

        let zero = zero_or_nil_of(&value);
        prop_assert!(is_zero(&zero));
        prop_assert!(!is_nil(&zero));

        let null = zero_or_nil_of(&Value::ptr(sample));
        prop_assert!(is_nil(&null));
    }

    /// Pointer casts round-trip back to the same object.
    #[test]
    fn prop_concrete_round_trip(sample in sample_strategy()) {
        setup();
        let value = Value::ptr(sample);
        let cap = Value::Capability(cast::<dyn Weighed>(&value).unwrap());
        let back = as_concrete::<Sample>(&cap).unwrap();
        prop_assert!(back.ptr_eq(value.as_ptr().unwrap()));
    }

    /// Every live handle is recoverable from its address.
    #[test]
    fn prop_address_recovery(samples in prop::collection::vec(sample_strategy(), 1..8)) {
        let class = registry().class::<Sample>();
        let handles: Vec<Handle> = samples
            .into_iter()
            .map(|sample| Handle::construct(Rc::new(SystemAllocator), class, Some(Value::of(sample))).unwrap())
            .collect();

        for handle in &handles {
            let recovered = Handle::from_address(handle.address().unwrap(), class).unwrap();
            prop_assert!(recovered.same_handle(handle));
        }
        for handle in &handles {
            prop_assert!(handle.deinit().is_ok());
            prop_assert!(handle.deinit().is_err());
        }
    }

    /// Concurrent first use creates exactly one descriptor per type.
    #[test]
    fn prop_descriptor_identity(threads in 2..8_usize) {
        let keys: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|_| scope.spawn(|| registry().class::<Sample>().key()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        prop_assert!(keys.iter().all(|key| *key == keys[0]));
    }
}
