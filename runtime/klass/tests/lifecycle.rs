//! Handle lifecycle and address recovery.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use std::rc::Rc;
use std::sync::Once;

use klass::{
    address_of, cast, implements, registry, Fault, Handle, State, TrackingAllocator, Value,
};
use pretty_assertions::assert_eq;

#[derive(Clone, Debug, Default, PartialEq)]
struct Counter {
    hits: i64,
}

trait Tally {
    fn bump(&mut self);
    fn total(&self) -> i64;
}

impl Tally for Counter {
    fn bump(&mut self) {
        self.hits += 1;
    }

    fn total(&self) -> i64 {
        self.hits
    }
}

fn setup() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        implements!(registry(), &mut Counter => dyn Tally);
    });
}

#[test]
fn capability_mutations_reach_the_handle() {
    setup();
    let allocator = Rc::new(TrackingAllocator::new());
    let handle = Handle::construct(allocator.clone(), registry().class::<Counter>(), None).unwrap();

    let tally = cast::<dyn Tally>(&handle.value().unwrap()).unwrap();
    for _ in 0..3 {
        tally.view_mut::<dyn Tally>().unwrap().bump();
    }
    assert_eq!(handle.with(|c: &Counter| c.hits), Ok(Some(3)));

    // The capability reference points at the handle's object.
    let address = handle.address().unwrap();
    assert_eq!(address_of(&Value::Capability(tally.clone())), Ok(address));

    handle.deinit().unwrap();
    assert_eq!(allocator.live(), 0);
    // Storage stays alive while the capability reference holds it.
    assert_eq!(tally.view::<dyn Tally>().unwrap().total(), 3);
}

#[test]
fn address_round_trip() {
    let counter = registry().class::<Counter>();
    let handle = Handle::construct(
        Rc::new(TrackingAllocator::new()),
        counter,
        Some(Value::of(Counter { hits: 11 })),
    )
    .unwrap();

    let address = handle.address().unwrap();
    let recovered = Handle::from_address(address, counter).unwrap();
    assert!(recovered.same_handle(&handle));
    assert_eq!(recovered.with(|c: &Counter| c.hits), Ok(Some(11)));

    recovered.deinit().unwrap();
    assert_eq!(handle.state(), State::Deinitialized);
    assert!(Handle::from_address(address, counter).is_none());
}

#[test]
fn double_release_is_reported() {
    let handle = Handle::construct(
        Rc::new(TrackingAllocator::new()),
        registry().class::<Counter>(),
        None,
    )
    .unwrap();
    handle.deinit().unwrap();
    assert!(matches!(handle.deinit(), Err(Fault::DoubleRelease { .. })));
}

#[test]
fn deinit_is_refused_while_a_capability_view_is_live() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Gauge {
        level: i64,
    }

    impl Tally for Gauge {
        fn bump(&mut self) {
            self.level += 1;
        }

        fn total(&self) -> i64 {
            self.level
        }
    }

    static RELEASED: AtomicUsize = AtomicUsize::new(0);
    implements!(registry(), Gauge => dyn Tally);
    registry().on_deinit::<Gauge, _>(|_| {
        RELEASED.fetch_add(1, Ordering::SeqCst);
    });

    let allocator = Rc::new(TrackingAllocator::new());
    let handle = Handle::construct(allocator, registry().class::<Gauge>(), None).unwrap();
    let tally = cast::<dyn Tally>(&handle.value().unwrap()).unwrap();

    let view = tally.view::<dyn Tally>().unwrap();
    assert!(matches!(handle.deinit(), Err(Fault::InvalidArgument { .. })));
    assert_eq!(handle.state(), State::Initialized);
    drop(view);

    handle.deinit().unwrap();
    assert!(handle.deinit().is_err());
    assert_eq!(RELEASED.load(Ordering::SeqCst), 1);
}
