use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::flags::TypeFlags;
use crate::implements;
use pretty_assertions::assert_eq;

#[derive(Clone, Debug, Default, PartialEq)]
struct Dog {
    name: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Counter {
    hits: i64,
}

trait Animal {
    fn sound(&self) -> String;
}

impl Animal for Dog {
    fn sound(&self) -> String {
        format!("{}: Woof!", self.name)
    }
}

trait Tally {
    fn bump(&mut self);
    #[allow(dead_code)]
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

trait Unrelated {
    #[allow(dead_code)]
    fn nothing(&self);
}

#[test]
fn class_lookup_is_idempotent() {
    let registry = TypeRegistry::new();
    let first = registry.class::<Dog>();
    let second = registry.class::<Dog>();

    assert!(std::ptr::eq(first, second));
    assert_eq!(first.key(), second.key());
    assert_eq!(registry.len(), 1);
}

#[test]
fn distinct_types_get_distinct_keys() {
    let registry = TypeRegistry::new();
    let dog = registry.class::<Dog>();
    let counter = registry.class::<Counter>();

    assert_ne!(dog.key(), counter.key());
    assert_eq!(registry.lookup(dog.key()).map(ClassInfo::key), Some(dog.key()));
    assert_eq!(
        registry.lookup(counter.key()).map(ClassInfo::name),
        Some("Counter")
    );
    assert!(registry.lookup(TypeKey::from_raw(999)).is_none());
}

#[test]
fn concurrent_first_use_creates_one_descriptor() {
    #[derive(Clone, Debug, Default, PartialEq)]
    struct Contended;

    let registry = TypeRegistry::new();
    let keys: Vec<TypeKey> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| registry.class::<Contended>().key()))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or(TypeKey::NONE))
            .collect()
    });

    assert_eq!(registry.len(), 1);
    assert!(keys.iter().all(|&key| key == keys[0]));
    assert!(!keys[0].is_none());
}

#[test]
fn descriptor_names_and_kinds() {
    let registry = TypeRegistry::new();
    let dog = registry.class::<Dog>();
    let animal = registry.capability::<dyn Animal>();

    assert_eq!(dog.name(), "Dog");
    assert_eq!(dog.kind(), TypeKind::Concrete);
    assert_eq!(animal.name(), "Animal");
    assert_eq!(animal.kind(), TypeKind::Capability);
    assert!(animal.is::<dyn Animal>());
    assert!(dog.is::<Dog>());
    assert!(!dog.is::<Counter>());

    assert_eq!(registry.pointer_to(dog).name(), "*Dog");
    assert_eq!(registry.slice_of(dog).name(), "[Dog]");
    assert_eq!(registry.map_of(dog).name(), "map[String]Dog");
    assert_eq!(registry.chan_of(dog).name(), "chan Dog");
    assert_eq!(registry.func().name(), "fn");
}

#[test]
fn composite_descriptors_are_interned() {
    let registry = TypeRegistry::new();
    let dog = registry.class::<Dog>();
    let ptr = registry.pointer_to(dog);

    assert!(std::ptr::eq(ptr, registry.pointer::<Dog>()));
    assert!(std::ptr::eq(ptr.elem().unwrap_or(ptr), dog));
    assert!(std::ptr::eq(registry.slice_of(dog), registry.slice_of(dog)));
    assert!(!std::ptr::eq(registry.slice_of(dog), registry.chan_of(dog)));
    assert!(ptr.flags().contains(TypeFlags::IS_POINTER));
}

#[test]
fn only_concrete_descriptors_have_zero_values() {
    let registry = TypeRegistry::new();
    let zero = registry.class::<Dog>().new_zeroed();
    assert!(zero.as_deref().is_some_and(|object| object.is_zero()));
    assert!(registry.capability::<dyn Animal>().new_zeroed().is_none());
    assert!(registry.pointer::<Dog>().new_zeroed().is_none());
}

#[test]
fn value_receiver_covers_value_and_pointer() {
    let registry = TypeRegistry::new();
    implements!(registry, Dog => dyn Animal);

    let dog = registry.class::<Dog>();
    let animal = registry.capability::<dyn Animal>();
    assert!(registry.implements(dog, animal));
    assert!(registry.implements(registry.pointer_to(dog), animal));
}

#[test]
fn pointer_receiver_covers_only_pointer() {
    let registry = TypeRegistry::new();
    implements!(registry, &mut Counter => dyn Tally);

    let counter = registry.class::<Counter>();
    let tally = registry.capability::<dyn Tally>();
    assert!(!registry.implements(counter, tally));
    assert!(registry.implements(registry.pointer_to(counter), tally));
}

#[test]
fn unrelated_and_non_capability_targets_are_not_implemented() {
    let registry = TypeRegistry::new();
    implements!(registry, Dog => dyn Animal);

    let dog = registry.class::<Dog>();
    assert!(!registry.implements(dog, registry.capability::<dyn Unrelated>()));
    assert!(!registry.implements(dog, registry.class::<Counter>()));
    assert!(!registry.implements(registry.slice_of(dog), registry.capability::<dyn Animal>()));
}

#[test]
fn membership_cache_is_invalidated_by_registration() {
    let registry = TypeRegistry::new();
    let dog = registry.class::<Dog>();
    let animal = registry.capability::<dyn Animal>();

    assert!(!registry.implements(dog, animal));
    assert_eq!(dog.cached_membership_count(), 1);

    implements!(registry, Dog => dyn Animal);
    assert!(registry.implements(dog, animal));
}

#[test]
fn entry_view_dispatches_through_the_capability() {
    let registry = TypeRegistry::new();
    let entry = implements!(registry, Dog => dyn Animal);
    let rex = Dog {
        name: "Rex".to_owned(),
    };

    let view = entry.view::<dyn Animal>();
    let sound = view
        .and_then(|view| view.get(&rex as &dyn Any))
        .map(Animal::sound);
    assert_eq!(sound.as_deref(), Some("Rex: Woof!"));

    // Wrong capability type or wrong object type yields nothing.
    assert!(entry.view::<dyn Tally>().is_none());
    let counter = Counter::default();
    assert!(view.and_then(|view| view.get(&counter as &dyn Any)).is_none());
}

#[test]
fn entry_view_mut_reaches_mutating_methods() {
    let registry = TypeRegistry::new();
    let entry = implements!(registry, &mut Counter => dyn Tally);
    assert_eq!(entry.receiver(), Receiver::Pointer);

    let mut counter = Counter { hits: 1 };
    if let Some(tally) = entry
        .view::<dyn Tally>()
        .and_then(|view| view.get_mut(&mut counter as &mut dyn Any))
    {
        tally.bump();
    }
    assert_eq!(counter.hits, 2);
}

#[test]
fn capabilities_of_lists_registered_pairs() {
    let registry = TypeRegistry::new();
    implements!(registry, Dog => dyn Animal);
    implements!(registry, &mut Dog => dyn Tally2);

    let names: Vec<&str> = registry
        .capabilities_of(registry.class::<Dog>())
        .iter()
        .map(|info| info.name())
        .collect();
    assert_eq!(names, vec!["Animal", "Tally2"]);
    assert_eq!(registry.implementation_count(), 2);
}

trait Tally2 {
    #[allow(dead_code)]
    fn noop(&mut self) {}
}

impl Tally2 for Dog {}

#[test]
fn reregistration_replaces_entry() {
    let registry = TypeRegistry::new();
    implements!(registry, &mut Dog => dyn Animal);
    implements!(registry, Dog => dyn Animal);

    let entry = registry.implementation(registry.class::<Dog>(), registry.capability::<dyn Animal>());
    assert_eq!(entry.map(|entry| entry.receiver()), Some(Receiver::Value));
    assert_eq!(registry.implementation_count(), 1);
}

#[test]
fn deinit_hook_installs_once() {
    static RUNS: AtomicUsize = AtomicUsize::new(0);

    let registry = TypeRegistry::new();
    assert!(registry.on_deinit::<Counter, _>(|counter| {
        counter.hits = -1;
        RUNS.fetch_add(1, Ordering::SeqCst);
    }));
    assert!(!registry.on_deinit::<Counter, _>(|_| {}));

    let info = registry.class::<Counter>();
    assert!(info.has_deinit_hook());

    let mut counter = Counter { hits: 3 };
    assert!(info.run_deinit_hook(&mut counter));
    assert_eq!(counter.hits, -1);
    assert_eq!(RUNS.load(Ordering::SeqCst), 1);

    assert!(!registry.class::<Dog>().run_deinit_hook(&mut Dog::default()));
}

#[test]
fn capability_lookup_does_not_change_the_class() {
    let registry = TypeRegistry::new();
    // Asked for as a capability before anyone asks for the class.
    let as_capability = registry.capability::<Counter>();
    let class = registry.class::<Counter>();

    assert!(!std::ptr::eq(as_capability, class));
    assert_eq!(as_capability.kind(), TypeKind::Capability);
    assert_eq!(class.kind(), TypeKind::Concrete);
    assert!(class.new_zeroed().is_some());
    assert!(std::ptr::eq(registry.capability::<Counter>(), as_capability));
    assert!(std::ptr::eq(registry.class::<Counter>(), class));
}

#[test]
fn try_class_matches_class() {
    let registry = TypeRegistry::new();
    let tried = registry.try_class::<Dog>();
    assert!(tried.is_ok_and(|info| std::ptr::eq(info, registry.class::<Dog>())));
}

#[test]
fn key_space_exhaustion_is_a_fault() {
    assert_eq!(TypeRegistry::next_key(0), Ok(TypeKey::from_raw(0)));
    assert_eq!(TypeRegistry::next_key(41), Ok(TypeKey::from_raw(41)));

    let full = TypeKey::NONE.raw() as usize;
    assert_eq!(
        TypeRegistry::next_key(full),
        Err(Fault::RegistryFull { count: full })
    );
}
