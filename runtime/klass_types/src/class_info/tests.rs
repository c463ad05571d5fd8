use crate::registry::TypeRegistry;
use pretty_assertions::assert_eq;

#[derive(Clone, Debug, Default, PartialEq)]
struct Gauge {
    level: u8,
}

#[test]
fn flags_follow_kind() {
    let registry = TypeRegistry::new();
    let gauge = registry.class::<Gauge>();
    assert!(gauge.is_concrete());
    assert!(!gauge.flags().is_nillable());
    assert!(registry.pointer_to(gauge).flags().is_reference());
    assert!(registry.slice_of(gauge).flags().is_nillable());
}

#[test]
fn membership_cache_respects_generation() {
    let registry = TypeRegistry::new();
    let gauge = registry.class::<Gauge>();
    let other = registry.class::<u8>();

    assert_eq!(gauge.cached_membership(other.key(), 0), None);
    gauge.cache_membership(other.key(), 3, true);
    assert_eq!(gauge.cached_membership(other.key(), 3), Some(true));
    assert_eq!(gauge.cached_membership(other.key(), 4), None);
    assert_eq!(gauge.cached_membership_count(), 1);
}

#[test]
fn display_and_debug() {
    let registry = TypeRegistry::new();
    let gauge = registry.class::<Gauge>();
    assert_eq!(gauge.to_string(), "Gauge");
    assert_eq!(registry.pointer_to(gauge).to_string(), "*Gauge");

    let debug = format!("{gauge:?}");
    assert!(debug.starts_with("ClassInfo { name: \"Gauge\""));
    assert!(debug.contains("has_deinit_hook: false"));
}

#[test]
fn descriptors_compare_by_key() {
    let registry = TypeRegistry::new();
    let a = registry.class::<Gauge>();
    let b = registry.class::<Gauge>();
    assert_eq!(a, b);
    assert_ne!(a, registry.class::<u8>());
}
