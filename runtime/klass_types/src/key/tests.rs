use super::*;

#[test]
fn key_size() {
    assert_eq!(std::mem::size_of::<TypeKey>(), 4);
}

#[test]
fn none_sentinel() {
    assert!(TypeKey::NONE.is_none());
    assert!(!TypeKey::from_raw(0).is_none());
    assert_eq!(format!("{:?}", TypeKey::NONE), "TypeKey(NONE)");
}

#[test]
fn raw_roundtrip_and_display() {
    let key = TypeKey::from_raw(17);
    assert_eq!(key.raw(), 17);
    assert_eq!(key.index(), 17);
    assert_eq!(key.to_string(), "#17");
    assert_eq!(format!("{key:?}"), "TypeKey(17)");
}
