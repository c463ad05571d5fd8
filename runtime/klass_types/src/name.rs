//! Display names for registered types.
//!
//! `std::any::type_name` yields fully qualified paths such as
//! `my_crate::animals::Dog` or `dyn my_crate::Animal`. Descriptors store the
//! short form (`Dog`, `Animal`), with generic arguments shortened the same way.

/// Shorten a fully qualified Rust type name.
pub fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment_start = 0;
    let bytes = full.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b':' if bytes.get(i + 1) == Some(&b':') => {
                // Drop everything in the current segment up to and including `::`.
                i += 2;
                segment_start = i;
            }
            b'<' | b'>' | b',' | b' ' | b'(' | b')' | b'[' | b']' | b'&' | b';' | b'*' => {
                out.push_str(&full[segment_start..i]);
                out.push(char::from(bytes[i]));
                i += 1;
                segment_start = i;
            }
            _ => i += 1,
        }
    }
    out.push_str(&full[segment_start..]);

    match out.strip_prefix("dyn ") {
        Some(rest) => rest.to_owned(),
        None => out,
    }
}
