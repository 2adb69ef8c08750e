/// Separates member paths inside a logical resource name
pub const BUNDLE_SEPARATOR: char = '+';

/// Path separator used inside the container
pub const NATIVE_SEPARATOR: char = '\\';

/// Split a logical name into normalized member paths
pub fn split_logical_name(logical_name: &str) -> Vec<String> {
    logical_name
        .split(BUNDLE_SEPARATOR)
        .map(normalize)
        .collect()
}

/// Strip leading/trailing `/` and translate to the container's separator
pub fn normalize(path: &str) -> String {
    path.trim_matches('/').replace('/', &NATIVE_SEPARATOR.to_string())
}

/// Final component of a path, lowercased, in either separator convention
pub fn bare_name(path: &str) -> String {
    path.rsplit(['/', NATIVE_SEPARATOR])
        .next()
        .unwrap_or(path)
        .to_ascii_lowercase()
}

/// Split `"name.ext"` into `("name", Some("ext"))`
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}
