//! Utility functions and helpers

/// Split a comma-separated list of counter names (e.g. "a, b,,c")
///
/// Whitespace around names is trimmed and empty entries are dropped. Order and
/// duplicates are preserved: results are reported in request order.
pub fn parse_name_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
