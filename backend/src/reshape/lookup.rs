//! Linear membership lookups over small label lists.
//!
//! Both helpers are O(|set|). The sets they run over are the fixed-column
//! list or the header, so they are bounded by table width, not row count.

/// Returns true iff `value` is equal to some element of `set`.
pub fn contains<S: AsRef<str>>(value: &str, set: &[S]) -> bool {
    set.iter().any(|s| s.as_ref() == value)
}

/// Returns the index of the first element of `set` equal to `value`.
pub fn index_of<S: AsRef<str>>(value: &str, set: &[S]) -> Option<usize> {
    set.iter().position(|s| s.as_ref() == value)
}
