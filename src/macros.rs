/// Compile a regex literal once and hand out a `&'static Regex`.
///
/// The pattern is a literal checked by the unit tests that exercise it, so a
/// failure here is a programming error rather than a runtime condition.
#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).expect("invalid built-in regex"));
        &*RE
    }};
}
