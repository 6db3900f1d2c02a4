//! Deterministic slug generation.
//!
//! Slugs participate in the CMS uniqueness constraint, so the same name must
//! always produce the same slug.

/// Derive a URL slug from a display name.
///
/// Lower-cases and trims the name, turns whitespace runs into single hyphens,
/// drops everything outside `[a-z0-9-]`, collapses repeated hyphens and trims
/// hyphens from both ends.
pub fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());

    for c in lowered.chars() {
        let c = if c.is_whitespace() { '-' } else { c };
        match c {
            'a'..='z' | '0'..='9' => slug.push(c),
            '-' if !slug.is_empty() && !slug.ends_with('-') => slug.push('-'),
            _ => {}
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
