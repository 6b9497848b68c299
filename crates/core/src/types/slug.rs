//! Category URL slugs.

/// Normalize a category name into the form used in `/category/{slug}` URLs.
///
/// Surrounding whitespace is trimmed, the name is lowercased, and every run
/// of dashes and whitespace collapses into a single `-`.
///
/// ```rust
/// # use emporium_core::category_slug;
/// assert_eq!(category_slug("  Home  -  Garden "), "home-garden");
/// ```
#[must_use]
pub fn category_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut in_separator = false;

    for c in name.trim().to_lowercase().chars() {
        if c == '-' || c.is_whitespace() {
            if !in_separator {
                slug.push('-');
                in_separator = true;
            }
        } else {
            slug.push(c);
            in_separator = false;
        }
    }

    slug
}
