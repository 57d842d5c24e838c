//! URL slugs for mentors and posts

use std::future::Future;

/// Upper bound on generated slug length, in characters
const MAX_SLUG_LEN: usize = 80;

/// Generate a URL-friendly slug from a name or title
///
/// Lowercases, turns separators and ASCII punctuation into hyphens, keeps
/// non-ASCII letters, and collapses runs of hyphens.
pub fn generate_slug(title: &str) -> String {
    let mut result = String::new();
    let mut prev_hyphen = false;

    for c in title.to_lowercase().chars() {
        let mapped = if c.is_ascii_alphanumeric() || (!c.is_ascii() && c.is_alphanumeric()) {
            Some(c)
        } else {
            None
        };
        match mapped {
            Some(c) => {
                result.push(c);
                prev_hyphen = false;
            }
            None => {
                if !prev_hyphen && !result.is_empty() {
                    result.push('-');
                    prev_hyphen = true;
                }
            }
        }
        if result.chars().count() >= MAX_SLUG_LEN {
            break;
        }
    }

    result.trim_end_matches('-').to_string()
}

/// Normalize `requested` (or derive from `fallback_source`) and append
/// `-2`, `-3`, ... until `exists` reports the slug as free.
pub(crate) async fn unique_slug<F, Fut>(
    requested: Option<&str>,
    fallback_source: &str,
    default_slug: &str,
    mut exists: F,
) -> anyhow::Result<String>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = anyhow::Result<bool>>,
{
    let mut base = requested
        .map(generate_slug)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| generate_slug(fallback_source));
    if base.is_empty() {
        base = default_slug.to_string();
    }

    if !exists(base.clone()).await? {
        return Ok(base);
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !exists(candidate.clone()).await? {
            return Ok(candidate);
        }
        n += 1;
    }
}
