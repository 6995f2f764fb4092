//! Slug normalization and collision-aware slug assignment.

use std::collections::{HashMap, HashSet};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercase, strip diacritics, collapse non-alphanumeric runs to `-`, trim.
///
/// `"Banská Bystrica"` → `"banska-bystrica"`, `"Hosťovce"` → `"hostovce"`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_sep = false;

    for c in text.to_lowercase().nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('-');
            }
            pending_sep = false;
            slug.push(c);
        } else {
            pending_sep = true;
        }
    }
    slug
}

/// One source record as seen by slug assignment.
#[derive(Debug, Clone, Copy)]
pub struct SlugInput<'a> {
    pub name: &'a str,
    /// Preferred base slug; derived from `name` when absent.
    pub base: Option<&'a str>,
    pub district: Option<&'a str>,
}

/// Result of assigning a slug to one input record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugAssignment {
    pub slug: String,
    /// True when the base slug was shared and had to be qualified.
    pub disambiguated: bool,
}

/// Assign unique slugs to a full input list.
///
/// First pass counts base slugs. Second pass qualifies every record whose
/// base is shared with the slugified district. A numeric suffix resolves
/// whatever still collides (same name in the same district, or no district).
/// The output is index-aligned with `inputs` and depends only on its content
/// and order.
pub fn assign_slugs(inputs: &[SlugInput<'_>]) -> Vec<SlugAssignment> {
    let bases: Vec<String> = inputs
        .iter()
        .map(|input| match input.base {
            Some(base) if !slugify(base).is_empty() => slugify(base),
            _ => slugify(input.name),
        })
        .collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for base in &bases {
        *counts.entry(base.as_str()).or_default() += 1;
    }

    let qualified: Vec<(String, bool)> = inputs
        .iter()
        .zip(&bases)
        .map(|(input, base)| {
            if counts.get(base.as_str()).copied().unwrap_or(0) <= 1 {
                return (base.clone(), false);
            }
            let district = input.district.map(slugify).unwrap_or_default();
            if district.is_empty() {
                (base.clone(), true)
            } else {
                (format!("{}-{}", base, district), true)
            }
        })
        .collect();

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut taken: HashSet<String> =
        qualified.iter().map(|(slug, _)| slug.clone()).collect();

    qualified
        .into_iter()
        .map(|(slug, disambiguated)| {
            let n = seen.entry(slug.clone()).or_default();
            *n += 1;
            if *n == 1 {
                return SlugAssignment { slug, disambiguated };
            }
            let mut suffix = *n;
            let mut candidate = format!("{}-{}", slug, suffix);
            while taken.contains(&candidate) {
                suffix += 1;
                candidate = format!("{}-{}", slug, suffix);
            }
            taken.insert(candidate.clone());
            SlugAssignment {
                slug: candidate,
                disambiguated: true,
            }
        })
        .collect()
}
