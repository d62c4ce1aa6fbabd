//! Product slug codec.
//!
//! Slugs are URL tokens derived from the product name, brand and part number,
//! e.g. `{name: "Filtro de Óleo", brand: "Hella", part_number: "FH-100"}`
//! becomes `filtro-de-oleo-hella-fh100`.
//!
//! Encoding is lossy: every word of the name becomes its own hyphen-delimited
//! token, so [`decode`] cannot tell where the name ends and the brand begins.
//! Detail lookups therefore resolve slugs by equality against the stored
//! `slug` column and fall back to the product id, never by parsing.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::Product;

/// Positional fields recovered from a slug by [`decode`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlugParts {
    pub name: String,
    pub brand: String,
    pub part_number: String,
}

/// Derive the slug for a product.
pub fn encode(product: &Product) -> String {
    encode_parts(
        &product.name,
        product.brand.as_deref(),
        product.part_number.as_deref(),
    )
}

/// Derive a slug from its raw fields.
///
/// The name keeps its word boundaries as hyphens; brand and part number are
/// squashed to a single alphanumeric token each and only appended when
/// something survives the stripping.
pub fn encode_parts(name: &str, brand: Option<&str>, part_number: Option<&str>) -> String {
    let folded: String = fold(name)
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();

    let mut segments: Vec<String> = Vec::with_capacity(3);
    let name_segment = folded.split_whitespace().collect::<Vec<_>>().join("-");
    if !name_segment.is_empty() {
        segments.push(name_segment);
    }

    for extra in [brand, part_number].into_iter().flatten() {
        let token = squash(extra);
        if !token.is_empty() {
            segments.push(token);
        }
    }

    segments.join("-")
}

/// Best-effort reverse parse: the first three hyphen-separated tokens are
/// taken as name, brand and part number.
///
/// Only exact for single-word names; `filtro-de-oleo-hella-fh100` yields
/// `name = "filtro"`, `brand = "de"`, `part_number = "oleo"`.
pub fn decode(slug: &str) -> SlugParts {
    let mut tokens = slug.split('-');
    let mut next = || tokens.next().unwrap_or("").to_string();
    SlugParts {
        name: next(),
        brand: next(),
        part_number: next(),
    }
}

/// Strip diacritics and lower-case.
pub(crate) fn fold(value: &str) -> String {
    value
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

fn squash(value: &str) -> String {
    fold(value)
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}
