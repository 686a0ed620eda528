//! Public property slugs.
//!
//! A slug is the slugified title followed by the property id, so the id is
//! always the last dash-delimited token: `sea-view-villa-a1b2c3`.

use slug::slugify;

use super::error::DomainError;

pub fn property_slug(title: &str, id: &str) -> String {
    let base = slugify(title);
    if base.is_empty() {
        id.to_string()
    } else {
        format!("{base}-{id}")
    }
}

/// Extract the property id from a public slug.
pub fn id_from_slug(slug: &str) -> Result<&str, DomainError> {
    let trimmed = slug.trim().trim_end_matches('/');
    let id = trimmed.rsplit('-').next().unwrap_or_default();
    if id.is_empty() {
        return Err(DomainError::invalid_slug(slug));
    }
    Ok(id)
}
