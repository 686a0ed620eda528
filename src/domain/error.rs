use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown property category `{value}`")]
    UnknownCategory { value: String },
    #[error("unknown locale `{value}`")]
    UnknownLocale { value: String },
    #[error("slug `{slug}` does not carry a property id")]
    InvalidSlug { slug: String },
}

impl DomainError {
    pub fn unknown_category(value: impl Into<String>) -> Self {
        Self::UnknownCategory {
            value: value.into(),
        }
    }

    pub fn unknown_locale(value: impl Into<String>) -> Self {
        Self::UnknownLocale {
            value: value.into(),
        }
    }

    pub fn invalid_slug(slug: impl Into<String>) -> Self {
        Self::InvalidSlug { slug: slug.into() }
    }
}
