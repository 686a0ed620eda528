use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache path `{0}` must start with `/`")]
    InvalidPath(String),
    #[error("cache tag must not be blank")]
    InvalidTag,
}
