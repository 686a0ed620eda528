//! Application services layer.

pub mod error;
pub mod listing;
pub mod metadata;
pub mod pagination;
pub mod repos;
pub mod revalidation;
pub mod tracking;
