//! Listing backend for a Costa Blanca real-estate site.
//!
//! Page documents and SEO metadata for the public routes, cache revalidation
//! after content uploads, and property view tracking.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
