//! In-process response cache.
//!
//! Page responses are cached per logical path and variant. Each entry carries
//! the tags recorded while it was built (`properties`, `property:<id>`,
//! `category:<slug>`), so revalidation can drop entries by tag or by path.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! response_limit = 500
//! response_body_limit_bytes = 1048576
//! ```

mod config;
pub mod deps;
mod error;
mod keys;
mod lock;
mod middleware;
mod registry;
mod response;
mod store;

pub use config::CacheConfig;
pub use error::CacheError;
pub use keys::{
    PROPERTIES_TAG, ResponseKey, category_tag, hash_variant, normalize_path, property_tag,
};
pub use middleware::{CACHE_STATUS_HEADER, response_cache_layer};
pub use registry::TagRegistry;
pub use response::{Generation, ResponseCache};
pub use store::{CachedResponse, ResponseStore};
