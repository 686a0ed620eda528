//! Domain layer: pure types shared by every other layer.

pub mod error;
pub mod locale;
pub mod property;
pub mod slug;
