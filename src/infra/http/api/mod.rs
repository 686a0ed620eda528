//! JSON endpoints called by the upload pipeline and the site frontend.

pub mod revalidate;
pub mod track_view;
