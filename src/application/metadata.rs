//! Search-engine and social metadata for public pages.
//!
//! Everything here is a pure function of its inputs so the same property
//! always yields the same head, whatever the request or cache state.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::domain::{
    locale::Locale,
    property::{Property, PropertyCategory},
};

pub const NOT_FOUND_TITLE: &str = "Property Not Found";
pub const NOT_FOUND_DESCRIPTION: &str =
    "The property you are looking for does not exist or has been removed.";

const DESCRIPTION_LIMIT: usize = 160;
const MAX_OG_IMAGES: usize = 4;
const X_DEFAULT: &str = "x-default";

/// Public identity of the site, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteIdentity {
    base_url: String,
    pub name: String,
    pub description: String,
}

impl SiteIdentity {
    pub fn new(
        base_url: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            name: name.into(),
            description: description.into(),
        }
    }

    /// Absolute URL for a site-relative path.
    pub fn absolute(&self, path: &str) -> String {
        if path == "/" {
            self.base_url.clone()
        } else {
            format!("{}{path}", self.base_url)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenGraphImage {
    pub url: String,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenGraph {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub site_name: String,
    pub locale: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub images: Vec<OpenGraphImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub open_graph: OpenGraph,
    /// hreflang → absolute URL, including `x-default`.
    pub alternates: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    pub noindex: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    Home,
    Category(PropertyCategory),
    Search,
}

impl ListingKind {
    pub fn path(self) -> &'static str {
        match self {
            ListingKind::Home => "/",
            ListingKind::Category(category) => category.listing_path(),
            ListingKind::Search => "/search",
        }
    }
}

/// Metadata for a property detail page.
///
/// `None` yields the fixed not-found head; this never fails.
pub fn property_metadata(
    property: Option<&Property>,
    locale: Locale,
    site: &SiteIdentity,
) -> PageMetadata {
    let Some(property) = property else {
        return not_found_metadata(locale, site);
    };

    let headline = property
        .localized_title(locale)
        .map(str::to_string)
        .unwrap_or_else(|| composed_headline(property));
    let description = property
        .localized_description(locale)
        .map(|text| truncate_description(text, DESCRIPTION_LIMIT))
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| composed_description(property));

    let path = format!("/property/{}", property.slug());
    let canonical = site.absolute(&locale.localize_path(&path));

    let images = property
        .images
        .iter()
        .take(MAX_OG_IMAGES)
        .map(|url| OpenGraphImage {
            url: url.clone(),
            alt: headline.clone(),
        })
        .collect();

    PageMetadata {
        title: format!("{headline} | {}", site.name),
        description: description.clone(),
        keywords: property_keywords(property),
        open_graph: OpenGraph {
            title: headline,
            description,
            url: Some(canonical.clone()),
            site_name: site.name.clone(),
            locale: locale.og_locale(),
            kind: "article",
            images,
        },
        alternates: alternates(&path, site),
        canonical: Some(canonical),
        noindex: false,
    }
}

/// Metadata for the home, category and search pages.
pub fn listing_metadata(kind: ListingKind, locale: Locale, site: &SiteIdentity) -> PageMetadata {
    let (heading, description) = match kind {
        ListingKind::Home => (site.name.clone(), site.description.clone()),
        ListingKind::Category(category) => {
            let heading = category.listing_title();
            (
                heading.to_string(),
                format!(
                    "Browse {} in Jávea and across the Costa Blanca.",
                    heading.to_lowercase()
                ),
            )
        }
        ListingKind::Search => (
            "Search Properties".to_string(),
            "Search homes, apartments and plots by location, price and bedrooms.".to_string(),
        ),
    };

    let title = if kind == ListingKind::Home {
        heading.clone()
    } else {
        format!("{heading} | {}", site.name)
    };
    let description = truncate_description(&description, DESCRIPTION_LIMIT);
    let path = kind.path();
    let canonical = site.absolute(&locale.localize_path(path));

    let mut keywords = vec!["Jávea".to_string(), "Costa Blanca".to_string()];
    if let ListingKind::Category(category) = kind {
        keywords.push(category.listing_title().to_lowercase());
    }

    PageMetadata {
        title,
        description: description.clone(),
        keywords,
        open_graph: OpenGraph {
            title: heading,
            description,
            url: Some(canonical.clone()),
            site_name: site.name.clone(),
            locale: locale.og_locale(),
            kind: "website",
            images: Vec::new(),
        },
        alternates: alternates(path, site),
        canonical: Some(canonical),
        noindex: kind == ListingKind::Search,
    }
}

fn not_found_metadata(locale: Locale, site: &SiteIdentity) -> PageMetadata {
    PageMetadata {
        title: NOT_FOUND_TITLE.to_string(),
        description: NOT_FOUND_DESCRIPTION.to_string(),
        keywords: Vec::new(),
        open_graph: OpenGraph {
            title: NOT_FOUND_TITLE.to_string(),
            description: NOT_FOUND_DESCRIPTION.to_string(),
            url: None,
            site_name: site.name.clone(),
            locale: locale.og_locale(),
            kind: "website",
            images: Vec::new(),
        },
        alternates: BTreeMap::new(),
        canonical: None,
        noindex: true,
    }
}

fn alternates(path: &str, site: &SiteIdentity) -> BTreeMap<String, String> {
    let mut links: BTreeMap<String, String> = Locale::ALL
        .into_iter()
        .map(|locale| {
            (
                locale.hreflang().to_string(),
                site.absolute(&locale.localize_path(path)),
            )
        })
        .collect();
    links.insert(
        X_DEFAULT.to_string(),
        site.absolute(&Locale::default().localize_path(path)),
    );
    links
}

/// `3-bedroom house in Jávea – €350,000`
fn composed_headline(property: &Property) -> String {
    let label = property.category.label();
    let mut headline = match property.specs.bedrooms {
        Some(bedrooms) if bedrooms > 0 => format!("{bedrooms}-bedroom {label}"),
        _ => capitalize(label),
    };
    if let Some(place) = property.location.display_name() {
        headline.push_str(" in ");
        headline.push_str(place);
    }
    headline.push_str(" – €");
    headline.push_str(&format_euros(property.price));
    headline
}

fn composed_description(property: &Property) -> String {
    let mut parts = vec![composed_headline(property)];
    let specs = &property.specs;
    if let Some(bathrooms) = specs.bathrooms {
        parts.push(format!("{bathrooms} bathrooms"));
    }
    if let Some(size) = specs.size {
        parts.push(format!("{} m² built", size.round() as i64));
    }
    if let Some(plot) = specs.plot_size {
        parts.push(format!("{} m² plot", plot.round() as i64));
    }
    truncate_description(&format!("{}.", parts.join(", ")), DESCRIPTION_LIMIT)
}

fn property_keywords(property: &Property) -> Vec<String> {
    let location = &property.location;
    let mut keywords: Vec<String> = [
        location.municipality.as_deref(),
        location.area.as_deref(),
        location.province.as_deref(),
        property.specs.zone.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|value| !value.is_empty())
    .map(str::to_string)
    .collect();
    keywords.push(property.category.label().to_string());
    keywords.push(property.category.listing_title().to_lowercase());

    let mut seen = HashSet::new();
    keywords.retain(|keyword| seen.insert(keyword.to_lowercase()));
    keywords
}

/// Collapse whitespace and cut to at most `limit` characters on a word
/// boundary, marking the cut with an ellipsis.
pub fn truncate_description(text: &str, limit: usize) -> String {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.chars().count() <= limit {
        return normalized;
    }

    let head: String = normalized.chars().take(limit.saturating_sub(1)).collect();
    let cut = match head.rfind(' ') {
        Some(index) if index > 0 => &head[..index],
        _ => head.as_str(),
    };
    let cut = cut.trim_end_matches([',', ';', ':', '.', ' ']);
    format!("{cut}…")
}

/// Whole euros with thousands separators: `350000.0` → `350,000`.
pub fn format_euros(amount: f64) -> String {
    let rounded = amount.round().max(0.0) as u64;
    let digits = rounded.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
