//! Property records as they come back from the listing store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use super::{error::DomainError, locale::Locale, slug::property_slug};

/// Listing category. `house`, `investment` and `plot` are legacy values that
/// still exist in the data and are listed together with `sale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyCategory {
    Sale,
    Rent,
    NewBuilding,
    House,
    Investment,
    Plot,
}

impl PropertyCategory {
    /// Categories that own a listing page.
    pub const LISTED: [PropertyCategory; 3] = [
        PropertyCategory::Sale,
        PropertyCategory::Rent,
        PropertyCategory::NewBuilding,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PropertyCategory::Sale => "sale",
            PropertyCategory::Rent => "rent",
            PropertyCategory::NewBuilding => "new-building",
            PropertyCategory::House => "house",
            PropertyCategory::Investment => "investment",
            PropertyCategory::Plot => "plot",
        }
    }

    /// Noun used in composed headlines ("3-bedroom villa in …").
    pub fn label(self) -> &'static str {
        match self {
            PropertyCategory::Sale => "property",
            PropertyCategory::Rent => "rental",
            PropertyCategory::NewBuilding => "new build",
            PropertyCategory::House => "house",
            PropertyCategory::Investment => "investment property",
            PropertyCategory::Plot => "plot",
        }
    }

    /// Heading of the listing page that shows this category.
    pub fn listing_title(self) -> &'static str {
        match self.listed_under() {
            PropertyCategory::Rent => "Properties for Rent",
            PropertyCategory::NewBuilding => "New Developments",
            _ => "Properties for Sale",
        }
    }

    /// The listing category this value is shown under.
    pub fn listed_under(self) -> PropertyCategory {
        match self {
            PropertyCategory::Rent => PropertyCategory::Rent,
            PropertyCategory::NewBuilding => PropertyCategory::NewBuilding,
            _ => PropertyCategory::Sale,
        }
    }

    pub fn listing_path(self) -> &'static str {
        match self.listed_under() {
            PropertyCategory::Rent => "/rent",
            PropertyCategory::NewBuilding => "/new-building",
            _ => "/sale",
        }
    }

    /// Stored category values a listing filter for `self` must match.
    pub fn stored_values(self) -> &'static [&'static str] {
        match self.listed_under() {
            PropertyCategory::Rent => &["rent"],
            PropertyCategory::NewBuilding => &["new-building"],
            _ => &["sale", "house", "investment", "plot"],
        }
    }
}

impl fmt::Display for PropertyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyCategory {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "sale" => Ok(PropertyCategory::Sale),
            "rent" => Ok(PropertyCategory::Rent),
            "new-building" | "new_building" => Ok(PropertyCategory::NewBuilding),
            "house" => Ok(PropertyCategory::House),
            "investment" => Ok(PropertyCategory::Investment),
            "plot" => Ok(PropertyCategory::Plot),
            other => Err(DomainError::unknown_category(other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default, rename = "location")]
    pub label: Option<String>,
}

impl Location {
    /// Most specific human-readable place name available.
    pub fn display_name(&self) -> Option<&str> {
        [&self.municipality, &self.label, &self.area, &self.province, &self.region]
            .into_iter()
            .filter_map(|value| value.as_deref())
            .map(str::trim)
            .find(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySpecs {
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
    /// Built area in square metres.
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(default)]
    pub plot_size: Option<f64>,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub buildability: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    #[serde(alias = "type")]
    pub category: PropertyCategory,
    pub title: String,
    #[serde(default)]
    pub title_en: Option<String>,
    #[serde(default)]
    pub title_ru: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_en: Option<String>,
    #[serde(default)]
    pub description_ru: Option<String>,
    pub price: f64,
    #[serde(flatten)]
    pub location: Location,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub features: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub specs: PropertySpecs,
    #[serde(default)]
    pub views_count: i64,
    #[serde(default)]
    pub saves_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Property {
    pub fn slug(&self) -> String {
        property_slug(&self.title, &self.id)
    }

    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Title in `locale`, falling back to the base column.
    ///
    /// Spanish copy lives in the base columns.
    pub fn localized_title(&self, locale: Locale) -> Option<&str> {
        localized(&self.title_en, &self.title_ru, Some(&self.title), locale)
    }

    pub fn localized_description(&self, locale: Locale) -> Option<&str> {
        localized(
            &self.description_en,
            &self.description_ru,
            self.description.as_ref(),
            locale,
        )
    }
}

/// Row of the denormalised card view used by listing pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyCard {
    pub id: String,
    #[serde(alias = "type")]
    pub category: PropertyCategory,
    pub title: String,
    #[serde(default)]
    pub title_en: Option<String>,
    #[serde(default)]
    pub title_ru: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub primary_image: Option<String>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(default)]
    pub views_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl PropertyCard {
    pub fn slug(&self) -> String {
        property_slug(&self.title, &self.id)
    }

    pub fn localized_title(&self, locale: Locale) -> &str {
        localized(&self.title_en, &self.title_ru, Some(&self.title), locale)
            .unwrap_or(&self.title)
    }
}

fn localized<'a>(
    en: &'a Option<String>,
    ru: &'a Option<String>,
    base: Option<&'a String>,
    locale: Locale,
) -> Option<&'a str> {
    let preferred = match locale {
        Locale::En => en.as_ref(),
        Locale::Ru => ru.as_ref(),
        Locale::Es => None,
    };
    preferred
        .into_iter()
        .chain(base)
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
