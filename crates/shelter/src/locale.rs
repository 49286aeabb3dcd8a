//! Per-locale message dictionaries.
//!
//! Dictionaries are JSON files embedded at compile time and decoded into
//! [`Dictionary`] once at startup. Callers read messages through typed fields,
//! so a missing key is a load error instead of a blank label at runtime.

use serde::Deserialize;

use crate::occupancy::OccupancyStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locale {
    En,
    PtBr,
    Es,
}

impl Locale {
    pub const fn ordered() -> [Self; 3] {
        [Self::En, Self::PtBr, Self::Es]
    }

    pub const fn tag(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::PtBr => "pt-BR",
            Self::Es => "es",
        }
    }

    /// Accepts a BCP 47 tag; only the primary language subtag is significant.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag.trim().split(['-', '_']).next()?.to_ascii_lowercase();
        match primary.as_str() {
            "en" => Some(Self::En),
            "pt" => Some(Self::PtBr),
            "es" => Some(Self::Es),
            _ => None,
        }
    }

    /// First supported language of an `Accept-Language` header, by quality.
    pub fn negotiate(header: Option<&str>, fallback: Locale) -> Locale {
        header
            .map(accept_language::parse)
            .unwrap_or_default()
            .iter()
            .find_map(|tag| Locale::from_tag(tag))
            .unwrap_or(fallback)
    }

    fn source(self) -> &'static str {
        match self {
            Self::En => include_str!("../locales/en.json"),
            Self::PtBr => include_str!("../locales/pt-BR.json"),
            Self::Es => include_str!("../locales/es.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Dictionary {
    pub occupancy: OccupancyMessages,
    pub placement: PlacementMessages,
    pub donation: DonationMessages,
    pub removal: RemovalMessages,
    pub errors: ErrorMessages,
}

impl Dictionary {
    pub fn occupancy_label(&self, status: OccupancyStatus) -> &str {
        match status {
            OccupancyStatus::Available => &self.occupancy.available,
            OccupancyStatus::Full => &self.occupancy.full,
            OccupancyStatus::Overcrowded => &self.occupancy.overcrowded,
            OccupancyStatus::NoRooms => &self.occupancy.no_rooms,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OccupancyMessages {
    pub available: String,
    pub full: String,
    pub overcrowded: String,
    pub no_rooms: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlacementMessages {
    pub housing_without_spaces: String,
    pub space_not_in_housing: String,
    pub already_allocated: String,
    pub not_allocated: String,
    pub same_placement: String,
    pub allocated: String,
    pub reallocated: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DonationMessages {
    pub missing_beneficiary: String,
    pub missing_source: String,
    pub missing_product: String,
    pub zero_quantity: String,
    pub donated: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemovalMessages {
    pub available: String,
    pub unavailable: String,
    pub error: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorMessages {
    pub network: String,
    pub not_found: String,
    pub validation: String,
    pub unauthorized: String,
}

#[derive(Debug, thiserror::Error)]
#[error("dictionary for '{tag}' is malformed: {source}")]
pub struct LocaleError {
    tag: &'static str,
    #[source]
    source: serde_json::Error,
}

/// Every supported dictionary, decoded once.
#[derive(Debug, Clone)]
pub struct Dictionaries {
    en: Dictionary,
    pt_br: Dictionary,
    es: Dictionary,
    fallback: Locale,
}

impl Dictionaries {
    pub fn load(fallback: Locale) -> Result<Self, LocaleError> {
        let parse = |locale: Locale| {
            serde_json::from_str::<Dictionary>(locale.source()).map_err(|source| LocaleError {
                tag: locale.tag(),
                source,
            })
        };

        Ok(Self {
            en: parse(Locale::En)?,
            pt_br: parse(Locale::PtBr)?,
            es: parse(Locale::Es)?,
            fallback,
        })
    }

    pub fn get(&self, locale: Locale) -> &Dictionary {
        match locale {
            Locale::En => &self.en,
            Locale::PtBr => &self.pt_br,
            Locale::Es => &self.es,
        }
    }

    pub fn fallback(&self) -> Locale {
        self.fallback
    }

    pub fn for_header(&self, accept_language: Option<&str>) -> &Dictionary {
        self.get(Locale::negotiate(accept_language, self.fallback))
    }
}
