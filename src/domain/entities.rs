//! Domain entities. Pure data structures for the core business.
//!
//! No store/IO types here; raw documents are mapped in `domain::documents`.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Language used when a requested translation is missing.
pub const FALLBACK_LANGUAGE: &str = "en";

/// Language code -> text. Titles, descriptions and translations are stored this way.
///
/// Decoding keeps only string entries; a null or non-string translation is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LocalizedText(pub BTreeMap<String, String>);

impl<'de> Deserialize<'de> for LocalizedText {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(d)?;
        Ok(Self(
            raw.into_iter()
                .filter_map(|(lang, v)| match v {
                    serde_json::Value::String(text) => Some((lang, text)),
                    _ => None,
                })
                .collect(),
        ))
    }
}

impl LocalizedText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for fixtures.
    pub fn with(mut self, lang: &str, text: &str) -> Self {
        self.0.insert(lang.to_string(), text.to_string());
        self
    }

    /// Text for `lang`, falling back to English, then to any entry, then to "".
    pub fn resolve(&self, lang: &str) -> &str {
        self.0
            .get(lang)
            .or_else(|| self.0.get(FALLBACK_LANGUAGE))
            .or_else(|| self.0.values().next())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Belt rank, lowest to highest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BeltRank {
    #[default]
    White,
    Yellow,
    Orange,
    Green,
    Blue,
    Brown,
    Black,
    Red,
    RedAndWhite,
}

impl BeltRank {
    pub const ALL: [BeltRank; 9] = [
        BeltRank::White,
        BeltRank::Yellow,
        BeltRank::Orange,
        BeltRank::Green,
        BeltRank::Blue,
        BeltRank::Brown,
        BeltRank::Black,
        BeltRank::Red,
        BeltRank::RedAndWhite,
    ];

    /// Stored label (matches the serde representation).
    pub fn as_str(self) -> &'static str {
        match self {
            BeltRank::White => "white",
            BeltRank::Yellow => "yellow",
            BeltRank::Orange => "orange",
            BeltRank::Green => "green",
            BeltRank::Blue => "blue",
            BeltRank::Brown => "brown",
            BeltRank::Black => "black",
            BeltRank::Red => "red",
            BeltRank::RedAndWhite => "red-and-white",
        }
    }

    /// Parse a stored label. Unknown labels yield `None`.
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.as_str() == label)
    }
}

impl fmt::Display for BeltRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A learner's profile document.
///
/// `completed_lessons` may contain duplicates (lesson completion is not idempotent);
/// `completed_techniques` never does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub belt: BeltRank,
    pub xp: u64,
    pub level: u32,
    pub completed_lessons: Vec<String>,
    pub completed_techniques: Vec<String>,
}

/// Fields a learner may edit on their profile. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub belt: Option<BeltRank>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    pub title: LocalizedText,
    pub xp: u64,
    pub category: String,
    /// Ordered term ids shown with the lesson.
    pub terminology: Vec<String>,
}

/// Top of the technique tree (e.g. Nage-waza).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechniqueCategory {
    pub id: String,
    pub title: LocalizedText,
    pub original: String,
    pub emoji: String,
    pub wazas: Vec<Waza>,
}

/// Sub-group of a category (e.g. Te-waza).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waza {
    pub id: String,
    pub category_id: String,
    pub title: LocalizedText,
    pub original: String,
    pub emoji: String,
    pub techniques: Vec<Technique>,
}

/// Leaf of the technique tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technique {
    pub id: String,
    pub category_id: String,
    pub waza_id: String,
    pub title: LocalizedText,
    pub original: String,
    pub emoji: String,
    pub description: LocalizedText,
    pub video: String,
    pub xp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub id: String,
    pub original: String,
    pub translation: LocalizedText,
    pub description: LocalizedText,
    pub icon: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance in kilometres (haversine).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dojo {
    pub id: String,
    pub name: String,
    pub location: Option<GeoPoint>,
    pub approved: bool,
}
