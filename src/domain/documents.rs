//! Raw store documents and the single decoding boundary into domain entities.
//!
//! Every optional field defaults here, once: absent `original` becomes "Unknown …",
//! absent maps become empty, absent XP becomes 0. Explicit `null` counts as absent.
//! Only a present field of the wrong shape is reported, as `DomainError::Malformed`.

use crate::domain::entities::{
    BeltRank, Dojo, GeoPoint, Lesson, LocalizedText, Technique, TechniqueCategory, Term, User,
    Waza,
};
use crate::domain::errors::DomainError;
use crate::domain::progression::level_for;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Top-level fields of a document.
pub type Fields = Map<String, Value>;

/// A document as returned by the store: its id plus untyped fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Fields,
}

impl StoredDocument {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Collection paths. Nested collections are slash-separated.
pub mod collections {
    pub const USERS: &str = "users";
    pub const LESSONS: &str = "lessons";
    pub const TECHNIQUES: &str = "techniques";
    pub const TERMS: &str = "terms";
    pub const DOJOS: &str = "dojos";

    pub fn wazas(category_id: &str) -> String {
        format!("{TECHNIQUES}/{category_id}/wazas")
    }

    pub fn waza_techniques(category_id: &str, waza_id: &str) -> String {
        format!("{TECHNIQUES}/{category_id}/wazas/{waza_id}/techniques")
    }
}

/// Stored field names.
pub mod field {
    pub const NAME: &str = "name";
    pub const BELT: &str = "belt";
    pub const XP: &str = "xp";
    pub const LEVEL: &str = "level";
    pub const COMPLETED_LESSONS: &str = "completedLessons";
    pub const COMPLETED_TECHNIQUES: &str = "completedTechniques";
    pub const CREATED_AT: &str = "createdAt";
    pub const LOCATION: &str = "location";
    pub const APPROVED: &str = "approved";
    pub const SUBMITTED_AT: &str = "submittedAt";
}

pub const UNKNOWN_CATEGORY: &str = "Unknown Category";
pub const UNKNOWN_WAZA: &str = "Unknown Waza";
pub const UNKNOWN_TECHNIQUE: &str = "Unknown Technique";
pub const UNKNOWN_TERM: &str = "Unknown Term";
pub const UNKNOWN_DOJO: &str = "Unknown Dojo";

/// Accepts integers, non-negative floats and numeric strings. Anything else is 0.
fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct UserDoc {
    name: Option<String>,
    belt: Option<String>,
    #[serde(deserialize_with = "lenient_u64")]
    xp: u64,
    completed_lessons: Vec<String>,
    completed_techniques: Vec<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct LessonDoc {
    title: LocalizedText,
    #[serde(deserialize_with = "lenient_u64")]
    xp: u64,
    category: String,
    terminology: Vec<String>,
}

/// Shared by category, waza and technique nodes.
#[derive(Deserialize, Default)]
#[serde(default)]
struct NodeDoc {
    title: LocalizedText,
    original: Option<String>,
    emoji: String,
    description: LocalizedText,
    video: String,
    #[serde(deserialize_with = "lenient_u64")]
    xp: u64,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TermDoc {
    original: Option<String>,
    translation: LocalizedText,
    description: LocalizedText,
    icon: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct DojoDoc {
    name: Option<String>,
    location: Option<GeoPoint>,
    approved: bool,
}

fn decode<T: DeserializeOwned>(collection: &str, doc: &StoredDocument) -> Result<T, DomainError> {
    let fields: Fields = doc
        .fields
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    serde_json::from_value(Value::Object(fields)).map_err(|e| DomainError::Malformed {
        collection: collection.to_string(),
        id: doc.id.clone(),
        reason: e.to_string(),
    })
}

fn original_or(original: Option<String>, fallback: &str) -> String {
    original
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

pub fn user_from_document(doc: &StoredDocument) -> Result<User, DomainError> {
    let raw: UserDoc = decode(collections::USERS, doc)?;
    Ok(User {
        id: doc.id.clone(),
        name: raw.name,
        belt: raw.belt.as_deref().and_then(BeltRank::parse).unwrap_or_default(),
        xp: raw.xp,
        level: level_for(raw.xp),
        completed_lessons: raw.completed_lessons,
        completed_techniques: raw.completed_techniques,
    })
}

pub fn lesson_from_document(doc: &StoredDocument) -> Result<Lesson, DomainError> {
    let raw: LessonDoc = decode(collections::LESSONS, doc)?;
    Ok(Lesson {
        id: doc.id.clone(),
        title: raw.title,
        xp: raw.xp,
        category: raw.category,
        terminology: raw.terminology,
    })
}

/// Category node without its wazas; the aggregator fills them in.
pub fn category_from_document(doc: &StoredDocument) -> Result<TechniqueCategory, DomainError> {
    let raw: NodeDoc = decode(collections::TECHNIQUES, doc)?;
    Ok(TechniqueCategory {
        id: doc.id.clone(),
        title: raw.title,
        original: original_or(raw.original, UNKNOWN_CATEGORY),
        emoji: raw.emoji,
        wazas: Vec::new(),
    })
}

/// Waza node without its techniques.
pub fn waza_from_document(category_id: &str, doc: &StoredDocument) -> Result<Waza, DomainError> {
    let raw: NodeDoc = decode(&collections::wazas(category_id), doc)?;
    Ok(Waza {
        id: doc.id.clone(),
        category_id: category_id.to_string(),
        title: raw.title,
        original: original_or(raw.original, UNKNOWN_WAZA),
        emoji: raw.emoji,
        techniques: Vec::new(),
    })
}

pub fn technique_from_document(
    category_id: &str,
    waza_id: &str,
    doc: &StoredDocument,
) -> Result<Technique, DomainError> {
    let raw: NodeDoc = decode(&collections::waza_techniques(category_id, waza_id), doc)?;
    Ok(Technique {
        id: doc.id.clone(),
        category_id: category_id.to_string(),
        waza_id: waza_id.to_string(),
        title: raw.title,
        original: original_or(raw.original, UNKNOWN_TECHNIQUE),
        emoji: raw.emoji,
        description: raw.description,
        video: raw.video,
        xp: raw.xp,
    })
}

pub fn term_from_document(doc: &StoredDocument) -> Result<Term, DomainError> {
    let raw: TermDoc = decode(collections::TERMS, doc)?;
    Ok(Term {
        id: doc.id.clone(),
        original: original_or(raw.original, UNKNOWN_TERM),
        translation: raw.translation,
        description: raw.description,
        icon: raw.icon,
    })
}

pub fn dojo_from_document(doc: &StoredDocument) -> Result<Dojo, DomainError> {
    let raw: DojoDoc = decode(collections::DOJOS, doc)?;
    Ok(Dojo {
        id: doc.id.clone(),
        name: original_or(raw.name, UNKNOWN_DOJO),
        location: raw.location,
        approved: raw.approved,
    })
}

/// Turns a `json!({...})` object into top-level fields. Non-objects yield no fields.
pub fn fields_from(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, value: Value) -> StoredDocument {
        StoredDocument::new(id, fields_from(value))
    }

    #[test]
    fn test_technique_defaults_when_fields_absent() {
        let t = technique_from_document("nage", "te", &doc("seoi", json!({}))).unwrap();
        assert_eq!(t.original, UNKNOWN_TECHNIQUE);
        assert!(t.title.is_empty());
        assert!(t.description.is_empty());
        assert_eq!(t.emoji, "");
        assert_eq!(t.xp, 0);
        assert_eq!(t.category_id, "nage");
        assert_eq!(t.waza_id, "te");
    }

    #[test]
    fn test_nulls_count_as_absent() {
        let c = category_from_document(&doc(
            "nage",
            json!({"original": null, "title": null, "emoji": null}),
        ))
        .unwrap();
        assert_eq!(c.original, UNKNOWN_CATEGORY);
        assert!(c.title.is_empty());

        let u = user_from_document(&doc("u1", json!({"completedLessons": null}))).unwrap();
        assert!(u.completed_lessons.is_empty());
    }

    #[test]
    fn test_null_translation_keeps_node() {
        let t = technique_from_document(
            "nage",
            "te",
            &doc(
                "seoi",
                json!({"original": "Seoi-nage", "title": {"en": "Shoulder throw", "fr": null}, "xp": 150}),
            ),
        )
        .unwrap();
        assert_eq!(t.original, "Seoi-nage");
        assert_eq!(t.title.resolve("fr"), "Shoulder throw");
        assert_eq!(t.xp, 150);
    }

    #[test]
    fn test_user_decoding() {
        let u = user_from_document(&doc(
            "u1",
            json!({
                "name": "Kano",
                "belt": "brown",
                "xp": 1200.0,
                "level": 1,
                "completedLessons": ["l1", "l1"],
                "completedTechniques": ["seoi"],
                "city": "Tokyo"
            }),
        ))
        .unwrap();
        assert_eq!(u.name.as_deref(), Some("Kano"));
        assert_eq!(u.belt, BeltRank::Brown);
        assert_eq!(u.xp, 1200);
        // level is derived from XP, not trusted from the document
        assert_eq!(u.level, 3);
        assert_eq!(u.completed_lessons, vec!["l1", "l1"]);
    }

    #[test]
    fn test_unknown_belt_defaults_to_white() {
        let u = user_from_document(&doc("u1", json!({"belt": "purple"}))).unwrap();
        assert_eq!(u.belt, BeltRank::White);
        assert_eq!(u.level, 1);
    }

    #[test]
    fn test_wrong_shape_is_malformed() {
        let err = lesson_from_document(&doc("l1", json!({"title": 42}))).unwrap_err();
        assert!(matches!(err, DomainError::Malformed { ref id, .. } if id == "l1"));
    }

    #[test]
    fn test_lesson_and_term_decoding() {
        let l = lesson_from_document(&doc(
            "l1",
            json!({"title": {"en": "Rei"}, "xp": "100", "category": "etiquette", "terminology": ["t2", "t1"]}),
        ))
        .unwrap();
        assert_eq!(l.xp, 100);
        assert_eq!(l.title.resolve("en"), "Rei");
        assert_eq!(l.terminology, vec!["t2", "t1"]);

        let t = term_from_document(&doc("t1", json!({"translation": {"en": "bow"}}))).unwrap();
        assert_eq!(t.original, UNKNOWN_TERM);
        assert_eq!(t.translation.resolve("en"), "bow");
    }

    #[test]
    fn test_dojo_decoding() {
        let d = dojo_from_document(&doc(
            "d1",
            json!({"name": "Kodokan", "location": {"latitude": 35.7, "longitude": 139.75}, "approved": true}),
        ))
        .unwrap();
        assert!(d.approved);
        assert_eq!(d.location, Some(GeoPoint::new(35.7, 139.75)));

        let d = dojo_from_document(&doc("d2", json!({}))).unwrap();
        assert_eq!(d.name, UNKNOWN_DOJO);
        assert!(!d.approved);
        assert!(d.location.is_none());
    }

    #[test]
    fn test_collection_paths() {
        assert_eq!(collections::wazas("nage"), "techniques/nage/wazas");
        assert_eq!(
            collections::waza_techniques("nage", "te"),
            "techniques/nage/wazas/te/techniques"
        );
    }
}
