//! Core domain layer. No external I/O dependencies.
//!
//! Entities, progression math and the document decoding boundary live here.

pub mod documents;
pub mod entities;
pub mod errors;
pub mod progression;

pub use documents::{Fields, StoredDocument};
pub use entities::{
    BeltRank, Dojo, GeoPoint, Lesson, LocalizedText, ProfileUpdate, Technique, TechniqueCategory,
    Term, User, Waza,
};
pub use errors::DomainError;
pub use progression::{Progression, level_for, progression_for};
