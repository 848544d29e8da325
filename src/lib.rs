//! judo-sync: judo learning core (XP progression, technique catalog, profile/lesson state)
//! over a hosted document store, with Hexagonal Architecture.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
