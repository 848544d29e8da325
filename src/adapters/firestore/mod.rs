//! Hosted Firestore backend over its REST API.

pub mod client;
pub mod value;

pub use client::FirestoreRestStore;
