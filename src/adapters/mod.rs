//! Infrastructure adapters. Implement outbound ports.
//!
//! Document stores, exports, console UI. Map errors to DomainError.

pub mod export;
pub mod firestore;
pub mod persistence;
pub mod ui;
