//! File exports.

pub mod csv_export;

pub use csv_export::{export_leaderboard, leaderboard_to_csv};
