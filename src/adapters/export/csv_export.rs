//! CSV export of the leaderboard. Uses the `csv` crate for quoting/escaping.

use crate::domain::DomainError;
use crate::usecases::LeaderboardEntry;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::info;

/// Leaderboard rows as CSV with a header: `Rank,Name,Belt,Level,XP`.
pub fn leaderboard_to_csv(entries: &[LeaderboardEntry]) -> Result<String, csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(Vec::new());

    wtr.write_record(["Rank", "Name", "Belt", "Level", "XP"])?;
    for e in entries {
        wtr.write_record([
            e.rank.to_string(),
            e.name.clone(),
            e.belt.to_string(),
            e.level.to_string(),
            e.xp.to_string(),
        ])?;
    }

    wtr.flush()?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| csv::Error::from(std::io::Error::other(e.to_string())))?;
    String::from_utf8(bytes).map_err(|e| {
        csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e.to_string(),
        ))
    })
}

/// Write `leaderboard-YYYY-MM-DD.csv` into `dir` and return its path.
pub async fn export_leaderboard(
    dir: impl AsRef<Path>,
    entries: &[LeaderboardEntry],
) -> Result<PathBuf, DomainError> {
    let dir = dir.as_ref();
    let csv = leaderboard_to_csv(entries)
        .map_err(|e| DomainError::DataUnavailable(format!("leaderboard CSV: {}", e)))?;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| DomainError::DataUnavailable(format!("create export dir: {}", e)))?;
    let path = dir.join(format!("leaderboard-{}.csv", Utc::now().format("%Y-%m-%d")));
    tokio::fs::write(&path, csv)
        .await
        .map_err(|e| DomainError::DataUnavailable(format!("write {}: {}", path.display(), e)))?;
    info!(path = %path.display(), rows = entries.len(), "leaderboard exported");
    Ok(path)
}
