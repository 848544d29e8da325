//! Implements InputPort. Inquire-based interactive menu.
//!
//! Thin: every action delegates to a use case. Failed actions are shown as an alert
//! and the menu continues; retry is always user-initiated.

use crate::adapters::export::export_leaderboard;
use crate::domain::{BeltRank, DomainError, GeoPoint, ProfileUpdate, Technique, progression_for};
use crate::ports::InputPort;
use crate::usecases::{
    CatalogService, CompletionOutcome, DojoService, LeaderboardService, LearningStore, LoadStatus,
};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::error::InquireError;
use inquire::ui::{Color, RenderConfig, Styled};
use inquire::{Confirm, Select, Text};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Red prompt prefix, applied to every prompt.
pub fn apply_theme() {
    let config = RenderConfig::default()
        .with_prompt_prefix(Styled::new("›").with_fg(Color::LightRed))
        .with_highlighted_option_prefix(Styled::new("➤").with_fg(Color::LightRed));
    inquire::set_global_render_config(config);
}

fn input_err(e: InquireError) -> DomainError {
    DomainError::Input(e.to_string())
}

/// `None` when the user backs out with Esc/Ctrl-C.
fn cancelled<T>(res: Result<T, InquireError>) -> Result<Option<T>, DomainError> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(input_err(e)),
    }
}

/// Spinner shown while a load is in flight.
fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[derive(Clone, Copy)]
enum MenuItem {
    Profile,
    Techniques,
    Lessons,
    Leaderboard,
    Dojos,
    Refresh,
    Quit,
}

impl MenuItem {
    const ALL: [MenuItem; 7] = [
        MenuItem::Profile,
        MenuItem::Techniques,
        MenuItem::Lessons,
        MenuItem::Leaderboard,
        MenuItem::Dojos,
        MenuItem::Refresh,
        MenuItem::Quit,
    ];
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MenuItem::Profile => "My profile",
            MenuItem::Techniques => "Techniques",
            MenuItem::Lessons => "Lessons",
            MenuItem::Leaderboard => "Leaderboard",
            MenuItem::Dojos => "Dojo map",
            MenuItem::Refresh => "Refresh",
            MenuItem::Quit => "Quit",
        })
    }
}

/// A select option carrying the index of the item it labels.
struct Labeled {
    index: usize,
    label: String,
}

impl fmt::Display for Labeled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

fn labeled<T>(items: &[T], label: impl Fn(&T) -> String) -> Vec<Labeled> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| Labeled {
            index,
            label: label(item),
        })
        .collect()
}

/// Console adapter.
pub struct TuiInputPort {
    store: Arc<LearningStore>,
    catalog: Arc<CatalogService>,
    leaderboard: Arc<LeaderboardService>,
    dojos: Arc<DojoService>,
    user_id: Option<String>,
    language: String,
    leaderboard_size: usize,
    export_dir: PathBuf,
}

impl TuiInputPort {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<LearningStore>,
        catalog: Arc<CatalogService>,
        leaderboard: Arc<LeaderboardService>,
        dojos: Arc<DojoService>,
        user_id: Option<String>,
        language: String,
        leaderboard_size: usize,
        export_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            catalog,
            leaderboard,
            dojos,
            user_id,
            language,
            leaderboard_size,
            export_dir,
        }
    }

    fn require_user(&self) -> Result<&str, DomainError> {
        self.user_id
            .as_deref()
            .ok_or_else(|| DomainError::Config("set JUDO_USER_ID to record progress".into()))
    }

    async fn load(&self) {
        let pb = spinner("Loading lessons and techniques…");
        let status = self.store.refresh().await;
        pb.finish_and_clear();
        if let LoadStatus::PartiallyFailed { lessons, catalog } = status {
            let mut missing = Vec::new();
            if lessons {
                missing.push("lessons");
            }
            if catalog {
                missing.push("techniques");
            }
            println!("⚠ Could not load {}. Pick Refresh to retry.", missing.join(" and "));
        }
    }

    async fn show_profile(&self) -> Result<(), DomainError> {
        let user_id = self.require_user()?;
        let user = self.store.load_profile(user_id).await?;
        let p = progression_for(user.xp);
        println!(
            "{} · {} belt · level {} · {} XP",
            user.name.as_deref().unwrap_or(&user.id),
            user.belt,
            p.level,
            user.xp
        );
        println!(
            "  {}/{} XP to next level ({:.1}%)",
            p.current_xp, p.required_xp, p.percent
        );
        println!(
            "  {} lessons, {} techniques completed",
            user.completed_lessons.len(),
            user.completed_techniques.len()
        );

        if !cancelled(Confirm::new("Edit profile?").with_default(false).prompt())?.unwrap_or(false) {
            return Ok(());
        }
        let name = cancelled(
            Text::new("Name:")
                .with_default(user.name.as_deref().unwrap_or(""))
                .prompt(),
        )?
        .filter(|n| !n.trim().is_empty());
        let belt = cancelled(Select::new("Belt:", BeltRank::ALL.to_vec()).prompt())?;
        let updated = self
            .store
            .update_profile(user_id, &ProfileUpdate { name, belt })
            .await?;
        println!("Saved. {} belt.", updated.belt);
        Ok(())
    }

    async fn browse_techniques(&self) -> Result<(), DomainError> {
        let catalog = self.store.catalog().await;
        if catalog.is_empty() {
            println!("No techniques loaded.");
            return Ok(());
        }
        let lang = &self.language;
        let options = labeled(&catalog, |c| {
            format!("{} {} ({})", c.emoji, c.original, c.title.resolve(lang))
        });
        let Some(pick) = cancelled(Select::new("Category:", options).prompt())? else {
            return Ok(());
        };
        // detail screens fetch their own scope so they reflect the latest data
        let category = self.catalog.fetch_category(&catalog[pick.index].id).await?;
        if let Some(notice) = empty_notice(category.wazas.len(), "wazas") {
            println!("{}", notice);
            return Ok(());
        }
        let options = labeled(&category.wazas, |w| {
            format!("{} {} ({})", w.emoji, w.original, w.title.resolve(lang))
        });
        let Some(pick) = cancelled(Select::new("Waza:", options).prompt())? else {
            return Ok(());
        };
        let waza = &category.wazas[pick.index];
        if let Some(notice) = empty_notice(waza.techniques.len(), "techniques") {
            println!("{}", notice);
            return Ok(());
        }
        let options = labeled(&waza.techniques, |t| {
            format!("{} ({}) · {} XP", t.original, t.title.resolve(lang), t.xp)
        });
        let Some(pick) = cancelled(Select::new("Technique:", options).prompt())? else {
            return Ok(());
        };
        self.show_technique(&waza.techniques[pick.index]).await
    }

    async fn show_technique(&self, technique: &Technique) -> Result<(), DomainError> {
        println!("{} {}", technique.emoji, technique.original);
        println!("  {}", technique.title.resolve(&self.language));
        println!("  {}", technique.description.resolve(&self.language));
        if !technique.video.is_empty() {
            println!("  video: {}", technique.video);
        }
        if !cancelled(Confirm::new("Mark as learned?").with_default(false).prompt())?.unwrap_or(false) {
            return Ok(());
        }
        let user_id = self.require_user()?;
        let outcome = self
            .store
            .record_technique_completion(user_id, &technique.id, technique.xp)
            .await?;
        report(&outcome);
        Ok(())
    }

    async fn browse_lessons(&self) -> Result<(), DomainError> {
        let lessons = self.store.lessons().await;
        if lessons.is_empty() {
            println!("No lessons loaded.");
            return Ok(());
        }
        let lang = &self.language;
        let options = labeled(&lessons, |l| {
            format!("[{}] {} · {} XP", l.category, l.title.resolve(lang), l.xp)
        });
        let Some(pick) = cancelled(Select::new("Lesson:", options).prompt())? else {
            return Ok(());
        };
        let lesson = &lessons[pick.index];
        for term in self.catalog.terms_for_lesson(lesson).await? {
            println!(
                "  {} {}: {}. {}",
                term.icon,
                term.original,
                term.translation.resolve(lang),
                term.description.resolve(lang)
            );
        }
        if !cancelled(Confirm::new("Complete lesson?").with_default(false).prompt())?.unwrap_or(false) {
            return Ok(());
        }
        let user_id = self.require_user()?;
        let outcome = self
            .store
            .record_lesson_completion(user_id, &lesson.id, lesson.xp)
            .await?;
        report(&outcome);
        Ok(())
    }

    async fn show_leaderboard(&self) -> Result<(), DomainError> {
        let board = self.leaderboard.top_or_empty(self.leaderboard_size).await;
        if board.is_empty() {
            println!("Leaderboard is empty.");
            return Ok(());
        }
        for e in &board {
            println!(
                "{:>3}. {:<24} {:<14} lvl {:>2} {:>7} XP",
                e.rank, e.name, e.belt, e.level, e.xp
            );
        }
        if cancelled(Confirm::new("Export to CSV?").with_default(false).prompt())?.unwrap_or(false) {
            let path = export_leaderboard(&self.export_dir, &board).await?;
            println!("Exported to {}", path.display());
        }
        Ok(())
    }

    async fn show_dojos(&self) -> Result<(), DomainError> {
        let here = cancelled(
            Text::new("Your location as lat,lon (empty to list all):").prompt(),
        )?
        .and_then(|s| parse_point(&s));
        match here {
            Some(point) => {
                for (dojo, km) in self.dojos.nearest(point, 10).await? {
                    println!("  {:<30} {:>8.1} km", dojo.name, km);
                }
            }
            None => {
                for dojo in self.dojos.approved().await? {
                    match dojo.location {
                        Some(p) => println!("  {:<30} ({:.4}, {:.4})", dojo.name, p.latitude, p.longitude),
                        None => println!("  {}", dojo.name),
                    }
                }
            }
        }
        if !cancelled(Confirm::new("Submit a new dojo?").with_default(false).prompt())?.unwrap_or(false) {
            return Ok(());
        }
        let Some(name) = cancelled(Text::new("Dojo name:").prompt())? else {
            return Ok(());
        };
        let point = cancelled(Text::new("Location (lat,lon):").prompt())?
            .and_then(|s| parse_point(&s))
            .ok_or_else(|| DomainError::Input("expected a location like 35.70,139.75".into()))?;
        self.dojos.submit(name.trim(), point).await?;
        println!("Thanks! The dojo appears on the map once approved.");
        Ok(())
    }
}

/// Parse "lat,lon".
fn parse_point(s: &str) -> Option<GeoPoint> {
    let (lat, lon) = s.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return None;
    }
    Some(GeoPoint::new(lat, lon))
}

/// Message shown instead of a picker with nothing to pick.
fn empty_notice(count: usize, what: &str) -> Option<String> {
    (count == 0).then(|| format!("No {}.", what))
}

fn report(outcome: &CompletionOutcome) {
    match outcome {
        CompletionOutcome::Recorded { user, progression } => println!(
            "+XP! {} XP total · level {} ({:.1}%)",
            user.xp, progression.level, progression.percent
        ),
        CompletionOutcome::AlreadyCompleted => println!("Already learned, no XP this time."),
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        self.load().await;
        loop {
            let Some(choice) =
                cancelled(Select::new("What next?", MenuItem::ALL.to_vec()).prompt())?
            else {
                return Ok(());
            };
            let result = match choice {
                MenuItem::Profile => self.show_profile().await,
                MenuItem::Techniques => self.browse_techniques().await,
                MenuItem::Lessons => self.browse_lessons().await,
                MenuItem::Leaderboard => self.show_leaderboard().await,
                MenuItem::Dojos => self.show_dojos().await,
                MenuItem::Refresh => {
                    self.load().await;
                    Ok(())
                }
                MenuItem::Quit => return Ok(()),
            };
            if let Err(e) = result {
                warn!(error = %e, "action failed");
                println!("⚠ {}", e);
            }
        }
    }
}
