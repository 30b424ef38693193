//! JSON snapshot of the game log: the on-disk form of a [`MemoryStore`].
//!
//! Loading is lenient. Rows with an unparseable date, a missing team, or a
//! reference to an unknown game are skipped with a warning instead of
//! failing the whole load.

use super::memory::MemoryStore;
use super::types::{game_id, season_for_date, Game, GameType, OddsQuote, StatLine, TeamBoxScore};
use super::Store;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub teams: Vec<RawTeam>,
    #[serde(default)]
    pub games: Vec<RawGame>,
    #[serde(default)]
    pub box_scores: Vec<RawBoxScore>,
    #[serde(default)]
    pub odds: Vec<OddsQuote>,
    #[serde(default)]
    pub team_ratings: Vec<RawTeamRating>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTeam {
    pub name: String,
    pub abbreviation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawGame {
    /// `YYYY-MM-DD`
    pub date: String,
    /// Team abbreviations.
    pub home: String,
    pub away: String,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    /// Derived from the date when absent.
    pub season: Option<i32>,
    #[serde(default)]
    pub game_type: GameType,
    pub home_pregame_rating: Option<f64>,
    pub away_pregame_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBoxScore {
    pub game_id: String,
    /// Team abbreviation.
    pub team: String,
    #[serde(flatten)]
    pub line: StatLine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTeamRating {
    pub abbreviation: String,
    pub rating: f64,
}

/// Counts of rows accepted and skipped during a load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub games: usize,
    pub box_scores: usize,
    pub quotes: usize,
    pub skipped: usize,
}

pub fn load(path: &Path) -> Result<(MemoryStore, LoadStats)> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot JSON: {}", path.display()))?;
    let (store, stats) = from_snapshot(snapshot);
    tracing::info!(
        path = %path.display(),
        games = stats.games,
        box_scores = stats.box_scores,
        quotes = stats.quotes,
        skipped = stats.skipped,
        "snapshot loaded"
    );
    Ok((store, stats))
}

pub fn from_snapshot(snapshot: Snapshot) -> (MemoryStore, LoadStats) {
    let mut store = MemoryStore::new();
    let mut stats = LoadStats::default();

    for team in &snapshot.teams {
        if team.abbreviation.trim().is_empty() {
            tracing::warn!(name = %team.name, "skipping team without abbreviation");
            stats.skipped += 1;
            continue;
        }
        store.get_or_create_team(&team.name, &team.abbreviation);
    }

    for raw in snapshot.games {
        match parse_game(&mut store, &raw) {
            Some(game) => {
                store.insert_game(game);
                stats.games += 1;
            }
            None => stats.skipped += 1,
        }
    }

    for raw in snapshot.box_scores {
        let Some(team_id) = store.team_by_abbreviation(&raw.team).map(|t| t.id) else {
            tracing::warn!(game_id = %raw.game_id, team = %raw.team, "skipping box score: unknown team");
            stats.skipped += 1;
            continue;
        };
        let is_home = store
            .game(&raw.game_id)
            .map(|g| g.home_team_id == team_id)
            .unwrap_or(false);
        let accepted = store.insert_box_score(TeamBoxScore {
            game_id: raw.game_id.clone(),
            team_id,
            is_home,
            line: raw.line,
        });
        if accepted {
            stats.box_scores += 1;
        } else {
            tracing::warn!(game_id = %raw.game_id, team = %raw.team, "skipping box score: no completed game for team");
            stats.skipped += 1;
        }
    }

    for mut quote in snapshot.odds {
        // American odds are never zero; treat a zero line as missing.
        for line in [&mut quote.home_moneyline, &mut quote.away_moneyline] {
            if *line == Some(0) {
                *line = None;
            }
        }
        let game_id = quote.game_id.clone();
        if store.upsert_quote(quote) {
            stats.quotes += 1;
        } else {
            tracing::warn!(%game_id, "skipping quote: unknown game");
            stats.skipped += 1;
        }
    }

    for rating in snapshot.team_ratings {
        match store.team_by_abbreviation(&rating.abbreviation).map(|t| t.id) {
            Some(id) => store.upsert_team_rating(id, rating.rating),
            None => {
                tracing::warn!(team = %rating.abbreviation, "skipping rating: unknown team");
                stats.skipped += 1;
            }
        }
    }

    (store, stats)
}

fn parse_game(store: &mut MemoryStore, raw: &RawGame) -> Option<Game> {
    let date = match NaiveDate::parse_from_str(raw.date.trim(), "%Y-%m-%d") {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!(date = %raw.date, error = %e, "skipping game: bad date");
            return None;
        }
    };
    let (home, away) = (raw.home.trim(), raw.away.trim());
    if home.is_empty() || away.is_empty() || home.eq_ignore_ascii_case(away) {
        tracing::warn!(%date, home, away, "skipping game: missing or identical teams");
        return None;
    }

    let home_id = store.get_or_create_team("", home);
    let away_id = store.get_or_create_team("", away);
    let id = game_id(date, &home.to_uppercase(), &away.to_uppercase());
    let season = raw.season.unwrap_or_else(|| season_for_date(date));

    let mut game = Game::new(id, date, home_id, away_id, season);
    game.game_type = raw.game_type;
    // A half-recorded score is treated as unplayed.
    if let (Some(h), Some(a)) = (raw.home_score, raw.away_score) {
        game = game.with_score(h, a);
    }
    game.home_pregame_rating = raw.home_pregame_rating;
    game.away_pregame_rating = raw.away_pregame_rating;
    Some(game)
}

pub fn to_snapshot(store: &MemoryStore) -> Snapshot {
    let abbr = |id| {
        store
            .team(id)
            .map(|t| t.abbreviation.clone())
            .unwrap_or_default()
    };

    let teams = store
        .teams()
        .iter()
        .map(|t| RawTeam {
            name: t.name.clone(),
            abbreviation: t.abbreviation.clone(),
        })
        .collect();

    let games = store
        .all_games()
        .into_iter()
        .map(|g| RawGame {
            date: g.date.format("%Y-%m-%d").to_string(),
            home: abbr(g.home_team_id),
            away: abbr(g.away_team_id),
            home_score: g.home_score,
            away_score: g.away_score,
            season: Some(g.season),
            game_type: g.game_type,
            home_pregame_rating: g.home_pregame_rating,
            away_pregame_rating: g.away_pregame_rating,
        })
        .collect();

    let mut box_scores: Vec<RawBoxScore> = store
        .box_scores()
        .map(|bs| RawBoxScore {
            game_id: bs.game_id.clone(),
            team: abbr(bs.team_id),
            line: bs.line.clone(),
        })
        .collect();
    box_scores.sort_by(|a, b| (&a.game_id, &a.team).cmp(&(&b.game_id, &b.team)));

    let mut odds: Vec<OddsQuote> = store.quotes().cloned().collect();
    odds.sort_by(|a, b| (&a.game_id, &a.bookmaker).cmp(&(&b.game_id, &b.bookmaker)));

    let mut team_ratings: Vec<RawTeamRating> = store
        .team_ratings()
        .iter()
        .map(|(&id, &rating)| RawTeamRating {
            abbreviation: abbr(id),
            rating,
        })
        .collect();
    team_ratings.sort_by(|a, b| a.abbreviation.cmp(&b.abbreviation));

    Snapshot {
        teams,
        games,
        box_scores,
        odds,
        team_ratings,
    }
}

pub fn save(store: &MemoryStore, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&to_snapshot(store))?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;
    tracing::info!(path = %path.display(), games = store.game_count(), "snapshot saved");
    Ok(())
}
