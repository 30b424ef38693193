//! Bring provider odds into the store.
//!
//! Feed failures stop here: they are retried with backoff, and whatever
//! reaches the store is already normalized to store teams and game ids.

use super::types::{BookmakerLines, OddsUpdate};
use super::OddsFeed;
use crate::store::types::{game_id, season_for_date, Game, OddsQuote, TeamId};
use crate::store::{MemoryStore, Store};
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::US::Eastern;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// `base_delay * 2^attempt` before retry number `attempt + 1`.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

pub async fn fetch_with_retry<F>(feed: &mut F, sport: &str, policy: &RetryPolicy) -> Result<Vec<OddsUpdate>>
where
    F: OddsFeed + ?Sized,
{
    let mut attempt = 0;
    loop {
        match feed.fetch_odds(sport).await {
            Ok(updates) => return Ok(updates),
            Err(e) if attempt < policy.max_retries => {
                let delay = policy.delay(attempt);
                tracing::warn!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "odds fetch failed; retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(attempts = attempt + 1, error = %e, "odds fetch failed; giving up");
                return Err(e.context(format!("odds fetch for {} failed after {} attempts", sport, attempt + 1)));
            }
        }
    }
}

const TEAMS: [(&str, &str); 30] = [
    ("ATL", "Atlanta Hawks"),
    ("BOS", "Boston Celtics"),
    ("BKN", "Brooklyn Nets"),
    ("CHA", "Charlotte Hornets"),
    ("CHI", "Chicago Bulls"),
    ("CLE", "Cleveland Cavaliers"),
    ("DAL", "Dallas Mavericks"),
    ("DEN", "Denver Nuggets"),
    ("DET", "Detroit Pistons"),
    ("GSW", "Golden State Warriors"),
    ("HOU", "Houston Rockets"),
    ("IND", "Indiana Pacers"),
    ("LAC", "Los Angeles Clippers"),
    ("LAL", "Los Angeles Lakers"),
    ("MEM", "Memphis Grizzlies"),
    ("MIA", "Miami Heat"),
    ("MIL", "Milwaukee Bucks"),
    ("MIN", "Minnesota Timberwolves"),
    ("NOP", "New Orleans Pelicans"),
    ("NYK", "New York Knicks"),
    ("OKC", "Oklahoma City Thunder"),
    ("ORL", "Orlando Magic"),
    ("PHI", "Philadelphia 76ers"),
    ("PHX", "Phoenix Suns"),
    ("POR", "Portland Trail Blazers"),
    ("SAC", "Sacramento Kings"),
    ("SAS", "San Antonio Spurs"),
    ("TOR", "Toronto Raptors"),
    ("UTA", "Utah Jazz"),
    ("WAS", "Washington Wizards"),
];

const ALIASES: [(&str, &str); 3] = [
    ("LA Lakers", "LAL"),
    ("LA Clippers", "LAC"),
    ("Philadelphia Sixers", "PHI"),
];

/// Full name for a known abbreviation.
pub fn canonical_name(abbreviation: &str) -> Option<&'static str> {
    TEAMS
        .iter()
        .find(|(abbr, _)| abbr.eq_ignore_ascii_case(abbreviation))
        .map(|(_, name)| *name)
}

/// Map a provider team name to an abbreviation: full name, alias, then the
/// trailing nickname ("Lakers").
pub fn team_abbreviation(provider_name: &str) -> Option<&'static str> {
    let name = provider_name.trim();
    if let Some((abbr, _)) = TEAMS.iter().find(|(_, full)| full.eq_ignore_ascii_case(name)) {
        return Some(*abbr);
    }
    if let Some((_, abbr)) = ALIASES.iter().find(|(alias, _)| alias.eq_ignore_ascii_case(name)) {
        return Some(*abbr);
    }
    let mut by_nickname = TEAMS.iter().filter(|(_, full)| {
        full.rsplit(' ').next().is_some_and(|nick| nick.eq_ignore_ascii_case(name))
    });
    match (by_nickname.next(), by_nickname.next()) {
        (Some((abbr, _)), None) => Some(*abbr),
        _ => None,
    }
}

/// Local date in US Eastern time (EST or EDT), so a late tip-off that is
/// already tomorrow in UTC still lands on its local date.
fn game_date(commence_time: &str) -> Option<NaiveDate> {
    let utc = DateTime::parse_from_rfc3339(commence_time).ok()?.with_timezone(&Utc);
    Some(utc.with_timezone(&Eastern).date_naive())
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestStats {
    pub games_created: usize,
    pub quotes: usize,
    pub skipped: usize,
}

fn resolve_team(store: &mut MemoryStore, provider_name: &str) -> Option<(TeamId, String)> {
    if let Some(abbr) = team_abbreviation(provider_name) {
        let name = canonical_name(abbr).unwrap_or(provider_name);
        let id = store.get_or_create_team(name, abbr);
        return Some((id, abbr.to_string()));
    }
    store
        .find_team(provider_name)
        .map(|t| (t.id, t.abbreviation.clone()))
}

/// The bookmaker's own update time wins over the ingest time when it parses.
fn quote(game_id: &str, lines: &BookmakerLines, ingested_at: DateTime<Utc>) -> OddsQuote {
    let fetched_at = DateTime::parse_from_rfc3339(&lines.last_update)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(ingested_at);
    OddsQuote {
        game_id: game_id.to_string(),
        bookmaker: lines.name.clone(),
        home_moneyline: lines.home_moneyline,
        away_moneyline: lines.away_moneyline,
        home_spread: lines.home_spread,
        home_spread_odds: lines.home_spread_odds,
        away_spread: lines.away_spread,
        away_spread_odds: lines.away_spread_odds,
        total: lines.total,
        over_odds: lines.over_odds,
        under_odds: lines.under_odds,
        fetched_at,
    }
}

/// Upsert one quote per (game, bookmaker), creating teams and scheduled
/// games on first sighting. Unmappable events are skipped with a warning.
pub fn apply_updates(store: &mut MemoryStore, updates: &[OddsUpdate], fetched_at: DateTime<Utc>) -> IngestStats {
    let mut stats = IngestStats::default();
    for update in updates {
        let Some(date) = game_date(&update.commence_time) else {
            tracing::warn!(event = %update.event_id, time = %update.commence_time, "unparseable commence time; skipping");
            stats.skipped += 1;
            continue;
        };
        let (Some((home, home_abbr)), Some((away, away_abbr))) = (
            resolve_team(store, &update.home_team),
            resolve_team(store, &update.away_team),
        ) else {
            tracing::warn!(home = %update.home_team, away = %update.away_team, "could not map teams; skipping");
            stats.skipped += 1;
            continue;
        };

        let id = game_id(date, &home_abbr, &away_abbr);
        if store.game(&id).is_none() {
            store.insert_game(Game::new(id.clone(), date, home, away, season_for_date(date)));
            stats.games_created += 1;
        }
        for lines in &update.bookmakers {
            if store.upsert_quote(quote(&id, lines, fetched_at)) {
                stats.quotes += 1;
            }
        }
    }
    tracing::info!(
        games_created = stats.games_created,
        quotes = stats.quotes,
        skipped = stats.skipped,
        "odds ingested"
    );
    stats
}
