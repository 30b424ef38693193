//! Normalized record types shared by the store and the engine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type TeamId = u32;

/// `YYYY-MM-DD-HOME-AWAY`, unique per (date, home, away).
pub type GameId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub abbreviation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    #[default]
    Regular,
    Playoff,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub date: NaiveDate,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub season: i32,
    #[serde(default)]
    pub game_type: GameType,
    #[serde(default)]
    pub home_pregame_rating: Option<f64>,
    #[serde(default)]
    pub away_pregame_rating: Option<f64>,
}

/// Final result of a completed game from the home side's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    HomeWin,
    AwayWin,
    Tie,
}

pub fn game_id(date: NaiveDate, home_abbr: &str, away_abbr: &str) -> GameId {
    format!("{}-{}-{}", date.format("%Y-%m-%d"), home_abbr, away_abbr)
}

/// NBA seasons start in October: a game in Oct-Dec belongs to that year's
/// season, anything earlier in the calendar year to the previous one.
pub fn season_for_date(date: NaiveDate) -> i32 {
    use chrono::Datelike;
    if date.month() >= 10 {
        date.year()
    } else {
        date.year() - 1
    }
}

impl Game {
    pub fn new(
        id: GameId,
        date: NaiveDate,
        home_team_id: TeamId,
        away_team_id: TeamId,
        season: i32,
    ) -> Self {
        Self {
            id,
            date,
            home_team_id,
            away_team_id,
            home_score: None,
            away_score: None,
            season,
            game_type: GameType::Regular,
            home_pregame_rating: None,
            away_pregame_rating: None,
        }
    }

    pub fn with_score(mut self, home: u32, away: u32) -> Self {
        self.home_score = Some(home);
        self.away_score = Some(away);
        self
    }

    /// Both scores recorded.
    pub fn is_completed(&self) -> bool {
        self.home_score.is_some() && self.away_score.is_some()
    }

    pub fn result(&self) -> Option<GameResult> {
        let (home, away) = (self.home_score?, self.away_score?);
        Some(match home.cmp(&away) {
            std::cmp::Ordering::Greater => GameResult::HomeWin,
            std::cmp::Ordering::Less => GameResult::AwayWin,
            std::cmp::Ordering::Equal => GameResult::Tie,
        })
    }

    pub fn involves(&self, team: TeamId) -> bool {
        self.home_team_id == team || self.away_team_id == team
    }

    /// True only for an outright win; ties count as not won.
    pub fn won_by(&self, team: TeamId) -> bool {
        match self.result() {
            Some(GameResult::HomeWin) => self.home_team_id == team,
            Some(GameResult::AwayWin) => self.away_team_id == team,
            _ => false,
        }
    }

    /// Points the given team conceded, `None` while the game is unplayed.
    pub fn points_allowed(&self, is_home: bool) -> Option<u32> {
        if is_home {
            self.away_score
        } else {
            self.home_score
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamBoxScore {
    pub game_id: GameId,
    pub team_id: TeamId,
    pub is_home: bool,
    #[serde(flatten)]
    pub line: StatLine,
}

/// One team's stat line for one game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatLine {
    // Shooting
    pub fg: u32,
    pub fga: u32,
    pub fg_pct: f64,
    pub fg3: u32,
    pub fg3a: u32,
    pub fg3_pct: f64,
    pub ft: u32,
    pub fta: u32,
    pub ft_pct: f64,
    // Rebounding
    pub orb: u32,
    pub drb: u32,
    pub trb: u32,
    pub ast: u32,
    pub stl: u32,
    pub blk: u32,
    pub tov: u32,
    pub pf: u32,
    pub pts: u32,
    pub plus_minus: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsQuote {
    pub game_id: GameId,
    pub bookmaker: String,
    pub home_moneyline: Option<i32>,
    pub away_moneyline: Option<i32>,
    pub home_spread: Option<f64>,
    pub home_spread_odds: Option<i32>,
    pub away_spread: Option<f64>,
    pub away_spread_odds: Option<i32>,
    pub total: Option<f64>,
    pub over_odds: Option<i32>,
    pub under_odds: Option<i32>,
    #[serde(default = "Utc::now")]
    pub fetched_at: DateTime<Utc>,
}

impl OddsQuote {
    /// Moneyline-only quote; the other markets start empty.
    pub fn moneyline(
        game_id: GameId,
        bookmaker: &str,
        home: i32,
        away: i32,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            game_id,
            bookmaker: bookmaker.to_string(),
            home_moneyline: Some(home),
            away_moneyline: Some(away),
            home_spread: None,
            home_spread_odds: None,
            away_spread: None,
            away_spread_odds: None,
            total: None,
            over_odds: None,
            under_odds: None,
            fetched_at,
        }
    }

    pub fn moneyline_for(&self, is_home: bool) -> Option<i32> {
        if is_home {
            self.home_moneyline
        } else {
            self.away_moneyline
        }
    }
}
