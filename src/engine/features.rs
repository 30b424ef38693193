//! Flat numeric feature rows for the classifier.
//!
//! Column order is the contract with the trained model; see
//! [`FEATURE_COLUMNS`].

use super::form::{FormStats, FormWindow};
use crate::store::types::{Game, GameId, TeamId};
use crate::store::Store;
use chrono::NaiveDate;

pub const FEATURE_COLUMNS: [&str; 20] = [
    "is_home",
    "team_elo",
    "opponent_elo",
    "elo_diff",
    "avg_pts_scored_l10",
    "avg_pts_allowed_l10",
    "avg_fg_pct_l10",
    "avg_tov_l10",
    "avg_plus_minus_l10",
    "avg_rebounds_l10",
    "avg_assists_l10",
    "opp_avg_pts_scored_l10",
    "opp_avg_pts_allowed_l10",
    "opp_avg_fg_pct_l10",
    "opp_avg_tov_l10",
    "opp_avg_plus_minus_l10",
    "h2h_win_pct",
    "days_since_last_game",
    "opponent_days_since_last_game",
    "rest_advantage",
];

pub const FEATURE_COUNT: usize = FEATURE_COLUMNS.len();

/// One perspective's features, named. `to_vec` flattens in column order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureVector {
    pub is_home: bool,
    pub team_elo: f64,
    pub opponent_elo: f64,
    pub elo_diff: f64,
    pub team_form: FormStats,
    pub opponent_form: FormStats,
    pub h2h_win_pct: f64,
    pub days_since_last_game: i64,
    pub opponent_days_since_last_game: i64,
    pub rest_advantage: i64,
}

impl FeatureVector {
    pub fn to_vec(&self) -> Vec<f64> {
        let t = &self.team_form;
        let o = &self.opponent_form;
        vec![
            if self.is_home { 1.0 } else { 0.0 },
            self.team_elo,
            self.opponent_elo,
            self.elo_diff,
            t.avg_points_scored,
            t.avg_points_allowed,
            t.avg_field_goal_pct,
            t.avg_turnovers,
            t.avg_plus_minus,
            t.avg_rebounds,
            t.avg_assists,
            o.avg_points_scored,
            o.avg_points_allowed,
            o.avg_field_goal_pct,
            o.avg_turnovers,
            o.avg_plus_minus,
            self.h2h_win_pct,
            self.days_since_last_game as f64,
            self.opponent_days_since_last_game as f64,
            self.rest_advantage as f64,
        ]
    }
}

/// Training labels. Never part of the feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub did_win: u8,
    /// Own score minus opponent score.
    pub win_margin: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub game_id: Option<GameId>,
    pub team_id: TeamId,
    pub opponent_id: TeamId,
    pub season: i32,
    pub date: NaiveDate,
    pub features: FeatureVector,
    /// Present on training rows only.
    pub target: Option<Target>,
}

impl FeatureRow {
    pub fn is_home(&self) -> bool {
        self.features.is_home
    }
}

pub fn feature_matrix(rows: &[FeatureRow]) -> Vec<Vec<f64>> {
    rows.iter().map(|r| r.features.to_vec()).collect()
}

/// `did_win` per row; rows without a target are labelled 0.
pub fn labels(rows: &[FeatureRow]) -> Vec<u8> {
    rows.iter()
        .map(|r| r.target.map_or(0, |t| t.did_win))
        .collect()
}

/// Per-team inputs gathered once per game and shared by both perspectives.
struct Side {
    rating: f64,
    form: FormStats,
    rest: i64,
    h2h: f64,
}

pub struct FeatureBuilder<'a, S: Store> {
    store: &'a S,
    form: FormWindow<'a, S>,
    initial_rating: f64,
}

impl<'a, S: Store> FeatureBuilder<'a, S> {
    pub fn new(store: &'a S, form: FormWindow<'a, S>, initial_rating: f64) -> Self {
        Self {
            store,
            form,
            initial_rating,
        }
    }

    fn side(&self, team: TeamId, opponent: TeamId, date: NaiveDate, rating: f64) -> Side {
        Side {
            rating,
            form: self.form.rolling_form(team, date),
            rest: self.form.rest_days(team, date),
            h2h: self.form.head_to_head_win_rate(team, opponent, date),
        }
    }

    fn vector(is_home: bool, team: &Side, opponent: &Side) -> FeatureVector {
        FeatureVector {
            is_home,
            team_elo: team.rating,
            opponent_elo: opponent.rating,
            elo_diff: team.rating - opponent.rating,
            team_form: team.form,
            opponent_form: opponent.form,
            h2h_win_pct: team.h2h,
            days_since_last_game: team.rest,
            opponent_days_since_last_game: opponent.rest,
            rest_advantage: team.rest - opponent.rest,
        }
    }

    /// Two rows per completed game, home perspective first. Ratings come
    /// from the pre-game stamps, so the rating pass must have run.
    pub fn build_training_rows<'g, I>(&self, games: I) -> Vec<FeatureRow>
    where
        I: IntoIterator<Item = &'g Game>,
    {
        let mut rows = Vec::new();
        let mut unrated = 0usize;
        for game in games {
            let (Some(home_score), Some(away_score)) = (game.home_score, game.away_score) else {
                continue;
            };
            if game.home_pregame_rating.is_none() || game.away_pregame_rating.is_none() {
                unrated += 1;
            }
            let home_rating = game.home_pregame_rating.unwrap_or(self.initial_rating);
            let away_rating = game.away_pregame_rating.unwrap_or(self.initial_rating);

            let (h, a) = (game.home_team_id, game.away_team_id);
            let home = self.side(h, a, game.date, home_rating);
            let away = self.side(a, h, game.date, away_rating);

            let home_won = u8::from(home_score > away_score);
            let margin = home_score as i32 - away_score as i32;

            rows.push(FeatureRow {
                game_id: Some(game.id.clone()),
                team_id: h,
                opponent_id: a,
                season: game.season,
                date: game.date,
                features: Self::vector(true, &home, &away),
                target: Some(Target {
                    did_win: home_won,
                    win_margin: margin,
                }),
            });
            rows.push(FeatureRow {
                game_id: Some(game.id.clone()),
                team_id: a,
                opponent_id: h,
                season: game.season,
                date: game.date,
                features: Self::vector(false, &away, &home),
                target: Some(Target {
                    did_win: 1 - home_won,
                    win_margin: -margin,
                }),
            });
        }
        if unrated > 0 {
            tracing::warn!(unrated, "games without pre-game ratings; using initial rating");
        }
        tracing::debug!(rows = rows.len(), "training rows built");
        rows
    }

    /// Every completed game in the store, optionally limited to one season.
    pub fn build_all_training_rows(&self, season: Option<i32>) -> Vec<FeatureRow> {
        let games = self.store.all_games();
        self.build_training_rows(
            games
                .into_iter()
                .filter(|g| season.map_or(true, |s| g.season == s)),
        )
    }

    /// Home-perspective row for a game that has not been played. Ratings
    /// are the teams' latest post-game ratings.
    pub fn build_inference_row(&self, home: TeamId, away: TeamId, as_of: NaiveDate) -> FeatureRow {
        let home_rating = self.current_rating(home);
        let away_rating = self.current_rating(away);
        let home_side = self.side(home, away, as_of, home_rating);
        let away_side = self.side(away, home, as_of, away_rating);

        FeatureRow {
            game_id: None,
            team_id: home,
            opponent_id: away,
            season: crate::store::types::season_for_date(as_of),
            date: as_of,
            features: Self::vector(true, &home_side, &away_side),
            target: None,
        }
    }

    fn current_rating(&self, team: TeamId) -> f64 {
        self.store.team_rating(team).unwrap_or_else(|| {
            tracing::debug!(team, "no persisted rating; using initial");
            self.initial_rating
        })
    }
}
