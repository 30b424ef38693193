//! Point-in-time team form: rolling averages, head-to-head record, rest.
//!
//! Every query takes a cutoff date and only reads completed games dated
//! strictly before it.

use crate::store::types::TeamId;
use crate::store::Store;
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FormParams {
    /// Games in the rolling window.
    #[serde(default = "default_window")]
    pub window: usize,
    /// Rest assumed for a team with no earlier game. A policy, not a measurement.
    #[serde(default = "default_rest_days")]
    pub default_rest_days: i64,
}

fn default_window() -> usize { 10 }
fn default_rest_days() -> i64 { 3 }

impl Default for FormParams {
    fn default() -> Self {
        Self {
            window: default_window(),
            default_rest_days: default_rest_days(),
        }
    }
}

/// Arithmetic means over the rolling window. All zero when the team has no
/// qualifying games.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FormStats {
    pub avg_points_scored: f64,
    pub avg_points_allowed: f64,
    pub avg_field_goal_pct: f64,
    pub avg_turnovers: f64,
    pub avg_plus_minus: f64,
    pub avg_rebounds: f64,
    pub avg_assists: f64,
    /// Games the averages were taken over.
    pub games: usize,
}

/// Neutral prior when two teams have never met.
pub const NEUTRAL_H2H: f64 = 0.5;

pub struct FormWindow<'a, S: Store> {
    store: &'a S,
    params: FormParams,
}

impl<'a, S: Store> FormWindow<'a, S> {
    pub fn new(store: &'a S, params: FormParams) -> Self {
        Self { store, params }
    }

    pub fn rolling_form(&self, team: TeamId, cutoff: NaiveDate) -> FormStats {
        self.rolling_form_with_window(team, cutoff, self.params.window)
    }

    pub fn rolling_form_with_window(
        &self,
        team: TeamId,
        cutoff: NaiveDate,
        window: usize,
    ) -> FormStats {
        let rows = self.store.box_scores_before(team, cutoff, window);
        if rows.is_empty() {
            return FormStats::default();
        }

        let mut sums = FormStats::default();
        for (bs, game) in &rows {
            let line = &bs.line;
            sums.avg_points_scored += line.pts as f64;
            sums.avg_points_allowed += game.points_allowed(bs.is_home).unwrap_or(0) as f64;
            sums.avg_field_goal_pct += line.fg_pct;
            sums.avg_turnovers += line.tov as f64;
            sums.avg_plus_minus += line.plus_minus as f64;
            sums.avg_rebounds += line.trb as f64;
            sums.avg_assists += line.ast as f64;
        }

        let n = rows.len() as f64;
        FormStats {
            avg_points_scored: sums.avg_points_scored / n,
            avg_points_allowed: sums.avg_points_allowed / n,
            avg_field_goal_pct: sums.avg_field_goal_pct / n,
            avg_turnovers: sums.avg_turnovers / n,
            avg_plus_minus: sums.avg_plus_minus / n,
            avg_rebounds: sums.avg_rebounds / n,
            avg_assists: sums.avg_assists / n,
            games: rows.len(),
        }
    }

    /// Share of completed meetings before `cutoff` won by `team`.
    pub fn head_to_head_win_rate(&self, team: TeamId, opponent: TeamId, cutoff: NaiveDate) -> f64 {
        let meetings = self.store.games_between(team, opponent, cutoff);
        if meetings.is_empty() {
            return NEUTRAL_H2H;
        }
        let wins = meetings.iter().filter(|g| g.won_by(team)).count();
        wins as f64 / meetings.len() as f64
    }

    /// Days between `cutoff` and the team's last completed game before it.
    pub fn rest_days(&self, team: TeamId, cutoff: NaiveDate) -> i64 {
        match self.store.last_completed_game_before(team, cutoff) {
            Some(game) => (cutoff - game.date).num_days().max(0),
            None => self.params.default_rest_days,
        }
    }
}
