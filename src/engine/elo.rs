//! Chronological ELO rating fold.
//!
//! Rating state is a left fold over the game log in (date, game id) order:
//! every game is stamped with both teams' ratings *before* it is played, and
//! only games with a recorded result move the table.

use crate::store::types::{Game, GameResult, TeamId};
use crate::store::Store;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RatingParams {
    #[serde(default = "default_initial")]
    pub initial: f64,
    #[serde(default = "default_k_factor")]
    pub k_factor: f64,
    /// Rating points added to the home side before computing expectation.
    #[serde(default = "default_home_advantage")]
    pub home_advantage: f64,
}

fn default_initial() -> f64 { 1500.0 }
fn default_k_factor() -> f64 { 20.0 }
fn default_home_advantage() -> f64 { 100.0 }

impl Default for RatingParams {
    fn default() -> Self {
        Self {
            initial: default_initial(),
            k_factor: default_k_factor(),
            home_advantage: default_home_advantage(),
        }
    }
}

/// Team -> current rating. Teams never seen read as `initial`.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingTable {
    initial: f64,
    ratings: HashMap<TeamId, f64>,
}

impl RatingTable {
    pub fn new(initial: f64) -> Self {
        Self {
            initial,
            ratings: HashMap::new(),
        }
    }

    pub fn get(&self, team: TeamId) -> f64 {
        self.ratings.get(&team).copied().unwrap_or(self.initial)
    }

    pub fn set(&mut self, team: TeamId, rating: f64) {
        self.ratings.insert(team, rating);
    }

    /// Teams that have been rated at least once.
    pub fn iter(&self) -> impl Iterator<Item = (TeamId, f64)> + '_ {
        self.ratings.iter().map(|(&team, &rating)| (team, rating))
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }
}

/// Expected score of the home side:
/// `1 / (1 + 10^((away - (home + home_advantage)) / 400))`.
pub fn expected_home_score(home: f64, away: f64, home_advantage: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((away - (home + home_advantage)) / 400.0))
}

/// Actual (home, away) scores: 1/0 for a decisive result, 0.5/0.5 for a tie.
fn actual_scores(result: GameResult) -> (f64, f64) {
    match result {
        GameResult::HomeWin => (1.0, 0.0),
        GameResult::AwayWin => (0.0, 1.0),
        GameResult::Tie => (0.5, 0.5),
    }
}

/// One step of the fold. Stamps `game` with the pre-game ratings, then
/// applies the result (if any) to `table`.
pub fn fold_game(table: &mut RatingTable, game: &mut Game, params: &RatingParams) {
    let home = table.get(game.home_team_id);
    let away = table.get(game.away_team_id);
    game.home_pregame_rating = Some(home);
    game.away_pregame_rating = Some(away);

    let Some(result) = game.result() else {
        return;
    };

    let expected_home = expected_home_score(home, away, params.home_advantage);
    let expected_away = 1.0 - expected_home;
    let (actual_home, actual_away) = actual_scores(result);

    table.set(game.home_team_id, home + params.k_factor * (actual_home - expected_home));
    table.set(game.away_team_id, away + params.k_factor * (actual_away - expected_away));
}

/// Sort into (date, game id) order.
pub fn sort_chronological(games: &mut [Game]) {
    games.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
}

/// Fold the whole log. `games` is put into chronological order first and
/// every game comes back stamped with its pre-game ratings.
pub fn compute_ratings(games: &mut [Game], params: &RatingParams) -> RatingTable {
    sort_chronological(games);
    games
        .iter_mut()
        .fold(RatingTable::new(params.initial), |mut table, game| {
            fold_game(&mut table, game, params);
            table
        })
}

/// Runs the rating pass against a store. Holds `&mut` on the store for the
/// whole pass, so no other writer can interleave.
pub struct RatingEngine {
    params: RatingParams,
    table: RatingTable,
}

impl RatingEngine {
    pub fn new(params: RatingParams) -> Self {
        Self {
            table: RatingTable::new(params.initial),
            params,
        }
    }

    /// Recompute every rating from scratch and persist both the per-game
    /// stamps and each team's latest rating. Returns the number of games
    /// visited.
    pub fn run<S: Store>(&mut self, store: &mut S) -> usize {
        let mut games: Vec<Game> = store.all_games().into_iter().cloned().collect();
        self.table = compute_ratings(&mut games, &self.params);

        for game in &games {
            if let (Some(home), Some(away)) = (game.home_pregame_rating, game.away_pregame_rating) {
                store.upsert_rating(&game.id, home, away);
            }
        }
        for (team, rating) in self.table.iter() {
            store.upsert_team_rating(team, rating);
        }

        let completed = games.iter().filter(|g| g.is_completed()).count();
        tracing::info!(
            games = games.len(),
            completed,
            teams = self.table.len(),
            "rating pass complete"
        );
        games.len()
    }

    /// Latest rating from the fold state (post-update).
    pub fn current_rating(&self, team: TeamId) -> f64 {
        self.table.get(team)
    }

    pub fn table(&self) -> &RatingTable {
        &self.table
    }
}
