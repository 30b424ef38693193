pub mod memory;
pub mod snapshot;
pub mod types;

pub use memory::MemoryStore;

use chrono::NaiveDate;
use types::{Game, OddsQuote, Team, TeamBoxScore, TeamId};

/// Queryable game log consumed by the rating engine, form window, feature
/// builder and backtest. Every date-bounded query is strict: `before` itself
/// is excluded.
pub trait Store {
    fn team(&self, id: TeamId) -> Option<&Team>;

    /// Exact name match first, then case-insensitive abbreviation.
    fn find_team(&self, identifier: &str) -> Option<&Team>;

    /// All games ordered by (date, game id).
    fn all_games(&self) -> Vec<&Game>;

    fn game(&self, id: &str) -> Option<&Game>;

    /// The team's box scores from completed games dated before `before`,
    /// most recent first, at most `limit` of them.
    fn box_scores_before(
        &self,
        team: TeamId,
        before: NaiveDate,
        limit: usize,
    ) -> Vec<(&TeamBoxScore, &Game)>;

    /// Completed meetings of the two teams (either venue) dated before `before`.
    fn games_between(&self, team_a: TeamId, team_b: TeamId, before: NaiveDate) -> Vec<&Game>;

    fn last_completed_game_before(&self, team: TeamId, before: NaiveDate) -> Option<&Game>;

    fn quotes_for(&self, game_id: &str) -> Vec<&OddsQuote>;

    /// Stamp pre-game ratings on a game. Unknown ids are ignored.
    fn upsert_rating(&mut self, game_id: &str, home_rating: f64, away_rating: f64);

    /// Persist a team's latest post-game rating.
    fn upsert_team_rating(&mut self, team: TeamId, rating: f64);

    fn team_rating(&self, team: TeamId) -> Option<f64>;
}
