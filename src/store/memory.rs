use super::types::{Game, GameId, OddsQuote, Team, TeamBoxScore, TeamId};
use super::Store;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Date-sorted `(date, game id)` keys for one team or one pairing.
type GameIndex = Vec<(NaiveDate, GameId)>;

/// In-memory store with per-team and per-pair indices sorted by date, so
/// point-in-time lookups cost a binary search plus the rows they return.
#[derive(Debug, Default)]
pub struct MemoryStore {
    teams: Vec<Team>,
    team_by_abbr: HashMap<String, TeamId>,
    games: HashMap<GameId, Game>,
    box_scores: HashMap<(GameId, TeamId), TeamBoxScore>,
    quotes: HashMap<GameId, Vec<OddsQuote>>,
    team_games: HashMap<TeamId, GameIndex>,
    pair_games: HashMap<(TeamId, TeamId), GameIndex>,
    team_ratings: HashMap<TeamId, f64>,
}

fn pair_key(a: TeamId, b: TeamId) -> (TeamId, TeamId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn insert_sorted(index: &mut GameIndex, key: (NaiveDate, GameId)) {
    if let Err(pos) = index.binary_search(&key) {
        index.insert(pos, key);
    }
}

/// Number of leading entries dated strictly before `before`.
fn cutoff(index: &[(NaiveDate, GameId)], before: NaiveDate) -> usize {
    index.partition_point(|(date, _)| *date < before)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look a team up by abbreviation, creating it on first sighting.
    pub fn get_or_create_team(&mut self, name: &str, abbreviation: &str) -> TeamId {
        let abbr = abbreviation.trim().to_uppercase();
        if let Some(&id) = self.team_by_abbr.get(&abbr) {
            return id;
        }
        let id = self.teams.len() as TeamId + 1;
        let name = if name.trim().is_empty() { abbr.clone() } else { name.trim().to_string() };
        tracing::debug!(id, %abbr, %name, "created team");
        self.teams.push(Team {
            id,
            name,
            abbreviation: abbr.clone(),
        });
        self.team_by_abbr.insert(abbr, id);
        id
    }

    pub fn team_by_abbreviation(&self, abbreviation: &str) -> Option<&Team> {
        self.team_by_abbr
            .get(&abbreviation.to_uppercase())
            .and_then(|&id| self.team(id))
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    /// Insert a game, or refresh scores/season/type of an existing one with
    /// the same id. Pre-game rating stamps already on file are kept unless
    /// the incoming record carries its own.
    pub fn insert_game(&mut self, game: Game) {
        if let Some(existing) = self.games.get_mut(&game.id) {
            existing.home_score = game.home_score;
            existing.away_score = game.away_score;
            existing.season = game.season;
            existing.game_type = game.game_type;
            if game.home_pregame_rating.is_some() {
                existing.home_pregame_rating = game.home_pregame_rating;
                existing.away_pregame_rating = game.away_pregame_rating;
            }
            return;
        }

        let key = (game.date, game.id.clone());
        for team in [game.home_team_id, game.away_team_id] {
            insert_sorted(self.team_games.entry(team).or_default(), key.clone());
        }
        insert_sorted(
            self.pair_games
                .entry(pair_key(game.home_team_id, game.away_team_id))
                .or_default(),
            key,
        );
        self.games.insert(game.id.clone(), game);
    }

    /// Returns false when the referenced game is unknown, unplayed, or the
    /// team did not take part in it.
    pub fn insert_box_score(&mut self, box_score: TeamBoxScore) -> bool {
        match self.games.get(&box_score.game_id) {
            Some(game) if game.is_completed() && game.involves(box_score.team_id) => {}
            _ => return false,
        }
        self.box_scores
            .insert((box_score.game_id.clone(), box_score.team_id), box_score);
        true
    }

    /// Insert or replace the quote for (game, bookmaker). Returns false for
    /// an unknown game.
    pub fn upsert_quote(&mut self, quote: OddsQuote) -> bool {
        if !self.games.contains_key(&quote.game_id) {
            return false;
        }
        let quotes = self.quotes.entry(quote.game_id.clone()).or_default();
        match quotes.iter_mut().find(|q| q.bookmaker == quote.bookmaker) {
            Some(existing) => *existing = quote,
            None => quotes.push(quote),
        }
        true
    }

    pub fn box_scores(&self) -> impl Iterator<Item = &TeamBoxScore> {
        self.box_scores.values()
    }

    pub fn quotes(&self) -> impl Iterator<Item = &OddsQuote> {
        self.quotes.values().flatten()
    }

    pub fn team_ratings(&self) -> &HashMap<TeamId, f64> {
        &self.team_ratings
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    /// Completed games of `team` before `before`, most recent first.
    fn completed_before(
        &self,
        team: TeamId,
        before: NaiveDate,
    ) -> impl Iterator<Item = &Game> + '_ {
        let index = self.team_games.get(&team).map(Vec::as_slice).unwrap_or(&[]);
        let end = cutoff(index, before);
        index[..end]
            .iter()
            .rev()
            .filter_map(|(_, id)| self.games.get(id))
            .filter(|g| g.is_completed())
    }
}

impl Store for MemoryStore {
    fn team(&self, id: TeamId) -> Option<&Team> {
        id.checked_sub(1).and_then(|i| self.teams.get(i as usize))
    }

    fn find_team(&self, identifier: &str) -> Option<&Team> {
        let identifier = identifier.trim();
        self.teams
            .iter()
            .find(|t| t.name == identifier)
            .or_else(|| self.team_by_abbreviation(identifier))
    }

    fn all_games(&self) -> Vec<&Game> {
        let mut games: Vec<&Game> = self.games.values().collect();
        games.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        games
    }

    fn game(&self, id: &str) -> Option<&Game> {
        self.games.get(id)
    }

    fn box_scores_before(
        &self,
        team: TeamId,
        before: NaiveDate,
        limit: usize,
    ) -> Vec<(&TeamBoxScore, &Game)> {
        self.completed_before(team, before)
            .filter_map(|game| {
                self.box_scores
                    .get(&(game.id.clone(), team))
                    .map(|bs| (bs, game))
            })
            .take(limit)
            .collect()
    }

    fn games_between(&self, team_a: TeamId, team_b: TeamId, before: NaiveDate) -> Vec<&Game> {
        let Some(index) = self.pair_games.get(&pair_key(team_a, team_b)) else {
            return Vec::new();
        };
        index[..cutoff(index, before)]
            .iter()
            .filter_map(|(_, id)| self.games.get(id))
            .filter(|g| g.is_completed())
            .collect()
    }

    fn last_completed_game_before(&self, team: TeamId, before: NaiveDate) -> Option<&Game> {
        self.completed_before(team, before).next()
    }

    fn quotes_for(&self, game_id: &str) -> Vec<&OddsQuote> {
        self.quotes
            .get(game_id)
            .map(|q| q.iter().collect())
            .unwrap_or_default()
    }

    fn upsert_rating(&mut self, game_id: &str, home_rating: f64, away_rating: f64) {
        if let Some(game) = self.games.get_mut(game_id) {
            game.home_pregame_rating = Some(home_rating);
            game.away_pregame_rating = Some(away_rating);
        }
    }

    fn upsert_team_rating(&mut self, team: TeamId, rating: f64) {
        self.team_ratings.insert(team, rating);
    }

    fn team_rating(&self, team: TeamId) -> Option<f64> {
        self.team_ratings.get(&team).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::{game_id, StatLine};
    use chrono::Utc;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn seeded() -> (MemoryStore, TeamId, TeamId) {
        let mut store = MemoryStore::new();
        let lal = store.get_or_create_team("Los Angeles Lakers", "LAL");
        let bos = store.get_or_create_team("Boston Celtics", "BOS");
        for (date, hs, as_) in [("2024-01-01", 110, 100), ("2024-01-05", 95, 99)] {
            let id = game_id(d(date), "LAL", "BOS");
            store.insert_game(Game::new(id.clone(), d(date), lal, bos, 2023).with_score(hs, as_));
            store.insert_box_score(TeamBoxScore {
                game_id: id,
                team_id: lal,
                is_home: true,
                line: StatLine {
                    pts: hs,
                    ..Default::default()
                },
            });
        }
        (store, lal, bos)
    }

    #[test]
    fn test_team_created_once_per_abbreviation() {
        let mut store = MemoryStore::new();
        let a = store.get_or_create_team("Lakers", "lal");
        let b = store.get_or_create_team("Los Angeles Lakers", "LAL");
        assert_eq!(a, b);
        assert_eq!(store.teams().len(), 1);
        assert_eq!(store.team(a).unwrap().name, "Lakers");
    }

    #[test]
    fn test_find_team_by_name_or_abbreviation() {
        let (store, lal, _) = seeded();
        assert_eq!(store.find_team("Los Angeles Lakers").unwrap().id, lal);
        assert_eq!(store.find_team("lal").unwrap().id, lal);
        assert!(store.find_team("Knicks").is_none());
    }

    #[test]
    fn test_box_scores_before_is_strict_and_newest_first() {
        let (store, lal, _) = seeded();
        let rows = store.box_scores_before(lal, d("2024-01-05"), 10);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1.date, d("2024-01-01"));

        let rows = store.box_scores_before(lal, d("2024-02-01"), 10);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1.date, d("2024-01-05"));
    }

    #[test]
    fn test_box_score_rejected_for_scheduled_game() {
        let (mut store, lal, bos) = seeded();
        let id = game_id(d("2024-03-01"), "BOS", "LAL");
        store.insert_game(Game::new(id.clone(), d("2024-03-01"), bos, lal, 2023));
        assert!(!store.insert_box_score(TeamBoxScore {
            game_id: id,
            team_id: lal,
            ..Default::default()
        }));
    }

    #[test]
    fn test_games_between_skips_scheduled() {
        let (mut store, lal, bos) = seeded();
        let id = game_id(d("2024-01-03"), "BOS", "LAL");
        store.insert_game(Game::new(id, d("2024-01-03"), bos, lal, 2023));
        assert_eq!(store.games_between(bos, lal, d("2024-12-01")).len(), 2);
    }

    #[test]
    fn test_quote_upsert_replaces_same_bookmaker() {
        let (mut store, _, _) = seeded();
        let id = game_id(d("2024-01-01"), "LAL", "BOS");
        assert!(store.upsert_quote(OddsQuote::moneyline(id.clone(), "fanduel", -150, 130, Utc::now())));
        assert!(store.upsert_quote(OddsQuote::moneyline(id.clone(), "fanduel", -170, 150, Utc::now())));
        assert!(store.upsert_quote(OddsQuote::moneyline(id.clone(), "draftkings", -160, 140, Utc::now())));
        let quotes = store.quotes_for(&id);
        assert_eq!(quotes.len(), 2);
        let fd = quotes.iter().find(|q| q.bookmaker == "fanduel").unwrap();
        assert_eq!(fd.home_moneyline, Some(-170));
        assert!(!store.upsert_quote(OddsQuote::moneyline("nope".into(), "fanduel", 100, -120, Utc::now())));
    }

    #[test]
    fn test_reinsert_keeps_rating_stamps() {
        let (mut store, lal, bos) = seeded();
        let id = game_id(d("2024-01-01"), "LAL", "BOS");
        store.upsert_rating(&id, 1510.0, 1490.0);
        store.insert_game(Game::new(id.clone(), d("2024-01-01"), lal, bos, 2023).with_score(110, 100));
        let g = store.game(&id).unwrap();
        assert_eq!(g.home_pregame_rating, Some(1510.0));
        assert_eq!(store.all_games().len(), 2);
    }
}
