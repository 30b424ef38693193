// Rating-fold and point-in-time feature invariants over a small synthetic league.

use chrono::{Duration, NaiveDate};
use nba_edge::engine::elo::{compute_ratings, RatingEngine, RatingParams};
use nba_edge::engine::features::FeatureBuilder;
use nba_edge::engine::form::{FormParams, FormStats, FormWindow};
use nba_edge::store::types::{game_id, Game, StatLine, TeamBoxScore, TeamId};
use nba_edge::store::{MemoryStore, Store};

const ABBRS: [&str; 4] = ["AAA", "BBB", "CCC", "DDD"];

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 11, 1).unwrap()
}

fn add_game(store: &mut MemoryStore, date: NaiveDate, home: usize, away: usize, score: Option<(u32, u32)>) -> String {
    let h = store.get_or_create_team("", ABBRS[home]);
    let a = store.get_or_create_team("", ABBRS[away]);
    let id = game_id(date, ABBRS[home], ABBRS[away]);
    let mut game = Game::new(id.clone(), date, h, a, 2023);
    if let Some((hs, as_)) = score {
        game = game.with_score(hs, as_);
    }
    store.insert_game(game);
    if let Some((hs, as_)) = score {
        for (team, is_home, pts, allowed) in [(h, true, hs, as_), (a, false, as_, hs)] {
            store.insert_box_score(TeamBoxScore {
                game_id: id.clone(),
                team_id: team,
                is_home,
                line: StatLine {
                    pts,
                    fg_pct: 0.40 + (pts % 10) as f64 / 100.0,
                    tov: pts % 17,
                    trb: 40 + pts % 9,
                    ast: 20 + pts % 7,
                    plus_minus: pts as i32 - allowed as i32,
                    ..StatLine::default()
                },
            });
        }
    }
    id
}

/// 24 completed round-robin games, one every other day, no ties.
fn league() -> MemoryStore {
    let mut store = MemoryStore::new();
    let pairs = [(0, 1), (2, 3), (0, 2), (1, 3), (0, 3), (1, 2)];
    for i in 0..24usize {
        let (h, a) = pairs[i % pairs.len()];
        let (h, a) = if (i / pairs.len()) % 2 == 0 { (h, a) } else { (a, h) };
        let home = 98 + (i * 7 % 15) as u32;
        let mut away = 96 + (i * 11 % 19) as u32;
        if away == home {
            away -= 1;
        }
        add_game(&mut store, start() + Duration::days(2 * i as i64), h, a, Some((home, away)));
    }
    store
}

fn team(store: &MemoryStore, idx: usize) -> TeamId {
    store.find_team(ABBRS[idx]).unwrap().id
}

#[test]
fn test_scheduled_game_does_not_move_ratings() {
    let mut base = league();
    let mut with_scheduled = league();
    add_game(&mut with_scheduled, start() + Duration::days(9), 0, 3, None);

    RatingEngine::new(RatingParams::default()).run(&mut base);
    RatingEngine::new(RatingParams::default()).run(&mut with_scheduled);

    for game in base.all_games() {
        let other = with_scheduled.game(&game.id).unwrap();
        assert_eq!(game.home_pregame_rating, other.home_pregame_rating, "stamp changed for {}", game.id);
        assert_eq!(game.away_pregame_rating, other.away_pregame_rating, "stamp changed for {}", game.id);
    }
    for idx in 0..ABBRS.len() {
        let t = team(&base, idx);
        assert_eq!(base.team_rating(t), with_scheduled.team_rating(t));
    }
}

#[test]
fn test_scheduled_game_is_stamped() {
    let mut store = league();
    let id = add_game(&mut store, start() + Duration::days(100), 1, 2, None);
    RatingEngine::new(RatingParams::default()).run(&mut store);
    let game = store.game(&id).unwrap();
    assert_eq!(game.home_pregame_rating, store.team_rating(team(&store, 1)));
    assert_eq!(game.away_pregame_rating, store.team_rating(team(&store, 2)));
}

#[test]
fn test_decisive_result_moves_ratings_symmetrically() {
    let params = RatingParams {
        home_advantage: 0.0,
        ..RatingParams::default()
    };
    for (home, away) in [(110, 100), (95, 120)] {
        let mut games = vec![Game::new("g".into(), start(), 1, 2, 2023).with_score(home, away)];
        let table = compute_ratings(&mut games, &params);
        let dh = table.get(1) - 1500.0;
        let da = table.get(2) - 1500.0;
        assert!((dh + da).abs() < 1e-9, "home {dh} away {da}");
        assert!((dh.abs() - 10.0).abs() < 1e-9, "K/2 at equal ratings, got {dh}");
    }
}

#[test]
fn test_cold_start_defaults() {
    let mut store = league();
    let newcomer = store.get_or_create_team("Expansion", "EXP");
    let form = FormWindow::new(&store, FormParams::default());
    let cutoff = start() + Duration::days(30);

    assert_eq!(form.rolling_form(newcomer, cutoff), FormStats::default());
    assert_eq!(form.head_to_head_win_rate(newcomer, team(&store, 0), cutoff), 0.5);
    assert_eq!(form.rest_days(newcomer, cutoff), 3);
    // the first day of the log has no history for anyone
    assert_eq!(form.rest_days(team(&store, 0), start()), 3);
}

#[test]
fn test_games_on_or_after_cutoff_never_leak() {
    let cutoff = start() + Duration::days(20);
    let before = league();
    let mut after = league();
    // same-day and later games, completed, with box scores
    add_game(&mut after, cutoff, 0, 1, Some((140, 80)));
    add_game(&mut after, cutoff + Duration::days(1), 1, 0, Some((70, 150)));
    add_game(&mut after, cutoff + Duration::days(5), 0, 2, Some((130, 90)));

    let (t, o) = (team(&before, 0), team(&before, 1));
    let fb = FormWindow::new(&before, FormParams::default());
    let fa = FormWindow::new(&after, FormParams::default());
    for window in [1, 3, 10] {
        assert_eq!(
            fb.rolling_form_with_window(t, cutoff, window),
            fa.rolling_form_with_window(t, cutoff, window)
        );
    }
    assert_eq!(fb.head_to_head_win_rate(t, o, cutoff), fa.head_to_head_win_rate(t, o, cutoff));
    assert_eq!(fb.rest_days(t, cutoff), fa.rest_days(t, cutoff));
}

#[test]
fn test_training_rows_before_cutoff_unchanged_by_later_games() {
    let cutoff = start() + Duration::days(20);
    let mut before = league();
    let mut after = league();
    add_game(&mut after, cutoff + Duration::days(1), 2, 3, Some((101, 99)));
    RatingEngine::new(RatingParams::default()).run(&mut before);
    RatingEngine::new(RatingParams::default()).run(&mut after);

    let rows = |store: &MemoryStore| {
        FeatureBuilder::new(store, FormWindow::new(store, FormParams::default()), 1500.0)
            .build_all_training_rows(None)
            .into_iter()
            .filter(|r| r.date < cutoff)
            .collect::<Vec<_>>()
    };
    let (rb, ra) = (rows(&before), rows(&after));
    assert!(!rb.is_empty());
    assert_eq!(rb, ra);
}

#[test]
fn test_feature_rows_mirror_per_game() {
    let mut store = league();
    add_game(&mut store, start() + Duration::days(200), 0, 1, None);
    RatingEngine::new(RatingParams::default()).run(&mut store);
    let rows = FeatureBuilder::new(&store, FormWindow::new(&store, FormParams::default()), 1500.0)
        .build_all_training_rows(None);

    assert_eq!(rows.len(), 48, "scheduled game yields no training rows");
    for pair in rows.chunks(2) {
        let (home, away) = (&pair[0], &pair[1]);
        assert_eq!(home.game_id, away.game_id);
        assert!(home.is_home() && !away.is_home());
        assert_eq!(home.features.elo_diff, -away.features.elo_diff);
        assert_eq!(home.features.team_form, away.features.opponent_form);
        let (ht, at) = (home.target.unwrap(), away.target.unwrap());
        assert_eq!(ht.did_win + at.did_win, 1, "game {:?}", home.game_id);
        assert_eq!(ht.win_margin, -at.win_margin);
    }
}

#[test]
fn test_rating_pass_is_deterministic() {
    let mut a = league();
    let mut b = league();
    RatingEngine::new(RatingParams::default()).run(&mut a);
    RatingEngine::new(RatingParams::default()).run(&mut b);
    for idx in 0..ABBRS.len() {
        assert_eq!(a.team_rating(team(&a, idx)), b.team_rating(team(&b, idx)));
    }
}
