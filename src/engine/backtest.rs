//! Replay a held-out season against market moneylines.
//!
//! Each test row is one team's perspective on a game. A bet is placed on
//! that team when the model's win probability beats the market's implied
//! probability by more than the edge threshold.

use super::features::FeatureRow;
use super::kelly::kelly_stake;
use super::odds::{implied_probability, net_odds, payout};
use crate::error::PredictResult;
use crate::model::{Classifier, FeatureScaler};
use crate::store::types::{GameId, GameResult, OddsQuote, TeamId};
use crate::store::Store;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which bookmaker's line to bet when a game has several.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotePolicy {
    /// The quote from the alphabetically first bookmaker, even if it lacks
    /// a line for the side being evaluated.
    #[default]
    FirstBookmaker,
    /// The best-paying line for the side across all bookmakers.
    BestPrice,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Staking {
    /// Fixed `stake` per bet.
    #[default]
    Flat,
    /// Fractional Kelly on a running bankroll.
    Kelly { fraction: f64, bankroll: f64 },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BacktestParams {
    #[serde(default = "default_edge_threshold")]
    pub edge_threshold: f64,
    #[serde(default = "default_stake")]
    pub stake: f64,
    #[serde(default)]
    pub quote_policy: QuotePolicy,
    #[serde(default)]
    pub staking: Staking,
}

fn default_edge_threshold() -> f64 { 0.03 }
fn default_stake() -> f64 { 100.0 }

impl Default for BacktestParams {
    fn default() -> Self {
        Self {
            edge_threshold: default_edge_threshold(),
            stake: default_stake(),
            quote_policy: QuotePolicy::default(),
            staking: Staking::default(),
        }
    }
}

/// A priced, scored perspective awaiting the edge check.
#[derive(Debug, Clone, PartialEq)]
pub struct BetCandidate {
    pub game_id: GameId,
    pub date: NaiveDate,
    pub team_id: TeamId,
    pub is_home: bool,
    pub bookmaker: String,
    pub moneyline: i32,
    pub model_prob: f64,
    pub won: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BetRecord {
    pub game_id: GameId,
    pub date: NaiveDate,
    pub team_id: TeamId,
    pub is_home: bool,
    pub bookmaker: String,
    pub moneyline: i32,
    pub model_prob: f64,
    pub implied_prob: f64,
    pub edge: f64,
    pub stake: f64,
    pub won: bool,
    pub profit: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BacktestReport {
    pub total_bets: usize,
    pub total_won: usize,
    pub total_lost: usize,
    pub win_rate: f64,
    pub total_profit: f64,
    pub total_staked: f64,
    pub roi: f64,
    /// Rows skipped because no usable moneyline was quoted.
    pub no_quote: usize,
    /// Candidates priced but not bet.
    pub below_threshold: usize,
    /// Rows from tied games. Neither side is graded.
    pub pushes: usize,
    pub bets: Vec<BetRecord>,
}

/// Pick the bookmaker and moneyline for one side of a game.
pub fn select_moneyline<'q>(
    quotes: &[&'q OddsQuote],
    is_home: bool,
    policy: QuotePolicy,
) -> Option<(&'q str, i32)> {
    match policy {
        QuotePolicy::FirstBookmaker => {
            let first = quotes.iter().min_by(|a, b| a.bookmaker.cmp(&b.bookmaker))?;
            let line = first.moneyline_for(is_home).filter(|&m| m != 0)?;
            Some((first.bookmaker.as_str(), line))
        }
        QuotePolicy::BestPrice => quotes
            .iter()
            .filter_map(|q| {
                q.moneyline_for(is_home)
                    .filter(|&m| m != 0)
                    .map(|m| (q.bookmaker.as_str(), m))
            })
            .min_by(|(ba, ma), (bb, mb)| {
                net_odds(*mb)
                    .total_cmp(&net_odds(*ma))
                    .then_with(|| ba.cmp(bb))
            }),
    }
}

/// Apply the edge filter and staking policy to candidates in order and
/// aggregate the results.
pub fn settle(candidates: &[BetCandidate], params: &BacktestParams) -> BacktestReport {
    let mut report = BacktestReport::default();
    let mut bankroll = match params.staking {
        Staking::Kelly { bankroll, .. } => bankroll,
        Staking::Flat => 0.0,
    };

    for c in candidates {
        let implied = implied_probability(c.moneyline);
        let edge = c.model_prob - implied;
        if edge <= params.edge_threshold {
            report.below_threshold += 1;
            continue;
        }
        let stake = match params.staking {
            Staking::Flat => params.stake,
            Staking::Kelly { fraction, .. } => kelly_stake(c.model_prob, c.moneyline, bankroll, fraction),
        };
        if stake <= 0.0 {
            report.below_threshold += 1;
            continue;
        }

        let profit = if c.won {
            payout(c.moneyline, stake) - stake
        } else {
            -stake
        };
        bankroll += profit;

        report.total_bets += 1;
        if c.won {
            report.total_won += 1;
        } else {
            report.total_lost += 1;
        }
        report.total_profit += profit;
        report.total_staked += stake;
        report.bets.push(BetRecord {
            game_id: c.game_id.clone(),
            date: c.date,
            team_id: c.team_id,
            is_home: c.is_home,
            bookmaker: c.bookmaker.clone(),
            moneyline: c.moneyline,
            model_prob: c.model_prob,
            implied_prob: implied,
            edge,
            stake,
            won: c.won,
            profit,
        });
    }

    if report.total_bets > 0 {
        report.win_rate = report.total_won as f64 / report.total_bets as f64 * 100.0;
    }
    if report.total_staked > 0.0 {
        report.roi = report.total_profit / report.total_staked * 100.0;
    }
    report
}

/// Score `rows` with the model, price them against the store's quotes and
/// settle. Rows without a target or game id cannot be graded and are ignored.
pub fn simulate<C, F, S>(
    classifier: &C,
    scaler: &F,
    rows: &[FeatureRow],
    store: &S,
    params: &BacktestParams,
) -> PredictResult<BacktestReport>
where
    C: Classifier,
    F: FeatureScaler,
    S: Store,
{
    let graded: Vec<&FeatureRow> = rows
        .iter()
        .filter(|r| r.target.is_some() && r.game_id.is_some())
        .collect();
    if graded.is_empty() {
        tracing::warn!("no graded rows to backtest");
        return Ok(BacktestReport::default());
    }

    let matrix: Vec<Vec<f64>> = graded.iter().map(|r| r.features.to_vec()).collect();
    let scaled = scaler.transform(&matrix)?;
    let probs = classifier.predict_proba(&scaled)?;

    let mut no_quote = 0usize;
    let mut pushes = 0usize;
    let mut candidates = Vec::with_capacity(graded.len());
    for (row, p) in graded.iter().zip(&probs) {
        let (Some(game_id), Some(target)) = (&row.game_id, row.target) else {
            continue;
        };
        if store.game(game_id).and_then(|g| g.result()) == Some(GameResult::Tie) {
            pushes += 1;
            continue;
        }
        let quotes = store.quotes_for(game_id);
        let Some((bookmaker, moneyline)) = select_moneyline(&quotes, row.is_home(), params.quote_policy) else {
            no_quote += 1;
            continue;
        };
        candidates.push(BetCandidate {
            game_id: game_id.clone(),
            date: row.date,
            team_id: row.team_id,
            is_home: row.is_home(),
            bookmaker: bookmaker.to_string(),
            moneyline,
            model_prob: p[1],
            won: target.did_win == 1,
        });
    }

    let mut report = settle(&candidates, params);
    report.no_quote = no_quote;
    report.pushes = pushes;
    tracing::info!(
        rows = graded.len(),
        priced = candidates.len(),
        bets = report.total_bets,
        profit = report.total_profit,
        roi = report.roi,
        "backtest complete"
    );
    Ok(report)
}

/// Write the full report, per-bet ledger included, as pretty JSON.
pub fn write_ledger(report: &BacktestReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write ledger: {}", path.display()))?;
    tracing::info!(path = %path.display(), bets = report.bets.len(), "ledger written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn candidate(id: &str, moneyline: i32, model_prob: f64, won: bool) -> BetCandidate {
        BetCandidate {
            game_id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            team_id: 1,
            is_home: true,
            bookmaker: "book".into(),
            moneyline,
            model_prob,
            won,
        }
    }

    fn three_rows() -> Vec<BetCandidate> {
        vec![
            // implied 0.60, edge 0.05
            candidate("a", -150, 0.65, true),
            // implied 0.4545, edge 0.10
            candidate("b", 120, 100.0 / 220.0 + 0.10, false),
            // implied 0.50, edge 0.01
            candidate("c", 100, 0.51, true),
        ]
    }

    #[test]
    fn test_flat_stake_aggregation() {
        let report = settle(&three_rows(), &BacktestParams::default());
        assert_eq!(report.total_bets, 2);
        assert_eq!(report.total_won, 1);
        assert_eq!(report.total_lost, 1);
        assert_eq!(report.below_threshold, 1);
        assert!((report.bets[0].profit - 66.6667).abs() < 1e-3, "got {}", report.bets[0].profit);
        assert!((report.total_profit + 33.3333).abs() < 1e-3, "got {}", report.total_profit);
        assert!((report.roi + 16.6667).abs() < 1e-3, "got {}", report.roi);
        assert!((report.win_rate - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_edge_equal_to_threshold_is_not_bet() {
        let params = BacktestParams {
            edge_threshold: 0.1,
            ..BacktestParams::default()
        };
        let report = settle(&[candidate("x", 100, 0.6, true)], &params);
        assert_eq!(report.total_bets, 0);
    }

    #[test]
    fn test_no_bets_reports_zero_rates() {
        let report = settle(&[], &BacktestParams::default());
        assert_eq!(report.win_rate, 0.0);
        assert_eq!(report.roi, 0.0);
    }

    #[test]
    fn test_kelly_staking_sizes_from_bankroll() {
        let params = BacktestParams {
            staking: Staking::Kelly {
                fraction: 1.0,
                bankroll: 1000.0,
            },
            ..BacktestParams::default()
        };
        let report = settle(&three_rows()[..1], &params);
        // f* = 0.125 at -150 with p = 0.65
        assert!((report.bets[0].stake - 125.0).abs() < 1e-6, "got {}", report.bets[0].stake);
        assert!((report.roi - 66.6667).abs() < 1e-3);
    }

    #[test]
    fn test_quote_policies() {
        let at = Utc::now();
        let dk = OddsQuote::moneyline("g".into(), "draftkings", -140, 120, at);
        let mut fd = OddsQuote::moneyline("g".into(), "fanduel", -120, 100, at);
        fd.away_moneyline = None;
        let quotes = vec![&fd, &dk];

        assert_eq!(
            select_moneyline(&quotes, true, QuotePolicy::FirstBookmaker),
            Some(("draftkings", -140))
        );
        assert_eq!(
            select_moneyline(&quotes, true, QuotePolicy::BestPrice),
            Some(("fanduel", -120))
        );
        assert_eq!(
            select_moneyline(&quotes, false, QuotePolicy::BestPrice),
            Some(("draftkings", 120))
        );
        assert_eq!(select_moneyline(&[], true, QuotePolicy::BestPrice), None);
    }

    #[test]
    fn test_first_bookmaker_without_line_skips() {
        let at = Utc::now();
        let mut a = OddsQuote::moneyline("g".into(), "aaa", -105, -105, at);
        a.home_moneyline = None;
        let b = OddsQuote::moneyline("g".into(), "bbb", -110, -110, at);
        assert_eq!(select_moneyline(&[&a, &b], true, QuotePolicy::FirstBookmaker), None);
    }

    struct FixedClassifier(f64);

    impl Classifier for FixedClassifier {
        fn fit(&mut self, _: &[Vec<f64>], _: &[u8]) -> PredictResult<()> {
            Ok(())
        }

        fn predict_proba(&self, features: &[Vec<f64>]) -> PredictResult<Vec<[f64; 2]>> {
            Ok(vec![[1.0 - self.0, self.0]; features.len()])
        }
    }

    struct Identity;

    impl FeatureScaler for Identity {
        fn fit(&mut self, _: &[Vec<f64>]) -> PredictResult<()> {
            Ok(())
        }

        fn transform(&self, features: &[Vec<f64>]) -> PredictResult<Vec<Vec<f64>>> {
            Ok(features.to_vec())
        }
    }

    #[test]
    fn test_tied_game_is_a_push() {
        use crate::engine::features::FeatureBuilder;
        use crate::engine::form::{FormParams, FormWindow};
        use crate::store::types::{game_id, Game};
        use crate::store::MemoryStore;

        let mut store = MemoryStore::new();
        let h = store.get_or_create_team("Home", "HHH");
        let a = store.get_or_create_team("Away", "AAA");
        let d = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let tied = game_id(d, "HHH", "AAA");
        store.insert_game(Game::new(tied.clone(), d, h, a, 2024).with_score(100, 100));
        store.upsert_quote(OddsQuote::moneyline(tied, "book", 150, 150, Utc::now()));
        let d2 = d.succ_opt().unwrap();
        let decided = game_id(d2, "AAA", "HHH");
        store.insert_game(Game::new(decided.clone(), d2, a, h, 2024).with_score(101, 99));
        store.upsert_quote(OddsQuote::moneyline(decided, "book", 150, 150, Utc::now()));

        let rows = FeatureBuilder::new(&store, FormWindow::new(&store, FormParams::default()), 1500.0)
            .build_all_training_rows(None);
        assert_eq!(rows.len(), 4);
        let report = simulate(&FixedClassifier(0.6), &Identity, &rows, &store, &BacktestParams::default()).unwrap();
        assert_eq!(report.pushes, 2);
        assert_eq!(report.total_bets, 2);
        assert_eq!(report.total_won, 1);
        assert!(report.bets.iter().all(|b| b.game_id.starts_with("2024-01-11")));
    }

    #[test]
    fn test_params_parse_from_toml() {
        let params: BacktestParams = toml::from_str(
            r#"
            edge_threshold = 0.05
            quote_policy = "best_price"
            [staking]
            mode = "kelly"
            fraction = 0.25
            bankroll = 5000.0
            "#,
        )
        .unwrap();
        assert_eq!(params.quote_policy, QuotePolicy::BestPrice);
        assert_eq!(params.stake, 100.0);
        assert!(matches!(params.staking, Staking::Kelly { fraction, .. } if fraction == 0.25));
    }
}
