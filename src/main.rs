use anyhow::{Context, Result};
use chrono::NaiveDate;
use nba_edge::config::Config;
use nba_edge::engine::backtest::BacktestReport;
use nba_edge::feed::the_odds_api::TheOddsApi;
use nba_edge::pipeline;
use nba_edge::store::{snapshot, MemoryStore};
use std::path::Path;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
usage: nba-edge [--config PATH] <command>

commands:
  ratings                                 recompute ELO ratings and save the snapshot
  train                                   fit scaler + classifier on the training seasons
  backtest                                replay the test season against stored odds
  predict HOME AWAY [--date YYYY-MM-DD] [--odds HOME_ML AWAY_ML]
  update-odds                             fetch current odds and save the snapshot";

/// Value following `flag`, removed from `args` together with the flag.
fn take_flag(args: &mut Vec<String>, flag: &str, count: usize) -> Result<Option<Vec<String>>> {
    let Some(pos) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    if pos + count >= args.len() {
        anyhow::bail!("{} expects {} value(s)", flag, count);
    }
    let values: Vec<String> = args.drain(pos..=pos + count).skip(1).collect();
    Ok(Some(values))
}

fn load_store(config: &Config) -> Result<MemoryStore> {
    let (store, stats) = snapshot::load(&config.data.snapshot_path)?;
    tracing::info!(
        games = stats.games,
        box_scores = stats.box_scores,
        quotes = stats.quotes,
        skipped = stats.skipped,
        "snapshot loaded"
    );
    Ok(store)
}

fn print_report(report: &BacktestReport) {
    println!("Bets placed:   {}", report.total_bets);
    println!("Won / lost:    {} / {}", report.total_won, report.total_lost);
    println!("Win rate:      {:.2}%", report.win_rate);
    println!("Total staked:  {:.2}", report.total_staked);
    println!("Total profit:  {:.2}", report.total_profit);
    println!("ROI:           {:.2}%", report.roi);
    println!("No quote:      {}", report.no_quote);
    println!("Pushes:        {}", report.pushes);
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nba_edge=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    Config::load_env_file();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{}", USAGE);
        return Ok(());
    }
    let config_path = take_flag(&mut args, "--config", 1)?
        .and_then(|v| v.into_iter().next())
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load_or_default(Path::new(&config_path))?;

    if args.is_empty() {
        anyhow::bail!("missing command\n\n{}", USAGE);
    }
    let command = args.remove(0);
    match command.as_str() {
        "ratings" => {
            let mut store = load_store(&config)?;
            let engine = pipeline::recompute_ratings(&mut store, &config.ratings);
            snapshot::save(&store, &config.data.snapshot_path)?;
            let mut table: Vec<_> = engine.table().iter().collect();
            table.sort_by(|a, b| b.1.total_cmp(&a.1));
            for (team, rating) in table {
                let name = store.teams().iter().find(|t| t.id == team).map_or("?", |t| t.abbreviation.as_str());
                println!("{:<5} {:>8.1}", name, rating);
            }
        }
        "train" => {
            let mut store = load_store(&config)?;
            let summary = pipeline::train(&mut store, &config)?;
            println!("Training rows: {}", summary.train_rows);
            println!("Train:      accuracy {:.4}  log loss {:.4}", summary.train.accuracy, summary.train.log_loss);
            for (label, eval) in [("Validation", summary.validation), ("Test", summary.test)] {
                match eval {
                    Some(e) => println!("{:<11} accuracy {:.4}  log loss {:.4}  ({} rows)", format!("{}:", label), e.accuracy, e.log_loss, e.rows),
                    None => println!("{:<11} no rows", format!("{}:", label)),
                }
            }
        }
        "backtest" => {
            let mut store = load_store(&config)?;
            let report = pipeline::backtest(&mut store, &config)?;
            print_report(&report);
        }
        "predict" => {
            let date = take_flag(&mut args, "--date", 1)?;
            let odds = take_flag(&mut args, "--odds", 2)?;
            let [home, away] = <[String; 2]>::try_from(args)
                .map_err(|_| anyhow::anyhow!("predict expects HOME AWAY\n\n{}", USAGE))?;
            let as_of = match date {
                Some(v) => NaiveDate::parse_from_str(&v[0], "%Y-%m-%d")
                    .with_context(|| format!("bad --date {}", v[0]))?,
                None => chrono::Local::now().date_naive(),
            };
            let odds = match odds {
                Some(v) => Some((
                    v[0].parse::<i32>().with_context(|| format!("bad moneyline {}", v[0]))?,
                    v[1].parse::<i32>().with_context(|| format!("bad moneyline {}", v[1]))?,
                )),
                None => None,
            };

            let mut store = load_store(&config)?;
            pipeline::recompute_ratings(&mut store, &config.ratings);
            let prediction = pipeline::predict(&store, &config, &home, &away, as_of, odds)?;
            println!("{}", prediction);
        }
        "update-odds" => {
            let feed_config = config
                .odds_feed
                .as_ref()
                .context("[odds_feed] section missing from config")?;
            let mut feed = TheOddsApi::new(Config::odds_api_key()?, &feed_config.base_url, &feed_config.bookmakers);
            let mut store = if config.data.snapshot_path.exists() {
                load_store(&config)?
            } else {
                tracing::warn!(path = %config.data.snapshot_path.display(), "no snapshot yet; starting empty");
                MemoryStore::new()
            };
            let stats = pipeline::update_odds(&mut feed, &mut store, &config).await?;
            println!(
                "Games created: {}  quotes: {}  skipped: {}",
                stats.games_created, stats.quotes, stats.skipped
            );
        }
        other => {
            anyhow::bail!("unknown command: {}\n\n{}", other, USAGE);
        }
    }
    Ok(())
}
