use super::types::*;
use super::OddsFeed;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

const MARKETS: &str = "h2h,spreads,totals";

pub struct TheOddsApi {
    client: Client,
    api_key: String,
    base_url: String,
    bookmakers: String,
    last_quota: Option<ApiQuota>,
}

/// Parse a quota header that may be an integer or float (e.g. "14527.0").
fn parse_quota_header(headers: &reqwest::header::HeaderMap, name: &str) -> u64 {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<f64>().ok())
        .map(|v| v as u64)
        .unwrap_or(0)
}

/// American prices arrive as JSON numbers; zero is not a valid line.
fn american(price: f64) -> Option<i32> {
    let p = price.round() as i32;
    (p != 0).then_some(p)
}

fn bookmaker_lines(bm: &TheOddsApiBookmaker, home: &str, away: &str) -> BookmakerLines {
    let mut lines = BookmakerLines {
        name: if bm.title.is_empty() { bm.key.clone() } else { bm.title.clone() },
        last_update: bm.last_update.clone(),
        ..BookmakerLines::default()
    };
    for market in &bm.markets {
        match market.key.as_str() {
            "h2h" => {
                for o in &market.outcomes {
                    if o.name == home {
                        lines.home_moneyline = american(o.price);
                    } else if o.name == away {
                        lines.away_moneyline = american(o.price);
                    }
                }
            }
            "spreads" => {
                for o in &market.outcomes {
                    if o.name == home {
                        lines.home_spread = o.point;
                        lines.home_spread_odds = american(o.price);
                    } else if o.name == away {
                        lines.away_spread = o.point;
                        lines.away_spread_odds = american(o.price);
                    }
                }
            }
            "totals" => {
                for o in &market.outcomes {
                    let name = o.name.to_lowercase();
                    if name.contains("over") {
                        lines.total = o.point.or(lines.total);
                        lines.over_odds = american(o.price);
                    } else if name.contains("under") {
                        lines.total = lines.total.or(o.point);
                        lines.under_odds = american(o.price);
                    }
                }
            }
            _ => {}
        }
    }
    lines
}

/// Normalize provider events. Bookmakers with no usable line are dropped,
/// and so are events left with no bookmakers.
pub fn parse_events(events: Vec<TheOddsApiEvent>) -> Vec<OddsUpdate> {
    events
        .into_iter()
        .filter_map(|event| {
            let bookmakers: Vec<BookmakerLines> = event
                .bookmakers
                .iter()
                .map(|bm| bookmaker_lines(bm, &event.home_team, &event.away_team))
                .filter(|l| !l.is_empty())
                .collect();
            if bookmakers.is_empty() {
                return None;
            }
            Some(OddsUpdate {
                event_id: event.id,
                home_team: event.home_team,
                away_team: event.away_team,
                commence_time: event.commence_time,
                bookmakers,
            })
        })
        .collect()
}

impl TheOddsApi {
    pub fn new(api_key: String, base_url: &str, bookmakers: &str) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            bookmakers: bookmakers.to_string(),
            last_quota: None,
        }
    }
}

#[async_trait]
impl OddsFeed for TheOddsApi {
    async fn fetch_odds(&mut self, sport: &str) -> Result<Vec<OddsUpdate>> {
        let url = format!(
            "{}/v4/sports/{}/odds?apiKey={}&regions=us&markets={}&oddsFormat=american&bookmakers={}",
            self.base_url, sport, self.api_key, MARKETS, self.bookmakers,
        );

        let resp = self.client.get(&url).send().await
            .context("the-odds-api request failed")?;

        let used = parse_quota_header(resp.headers(), "x-requests-used");
        let remaining = parse_quota_header(resp.headers(), "x-requests-remaining");
        self.last_quota = Some(ApiQuota {
            requests_used: used,
            requests_remaining: remaining,
        });

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("the-odds-api {} ({}): {}", sport, status, body);
        }

        let events: Vec<TheOddsApiEvent> = resp.json().await
            .context("failed to parse the-odds-api response")?;
        let updates = parse_events(events);
        tracing::debug!(sport, events = updates.len(), used, remaining, "odds fetched");
        Ok(updates)
    }

    fn last_quota(&self) -> Option<ApiQuota> {
        self.last_quota.clone()
    }
}
