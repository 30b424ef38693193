use serde::Deserialize;

/// One upcoming game as reported by an odds provider. Team names are the
/// provider's own spelling; mapping to store teams happens on ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct OddsUpdate {
    pub event_id: String,
    pub home_team: String,
    pub away_team: String,
    /// RFC 3339 start time.
    pub commence_time: String,
    pub bookmakers: Vec<BookmakerLines>,
}

/// All American-format lines one bookmaker posts for a game.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookmakerLines {
    pub name: String,
    pub home_moneyline: Option<i32>,
    pub away_moneyline: Option<i32>,
    pub home_spread: Option<f64>,
    pub home_spread_odds: Option<i32>,
    pub away_spread: Option<f64>,
    pub away_spread_odds: Option<i32>,
    pub total: Option<f64>,
    pub over_odds: Option<i32>,
    pub under_odds: Option<i32>,
    pub last_update: String,
}

impl BookmakerLines {
    pub fn is_empty(&self) -> bool {
        self.home_moneyline.is_none()
            && self.away_moneyline.is_none()
            && self.home_spread.is_none()
            && self.total.is_none()
    }
}

/// the-odds-api.com v4 response: top-level array of events
#[derive(Debug, Deserialize)]
pub struct TheOddsApiEvent {
    pub id: String,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: String,
    #[serde(default)]
    pub bookmakers: Vec<TheOddsApiBookmaker>,
}

#[derive(Debug, Deserialize)]
pub struct TheOddsApiBookmaker {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub last_update: String,
    #[serde(default)]
    pub markets: Vec<TheOddsApiMarket>,
}

#[derive(Debug, Deserialize)]
pub struct TheOddsApiMarket {
    pub key: String,
    #[serde(default)]
    pub outcomes: Vec<TheOddsApiOutcome>,
}

#[derive(Debug, Deserialize)]
pub struct TheOddsApiOutcome {
    pub name: String,
    pub price: f64,
    /// Spread or total line; absent on h2h.
    pub point: Option<f64>,
}

/// API usage quota info extracted from response headers.
#[derive(Debug, Clone, Default)]
pub struct ApiQuota {
    pub requests_used: u64,
    pub requests_remaining: u64,
}
