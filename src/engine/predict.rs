use super::features::{FeatureBuilder, FeatureVector};
use super::form::{FormParams, FormWindow};
use super::odds::implied_probability;
use crate::error::{PredictError, PredictResult};
use crate::model::artifacts::ArtifactStore;
use crate::model::{Classifier, FeatureScaler, LogisticRegression, StandardScaler};
use crate::store::types::Team;
use crate::store::Store;
use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Distance of the home win probability from a coin flip.
    pub fn from_probability(p: f64) -> Self {
        let d = (p - 0.5).abs();
        if d > 0.20 {
            Self::High
        } else if d > 0.10 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueBet {
    Home { team: String, edge: f64 },
    Away { team: String, edge: f64 },
    NoValue,
}

impl fmt::Display for ValueBet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home { team, edge } => write!(f, "Bet Home ({}) - Edge: {:.1}%", team, edge * 100.0),
            Self::Away { team, edge } => write!(f, "Bet Away ({}) - Edge: {:.1}%", team, edge * 100.0),
            Self::NoValue => f.write_str("No Value"),
        }
    }
}

/// Home side is checked first; the away side only when home has no edge.
pub fn value_bet(
    home: &str,
    away: &str,
    home_win_prob: f64,
    moneylines: (i32, i32),
    edge_threshold: f64,
) -> ValueBet {
    let home_edge = home_win_prob - implied_probability(moneylines.0);
    let away_edge = (1.0 - home_win_prob) - implied_probability(moneylines.1);
    if home_edge > edge_threshold {
        ValueBet::Home {
            team: home.to_string(),
            edge: home_edge,
        }
    } else if away_edge > edge_threshold {
        ValueBet::Away {
            team: away.to_string(),
            edge: away_edge,
        }
    } else {
        ValueBet::NoValue
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub home_team: String,
    pub away_team: String,
    pub as_of: NaiveDate,
    pub home_win_prob: f64,
    pub away_win_prob: f64,
    pub confidence: Confidence,
    pub predicted_winner: String,
    /// Present only when both moneylines were supplied.
    pub value_bet: Option<ValueBet>,
    /// Unscaled inputs, for inspection.
    pub features: FeatureVector,
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} vs {} ({})", self.home_team, self.away_team, self.as_of)?;
        writeln!(f, "  home win: {:.1}%", self.home_win_prob * 100.0)?;
        writeln!(f, "  away win: {:.1}%", self.away_win_prob * 100.0)?;
        write!(f, "  winner:   {} ({} confidence)", self.predicted_winner, self.confidence)?;
        if let Some(v) = &self.value_bet {
            write!(f, "\n  value:    {}", v)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictSettings {
    pub form: FormParams,
    pub initial_rating: f64,
    pub edge_threshold: f64,
}

/// Answers single-game questions against a rated store with a trained model.
pub struct Predictor<'a, S: Store, C: Classifier, F: FeatureScaler> {
    store: &'a S,
    classifier: C,
    scaler: F,
    settings: PredictSettings,
}

impl<'a, S: Store> Predictor<'a, S, LogisticRegression, StandardScaler> {
    /// Fails with `MissingArtifact` when either file has not been written yet.
    pub fn from_artifacts(
        store: &'a S,
        artifacts: &ArtifactStore,
        settings: PredictSettings,
    ) -> PredictResult<Self> {
        let scaler = artifacts.load_scaler()?;
        let classifier = artifacts.load_classifier()?;
        Ok(Self::new(store, classifier, scaler, settings))
    }
}

impl<'a, S: Store, C: Classifier, F: FeatureScaler> Predictor<'a, S, C, F> {
    pub fn new(store: &'a S, classifier: C, scaler: F, settings: PredictSettings) -> Self {
        Self {
            store,
            classifier,
            scaler,
            settings,
        }
    }

    fn resolve(&self, ident: &str) -> PredictResult<&'a Team> {
        self.store
            .find_team(ident.trim())
            .ok_or_else(|| PredictError::TeamNotFound(ident.to_string()))
    }

    pub fn predict(
        &self,
        home_ident: &str,
        away_ident: &str,
        as_of: NaiveDate,
        odds: Option<(i32, i32)>,
    ) -> PredictResult<Prediction> {
        let home = self.resolve(home_ident)?;
        let away = self.resolve(away_ident)?;
        if home.id == away.id {
            return Err(PredictError::InvalidInput(format!(
                "{} cannot play itself",
                home.name
            )));
        }
        if let Some((h, a)) = odds {
            if h == 0 || a == 0 {
                return Err(PredictError::InvalidInput("moneyline cannot be 0".into()));
            }
        }

        let builder = FeatureBuilder::new(
            self.store,
            FormWindow::new(self.store, self.settings.form),
            self.settings.initial_rating,
        );
        let row = builder.build_inference_row(home.id, away.id, as_of);
        let scaled = self.scaler.transform(&[row.features.to_vec()])?;
        let proba = self.classifier.predict_proba(&scaled)?;
        let [p_loss, p_win] = proba
            .first()
            .copied()
            .ok_or_else(|| PredictError::InvalidInput("classifier returned no rows".into()))?;

        let predicted_winner = if p_win > 0.5 { &home.name } else { &away.name };
        let value = odds.map(|lines| {
            value_bet(&home.name, &away.name, p_win, lines, self.settings.edge_threshold)
        });

        tracing::debug!(
            home = %home.abbreviation,
            away = %away.abbreviation,
            %as_of,
            p_win,
            "prediction"
        );

        Ok(Prediction {
            home_team: home.name.clone(),
            away_team: away.name.clone(),
            as_of,
            home_win_prob: p_win,
            away_win_prob: p_loss,
            confidence: Confidence::from_probability(p_win),
            predicted_winner: predicted_winner.clone(),
            value_bet: value,
            features: row.features,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_thresholds() {
        assert_eq!(Confidence::from_probability(0.75), Confidence::High);
        assert_eq!(Confidence::from_probability(0.25), Confidence::High);
        assert_eq!(Confidence::from_probability(0.65), Confidence::Medium);
        assert_eq!(Confidence::from_probability(0.55), Confidence::Low);
        assert_eq!(Confidence::from_probability(0.5), Confidence::Low);
    }

    #[test]
    fn test_value_bet_text() {
        // home implied 0.5, edge 0.05
        let v = value_bet("Lakers", "Celtics", 0.55, (100, -120), 0.03);
        assert_eq!(v.to_string(), "Bet Home (Lakers) - Edge: 5.0%");

        // away implied 0.5, away prob 0.6
        let v = value_bet("Lakers", "Celtics", 0.40, (-150, 100), 0.03);
        assert_eq!(v.to_string(), "Bet Away (Celtics) - Edge: 10.0%");

        let v = value_bet("Lakers", "Celtics", 0.52, (-110, -110), 0.03);
        assert_eq!(v, ValueBet::NoValue);
        assert_eq!(v.to_string(), "No Value");
    }

    #[test]
    fn test_home_checked_before_away() {
        // both sides clear the threshold against a generous market
        let v = value_bet("H", "A", 0.5, (200, 200), 0.03);
        assert!(matches!(v, ValueBet::Home { .. }));
    }
}
