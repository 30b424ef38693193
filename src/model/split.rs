use crate::engine::features::FeatureRow;
use serde::Deserialize;

/// Season partitioning. Seasons are split whole so no game from a later
/// season ever trains a model evaluated on an earlier one.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SplitConfig {
    #[serde(default = "default_train_seasons")]
    pub train_seasons: Vec<i32>,
    #[serde(default = "default_validation_season")]
    pub validation_season: i32,
    #[serde(default = "default_test_season")]
    pub test_season: i32,
}

fn default_train_seasons() -> Vec<i32> { (2015..=2021).collect() }
fn default_validation_season() -> i32 { 2022 }
fn default_test_season() -> i32 { 2023 }

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_seasons: default_train_seasons(),
            validation_season: default_validation_season(),
            test_season: default_test_season(),
        }
    }
}

impl SplitConfig {
    /// Every training season must precede validation, which precedes test.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(&last) = self.train_seasons.iter().max() {
            if last >= self.validation_season {
                anyhow::bail!(
                    "train season {} is not before validation season {}",
                    last,
                    self.validation_season
                );
            }
        }
        if self.validation_season >= self.test_season {
            anyhow::bail!(
                "validation season {} is not before test season {}",
                self.validation_season,
                self.test_season
            );
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct TemporalSplit {
    pub train: Vec<FeatureRow>,
    pub validation: Vec<FeatureRow>,
    pub test: Vec<FeatureRow>,
}

/// Rows from seasons outside the config are dropped.
pub fn split_by_season(rows: Vec<FeatureRow>, config: &SplitConfig) -> TemporalSplit {
    let mut split = TemporalSplit::default();
    let mut dropped = 0usize;
    for row in rows {
        if row.season == config.test_season {
            split.test.push(row);
        } else if row.season == config.validation_season {
            split.validation.push(row);
        } else if config.train_seasons.contains(&row.season) {
            split.train.push(row);
        } else {
            dropped += 1;
        }
    }
    tracing::info!(
        train = split.train.len(),
        validation = split.validation.len(),
        test = split.test.len(),
        dropped,
        "temporal split"
    );
    split
}
