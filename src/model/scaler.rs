use super::FeatureScaler;
use crate::error::{PredictError, PredictResult};
use serde::{Deserialize, Serialize};

/// Zero-mean, unit-variance scaling per column. A constant column keeps a
/// unit scale so it is only centred.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        !self.mean.is_empty()
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }
}

fn check_width(rows: &[Vec<f64>], width: usize) -> PredictResult<()> {
    match rows.iter().position(|r| r.len() != width) {
        Some(i) => Err(PredictError::InvalidInput(format!(
            "row {} has {} columns, expected {}",
            i,
            rows[i].len(),
            width
        ))),
        None => Ok(()),
    }
}

impl FeatureScaler for StandardScaler {
    fn fit(&mut self, features: &[Vec<f64>]) -> PredictResult<()> {
        let Some(first) = features.first() else {
            return Err(PredictError::InvalidInput("cannot fit scaler on zero rows".into()));
        };
        let width = first.len();
        check_width(features, width)?;

        let n = features.len() as f64;
        let mut mean = vec![0.0; width];
        for row in features {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        // Population variance, matching the usual StandardScaler convention.
        let mut var = vec![0.0; width];
        for row in features {
            for ((v, x), m) in var.iter_mut().zip(row).zip(&mean) {
                *v += (x - m).powi(2);
            }
        }
        let scale = var
            .into_iter()
            .map(|v| {
                let sd = (v / n).sqrt();
                if sd > f64::EPSILON { sd } else { 1.0 }
            })
            .collect();

        self.mean = mean;
        self.scale = scale;
        Ok(())
    }

    fn transform(&self, features: &[Vec<f64>]) -> PredictResult<Vec<Vec<f64>>> {
        if !self.is_fitted() {
            return Err(PredictError::NotFitted("scaler"));
        }
        check_width(features, self.width())?;
        Ok(features
            .iter()
            .map(|row| {
                row.iter()
                    .zip(self.mean.iter().zip(&self.scale))
                    .map(|(x, (m, s))| (x - m) / s)
                    .collect()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_transform_standardizes() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0], vec![5.0, 10.0]];
        let mut scaler = StandardScaler::new();
        scaler.fit(&rows).unwrap();
        let out = scaler.transform(&rows).unwrap();
        let sd = (8.0f64 / 3.0).sqrt();
        assert!((out[0][0] + 2.0 / sd).abs() < 1e-12);
        assert!(out[1][0].abs() < 1e-12);
        // constant column is centred, not blown up
        assert!(out.iter().all(|r| r[1] == 0.0));
    }

    #[test]
    fn test_transform_uses_training_statistics() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&[vec![0.0], vec![2.0]]).unwrap();
        let out = scaler.transform(&[vec![4.0]]).unwrap();
        assert!((out[0][0] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_unfitted_transform_is_missing_artifact() {
        let err = StandardScaler::new().transform(&[vec![1.0]]).unwrap_err();
        assert!(err.is_missing_artifact());
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let mut scaler = StandardScaler::new();
        assert!(scaler.fit(&[vec![1.0, 2.0], vec![1.0]]).is_err());
        scaler.fit(&[vec![1.0, 2.0]]).unwrap();
        assert!(matches!(
            scaler.transform(&[vec![1.0]]),
            Err(PredictError::InvalidInput(_))
        ));
    }
}
