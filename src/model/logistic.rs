//! L2-regularised logistic regression trained by mini-batch gradient descent.

use super::Classifier;
use crate::error::{PredictError, PredictResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_l2")]
    pub l2: f64,
    /// Shuffle seed; training is deterministic for a given seed.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_learning_rate() -> f64 { 0.05 }
fn default_epochs() -> usize { 200 }
fn default_batch_size() -> usize { 64 }
fn default_l2() -> f64 { 1e-4 }
fn default_seed() -> u64 { 42 }

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            l2: default_l2(),
            seed: default_seed(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    params: LogisticParams,
    weights: Vec<f64>,
    bias: f64,
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl LogisticRegression {
    pub fn new(params: LogisticParams) -> Self {
        Self {
            params,
            weights: Vec::new(),
            bias: 0.0,
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.weights.is_empty()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn width(&self) -> usize {
        self.weights.len()
    }

    fn decision(&self, row: &[f64]) -> f64 {
        self.bias + row.iter().zip(&self.weights).map(|(x, w)| x * w).sum::<f64>()
    }
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(LogisticParams::default())
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, features: &[Vec<f64>], labels: &[u8]) -> PredictResult<()> {
        if features.is_empty() {
            return Err(PredictError::InvalidInput("cannot fit on zero rows".into()));
        }
        if features.len() != labels.len() {
            return Err(PredictError::InvalidInput(format!(
                "{} rows but {} labels",
                features.len(),
                labels.len()
            )));
        }
        if labels.iter().any(|&y| y > 1) {
            return Err(PredictError::InvalidInput("labels must be 0 or 1".into()));
        }
        let width = features[0].len();
        if features.iter().any(|r| r.len() != width) {
            return Err(PredictError::InvalidInput("ragged feature rows".into()));
        }

        let p = &self.params;
        let mut weights = vec![0.0; width];
        let mut bias = 0.0;
        let mut order: Vec<usize> = (0..features.len()).collect();
        let mut rng = StdRng::seed_from_u64(p.seed);
        let batch_size = p.batch_size.max(1);

        for _ in 0..p.epochs {
            order.shuffle(&mut rng);
            for batch in order.chunks(batch_size) {
                let mut grad_w = vec![0.0; width];
                let mut grad_b = 0.0;
                for &i in batch {
                    let row = &features[i];
                    let z = bias + row.iter().zip(&weights).map(|(x, w)| x * w).sum::<f64>();
                    let err = sigmoid(z) - labels[i] as f64;
                    for (g, x) in grad_w.iter_mut().zip(row) {
                        *g += err * x;
                    }
                    grad_b += err;
                }
                let n = batch.len() as f64;
                for (w, g) in weights.iter_mut().zip(&grad_w) {
                    *w -= p.learning_rate * (g / n + p.l2 * *w);
                }
                bias -= p.learning_rate * grad_b / n;
            }
        }

        tracing::debug!(rows = features.len(), width, epochs = p.epochs, "logistic regression fitted");
        self.weights = weights;
        self.bias = bias;
        Ok(())
    }

    fn predict_proba(&self, features: &[Vec<f64>]) -> PredictResult<Vec<[f64; 2]>> {
        if !self.is_fitted() {
            return Err(PredictError::NotFitted("classifier"));
        }
        features
            .iter()
            .map(|row| {
                if row.len() != self.width() {
                    return Err(PredictError::InvalidInput(format!(
                        "expected {} features, got {}",
                        self.width(),
                        row.len()
                    )));
                }
                let p_win = sigmoid(self.decision(row));
                Ok([1.0 - p_win, p_win])
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn synthetic(n: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<u8>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut x = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        for _ in 0..n {
            let a: f64 = rng.gen_range(-1.0..1.0);
            let b: f64 = rng.gen_range(-1.0..1.0);
            y.push(u8::from(a + 0.5 * b > 0.0));
            x.push(vec![a, b]);
        }
        (x, y)
    }

    #[test]
    fn test_learns_separable_data() {
        let (x, y) = synthetic(400, 7);
        let mut model = LogisticRegression::default();
        model.fit(&x, &y).unwrap();
        let probs = model.predict_proba(&x).unwrap();
        let correct = probs
            .iter()
            .zip(&y)
            .filter(|(p, &label)| u8::from(p[1] > 0.5) == label)
            .count();
        assert!(correct as f64 / y.len() as f64 > 0.9, "accuracy {correct}/400");
        assert!(model.weights()[0] > model.weights()[1]);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (x, y) = synthetic(50, 1);
        let mut model = LogisticRegression::default();
        model.fit(&x, &y).unwrap();
        for p in model.predict_proba(&x).unwrap() {
            assert!((p[0] + p[1] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_same_seed_same_model() {
        let (x, y) = synthetic(100, 3);
        let mut a = LogisticRegression::default();
        let mut b = LogisticRegression::default();
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_predict_before_fit_is_missing_artifact() {
        let model = LogisticRegression::default();
        let err = model.predict_proba(&[vec![0.0]]).unwrap_err();
        assert!(err.is_missing_artifact());
    }

    #[test]
    fn test_rejects_bad_labels() {
        let mut model = LogisticRegression::default();
        assert!(model.fit(&[vec![0.0]], &[2]).is_err());
        assert!(model.fit(&[vec![0.0]], &[]).is_err());
    }

    #[test]
    fn test_sigmoid_is_stable() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(sigmoid(800.0) <= 1.0);
    }
}
