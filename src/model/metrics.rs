//! Classification metrics over `[p_loss, p_win]` predictions.

const EPS: f64 = 1e-15;

/// Share of rows where `p_win > 0.5` matches the label.
pub fn accuracy(probs: &[[f64; 2]], labels: &[u8]) -> f64 {
    if probs.is_empty() {
        return 0.0;
    }
    let correct = probs
        .iter()
        .zip(labels)
        .filter(|(p, &y)| u8::from(p[1] > 0.5) == y)
        .count();
    correct as f64 / probs.len() as f64
}

/// Mean binary cross-entropy with probabilities clipped to [1e-15, 1 - 1e-15].
pub fn log_loss(probs: &[[f64; 2]], labels: &[u8]) -> f64 {
    if probs.is_empty() {
        return 0.0;
    }
    let total: f64 = probs
        .iter()
        .zip(labels)
        .map(|(p, &y)| {
            let p_win = p[1].clamp(EPS, 1.0 - EPS);
            if y == 1 {
                -p_win.ln()
            } else {
                -(1.0 - p_win).ln()
            }
        })
        .sum();
    total / probs.len() as f64
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub rows: usize,
    pub accuracy: f64,
    pub log_loss: f64,
}

pub fn evaluate(probs: &[[f64; 2]], labels: &[u8]) -> Evaluation {
    Evaluation {
        rows: probs.len(),
        accuracy: accuracy(probs, labels),
        log_loss: log_loss(probs, labels),
    }
}
