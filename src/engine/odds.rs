//! American moneyline conversions.
//!
//! Moneylines are never zero in American format; passing 0 is a caller bug.

/// Convert a moneyline to the win probability it implies (vig included).
/// Positive odds (e.g., +150): prob = 100 / (odds + 100)
/// Negative odds (e.g., -150): prob = |odds| / (|odds| + 100)
pub fn implied_probability(moneyline: i32) -> f64 {
    debug_assert!(moneyline != 0, "moneyline must be non-zero");
    let odds = moneyline as f64;
    if odds > 0.0 {
        100.0 / (odds + 100.0)
    } else {
        let abs = odds.abs();
        abs / (abs + 100.0)
    }
}

/// Total returned on a winning bet, stake included.
/// Positive odds: stake * (1 + odds/100); negative: stake * (1 + 100/|odds|).
pub fn payout(moneyline: i32, stake: f64) -> f64 {
    debug_assert!(moneyline != 0, "moneyline must be non-zero");
    let odds = moneyline as f64;
    if odds > 0.0 {
        stake * (1.0 + odds / 100.0)
    } else {
        stake * (1.0 + 100.0 / odds.abs())
    }
}

/// Net profit per unit staked on a win (the `b` in Kelly's formula).
pub fn net_odds(moneyline: i32) -> f64 {
    payout(moneyline, 1.0) - 1.0
}
