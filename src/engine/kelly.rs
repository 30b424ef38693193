//! Kelly criterion stake sizing for moneyline bets.

use super::odds::net_odds;

/// Kelly-optimal fraction of bankroll.
///
/// - `win_prob`: model probability of the side winning (0–1)
/// - `moneyline`: American odds for that side
///
/// Returns 0.0 when the bet has no positive expectation.
pub fn kelly_fraction(win_prob: f64, moneyline: i32) -> f64 {
    if !(0.0..=1.0).contains(&win_prob) {
        return 0.0;
    }
    let b = net_odds(moneyline);
    if b <= 0.0 {
        return 0.0;
    }
    let p = win_prob;
    let q = 1.0 - p;

    // f* = (b*p - q) / b
    let f_star = (b * p - q) / b;
    f_star.max(0.0)
}

/// Stake for one bet: `f* * scale * bankroll`, where `scale` is the Kelly
/// multiplier (e.g. 0.25 for quarter-Kelly).
pub fn kelly_stake(win_prob: f64, moneyline: i32, bankroll: f64, scale: f64) -> f64 {
    if bankroll <= 0.0 || scale <= 0.0 {
        return 0.0;
    }
    kelly_fraction(win_prob, moneyline) * scale * bankroll
}
