// src/pricing/volatility.rs

use statrs::statistics::Statistics;

/// Log-returns between consecutive prices. Pairs with a non-positive price
/// are skipped rather than producing NaN or infinities.
pub fn log_returns<'a, I>(prices: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut returns = Vec::new();
    let mut prev: Option<f64> = None;
    for &price in prices {
        if let Some(p) = prev {
            if p > 0.0 && price > 0.0 {
                returns.push((price / p).ln());
            }
        }
        prev = Some(price);
    }
    returns
}

/// Population standard deviation of log-returns over the window.
/// Unlike an annualized estimator this is the raw per-tick figure.
pub fn rolling_volatility<'a, I>(prices: I) -> f64
where
    I: IntoIterator<Item = &'a f64>,
{
    let returns = log_returns(prices);
    if returns.is_empty() {
        return 0.0;
    }
    let vol = returns.iter().population_std_dev();
    if vol.is_finite() { vol.max(0.0) } else { 0.0 }
}
