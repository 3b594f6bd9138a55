//! Black-Scholes Model
//!
//! Provides:
//! - Closed-form second-order Greeks (gamma, vega, vanna, volga, charm)
//! - European option pricing
//! - Probability of finishing in the money from chain IVs
//! - Implied volatility solver (Brent on a fixed bracket)
//!
//! Every Greek returns exactly 0.0 on degenerate inputs (see
//! `MarketInputs::is_degenerate`).

use std::f64::consts::{PI, SQRT_2};

use statrs::function::erf::erfc;

use crate::core::{ExposureError, ExposureResult, Greeks, MarketInputs, OptionChainRow, OptionType};
use crate::math::{brent, BRENT_MAX_ITER, BRENT_XTOL};

/// Lower end of the implied volatility search bracket
pub const IV_LOWER: f64 = 0.001;

/// Upper end of the implied volatility search bracket
pub const IV_UPPER: f64 = 2.0;

/// Standard normal CDF
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Standard normal PDF
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Black-Scholes d1 parameter. Unguarded: check `is_degenerate` first.
pub fn d1(inputs: &MarketInputs) -> f64 {
    let MarketInputs { spot, strike, time, rate, div_yield, vol } = *inputs;
    ((spot / strike).ln() + (rate - div_yield + 0.5 * vol * vol) * time) / (vol * time.sqrt())
}

/// Black-Scholes d2 parameter
pub fn d2(inputs: &MarketInputs) -> f64 {
    d1(inputs) - inputs.vol * inputs.time.sqrt()
}

/// Gamma, identical for calls and puts
pub fn gamma(inputs: &MarketInputs) -> f64 {
    if inputs.is_degenerate() {
        return 0.0;
    }
    let div_factor = (-inputs.div_yield * inputs.time).exp();
    div_factor * norm_pdf(d1(inputs)) / (inputs.spot * inputs.vol * inputs.time.sqrt())
}

/// Vega per unit of volatility (a 1.0 move is 100 vol points)
pub fn vega(inputs: &MarketInputs) -> f64 {
    if inputs.is_degenerate() {
        return 0.0;
    }
    let div_factor = (-inputs.div_yield * inputs.time).exp();
    inputs.spot * div_factor * norm_pdf(d1(inputs)) * inputs.time.sqrt()
}

/// Vanna in the exposure-chart sign convention: e^(-qT)·φ(d1)·d2/σ,
/// the negative of d(vega)/d(spot).
pub fn vanna(inputs: &MarketInputs) -> f64 {
    if inputs.is_degenerate() {
        return 0.0;
    }
    let div_factor = (-inputs.div_yield * inputs.time).exp();
    div_factor * norm_pdf(d1(inputs)) * d2(inputs) / inputs.vol
}

/// Volga (vomma): d(vega)/d(vol)
pub fn volga(inputs: &MarketInputs) -> f64 {
    if inputs.is_degenerate() {
        return 0.0;
    }
    vega(inputs) * d1(inputs) * d2(inputs) / inputs.vol
}

/// Charm: rate of change of call delta with respect to time
pub fn charm(inputs: &MarketInputs) -> f64 {
    if inputs.is_degenerate() {
        return 0.0;
    }
    let MarketInputs { time, rate, div_yield, vol, .. } = *inputs;
    let d1 = d1(inputs);
    let d2 = d2(inputs);
    let div_factor = (-div_yield * time).exp();
    let vol_sqrt_t = vol * time.sqrt();

    div_yield * div_factor * norm_cdf(d1)
        - div_factor * norm_pdf(d1) * (2.0 * (rate - div_yield) * time - d2 * vol_sqrt_t)
            / (2.0 * time * vol_sqrt_t)
}

/// All five sensitivities in one record
pub fn greeks(inputs: &MarketInputs) -> Greeks {
    if inputs.is_degenerate() {
        return Greeks::default();
    }
    Greeks {
        gamma: gamma(inputs),
        vega: vega(inputs),
        vanna: vanna(inputs),
        volga: volga(inputs),
        charm: charm(inputs),
    }
}

/// Black-Scholes European call price
pub fn call_price(inputs: &MarketInputs) -> f64 {
    price(inputs, OptionType::Call)
}

/// Black-Scholes European put price
pub fn put_price(inputs: &MarketInputs) -> f64 {
    price(inputs, OptionType::Put)
}

/// Black-Scholes European option price
pub fn price(inputs: &MarketInputs, option_type: OptionType) -> f64 {
    let MarketInputs { spot, strike, time, rate, div_yield, vol } = *inputs;

    if time <= 0.0 {
        return option_type.intrinsic(spot, strike);
    }

    let df = (-rate * time).exp();

    if vol <= 0.0 {
        // Zero vol = intrinsic value of the forward, discounted
        return df * option_type.intrinsic(inputs.forward(), strike);
    }

    let d1 = d1(inputs);
    let d2 = d2(inputs);
    let div_factor = (-div_yield * time).exp();

    match option_type {
        OptionType::Call => spot * div_factor * norm_cdf(d1) - strike * df * norm_cdf(d2),
        OptionType::Put => strike * df * norm_cdf(-d2) - spot * div_factor * norm_cdf(-d1),
    }
}

/// Risk-neutral probability that one side of a strike finishes in the money.
///
/// The volatility is the strike's shared IV (mean of the call and put IVs,
/// or whichever one is quoted) and d2 uses the dividend-free drift
/// `r - σ²/2`. Returns `None` without an IV or with a non-positive strike,
/// spot or time.
pub fn probability_itm(
    row: &OptionChainRow,
    side: OptionType,
    spot: f64,
    time: f64,
    rate: f64,
) -> Option<f64> {
    if !(row.has_valid_strike() && spot > 0.0 && time > 0.0) {
        return None;
    }
    let vol = row.shared_iv()?;
    let d2 = ((spot / row.strike).ln() + (rate - 0.5 * vol * vol) * time) / (vol * time.sqrt());

    match side {
        OptionType::Call => Some(norm_cdf(d2)),
        OptionType::Put => Some(norm_cdf(-d2)),
    }
}

/// Implied volatility by Brent's method on [IV_LOWER, IV_UPPER].
///
/// Fails when the price is outside what the bracket can reach or the search
/// does not converge within 100 iterations.
pub fn implied_volatility(
    market_price: f64,
    spot: f64,
    strike: f64,
    time: f64,
    rate: f64,
    div_yield: f64,
    option_type: OptionType,
) -> ExposureResult<f64> {
    if !(market_price.is_finite() && market_price > 0.0) {
        return Err(ExposureError::numerical("Non-positive option price"));
    }
    if time <= 0.0 {
        return Err(ExposureError::numerical("Non-positive time to expiry"));
    }
    if spot <= 0.0 || strike <= 0.0 {
        return Err(ExposureError::numerical("Non-positive spot or strike"));
    }

    let inputs = MarketInputs::new(spot, strike, time, rate, div_yield, IV_LOWER);
    let objective = |vol: f64| price(&inputs.with_vol(vol), option_type) - market_price;

    brent(objective, IV_LOWER, IV_UPPER, BRENT_XTOL, BRENT_MAX_ITER)
}
