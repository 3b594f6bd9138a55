//! Heston Stochastic Volatility Model
//!
//! The Heston model assumes variance follows a mean-reverting square-root process:
//!
//! dS = (r - q) * S * dt + √v * S * dW_S
//! dv = κ(θ - v) * dt + σ_v * √v * dW_v
//!
//! where:
//! - S: spot price
//! - v: instantaneous variance
//! - κ: mean reversion speed
//! - θ: long-term variance
//! - σ_v: volatility of volatility (vol-of-vol)
//! - ρ: correlation between spot and variance Brownians
//!
//! European calls are priced from the characteristic function of ln S_T:
//!
//! C = S e^{-qT} P1 - K e^{-rT} P2
//!
//! with P1, P2 obtained by adaptive quadrature of the Gil-Pelaez integrals.
//! Greeks are central finite differences of that price.

use std::f64::consts::PI;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::config::{CharacteristicFormulation, PricerConfig};
use crate::core::{ExposureError, ExposureResult, HestonGreek, OptionType};
use crate::math::integrate;

/// Default relative bump for finite-difference Greeks
pub const DEFAULT_GREEK_BUMP: f64 = 1e-4;

/// Heston model parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HestonParams {
    /// Mean reversion speed (κ)
    pub kappa: f64,
    /// Long-term variance (θ)
    pub theta: f64,
    /// Volatility of volatility (σ_v)
    pub sigma_v: f64,
    /// Correlation between spot and variance (ρ)
    pub rho: f64,
    /// Initial variance (v0)
    pub v0: f64,
}

impl HestonParams {
    pub fn new(kappa: f64, theta: f64, sigma_v: f64, rho: f64, v0: f64) -> Self {
        Self { kappa, theta, sigma_v, rho, v0 }
    }

    /// Typical parameters for an equity index
    pub fn typical_equity() -> Self {
        Self {
            kappa: 2.0,    // Mean reversion
            theta: 0.04,   // 20% long-term vol
            sigma_v: 0.3,  // Vol-of-vol
            rho: -0.7,     // Negative correlation (leverage effect)
            v0: 0.04,      // 20% initial vol
        }
    }

    /// Check Feller condition: 2κθ > σ_v² (variance stays strictly positive)
    pub fn feller_condition(&self) -> bool {
        2.0 * self.kappa * self.theta > self.sigma_v * self.sigma_v
    }

    /// Validate parameters
    pub fn validate(&self) -> ExposureResult<()> {
        if !(self.v0 > 0.0) {
            return Err(ExposureError::invalid_input("v0 must be positive"));
        }
        if !(self.kappa > 0.0) {
            return Err(ExposureError::invalid_input("kappa must be positive"));
        }
        if !(self.theta > 0.0) {
            return Err(ExposureError::invalid_input("theta must be positive"));
        }
        if !(self.sigma_v > 0.0) {
            return Err(ExposureError::invalid_input("sigma_v must be positive"));
        }
        if !(self.rho > -1.0 && self.rho < 1.0) {
            return Err(ExposureError::invalid_input("rho must be in (-1, 1)"));
        }
        Ok(())
    }

    /// Long-term volatility
    pub fn long_term_vol(&self) -> f64 {
        self.theta.sqrt()
    }

    /// Initial volatility
    pub fn initial_vol(&self) -> f64 {
        self.v0.sqrt()
    }

    /// Same parameters with a different initial variance
    pub fn with_v0(&self, v0: f64) -> Self {
        Self { v0, ..*self }
    }
}

impl Default for HestonParams {
    fn default() -> Self {
        Self::typical_equity()
    }
}

/// Which of the two Heston probabilities to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HestonProbability {
    /// Exercise probability under the stock measure
    P1,
    /// Risk-neutral exercise probability
    P2,
}

impl HestonProbability {
    /// From the conventional index j = 1 or 2
    pub fn from_index(j: u8) -> ExposureResult<Self> {
        match j {
            1 => Ok(HestonProbability::P1),
            2 => Ok(HestonProbability::P2),
            _ => Err(ExposureError::invalid_input(format!(
                "Heston probability index must be 1 or 2, got {}",
                j
            ))),
        }
    }
}

/// Characteristic-function pricer for the Heston model
#[derive(Debug, Clone, Copy, Default)]
pub struct HestonPricer {
    config: PricerConfig,
}

impl HestonPricer {
    pub fn new(config: PricerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricerConfig {
        &self.config
    }

    /// Characteristic function of ln S_T, E[exp(iu ln S_T)].
    ///
    /// `u` is complex so the P1 integrand can evaluate at u - i.
    pub fn characteristic_function(
        &self,
        u: Complex64,
        spot: f64,
        time: f64,
        rate: f64,
        div_yield: f64,
        params: &HestonParams,
    ) -> Complex64 {
        let i = Complex64::i();
        let iu = i * u;

        let a = params.kappa * params.theta;
        let sigma2 = params.sigma_v * params.sigma_v;

        // ξ = κ - ρσiu,  d = sqrt((ρσiu - κ)² + σ²(iu + u²))
        let xi = params.kappa - params.rho * params.sigma_v * iu;
        let d = (xi * xi + sigma2 * (iu + u * u)).sqrt();

        let (c, d_coef) = match self.config.formulation {
            CharacteristicFormulation::Original => {
                let g = (xi + d) / (xi - d);
                let exp_dt = (d * time).exp();
                let c = (a / sigma2) * ((xi + d) * time - 2.0 * ((1.0 - g * exp_dt) / (1.0 - g)).ln());
                let d_coef = ((xi + d) / sigma2) * ((1.0 - exp_dt) / (1.0 - g * exp_dt));
                (c, d_coef)
            }
            CharacteristicFormulation::LittleTrap => {
                let g = (xi - d) / (xi + d);
                let exp_neg_dt = (-d * time).exp();
                let c = (a / sigma2)
                    * ((xi - d) * time - 2.0 * ((1.0 - g * exp_neg_dt) / (1.0 - g)).ln());
                let d_coef = ((xi - d) / sigma2) * ((1.0 - exp_neg_dt) / (1.0 - g * exp_neg_dt));
                (c, d_coef)
            }
        };

        let drift = (rate - div_yield) * iu * time;
        (drift + c + d_coef * params.v0 + iu * spot.ln()).exp()
    }

    /// P1 or P2 by numerical integration over [0, upper_limit].
    ///
    /// P1 is taken under the stock measure, so its integrand is normalized
    /// by φ(-i) = S e^{(r-q)T}.
    #[allow(clippy::too_many_arguments)]
    pub fn probability(
        &self,
        which: HestonProbability,
        spot: f64,
        strike: f64,
        time: f64,
        rate: f64,
        div_yield: f64,
        params: &HestonParams,
    ) -> ExposureResult<f64> {
        let i = Complex64::i();
        let ln_k = strike.ln();

        let (shift, norm) = match which {
            HestonProbability::P1 => (i, spot * ((rate - div_yield) * time).exp()),
            HestonProbability::P2 => (Complex64::new(0.0, 0.0), 1.0),
        };

        let integrand = |u: f64| {
            let phi = self.characteristic_function(
                Complex64::new(u, 0.0) - shift,
                spot,
                time,
                rate,
                div_yield,
                params,
            );
            ((-i * u * ln_k).exp() * phi / (i * u * norm)).re
        };

        let quadrature = &self.config.quadrature;
        let result = integrate(integrand, 0.0, quadrature.upper_limit, quadrature).map_err(|e| {
            ExposureError::pricing(format!("{:?} integral failed at K={}: {}", which, strike, e))
        })?;

        Ok(0.5 + result.value / PI)
    }

    /// European call price
    pub fn call_price(
        &self,
        spot: f64,
        strike: f64,
        time: f64,
        rate: f64,
        div_yield: f64,
        params: &HestonParams,
    ) -> ExposureResult<f64> {
        params.validate()?;
        if !(spot > 0.0 && strike > 0.0) {
            return Err(ExposureError::invalid_input("spot and strike must be positive"));
        }
        if time <= 0.0 {
            return Ok(OptionType::Call.intrinsic(spot, strike));
        }

        let p1 = self.probability(HestonProbability::P1, spot, strike, time, rate, div_yield, params)?;
        let p2 = self.probability(HestonProbability::P2, spot, strike, time, rate, div_yield, params)?;

        Ok(spot * (-div_yield * time).exp() * p1 - strike * (-rate * time).exp() * p2)
    }

    /// European price for either side; puts come from put-call parity
    #[allow(clippy::too_many_arguments)]
    pub fn price(
        &self,
        spot: f64,
        strike: f64,
        time: f64,
        rate: f64,
        div_yield: f64,
        params: &HestonParams,
        option_type: OptionType,
    ) -> ExposureResult<f64> {
        let call = self.call_price(spot, strike, time, rate, div_yield, params)?;
        match option_type {
            OptionType::Call => Ok(call),
            OptionType::Put if time <= 0.0 => Ok(OptionType::Put.intrinsic(spot, strike)),
            OptionType::Put => {
                Ok(call - spot * (-div_yield * time).exp() + strike * (-rate * time).exp())
            }
        }
    }

    /// Finite-difference Greek of the call price with relative bump `h`.
    ///
    /// - Gamma: second difference in spot
    /// - Vega: central difference in v0 (per unit variance)
    /// - Vanna: four-point mixed difference in spot and v0
    /// - Charm: central difference in time to expiry
    #[allow(clippy::too_many_arguments)]
    pub fn heston_greek(
        &self,
        greek: HestonGreek,
        spot: f64,
        strike: f64,
        time: f64,
        rate: f64,
        div_yield: f64,
        params: &HestonParams,
        h: f64,
    ) -> ExposureResult<f64> {
        if !(h > 0.0 && h < 1.0) {
            return Err(ExposureError::invalid_input("finite-difference bump must be in (0, 1)"));
        }
        let price = |s: f64, t: f64, p: &HestonParams| self.call_price(s, strike, t, rate, div_yield, p);

        match greek {
            HestonGreek::Gamma => {
                let up = price(spot * (1.0 + h), time, params)?;
                let mid = price(spot, time, params)?;
                let down = price(spot * (1.0 - h), time, params)?;
                Ok((up - 2.0 * mid + down) / (spot * h).powi(2))
            }
            HestonGreek::Vega => {
                let up = price(spot, time, &params.with_v0(params.v0 * (1.0 + h)))?;
                let down = price(spot, time, &params.with_v0(params.v0 * (1.0 - h)))?;
                Ok((up - down) / (2.0 * params.v0 * h))
            }
            HestonGreek::Vanna => {
                let ds = spot * h;
                let dv = params.v0 * h;
                let v_up = params.with_v0(params.v0 + dv);
                let v_down = params.with_v0(params.v0 - dv);

                let pp = price(spot + ds, time, &v_up)?;
                let pm = price(spot + ds, time, &v_down)?;
                let mp = price(spot - ds, time, &v_up)?;
                let mm = price(spot - ds, time, &v_down)?;
                Ok((pp - pm - mp + mm) / (4.0 * ds * dv))
            }
            HestonGreek::Charm => {
                let up = price(spot, time * (1.0 + h), params)?;
                let down = price(spot, time * (1.0 - h), params)?;
                Ok((up - down) / (2.0 * time * h))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, QuadratureConfig};
    use crate::core::MarketInputs;
    use crate::models::black_scholes;

    /// Nearly deterministic variance: sigma_v → 0 with v0 = theta
    fn near_bs_params(vol: f64) -> HestonParams {
        HestonParams::new(2.0, vol * vol, 0.01, 0.0, vol * vol)
    }

    fn precise_pricer() -> HestonPricer {
        HestonPricer::new(EngineConfig::high_precision().pricer)
    }

    #[test]
    fn test_feller_condition() {
        let params = HestonParams::typical_equity();
        // 2 * 2.0 * 0.04 = 0.16 > 0.3² = 0.09 ✓
        assert!(params.feller_condition());

        let bad_params = HestonParams::new(1.0, 0.04, 0.5, -0.7, 0.04);
        // 2 * 1.0 * 0.04 = 0.08 < 0.5² = 0.25 ✗
        assert!(!bad_params.feller_condition());
    }

    #[test]
    fn test_validate() {
        assert!(HestonParams::typical_equity().validate().is_ok());
        assert!(HestonParams { rho: 1.0, ..Default::default() }.validate().is_err());
        assert!(HestonParams { v0: 0.0, ..Default::default() }.validate().is_err());
        assert!(HestonParams { sigma_v: f64::NAN, ..Default::default() }.validate().is_err());
    }

    #[test]
    fn test_characteristic_function_at_zero_is_one() {
        // The original g has a removable 0/0 at u = 0; the little-trap form does not
        let pricer = HestonPricer::new(PricerConfig {
            formulation: CharacteristicFormulation::LittleTrap,
            ..Default::default()
        });
        let params = HestonParams::typical_equity();
        let phi = pricer.characteristic_function(Complex64::new(0.0, 0.0), 100.0, 0.5, 0.05, 0.01, &params);
        assert!((phi - Complex64::new(1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_converges_to_black_scholes() {
        let pricer = HestonPricer::default();
        let params = near_bs_params(0.2);

        for strike in [90.0, 100.0, 110.0] {
            let heston = pricer.call_price(100.0, strike, 0.5, 0.05, 0.01, &params).unwrap();
            let bs = black_scholes::call_price(&MarketInputs::new(100.0, strike, 0.5, 0.05, 0.01, 0.2));
            let rel = (heston - bs).abs() / bs;
            assert!(rel < 1e-2, "K={}: heston {} vs bs {}", strike, heston, bs);
        }
    }

    #[test]
    fn test_formulations_agree() {
        let original = HestonPricer::default();
        let little_trap = HestonPricer::new(PricerConfig {
            formulation: CharacteristicFormulation::LittleTrap,
            ..Default::default()
        });
        let params = HestonParams::typical_equity();

        for strike in [85.0, 100.0, 115.0] {
            let a = original.call_price(100.0, strike, 0.5, 0.03, 0.0, &params).unwrap();
            let b = little_trap.call_price(100.0, strike, 0.5, 0.03, 0.0, &params).unwrap();
            assert!((a - b).abs() < 1e-4, "K={}: {} vs {}", strike, a, b);
        }
    }

    #[test]
    fn test_original_formulation_breaks_for_long_high_vol_of_vol() {
        let original = HestonPricer::default();
        let little_trap = HestonPricer::new(PricerConfig {
            formulation: CharacteristicFormulation::LittleTrap,
            ..Default::default()
        });
        let params = HestonParams::new(0.5, 0.04, 0.9, -0.9, 0.04);

        let stable = little_trap.call_price(100.0, 100.0, 3.0, 0.0, 0.0, &params).unwrap();
        assert!(stable > 5.0 && stable < 100.0, "little trap {}", stable);

        // Either a silently wrong price or a quadrature failure
        let unstable = original.call_price(100.0, 100.0, 3.0, 0.0, 0.0, &params);
        assert!(
            unstable.as_ref().map_or(true, |p| (p - stable).abs() > 1.0),
            "original {:?} vs little trap {}",
            unstable,
            stable
        );
    }

    #[test]
    fn test_put_call_parity_and_bounds() {
        let pricer = HestonPricer::default();
        let params = HestonParams::typical_equity();
        let (spot, strike, time, rate, div) = (100.0, 95.0, 0.75, 0.04, 0.01);

        let call = pricer.price(spot, strike, time, rate, div, &params, OptionType::Call).unwrap();
        let put = pricer.price(spot, strike, time, rate, div, &params, OptionType::Put).unwrap();

        assert!(call > spot * (-div * time).exp() - strike * (-rate * time).exp());
        assert!(call < spot);
        assert!(put > 0.0);
    }

    #[test]
    fn test_negative_rho_gives_downside_skew() {
        let pricer = HestonPricer::default();
        let params = HestonParams::typical_equity();
        let (spot, time, rate) = (100.0, 0.5, 0.03);

        let iv_at = |strike: f64| {
            let price = pricer.call_price(spot, strike, time, rate, 0.0, &params).unwrap();
            black_scholes::implied_volatility(price, spot, strike, time, rate, 0.0, OptionType::Call).unwrap()
        };

        assert!(iv_at(85.0) > iv_at(115.0));
    }

    #[test]
    fn test_quadrature_failure_propagates() {
        let pricer = HestonPricer::new(PricerConfig {
            quadrature: QuadratureConfig {
                tolerance: 1e-15,
                max_subdivisions: 2,
                ..Default::default()
            },
            ..Default::default()
        });
        let result = pricer.call_price(100.0, 100.0, 0.5, 0.05, 0.0, &HestonParams::typical_equity());
        assert!(matches!(result, Err(ExposureError::Pricing(_))));
    }

    #[test]
    fn test_heston_gamma_near_black_scholes() {
        let pricer = precise_pricer();
        let params = near_bs_params(0.2);

        let heston_gamma = pricer
            .heston_greek(HestonGreek::Gamma, 100.0, 100.0, 0.5, 0.05, 0.0, &params, 1e-3)
            .unwrap();
        let bs_gamma = black_scholes::gamma(&MarketInputs::new(100.0, 100.0, 0.5, 0.05, 0.0, 0.2));

        assert!((heston_gamma - bs_gamma).abs() / bs_gamma < 0.05);
    }

    #[test]
    fn test_heston_greek_signs() {
        let pricer = precise_pricer();
        let params = HestonParams::typical_equity();

        let vega = pricer
            .heston_greek(HestonGreek::Vega, 100.0, 100.0, 0.5, 0.05, 0.0, &params, 1e-3)
            .unwrap();
        assert!(vega > 0.0);

        // Call value grows with maturity
        let charm = pricer
            .heston_greek(HestonGreek::Charm, 100.0, 100.0, 0.5, 0.05, 0.0, &params, 1e-3)
            .unwrap();
        assert!(charm > 0.0);

        let vanna = pricer
            .heston_greek(HestonGreek::Vanna, 100.0, 100.0, 0.5, 0.05, 0.0, &params, 1e-2)
            .unwrap();
        assert!(vanna.is_finite());
    }

    #[test]
    fn test_greek_by_name() {
        let pricer = HestonPricer::default();
        let greek: HestonGreek = "GAMMA".parse().unwrap();
        assert_eq!(greek, HestonGreek::Gamma);
        assert!("rho".parse::<HestonGreek>().is_err());
        assert!(pricer
            .heston_greek(greek, 100.0, 100.0, 0.5, 0.05, 0.0, &HestonParams::typical_equity(), 0.0)
            .is_err());
    }

    #[test]
    fn test_probability_index() {
        assert_eq!(HestonProbability::from_index(1).unwrap(), HestonProbability::P1);
        assert_eq!(HestonProbability::from_index(2).unwrap(), HestonProbability::P2);
        assert!(HestonProbability::from_index(3).is_err());
    }
}
