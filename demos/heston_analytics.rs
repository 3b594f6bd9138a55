//! Example: Heston calibration, Greeks, paths and implied smile
//!
//! Run with: cargo run --example heston_analytics

use options_exposure::prelude::*;

/// Chain whose call quotes come from a skewed Black-Scholes smile
fn sample_chain(spot: f64, time: f64, rate: f64, div: f64) -> OptionChain {
    let mut chain = OptionChain::new();
    for i in 0..13 {
        let strike = 440.0 + 10.0 * i as f64;
        let moneyness = (strike / spot).ln();
        let iv = 0.20 - 0.35 * moneyness + 0.8 * moneyness * moneyness;

        let inputs = MarketInputs::new(spot, strike, time, rate, div, iv);
        let call = black_scholes::price(&inputs, OptionType::Call);
        let put = black_scholes::price(&inputs, OptionType::Put);

        chain.upsert(OptionChainRow::new(
            strike,
            SideQuote::new(1_000.0, iv).with_quotes(call * 0.995, call * 1.005),
            SideQuote::new(1_000.0, iv).with_quotes(put * 0.995, put * 1.005),
        ));
    }
    chain
}

fn main() -> ExposureResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = EngineConfig::default();
    let pricer = HestonPricer::new(config.pricer);
    let spot = 500.0;
    let time = 0.25;
    let rate = config.exposure.risk_free_rate;
    let div = config.exposure.dividend_yield;

    let chain = sample_chain(spot, time, rate, div);

    println!("=== Heston Calibration ===\n");
    let target = CalibrationTarget::from_chain(&chain, spot, time, rate, div)?;
    println!("Quotes:   {}", target.valid_points().len());
    println!("v0:       {:.4} (vol {:.2}%)", target.v0, target.v0.sqrt() * 100.0);

    let result = calibrate_heston(&target, &config.calibration, &pricer)?;
    let params = result.params;
    println!("kappa:    {:.4}", params.kappa);
    println!("theta:    {:.4}", params.theta);
    println!("sigma_v:  {:.4}", params.sigma_v);
    println!("rho:      {:.4}", params.rho);
    println!("Feller:   {}", if params.feller_condition() { "satisfied" } else { "violated" });
    println!(
        "Status:   {} after {} iterations (objective {:.3e})",
        result.message, result.iterations, result.objective
    );

    println!("\n=== Heston vs Market (calls) ===\n");
    for (strike, market) in target.valid_points() {
        let model = pricer.call_price(spot, strike, time, rate, div, &params)?;
        println!("{:>7.1}  market {:>8.4}  model {:>8.4}", strike, market, model);
    }

    println!("\n=== Heston Greeks (ATM) ===\n");
    for greek in HestonGreek::ALL {
        let value = pricer.heston_greek(greek, spot, spot, time, rate, div, &params, DEFAULT_GREEK_BUMP)?;
        println!("{:<6} {:>12.6}", greek.name(), value);
    }

    println!("\n=== Simulated Paths ===\n");
    let sim = SimulationConfig {
        n_paths: 500,
        seed: Some(7),
        ..config.simulation
    };
    let paths = simulate_heston_paths(spot, time, rate, div, &params, &sim)?;
    if let Some(mean) = paths.mean_terminal_spot() {
        println!("Mean terminal spot:  ${:.2}", mean);
        println!("Forward:             ${:.2}", spot * ((rate - div) * time).exp());
    }
    if let Some(first) = paths.path(0) {
        if let Some(last) = first.last() {
            println!("Path 0 ends at ${:.2} with vol {:.2}%", last.spot, last.variance.sqrt() * 100.0);
        }
    }

    println!("\n=== Heston Implied Smile ===\n");
    let strikes = chain.strikes_near(spot, 0.5, 1.5);
    for (strike, iv) in implied_volatility_smile(spot, &strikes, time, rate, div, &params, &pricer) {
        let market = chain.row_at(strike).and_then(|row| row.call.iv()).unwrap_or(f64::NAN);
        println!("{:>7.1}  model {:>6.2}%  market {:>6.2}%", strike, iv * 100.0, market * 100.0);
    }

    Ok(())
}
