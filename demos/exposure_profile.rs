//! Example: Dealer exposures and the gamma flip for a sample chain
//!
//! Run with: cargo run --example exposure_profile

use options_exposure::prelude::*;

fn sample_chain() -> OptionChain {
    // (strike, call OI, call IV, put OI, put IV)
    let rows = [
        (480.0, 1_200.0, 0.27, 9_500.0, 0.29),
        (490.0, 2_800.0, 0.24, 8_100.0, 0.26),
        (495.0, 4_300.0, 0.22, 6_900.0, 0.24),
        (500.0, 9_800.0, 0.20, 7_400.0, 0.21),
        (505.0, 8_700.0, 0.19, 3_100.0, 0.20),
        (510.0, 7_600.0, 18.5, 1_800.0, 19.5),
        (520.0, 5_400.0, 0.18, 600.0, 0.19),
    ];

    let mut chain = OptionChain::new();
    for (strike, call_oi, call_iv, put_oi, put_iv) in rows {
        chain.upsert(OptionChainRow::new(
            strike,
            SideQuote::new(call_oi, call_iv),
            SideQuote::new(put_oi, put_iv),
        ));
    }
    chain
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = EngineConfig::default();
    let chain = sample_chain();
    let spot = 500.0;
    let time = 21.0 / 365.0;
    let rate = config.exposure.risk_free_rate;
    let div = config.exposure.dividend_yield;

    println!("=== Dealer Exposure ===\n");
    println!("Spot:     ${:.2}", spot);
    println!("Expiry:   {:.0} days", time * 365.0);
    println!("Strikes:  {}\n", chain.len());

    for greek in [ExposureGreek::Gamma, ExposureGreek::Vanna, ExposureGreek::Volga, ExposureGreek::Charm] {
        let rows = chain_exposures(&chain, spot, time, rate, div, greek);
        let summary = ExposureSummary::from_rows(greek, &rows);
        println!(
            "{:<6} total {:>10.4}B  calls {:>14.0}  puts {:>14.0}  peak strike {}",
            greek.name(),
            summary.total_billions(),
            summary.call_total,
            summary.put_total,
            summary
                .peak_strike
                .map_or_else(|| "-".to_string(), |k| format!("{:.0}", k)),
        );
    }

    println!("\n=== Gamma Exposure by Strike ===\n");
    for row in chain_exposures(&chain, spot, time, rate, div, ExposureGreek::Gamma) {
        println!("{:>7.1} {:<4} {:>16.0}", row.strike, row.side.label(), row.exposure);
    }

    println!("\n=== Gamma Flip ===\n");
    match find_zero_gamma_around(&chain, spot, time, &config.exposure) {
        Some(flip) => println!("Zero gamma:     ${:.2}", flip),
        None => println!("No sign change within ±{:.0}%", config.exposure.spot_range_pct * 100.0),
    }

    let lo = spot * (1.0 - config.exposure.spot_range_pct);
    let hi = spot * (1.0 + config.exposure.spot_range_pct);
    let profile = gamma_profile(&chain, lo, hi, config.exposure.grid_steps, time, rate, div);
    if let Some(flip) = profile.interpolated_flip() {
        println!("Interpolated:   ${:.2}", flip);
    }
    if let Some((peak_spot, peak_gamma)) = profile.peak() {
        println!("Peak |gamma|:   {:.0} at ${:.2}", peak_gamma, peak_spot);
    }
    println!("Net at spot:    {:.0}", total_gamma_at_spot(&chain, spot, time, rate, div));

    let net = net_greeks(&chain, spot, time, rate, div);
    println!("\n=== OI-Weighted Greeks (calls - puts) ===\n");
    println!("Gamma:  {:.4}", net.gamma);
    println!("Vega:   {:.4}", net.vega);
    println!("Vanna:  {:.4}", net.vanna);
    println!("Volga:  {:.4}", net.volga);
    println!("Charm:  {:.4}", net.charm);
}
