//! Adaptive Gauss-Kronrod quadrature
//!
//! Globally adaptive 7/15-point Gauss-Kronrod integration: the interval with
//! the largest error estimate is bisected until the total estimate meets the
//! tolerance or the subdivision limit is hit. Hitting the limit is an error,
//! never a silently truncated result.

use crate::config::QuadratureConfig;
use crate::core::{ExposureError, ExposureResult};

/// Kronrod abscissae on [-1, 1] (positive half, descending); the last is the center
const XGK: [f64; 8] = [
    0.991_455_371_120_812_639_206_854_697_526_329,
    0.949_107_912_342_758_524_526_189_684_047_851,
    0.864_864_423_359_769_072_789_712_788_640_926,
    0.741_531_185_599_394_439_863_864_773_280_788,
    0.586_087_235_467_691_130_294_144_845_693_013,
    0.405_845_151_377_397_166_906_606_412_076_961,
    0.207_784_955_007_898_467_600_689_403_773_245,
    0.0,
];

/// Kronrod weights matching `XGK`
const WGK: [f64; 8] = [
    0.022_935_322_010_529_224_963_732_008_058_970,
    0.063_092_092_629_978_553_290_700_663_189_204,
    0.104_790_010_322_250_183_839_876_322_541_518,
    0.140_653_259_715_525_918_745_189_590_510_238,
    0.169_004_726_639_267_902_826_583_426_598_550,
    0.190_350_578_064_785_409_913_256_402_421_014,
    0.204_432_940_075_298_892_414_161_999_234_649,
    0.209_482_141_084_727_828_012_999_174_891_714,
];

/// 7-point Gauss weights at XGK[1], XGK[3], XGK[5] and the center
const WG: [f64; 4] = [
    0.129_484_966_168_869_693_270_611_432_679_082,
    0.279_705_391_489_276_667_901_467_771_423_780,
    0.381_830_050_505_118_944_950_369_775_488_975,
    0.417_959_183_673_469_387_755_102_040_816_327,
];

/// Integration result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadratureResult {
    /// Integral estimate
    pub value: f64,
    /// Estimated absolute error
    pub error: f64,
    /// Number of intervals in the final partition
    pub intervals: usize,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    a: f64,
    b: f64,
    value: f64,
    error: f64,
}

/// Single 15-point Kronrod rule with embedded 7-point Gauss error estimate
fn gauss_kronrod_15<F>(f: &F, a: f64, b: f64) -> Segment
where
    F: Fn(f64) -> f64,
{
    let center = 0.5 * (a + b);
    let half = 0.5 * (b - a);

    let fc = f(center);
    let mut kronrod = fc * WGK[7];
    let mut gauss = fc * WG[3];

    for j in 0..7 {
        let dx = half * XGK[j];
        let pair = f(center - dx) + f(center + dx);
        kronrod += WGK[j] * pair;
        if j % 2 == 1 {
            gauss += WG[j / 2] * pair;
        }
    }

    Segment {
        a,
        b,
        value: kronrod * half,
        error: ((kronrod - gauss) * half).abs(),
    }
}

/// Integrate `f` over [a, b] to within `config.tolerance` (absolute or
/// relative, whichever is looser).
///
/// Fails with `ExposureError::Numerical` if the integrand produces a
/// non-finite value or if `config.max_subdivisions` intervals are not enough.
pub fn integrate<F>(f: F, a: f64, b: f64, config: &QuadratureConfig) -> ExposureResult<QuadratureResult>
where
    F: Fn(f64) -> f64,
{
    if !(a.is_finite() && b.is_finite()) {
        return Err(ExposureError::invalid_input("integration bounds must be finite"));
    }
    if a == b {
        return Ok(QuadratureResult { value: 0.0, error: 0.0, intervals: 0 });
    }

    let limit = config.max_subdivisions.max(1);
    let tol = config.tolerance.max(f64::EPSILON);

    let mut segments = vec![gauss_kronrod_15(&f, a, b)];

    loop {
        let value: f64 = segments.iter().map(|s| s.value).sum();
        let error: f64 = segments.iter().map(|s| s.error).sum();

        if !value.is_finite() || !error.is_finite() {
            return Err(ExposureError::numerical(
                "integrand returned a non-finite value",
            ));
        }

        if error <= tol.max(tol * value.abs()) {
            return Ok(QuadratureResult {
                value,
                error,
                intervals: segments.len(),
            });
        }

        if segments.len() >= limit {
            return Err(ExposureError::numerical(format!(
                "quadrature did not converge within {} subdivisions (estimated error {:.3e})",
                limit, error
            )));
        }

        let worst = segments
            .iter()
            .enumerate()
            .max_by(|(_, x), (_, y)| x.error.total_cmp(&y.error))
            .map(|(idx, _)| idx)
            .unwrap_or(0);

        let seg = segments.swap_remove(worst);
        let mid = 0.5 * (seg.a + seg.b);
        segments.push(gauss_kronrod_15(&f, seg.a, mid));
        segments.push(gauss_kronrod_15(&f, mid, seg.b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polynomial_exact() {
        let config = QuadratureConfig::default();
        let result = integrate(|x| 3.0 * x * x + 2.0 * x + 1.0, 0.0, 2.0, &config).unwrap();
        assert!((result.value - 14.0).abs() < 1e-12);
        assert_eq!(result.intervals, 1);
    }

    #[test]
    fn test_oscillatory_needs_subdivision() {
        let config = QuadratureConfig {
            tolerance: 1e-10,
            max_subdivisions: 1000,
            ..Default::default()
        };
        let result = integrate(|x: f64| (10.0 * x).sin() * (-0.1 * x).exp(), 0.0, 20.0, &config).unwrap();

        // ∫ e^{-ax} sin(bx) dx from 0..L = [b - e^{-aL}(a sin(bL) + b cos(bL))] / (a² + b²)
        let (a, b, l) = (0.1_f64, 10.0_f64, 20.0_f64);
        let exact = (b - (-a * l).exp() * (a * (b * l).sin() + b * (b * l).cos())) / (a * a + b * b);

        assert!((result.value - exact).abs() < 1e-8);
        assert!(result.intervals > 1);
    }

    #[test]
    fn test_subdivision_limit_is_error() {
        let config = QuadratureConfig {
            tolerance: 1e-14,
            max_subdivisions: 3,
            ..Default::default()
        };
        let result = integrate(|x: f64| (50.0 * x).sin(), 0.0, 100.0, &config);
        assert!(matches!(result, Err(ExposureError::Numerical(_))));
    }

    #[test]
    fn test_non_finite_integrand_is_error() {
        let config = QuadratureConfig::default();
        let result = integrate(|_| f64::NAN, 0.0, 1.0, &config);
        assert!(result.is_err());
    }
}
