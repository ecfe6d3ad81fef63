//! # 峰形模型
//!
//! 四参数峰形函数 (y0, a, center, width) 及其解析偏导数。
//!
//! ## 模型
//! - Gaussian: `y0 + a/(σ√(2π)) · exp(-(x-μ)²/(2σ²))`
//! - Lorentzian: `y0 + (a/π) · γ/((x-μ)² + γ²)`
//! - Pseudo-Voigt: `y0 + a · (0.5·G_σ + 0.5·L_γ)`，其中 `γ = σ√(2 ln 2)`，
//!   两个分量共享同一个 FWHM
//!
//! 振幅 a 均为峰面积（扣除基线后），因此 (a, width) 同时取反时模型不变。
//!
//! ## 依赖关系
//! - 被 `xrd/fit.rs` 用于最小二乘拟合
//! - 被 `models/peak.rs` 用于计算 FWHM 和 HWMIN

use std::f64::consts::{LN_2, PI};

/// σ → FWHM 换算系数 2√(2 ln 2)
pub const GAUSSIAN_FWHM_FACTOR: f64 = 2.354_820_045_030_949;

/// Pseudo-Voigt 中 Lorentzian 分量所占比例
const PSEUDO_VOIGT_ETA: f64 = 0.5;

/// 峰形类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeakShape {
    #[default]
    Gaussian,
    Lorentzian,
    PseudoVoigt,
}

impl std::fmt::Display for PeakShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeakShape::Gaussian => write!(f, "gaussian"),
            PeakShape::Lorentzian => write!(f, "lorentzian"),
            PeakShape::PseudoVoigt => write!(f, "pseudo-voigt"),
        }
    }
}

impl PeakShape {
    /// 模型取值，`p = [y0, a, center, width]`
    pub fn evaluate(&self, x: f64, p: &[f64; 4]) -> f64 {
        self.evaluate_with_gradient(x, p).0
    }

    /// 模型取值及对四个参数的偏导数
    pub fn evaluate_with_gradient(&self, x: f64, p: &[f64; 4]) -> (f64, [f64; 4]) {
        let [y0, a, mu, w] = *p;
        match self {
            PeakShape::Gaussian => {
                let (g, dg) = gaussian(x, a, mu, w);
                (y0 + g, [1.0, dg[0], dg[1], dg[2]])
            }
            PeakShape::Lorentzian => {
                let (l, dl) = lorentzian(x, a, mu, w);
                (y0 + l, [1.0, dl[0], dl[1], dl[2]])
            }
            PeakShape::PseudoVoigt => {
                let k = lorentz_per_sigma();
                let (g, dg) = gaussian(x, a, mu, w);
                let (l, dl) = lorentzian(x, a, mu, k * w);
                let eta = PSEUDO_VOIGT_ETA;
                (
                    y0 + (1.0 - eta) * g + eta * l,
                    [
                        1.0,
                        (1.0 - eta) * dg[0] + eta * dl[0],
                        (1.0 - eta) * dg[1] + eta * dl[1],
                        (1.0 - eta) * dg[2] + eta * k * dl[2],
                    ],
                )
            }
        }
    }

    /// 由宽度参数换算 FWHM（与 x 同单位）
    pub fn fwhm(&self, width: f64) -> f64 {
        match self {
            PeakShape::Gaussian | PeakShape::PseudoVoigt => width * GAUSSIAN_FWHM_FACTOR,
            PeakShape::Lorentzian => 2.0 * width,
        }
    }

    /// 峰值降至 1/50 处距中心的距离
    ///
    /// Pseudo-Voigt 取 Lorentzian 分量的值：其拖尾衰减最慢，是混合峰的上界。
    pub fn half_width_minimum(&self, width: f64) -> f64 {
        match self {
            PeakShape::Gaussian => width * (2.0 * 50f64.ln()).sqrt(),
            PeakShape::Lorentzian => 7.0 * width,
            PeakShape::PseudoVoigt => 7.0 * lorentz_per_sigma() * width,
        }
    }
}

/// Pseudo-Voigt 中 γ/σ，使两分量 FWHM 相同
fn lorentz_per_sigma() -> f64 {
    (2.0 * LN_2).sqrt()
}

/// 面积归一 Gaussian 及对 (a, μ, σ) 的偏导
fn gaussian(x: f64, a: f64, mu: f64, sigma: f64) -> (f64, [f64; 3]) {
    let u = x - mu;
    let s2 = sigma * sigma;
    let e = (-u * u / (2.0 * s2)).exp();
    let norm = 1.0 / (sigma * (2.0 * PI).sqrt());
    let g = a * norm * e;
    (
        g,
        [norm * e, g * u / s2, g * (u * u / (s2 * sigma) - 1.0 / sigma)],
    )
}

/// 面积归一 Lorentzian 及对 (a, μ, γ) 的偏导
fn lorentzian(x: f64, a: f64, mu: f64, gamma: f64) -> (f64, [f64; 3]) {
    let u = x - mu;
    let d = u * u + gamma * gamma;
    let c = a / PI;
    (
        c * gamma / d,
        [
            gamma / (PI * d),
            c * gamma * 2.0 * u / (d * d),
            c * (u * u - gamma * gamma) / (d * d),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SHAPES: [PeakShape; 3] = [
        PeakShape::Gaussian,
        PeakShape::Lorentzian,
        PeakShape::PseudoVoigt,
    ];

    #[test]
    fn test_gradient_matches_finite_difference() {
        let p = [3.0, 120.0, 25.0, 0.7];
        for shape in SHAPES {
            for &x in &[23.9, 24.6, 25.0, 25.8] {
                let (_, grad) = shape.evaluate_with_gradient(x, &p);
                for k in 0..4 {
                    let h = 1e-6 * p[k].abs().max(1.0);
                    let mut hi = p;
                    let mut lo = p;
                    hi[k] += h;
                    lo[k] -= h;
                    let numeric = (shape.evaluate(x, &hi) - shape.evaluate(x, &lo)) / (2.0 * h);
                    assert_relative_eq!(grad[k], numeric, epsilon = 1e-5, max_relative = 1e-5);
                }
            }
        }
    }

    #[test]
    fn test_fwhm_is_half_height() {
        let p = [0.0, 10.0, 40.0, 0.4];
        for shape in SHAPES {
            let peak = shape.evaluate(40.0, &p);
            let half = shape.evaluate(40.0 + shape.fwhm(p[3]) / 2.0, &p);
            assert_relative_eq!(half, peak / 2.0, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_half_width_minimum_bounds_tail() {
        let p = [0.0, 10.0, 40.0, 0.4];
        for shape in SHAPES {
            let peak = shape.evaluate(40.0, &p);
            let tail = shape.evaluate(40.0 + shape.half_width_minimum(p[3]), &p);
            assert!(tail <= peak / 50.0 * (1.0 + 1e-9), "{} tail too high", shape);
        }
        let g = PeakShape::Gaussian;
        let tail = g.evaluate(40.0 + g.half_width_minimum(0.4), &p);
        assert_relative_eq!(tail, g.evaluate(40.0, &p) / 50.0, max_relative = 1e-9);
    }

    #[test]
    fn test_sign_flip_invariance() {
        let p = [1.0, 50.0, 12.0, 0.3];
        let q = [1.0, -50.0, 12.0, -0.3];
        for shape in SHAPES {
            assert_relative_eq!(shape.evaluate(12.2, &p), shape.evaluate(12.2, &q), epsilon = 1e-12);
        }
    }
}
