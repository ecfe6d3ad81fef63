//! # 峰宽分析
//!
//! 由拟合峰计算 FWHM、Scherrer 宽度以及递归搜索的排除窗口。
//!
//! ## 公式
//! - FWHM_deg = σ · 2√(2 ln 2)，FWHM_rad = FWHM_deg · π/180
//! - τ = K · λ / (FWHM_rad · cos θ)，θ = 峰位 2θ 的一半（弧度）
//! - HWMIN = σ · √(2 ln 50)，排除窗口 [μ - HWMIN, μ + HWMIN]
//!
//! ## 依赖关系
//! - 被 `xrd/search.rs` 与 `commands/inspect.rs` 调用
//! - 使用 `models/peak.rs` 的 FittedPeak, ModelParameters, ScherrerRecord

use crate::error::{Result, XrdScanError};
use crate::models::{FittedPeak, ModelParameters, ScherrerRecord};
use crate::xrd::maximum::LocalMaximum;

/// cos θ 低于该值（2θ 接近 180°）时视为数值不稳定
pub const MIN_COS_THETA: f64 = 1e-6;

/// 峰宽分析结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidthAnalysis {
    /// 半高全宽（度）
    pub fwhm_deg: f64,
    /// 半高全宽（弧度）
    pub fwhm_rad: f64,
    /// 峰值 1/50 处半宽（度）
    pub half_width_minimum: f64,
    /// Scherrer 结果
    pub record: ScherrerRecord,
    /// 排除窗口 [μ - HWMIN, μ + HWMIN]
    pub exclusion: (f64, f64),
}

/// Scherrer 方程 τ = Kλ / (β cos θ)
///
/// `fwhm_rad` 为弧度制峰宽 β，`theta` 为半衍射角（弧度）。
pub fn scherrer(shape_factor: f64, wavelength: f64, fwhm_rad: f64, theta: f64) -> Result<f64> {
    if !fwhm_rad.is_finite() || fwhm_rad <= 0.0 {
        return Err(XrdScanError::NumericInstability {
            quantity: "FWHM".to_string(),
            value: fwhm_rad,
        });
    }

    let cos_theta = theta.cos();
    if cos_theta.abs() < MIN_COS_THETA {
        return Err(XrdScanError::NumericInstability {
            quantity: "cos(theta)".to_string(),
            value: cos_theta,
        });
    }

    let tau = shape_factor * wavelength / (fwhm_rad * cos_theta);
    if !tau.is_finite() {
        return Err(XrdScanError::NumericInstability {
            quantity: "Scherrer width".to_string(),
            value: tau,
        });
    }
    Ok(tau)
}

/// 计算峰宽与 Scherrer 宽度
///
/// `apex` 为拟合窗口内的实测最大样本，作为记录的峰位与强度，
/// 同时用于求 θ。
pub fn compute_width(
    peak: &FittedPeak,
    apex: &LocalMaximum,
    params: &ModelParameters,
) -> Result<WidthAnalysis> {
    let fwhm_deg = peak.fwhm_deg();
    let fwhm_rad = peak.fwhm_rad();
    let half_width_minimum = peak.half_width_minimum();

    let theta = (apex.x / 2.0).to_radians();
    let scherrer_width = scherrer(params.shape_factor, params.wavelength_ka, fwhm_rad, theta)?;

    Ok(WidthAnalysis {
        fwhm_deg,
        fwhm_rad,
        half_width_minimum,
        record: ScherrerRecord {
            center_x: apex.x,
            peak_intensity: apex.y,
            scherrer_width,
        },
        exclusion: exclusion_window(peak),
    })
}

/// 排除窗口 [μ - HWMIN, μ + HWMIN]
pub fn exclusion_window(peak: &FittedPeak) -> (f64, f64) {
    let hw = peak.half_width_minimum();
    (peak.center - hw, peak.center + hw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xrd::shape::PeakShape;
    use approx::assert_relative_eq;

    fn peak(center: f64, sigma: f64) -> FittedPeak {
        FittedPeak {
            shape: PeakShape::Gaussian,
            y_offset: 0.0,
            amplitude: 100.0,
            center,
            sigma,
        }
    }

    fn apex(x: f64) -> LocalMaximum {
        LocalMaximum { index: 0, x, y: 250.0 }
    }

    #[test]
    fn test_scherrer_typical() {
        let tau = scherrer(0.9, 1.54, 0.01, std::f64::consts::FRAC_PI_4).unwrap();
        assert!(10.0 < tau && tau < 1000.0);
        assert_relative_eq!(tau, 0.9 * 1.54 / (0.01 * std::f64::consts::FRAC_PI_4.cos()));
    }

    #[test]
    fn test_compute_width_values() {
        let p = peak(30.0, 0.2);
        let a = compute_width(&p, &apex(30.02), &ModelParameters::default()).unwrap();

        let fwhm = 0.2 * 2.0 * (2.0 * 2f64.ln()).sqrt();
        assert_relative_eq!(a.fwhm_deg, fwhm, epsilon = 1e-12);
        assert_relative_eq!(a.fwhm_rad, fwhm * std::f64::consts::PI / 180.0, epsilon = 1e-12);

        let theta = (30.02f64 / 2.0).to_radians();
        let expected = 0.9 * 0.15406 / (a.fwhm_rad * theta.cos());
        assert_relative_eq!(a.record.scherrer_width, expected, epsilon = 1e-12);
        assert_eq!(a.record.center_x, 30.02);
        assert_eq!(a.record.peak_intensity, 250.0);

        let hw = 0.2 * (2.0 * 50f64.ln()).sqrt();
        assert_relative_eq!(a.exclusion.0, 30.0 - hw);
        assert_relative_eq!(a.exclusion.1, 30.0 + hw);
    }

    #[test]
    fn test_width_positive() {
        for &(c, s) in &[(15.0, 0.3), (40.0, 0.8), (120.0, 0.05)] {
            let a = compute_width(&peak(c, s), &apex(c), &ModelParameters::default()).unwrap();
            assert!(a.record.scherrer_width > 0.0);
        }
    }

    #[test]
    fn test_near_180_is_unstable() {
        let err = compute_width(&peak(180.0, 0.2), &apex(180.0), &ModelParameters::default());
        assert!(matches!(err, Err(XrdScanError::NumericInstability { .. })));
    }

    #[test]
    fn test_zero_width_is_unstable() {
        let err = scherrer(0.9, 0.15406, 0.0, 0.3);
        assert!(matches!(err, Err(XrdScanError::NumericInstability { .. })));
    }
}
