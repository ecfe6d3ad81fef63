//! # 谱线工具
//!
//! Bragg 晶面间距、Kα/Kβ 发射线位置与两区间的强度比。
//!
//! ## 公式
//! - d = λ / (2 sin θ)
//! - 2θ(Kβ) = 2·asin((λKβ / λKα)·sin θ(Kα))
//!
//! ## 依赖关系
//! - 被 `commands/peaks.rs`, `commands/inspect.rs` 调用
//! - 使用 `xrd/maximum.rs`

use crate::error::{Result, XrdScanError};
use crate::models::{ModelParameters, Signal};
use crate::xrd::maximum::{self, LocalMaximum};

/// 低于该 2θ（度）时 d 视为无穷大
pub const MIN_BRAGG_TWO_THETA: f64 = 5.0;

/// Bragg 晶面间距，与波长同单位
pub fn bragg_d_spacing(two_theta: f64, wavelength: f64) -> f64 {
    if two_theta < MIN_BRAGG_TWO_THETA {
        return f64::INFINITY;
    }
    let theta = (two_theta / 2.0).to_radians();
    wavelength / (2.0 * theta.sin())
}

/// 发射线位置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionLines {
    /// Kα 峰（区间内最大样本）
    pub ka: LocalMaximum,
    /// Kβ 峰位 2θ（度）
    pub kb_two_theta: f64,
}

impl EmissionLines {
    /// Kα 与 Kβ 的中点
    pub fn midpoint(&self) -> f64 {
        (self.ka.x + self.kb_two_theta) / 2.0
    }
}

/// 由 Kα 区间内的最大值推算 Kβ 位置
pub fn emission_line(
    signal: &Signal,
    ka_range: (f64, f64),
    params: &ModelParameters,
) -> Result<EmissionLines> {
    let ka = maximum::find_peak_in_range(signal, ka_range.0, ka_range.1)?;

    let theta_ka = (ka.x / 2.0).to_radians();
    let ratio = params.wavelength_kb / params.wavelength_ka;
    let sin_kb = ratio * theta_ka.sin();
    if !sin_kb.is_finite() || sin_kb.abs() > 1.0 {
        return Err(XrdScanError::NumericInstability {
            quantity: "sin(theta Kb)".to_string(),
            value: sin_kb,
        });
    }

    Ok(EmissionLines {
        ka,
        kb_two_theta: 2.0 * sin_kb.asin().to_degrees(),
    })
}

/// 两区间最大强度之比 max(r2) / max(r1)
pub fn intensity_ratio(signal: &Signal, first: (f64, f64), second: (f64, f64)) -> Result<f64> {
    let a = maximum::find_peak_in_range(signal, first.0, first.1)?;
    let b = maximum::find_peak_in_range(signal, second.0, second.1)?;
    if a.y == 0.0 {
        return Err(XrdScanError::NumericInstability {
            quantity: "intensity ratio denominator".to_string(),
            value: a.y,
        });
    }
    Ok(b.y / a.y)
}
