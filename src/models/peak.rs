//! # 衍射峰数据模型
//!
//! 拟合峰参数、Scherrer 结果记录以及仪器/物理常数。
//!
//! ## 依赖关系
//! - 被 `xrd/fit.rs`, `xrd/width.rs`, `xrd/search.rs`, `xrd/export.rs` 使用
//! - 使用 `xrd/shape.rs` 的 PeakShape 计算模型值与特征宽度

use crate::xrd::shape::PeakShape;
use serde::{Deserialize, Serialize};

/// Scherrer 形状因子默认值
pub const DEFAULT_SHAPE_FACTOR: f64 = 0.9;
/// Cu Kα 波长 (nm)
pub const DEFAULT_WAVELENGTH_KA: f64 = 0.15406;
/// Cu Kβ 波长 (nm)
pub const DEFAULT_WAVELENGTH_KB: f64 = 0.139;

/// 仪器/物理常数，搜索过程中只读
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// 无量纲形状因子 K
    pub shape_factor: f64,
    /// Kα 特征波长 (nm)
    pub wavelength_ka: f64,
    /// Kβ 特征波长 (nm)
    pub wavelength_kb: f64,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            shape_factor: DEFAULT_SHAPE_FACTOR,
            wavelength_ka: DEFAULT_WAVELENGTH_KA,
            wavelength_kb: DEFAULT_WAVELENGTH_KB,
        }
    }
}

/// 单个区域的拟合结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedPeak {
    /// 峰形模型
    pub shape: PeakShape,
    /// 基线偏移 y0
    pub y_offset: f64,
    /// 面积型振幅 a
    pub amplitude: f64,
    /// 峰中心（度）
    pub center: f64,
    /// 宽度参数：Gaussian/Pseudo-Voigt 为 σ，Lorentzian 为 γ
    pub sigma: f64,
}

impl FittedPeak {
    /// 参数向量 (y0, a, center, sigma)
    pub fn params(&self) -> [f64; 4] {
        [self.y_offset, self.amplitude, self.center, self.sigma]
    }

    /// 模型在 x 处的取值
    pub fn evaluate(&self, x: f64) -> f64 {
        self.shape.evaluate(x, &self.params())
    }

    /// 在给定 x 序列上生成拟合曲线（供外部绘图使用）
    pub fn curve(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.evaluate(x)).collect()
    }

    /// 半高全宽（度）
    pub fn fwhm_deg(&self) -> f64 {
        self.shape.fwhm(self.sigma)
    }

    /// 半高全宽（弧度）
    pub fn fwhm_rad(&self) -> f64 {
        self.fwhm_deg().to_radians()
    }

    /// 峰值降至 1/50 处距中心的距离 (HWMIN)
    pub fn half_width_minimum(&self) -> f64 {
        self.shape.half_width_minimum(self.sigma)
    }
}

/// Scherrer 结果记录，结果表的基本单元
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScherrerRecord {
    /// 峰位 2θ（度）
    pub center_x: f64,
    /// 峰强度
    pub peak_intensity: f64,
    /// Scherrer 宽度（与波长同单位，nm）
    pub scherrer_width: f64,
}
