//! # 共享参数组
//!
//! 多个子命令共用的参数，通过 `#[command(flatten)]` 嵌入。
//!
//! ## 依赖关系
//! - 被 `cli/peaks.rs`, `cli/inspect.rs`, `cli/preprocess.rs` 使用
//! - 转换为 `models::ModelParameters`, `xrd::PeakShape`

use crate::models::peak::{DEFAULT_SHAPE_FACTOR, DEFAULT_WAVELENGTH_KB};
use crate::models::ModelParameters;
use crate::xrd::fit::DEFAULT_MAX_ITERATIONS;
use crate::xrd::PeakShape;

use clap::{Args, ValueEnum};

// ─────────────────────────────────────────────────────────────
// 仪器常数
// ─────────────────────────────────────────────────────────────

/// 预定义辐射源波长 (nm)
pub fn get_predefined_wavelength(name: &str) -> Option<f64> {
    match name.to_lowercase().as_str() {
        "cu-ka" | "cuka" => Some(0.15418),
        "cu-ka1" | "cuka1" => Some(0.15406),
        "cu-ka2" | "cuka2" => Some(0.15444),
        "cu-kb1" | "cukb1" => Some(0.13922),
        "mo-ka" | "moka" => Some(0.07107),
        "mo-ka1" | "moka1" => Some(0.07093),
        "co-ka" | "coka" => Some(0.17903),
        "fe-ka" | "feka" => Some(0.19373),
        "cr-ka" | "crka" => Some(0.22910),
        "ag-ka" | "agka" => Some(0.05609),
        _ => None,
    }
}

/// 解析波长输入（辐射源名称或 nm 数值）
pub fn parse_wavelength(input: &str) -> Result<f64, String> {
    if let Some(wl) = get_predefined_wavelength(input) {
        return Ok(wl);
    }
    match input.parse::<f64>() {
        Ok(wl) if wl.is_finite() && wl > 0.0 => Ok(wl),
        _ => Err(format!(
            "Invalid wavelength '{}'. Use a number in nm (e.g., 0.15406) or a name: cu-ka, cu-ka1, mo-ka, co-ka, fe-ka, cr-ka, ag-ka",
            input
        )),
    }
}

/// 仪器与物理常数参数
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Kα wavelength in nm, or a source name (cu-ka, cu-ka1, mo-ka, co-ka, fe-ka, cr-ka, ag-ka)
    #[arg(short, long, env = "XRDSCAN_WAVELENGTH", default_value = "cu-ka1")]
    pub wavelength: String,

    /// Kβ wavelength in nm, or a source name
    #[arg(long, default_value_t = DEFAULT_WAVELENGTH_KB.to_string())]
    pub wavelength_kb: String,

    /// Dimensionless Scherrer shape factor K
    #[arg(short = 'k', long, env = "XRDSCAN_SHAPE_FACTOR", default_value_t = DEFAULT_SHAPE_FACTOR)]
    pub shape_factor: f64,
}

impl ModelArgs {
    /// 转换为模型参数
    pub fn to_params(&self) -> Result<ModelParameters, String> {
        if !self.shape_factor.is_finite() || self.shape_factor <= 0.0 {
            return Err(format!("Shape factor must be positive, got {}", self.shape_factor));
        }
        Ok(ModelParameters {
            shape_factor: self.shape_factor,
            wavelength_ka: parse_wavelength(&self.wavelength)?,
            wavelength_kb: parse_wavelength(&self.wavelength_kb)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────
// 拟合参数
// ─────────────────────────────────────────────────────────────

/// 峰形模型
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum ShapeArg {
    /// Gaussian (default)
    #[default]
    Gaussian,
    /// Lorentzian (Cauchy)
    Lorentzian,
    /// Pseudo-Voigt (50% Gaussian + 50% Lorentzian)
    PseudoVoigt,
}

impl From<ShapeArg> for PeakShape {
    fn from(arg: ShapeArg) -> Self {
        match arg {
            ShapeArg::Gaussian => PeakShape::Gaussian,
            ShapeArg::Lorentzian => PeakShape::Lorentzian,
            ShapeArg::PseudoVoigt => PeakShape::PseudoVoigt,
        }
    }
}

/// 峰形拟合参数
#[derive(Args, Debug, Clone)]
pub struct FitArgs {
    /// Peak shape model
    #[arg(long, value_enum, default_value_t = ShapeArg::Gaussian)]
    pub shape: ShapeArg,

    /// Maximum Levenberg-Marquardt iterations per peak
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: usize,
}

// ─────────────────────────────────────────────────────────────
// 预处理参数
// ─────────────────────────────────────────────────────────────

/// 平滑与背景扣除参数
#[derive(Args, Debug, Clone, Default)]
pub struct PreprocessOptions {
    /// Apply an n-point moving average before analysis
    #[arg(long)]
    pub smooth: Option<usize>,

    /// Subtract background with the window-difference rule at this tolerance
    #[arg(long, conflicts_with = "background_points")]
    pub backsub: Option<f64>,

    /// Subtract a piecewise-linear background through anchor points (e.g., '10:120,40:80,80:60')
    #[arg(long)]
    pub background_points: Option<String>,
}

impl PreprocessOptions {
    /// 是否需要任何预处理
    pub fn is_empty(&self) -> bool {
        self.smooth.is_none() && self.backsub.is_none() && self.background_points.is_none()
    }
}
