//! # XRD 分析模块
//!
//! 粉末衍射曲线的寻峰、峰形拟合与 Scherrer 峰宽分析。
//!
//! ## 子模块
//! - `maximum`: 区间最大值查找
//! - `shape`: 峰形模型（Gaussian / Lorentzian / Pseudo-Voigt）
//! - `fit`: Levenberg–Marquardt 峰形拟合
//! - `width`: FWHM、Scherrer 宽度与排除窗口
//! - `search`: 递归寻峰
//! - `background`: 平滑与背景扣除
//! - `lines`: Bragg d 值、发射线与强度比
//! - `export`: 数据导出
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `models/` 的 Signal 与峰数据结构

pub mod background;
pub mod export;
pub mod fit;
pub mod lines;
pub mod maximum;
pub mod search;
pub mod shape;
pub mod width;

#[cfg(test)]
pub(crate) mod synthetic;

pub use background::{moving_average, BackgroundSubtractor, ForwardDifference, InterpolatedBackground};
pub use fit::{fit_peak, FitOptions, PeakFit};
pub use search::{SearchLimits, SearchOptions};
pub use shape::PeakShape;
