//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `peaks`: 递归寻峰 + Scherrer 分析（单文件或批量目录）
//! - `peak`: 单窗口峰形拟合
//! - `lines`: Kα/Kβ 发射线位置
//! - `ratio`: 两区间强度比
//! - `preprocess`: 平滑 / 背景扣除后导出
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: options, peaks, inspect, preprocess

pub mod inspect;
pub mod options;
pub mod peaks;
pub mod preprocess;

use clap::{Parser, Subcommand};

/// xrdscan - 粉末 XRD 寻峰与 Scherrer 晶粒尺寸分析
#[derive(Parser)]
#[command(name = "xrdscan")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Powder XRD peak search and Scherrer crystallite-size analysis", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Find all peaks and compute Scherrer widths (file or directory)
    Peaks(peaks::PeaksArgs),

    /// Fit a single peak inside a 2θ window
    Peak(inspect::PeakArgs),

    /// Locate the Kα line and the matching Kβ position
    Lines(inspect::LinesArgs),

    /// Intensity ratio between the maxima of two 2θ windows
    Ratio(inspect::RatioArgs),

    /// Smooth and/or subtract background, then export the pattern
    Preprocess(preprocess::PreprocessArgs),
}
