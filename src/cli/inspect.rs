//! # 单峰与谱线子命令 CLI 定义
//!
//! - `peak`: 在给定窗口内拟合单个峰
//! - `lines`: Kα/Kβ 发射线
//! - `ratio`: 两区间强度比
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/inspect.rs`

use super::options::{FitArgs, ModelArgs, PreprocessOptions};

use clap::Args;
use std::path::PathBuf;

/// peak 子命令参数
#[derive(Args, Debug)]
pub struct PeakArgs {
    /// Input pattern file
    pub input: PathBuf,

    /// 2θ window of the peak (e.g., '27-30')
    #[arg(long)]
    pub range: String,

    /// Write the observed and fitted curve to this CSV
    #[arg(long)]
    pub curve: Option<PathBuf>,

    #[command(flatten)]
    pub fit: FitArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub preprocess: PreprocessOptions,
}

/// lines 子命令参数
#[derive(Args, Debug)]
pub struct LinesArgs {
    /// Input pattern file
    pub input: PathBuf,

    /// 2θ window containing the Kα peak
    #[arg(long, default_value = "10-20")]
    pub ka_range: String,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// ratio 子命令参数
#[derive(Args, Debug)]
pub struct RatioArgs {
    /// Input pattern file
    pub input: PathBuf,

    /// 2θ window of the reference peak (denominator)
    #[arg(long)]
    pub first: String,

    /// 2θ window of the compared peak (numerator)
    #[arg(long)]
    pub second: String,
}
