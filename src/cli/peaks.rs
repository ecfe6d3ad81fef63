//! # peaks 子命令 CLI 定义
//!
//! 递归寻峰与 Scherrer 分析，支持单文件与批量目录。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/peaks.rs`

use super::options::{FitArgs, ModelArgs, PreprocessOptions};
use crate::xrd::search::{DEFAULT_HEIGHT_FRACTION, DEFAULT_TROUGH_DISTANCE};

use clap::Args;
use std::path::PathBuf;

/// peaks 子命令参数
#[derive(Args, Debug)]
pub struct PeaksArgs {
    /// Input pattern file (.xy/.dat/.txt/.csv) or directory for batch mode
    pub input: PathBuf,

    /// Output CSV (single file) or output directory (batch mode)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Minimum peak height as a fraction of the global maximum
    #[arg(long, default_value_t = DEFAULT_HEIGHT_FRACTION)]
    pub height_fraction: f64,

    /// Peak-to-trough distance in degrees (half-width of the fit window)
    #[arg(long, default_value_t = DEFAULT_TROUGH_DISTANCE)]
    pub trough_distance: f64,

    /// Abort the search beyond this recursion depth
    #[arg(long, default_value_t = 512)]
    pub max_depth: usize,

    /// Abort the search after this many peaks
    #[arg(long, default_value_t = 1000)]
    pub max_peaks: usize,

    #[command(flatten)]
    pub fit: FitArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub preprocess: PreprocessOptions,

    /// File pattern(s) for batch mode, comma-separated
    #[arg(short, long, default_value = "*.xy,*.dat,*.txt,*.csv")]
    pub pattern: String,

    /// Search subdirectories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Number of parallel jobs (0 = auto, batch mode only)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Overwrite existing output files
    #[arg(long)]
    pub overwrite: bool,

    /// Print search statistics and skipped-peak diagnostics
    #[arg(short, long)]
    pub verbose: bool,
}
