//! # preprocess 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/preprocess.rs`

use super::options::PreprocessOptions;

use clap::Args;
use std::path::PathBuf;

/// preprocess 子命令参数
#[derive(Args, Debug)]
pub struct PreprocessArgs {
    /// Input pattern file
    pub input: PathBuf,

    /// Output file (.csv writes CSV, anything else writes XY)
    #[arg(short, long)]
    pub output: PathBuf,

    #[command(flatten)]
    pub options: PreprocessOptions,

    /// Overwrite an existing output file
    #[arg(long)]
    pub overwrite: bool,
}
