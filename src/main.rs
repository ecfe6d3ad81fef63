//! # xrdscan - 粉末 XRD 寻峰与 Scherrer 分析
//!
//! 读取实测衍射曲线，递归查找所有衍射峰，对每个峰做峰形拟合，
//! 由半高全宽经 Scherrer 方程估计晶粒尺寸。
//!
//! ## 子命令
//! - `peaks` - 全谱寻峰 + Scherrer 峰表（单文件 / 批量目录）
//! - `peak` - 单窗口峰形拟合
//! - `lines` - Kα/Kβ 发射线
//! - `ratio` - 两区间强度比
//! - `preprocess` - 背景扣除与平滑
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── parsers/   (数据文件读取)
//!   │     ├── xrd/       (寻峰、拟合、峰宽)
//!   │     ├── batch/     (批量处理)
//!   │     └── models/    (数据模型)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod error;
mod models;
mod parsers;
mod utils;
mod xrd;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
