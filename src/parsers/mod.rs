//! # 解析器模块
//!
//! 读取实测粉末衍射数据文件。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/signal.rs`
//! - 子模块: pattern

pub mod pattern;

use crate::error::{Result, XrdScanError};
use crate::models::Signal;
use std::fs;
use std::path::Path;

/// 支持的输入扩展名
pub const SUPPORTED_EXTENSIONS: &[&str] = &["xy", "dat", "txt", "csv"];

/// 从文件路径推断格式并解析
pub fn load_pattern(path: &Path) -> Result<Signal> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(XrdScanError::UnsupportedFormat(format!(
            "Cannot determine format for: {} (expected .xy, .dat, .txt or .csv)",
            path.display()
        )));
    }

    let content = fs::read_to_string(path).map_err(|e| XrdScanError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");

    match ext.as_str() {
        "csv" => pattern::parse_csv_content(&content, name),
        _ => pattern::parse_xy_content(&content, name),
    }
}
