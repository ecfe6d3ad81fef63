//! # 统一错误处理模块
//!
//! 定义 xrdscan 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 引用 `xrd/search.rs` 的 PeakReport（递归超限时携带部分结果）

use crate::xrd::search::PeakReport;
use thiserror::Error;

/// xrdscan 统一错误类型
#[derive(Error, Debug)]
pub enum XrdScanError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} data: {source_name}\nReason: {reason}")]
    ParseError {
        format: String,
        source_name: String,
        reason: String,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid signal: {0}")]
    InvalidSignal(String),

    // ─────────────────────────────────────────────────────────────
    // 分析错误
    // ─────────────────────────────────────────────────────────────
    #[error("No samples in range [{left}, {right}]")]
    EmptyRange { left: f64, right: f64 },

    #[error("Peak fit did not converge after {iterations} iterations: {reason}")]
    FitConvergence { reason: String, iterations: usize },

    #[error("Numerically unstable {quantity} (value = {value})")]
    NumericInstability { quantity: String, value: f64 },

    #[error(
        "Peak search aborted: {limit} exceeded ({} peaks found before abort)",
        .partial.records.len()
    )]
    RecursionLimitExceeded {
        limit: String,
        partial: Box<PeakReport>,
    },

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid range format: {0}")]
    InvalidRange(String),

    // ─────────────────────────────────────────────────────────────
    // CSV 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, XrdScanError>;
