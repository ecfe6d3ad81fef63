//! # 批量处理模块
//!
//! 提供统一的衍射数据文件批量处理能力。
//!
//! ## 功能
//! - 自动检测输入类型（文件/目录）
//! - 收集匹配文件列表
//! - 基于 rayon 的并行处理，进度反馈与统计
//!
//! ## 依赖关系
//! - 被 `commands/peaks.rs` 使用
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::FileCollector;
pub use runner::{BatchRunner, ProcessResult};
