//! # 数据模型模块
//!
//! 定义衍射信号与衍射峰分析结果的数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `xrd/` 和 `commands/` 使用
//! - 子模块: signal, peak

pub mod peak;
pub mod signal;

pub use peak::{FittedPeak, ModelParameters, ScherrerRecord};
pub use signal::Signal;
