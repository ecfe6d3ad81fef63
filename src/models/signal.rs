//! # 衍射信号数据模型
//!
//! 一维粉末衍射曲线：2θ（严格升序）与强度的等长序列，支持按 x 区间查询。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `xrd/` 使用
//! - 无外部模块依赖

use crate::error::{Result, XrdScanError};
use std::ops::Range;

/// 衍射信号 (x = 2θ, y = 强度)
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    /// 信号名称（通常为文件名）
    pub name: String,
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Signal {
    /// 创建信号，检查等长、有限值与 x 严格升序
    pub fn new(name: impl Into<String>, x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(XrdScanError::InvalidSignal(format!(
                "x and y lengths differ ({} vs {})",
                x.len(),
                y.len()
            )));
        }

        if let Some(i) = x.iter().zip(&y).position(|(a, b)| !a.is_finite() || !b.is_finite()) {
            return Err(XrdScanError::InvalidSignal(format!(
                "non-finite sample at index {}",
                i
            )));
        }

        if let Some(i) = x.windows(2).position(|w| w[1] <= w[0]) {
            return Err(XrdScanError::InvalidSignal(format!(
                "x is not strictly ascending at index {} ({} >= {})",
                i + 1,
                x[i],
                x[i + 1]
            )));
        }

        Ok(Self {
            name: name.into(),
            x,
            y,
        })
    }

    /// 样本数
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// x 的最小值与最大值
    pub fn x_bounds(&self) -> Option<(f64, f64)> {
        match (self.x.first(), self.x.last()) {
            (Some(&lo), Some(&hi)) => Some((lo, hi)),
            _ => None,
        }
    }

    /// 返回满足 `x1 <= x[i] <= x2` 的连续下标区间 `[i_l, i_r)`
    ///
    /// 依赖 x 升序做二分查找：左边界取第一个 `>= x1` 的位置，
    /// 右边界取第一个 `> x2` 的位置。无样本落入时返回空区间。
    pub fn span(&self, x1: f64, x2: f64) -> Range<usize> {
        let i_l = self.x.partition_point(|&v| v < x1);
        let i_r = self.x.partition_point(|&v| v <= x2);
        if i_r <= i_l {
            i_l..i_l
        } else {
            i_l..i_r
        }
    }

    /// 按下标区间截取 (x, y) 片段
    pub fn segment(&self, span: Range<usize>) -> (&[f64], &[f64]) {
        (&self.x[span.clone()], &self.y[span])
    }

    /// 替换强度序列（长度必须一致），用于平滑和背景扣除的结果
    pub fn with_intensities(&self, y: Vec<f64>) -> Result<Self> {
        Self::new(self.name.clone(), self.x.clone(), y)
    }
}
