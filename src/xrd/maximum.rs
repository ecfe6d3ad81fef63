//! # 局部极大值查找
//!
//! 在给定 2θ 区间内查找强度最大的样本。
//!
//! ## 依赖关系
//! - 被 `xrd/search.rs`, `xrd/lines.rs` 调用
//! - 使用 `models/signal.rs` 的区间查询

use crate::error::{Result, XrdScanError};
use crate::models::Signal;

/// 区间内的最大样本
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalMaximum {
    /// 样本下标
    pub index: usize,
    /// 2θ（度）
    pub x: f64,
    /// 强度
    pub y: f64,
}

/// 查找 [left, right] 内的最大样本，并列时取最靠左者
///
/// 区间内没有样本时返回 `EmptyRange`，递归搜索将其视为终止条件。
pub fn find_peak_in_range(signal: &Signal, left: f64, right: f64) -> Result<LocalMaximum> {
    let span = signal.span(left, right);
    let offset = span.start;
    let (xs, ys) = signal.segment(span);

    let best = ys
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &y)| match best {
            Some((_, by)) if by >= y => best,
            _ => Some((i, y)),
        });

    match best {
        Some((i, y)) => Ok(LocalMaximum {
            index: offset + i,
            x: xs[i],
            y,
        }),
        None => Err(XrdScanError::EmptyRange { left, right }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Signal {
        Signal::new(
            "sample",
            vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0],
            vec![1.0, 7.0, 3.0, 7.0, 9.0, 2.0],
        )
        .unwrap()
    }

    #[test]
    fn test_global_maximum() {
        let m = find_peak_in_range(&sample(), 10.0, 15.0).unwrap();
        assert_eq!(m, LocalMaximum { index: 4, x: 14.0, y: 9.0 });
    }

    #[test]
    fn test_sub_range_and_ties() {
        let m = find_peak_in_range(&sample(), 10.5, 13.5).unwrap();
        assert_eq!(m.index, 1);
        assert_eq!(m.x, 11.0);
    }

    #[test]
    fn test_empty_range_is_distinct_error() {
        let err = find_peak_in_range(&sample(), 12.2, 12.8).unwrap_err();
        assert!(matches!(err, XrdScanError::EmptyRange { .. }));
    }
}
