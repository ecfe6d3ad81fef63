//! # 信号预处理
//!
//! 寻峰前的平滑与背景扣除。寻峰本身只依赖处理后的强度，不关心具体算法。
//!
//! ## 功能
//! - `moving_average`: n 点滑动平均（valid 模式）
//! - `ForwardDifference`: 固定偏移窗口差分阈值法扣背景
//! - `InterpolatedBackground`: 通过用户锚点的分段线性背景
//!
//! ## 依赖关系
//! - 被 `commands/peaks.rs`, `commands/preprocess.rs` 调用
//! - 使用 `models/signal.rs`

use crate::error::{Result, XrdScanError};
use crate::models::Signal;

/// 背景扣除器
pub trait BackgroundSubtractor {
    /// 返回扣除背景后的新信号，x 不变
    fn subtract(&self, signal: &Signal) -> Result<Signal>;
}

/// 窗口差分阈值法
///
/// 偏移量 `lmda = trunc(0.5·L / (x[0] - x[L-1]))`（升序数据为负，即向后比较），
/// 对每个 i 取 `j = (i + lmda) mod L`：若 `y[j] > tol·y[i]` 则 `y'[j] = y[j] - y[i]`，
/// 否则置零。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForwardDifference {
    pub tolerance: f64,
}

impl ForwardDifference {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// 比较窗口的下标偏移
    pub fn offset(signal: &Signal) -> Option<isize> {
        let (lo, hi) = signal.x_bounds()?;
        let len = signal.len() as f64;
        let offset = (0.5 * len / (lo - hi)).trunc();
        if offset.is_finite() && offset != 0.0 {
            Some(offset as isize)
        } else {
            None
        }
    }
}

impl BackgroundSubtractor for ForwardDifference {
    fn subtract(&self, signal: &Signal) -> Result<Signal> {
        if !self.tolerance.is_finite() {
            return Err(XrdScanError::InvalidArgument(format!(
                "background tolerance must be finite, got {}",
                self.tolerance
            )));
        }
        if signal.len() < 2 {
            return Ok(signal.clone());
        }

        let offset = Self::offset(signal).ok_or_else(|| {
            XrdScanError::InvalidArgument(format!(
                "too few samples per degree for background subtraction ({} samples)",
                signal.len()
            ))
        })?;

        let y = signal.y();
        let n = y.len() as isize;
        let mut out = vec![0.0; y.len()];
        for i in 0..n {
            let j = (i + offset).rem_euclid(n) as usize;
            let i = i as usize;
            if y[j] > self.tolerance * y[i] {
                out[j] = y[j] - y[i];
            }
        }

        signal.with_intensities(out)
    }
}

/// 锚点插值背景，超出锚点范围时取端点值
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedBackground {
    points: Vec<(f64, f64)>,
}

impl InterpolatedBackground {
    pub fn new(mut points: Vec<(f64, f64)>) -> Result<Self> {
        if points.is_empty() {
            return Err(XrdScanError::InvalidArgument(
                "at least one background point is required".to_string(),
            ));
        }
        if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(XrdScanError::InvalidArgument(
                "background points must be finite".to_string(),
            ));
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        if points.windows(2).any(|w| w[0].0 == w[1].0) {
            return Err(XrdScanError::InvalidArgument(
                "background points must have distinct x values".to_string(),
            ));
        }
        Ok(Self { points })
    }

    /// 在 x 处的背景值
    pub fn level(&self, x: f64) -> f64 {
        let pts = &self.points;
        let i = pts.partition_point(|p| p.0 <= x);
        if i == 0 {
            return pts[0].1;
        }
        if i == pts.len() {
            return pts[pts.len() - 1].1;
        }
        let (x0, y0) = pts[i - 1];
        let (x1, y1) = pts[i];
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }
}

impl BackgroundSubtractor for InterpolatedBackground {
    fn subtract(&self, signal: &Signal) -> Result<Signal> {
        let y = signal
            .x()
            .iter()
            .zip(signal.y())
            .map(|(&x, &y)| y - self.level(x))
            .collect();
        signal.with_intensities(y)
    }
}

/// n 点滑动平均
///
/// 输出 `len - n + 1` 个点，每个平均值放在其窗口的中间样本处
/// （n 为偶数时取偏左的中间样本）。
pub fn moving_average(signal: &Signal, n: usize) -> Result<Signal> {
    if n == 0 {
        return Err(XrdScanError::InvalidArgument(
            "moving average window must be >= 1".to_string(),
        ));
    }
    if n > signal.len() {
        return Err(XrdScanError::InvalidArgument(format!(
            "moving average window ({}) exceeds signal length ({})",
            n,
            signal.len()
        )));
    }

    let half = (n - 1) / 2;
    let x: Vec<f64> = signal.x()[half..half + signal.len() - n + 1].to_vec();
    let y: Vec<f64> = signal
        .y()
        .windows(n)
        .map(|w| w.iter().sum::<f64>() / n as f64)
        .collect();

    Signal::new(signal.name.clone(), x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xrd::synthetic::{linspace, PatternBuilder};
    use approx::assert_relative_eq;

    #[test]
    fn test_moving_average_shape_and_values() {
        let s = Signal::new("s", vec![1.0, 2.0, 3.0, 4.0, 5.0], vec![1.0, 2.0, 3.0, 4.0, 8.0]).unwrap();
        let m = moving_average(&s, 3).unwrap();
        assert_eq!(m.x(), &[2.0, 3.0, 4.0]);
        assert_eq!(m.y(), &[2.0, 3.0, 5.0]);

        let same = moving_average(&s, 1).unwrap();
        assert_eq!(same, s);
    }

    #[test]
    fn test_moving_average_invalid_window() {
        let s = Signal::new("s", vec![1.0, 2.0], vec![1.0, 2.0]).unwrap();
        assert!(moving_average(&s, 0).is_err());
        assert!(moving_average(&s, 3).is_err());
    }

    #[test]
    fn test_forward_difference_preserves_length() {
        let s = PatternBuilder::new(10.0, 80.0, 1000)
            .gaussian(30.0, 0.5, 1000.0)
            .baseline(200.0)
            .build();
        let out = ForwardDifference::new(1.0).subtract(&s).unwrap();
        assert_eq!(out.len(), s.len());
        assert_eq!(out.x(), s.x());
        assert!(out.y().iter().all(|&v| v >= 0.0));

        // 平坦背景被完全扣除，峰仍保留
        let flat = out.span(60.0, 70.0);
        assert!(out.y()[flat].iter().all(|&v| v == 0.0));
        let peak = out.y().iter().copied().fold(0.0, f64::max);
        assert!(peak > 300.0);
    }

    #[test]
    fn test_forward_difference_offset() {
        let s = Signal::new("s", linspace(10.0, 80.0, 1000), vec![1.0; 1000]).unwrap();
        assert_eq!(ForwardDifference::offset(&s), Some(-7));

        let sparse = Signal::new("s", vec![0.0, 10.0, 20.0], vec![1.0; 3]).unwrap();
        assert!(ForwardDifference::new(1.0).subtract(&sparse).is_err());
    }

    #[test]
    fn test_interpolated_background() {
        let bg = InterpolatedBackground::new(vec![(20.0, 30.0), (10.0, 10.0)]).unwrap();
        assert_relative_eq!(bg.level(5.0), 10.0);
        assert_relative_eq!(bg.level(15.0), 20.0);
        assert_relative_eq!(bg.level(25.0), 30.0);

        let s = Signal::new("s", vec![10.0, 15.0, 20.0], vec![10.0, 25.0, 30.0]).unwrap();
        let out = bg.subtract(&s).unwrap();
        assert_eq!(out.y(), &[0.0, 5.0, 0.0]);
    }

    #[test]
    fn test_interpolated_background_validation() {
        assert!(InterpolatedBackground::new(vec![]).is_err());
        assert!(InterpolatedBackground::new(vec![(1.0, 0.0), (1.0, 2.0)]).is_err());
    }
}
