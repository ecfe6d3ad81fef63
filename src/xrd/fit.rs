//! # 峰形拟合器
//!
//! 用 Levenberg–Marquardt 非线性最小二乘将峰形模型拟合到一段 (x, y) 数据。
//!
//! ## 算法概述
//! 1. 初值估计：y0 = min(y), a = max(y), μ = x[argmax(y)], σ = μ - min(x)
//! 2. 每步求解 (JᵀJ + λ·diag(JᵀJ)) δ = Jᵀr
//! 3. 代价下降则接受并减小 λ，否则增大 λ
//! 4. 相对代价下降 ≤ ftol 或步长 ≤ xtol·(|p| + xtol) 时收敛
//! 5. 协方差 = (JᵀJ)⁻¹ · SSR / (n - 4)
//! 6. 合理性检查：峰的半高部分必须落在窗口内，峰高为正且与窗口内 y 的跨度同量级
//!
//! ## 参考
//! - MINPACK lmder / scipy.optimize.curve_fit 的收敛判据与协方差定义
//!
//! ## 依赖关系
//! - 被 `xrd/search.rs` 与 `commands/inspect.rs` 调用
//! - 使用 `xrd/shape.rs` 的模型与解析导数
//! - 使用 `nalgebra` 求解 4×4 法方程

use crate::error::{Result, XrdScanError};
use crate::models::FittedPeak;
use crate::xrd::shape::PeakShape;

use nalgebra::{Matrix4, Vector4};

/// 默认最大迭代次数（稀疏窗口上收敛较慢，需留足余量）
pub const DEFAULT_MAX_ITERATIONS: usize = 5000;

const DEFAULT_TOLERANCE: f64 = 1.49012e-8;
const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e16;
/// λ 溢出时视为驻点的梯度余弦上限
const STATIONARY_GTOL: f64 = 1e-6;
/// 拟合峰高与窗口 y 跨度之比的上限
const MAX_HEIGHT_RATIO: f64 = 10.0;

/// 拟合参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    /// 最大迭代次数
    pub max_iterations: usize,
    /// 代价相对下降阈值
    pub ftol: f64,
    /// 参数相对步长阈值
    pub xtol: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            ftol: DEFAULT_TOLERANCE,
            xtol: DEFAULT_TOLERANCE,
        }
    }
}

/// 拟合结果
#[derive(Debug, Clone, PartialEq)]
pub struct PeakFit {
    /// 拟合参数
    pub peak: FittedPeak,
    /// 参数协方差矩阵（顺序 y0, a, center, sigma；自由度不足时为 inf）
    pub covariance: Matrix4<f64>,
    /// 残差平方和
    pub residual_sum_sq: f64,
    /// 实际迭代次数
    pub iterations: usize,
}

impl PeakFit {
    /// 参数标准差
    pub fn std_errors(&self) -> [f64; 4] {
        let c = &self.covariance;
        [
            c[(0, 0)].sqrt(),
            c[(1, 1)].sqrt(),
            c[(2, 2)].sqrt(),
            c[(3, 3)].sqrt(),
        ]
    }
}

/// 初值估计
///
/// 最大值落在窗口左端时 μ - min(x) 为零，改用窗口宽度的四分之一。
pub fn initial_guess(xs: &[f64], ys: &[f64]) -> [f64; 4] {
    let y_min = ys.iter().copied().fold(f64::INFINITY, f64::min);
    let (i_max, y_max) = ys
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, y)| if y > best.1 { (i, y) } else { best });
    let x_min = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let x_max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mean = xs[i_max];
    let mut sigma = mean - x_min;
    if sigma <= 0.0 {
        sigma = (x_max - x_min) / 4.0;
    }
    [y_min, y_max, mean, sigma]
}

/// 拟合单个峰
pub fn fit_peak(xs: &[f64], ys: &[f64], shape: PeakShape, options: &FitOptions) -> Result<PeakFit> {
    if xs.len() != ys.len() {
        return Err(XrdScanError::InvalidArgument(format!(
            "x and y segments differ in length ({} vs {})",
            xs.len(),
            ys.len()
        )));
    }
    if xs.len() < 4 {
        return Err(XrdScanError::FitConvergence {
            reason: format!("need at least 4 samples, got {}", xs.len()),
            iterations: 0,
        });
    }

    let p0 = initial_guess(xs, ys);
    if p0[3] <= 0.0 {
        return Err(XrdScanError::FitConvergence {
            reason: "segment has zero x extent".to_string(),
            iterations: 0,
        });
    }

    let mut p = Vector4::from(p0);
    let (mut jtj, mut jtr, mut cost) = normal_equations(shape, xs, ys, &p);
    if !cost.is_finite() {
        return Err(XrdScanError::FitConvergence {
            reason: "initial residual is not finite".to_string(),
            iterations: 0,
        });
    }

    let mut lambda = LAMBDA_INIT;
    let mut iterations = 0;
    let mut converged = cost == 0.0;

    while !converged && iterations < options.max_iterations {
        iterations += 1;

        let mut damped = jtj;
        for k in 0..4 {
            damped[(k, k)] += lambda * jtj[(k, k)].max(LAMBDA_MIN);
        }

        let delta = match damped.cholesky() {
            Some(chol) => chol.solve(&jtr),
            None => {
                lambda *= 10.0;
                if lambda > LAMBDA_MAX {
                    break;
                }
                continue;
            }
        };

        let trial = p + delta;
        let (trial_jtj, trial_jtr, trial_cost) = if trial[3] != 0.0 && trial.iter().all(|v| v.is_finite()) {
            normal_equations(shape, xs, ys, &trial)
        } else {
            (jtj, jtr, f64::INFINITY)
        };

        if trial_cost.is_finite() && trial_cost < cost {
            let reduction = cost - trial_cost;
            let small_step = delta.norm() <= options.xtol * (trial.norm() + options.xtol);
            let small_reduction = reduction <= options.ftol * cost;

            p = trial;
            jtj = trial_jtj;
            jtr = trial_jtr;
            cost = trial_cost;
            lambda = (lambda / 10.0).max(LAMBDA_MIN);
            converged = small_step || small_reduction || cost == 0.0;
        } else {
            lambda *= 10.0;
            // 阻尼已大到步长可忽略，只有梯度也为零时才算收敛
            if lambda > LAMBDA_MAX {
                converged = is_stationary(&jtj, &jtr, cost, ys);
                break;
            }
        }
    }

    if !converged {
        let reason = if iterations < options.max_iterations {
            format!("solver stalled away from a stationary point (SSR = {:.4e})", cost)
        } else {
            format!("residual still decreasing at iteration cap (SSR = {:.4e})", cost)
        };
        return Err(XrdScanError::FitConvergence { reason, iterations });
    }

    let mut covariance = covariance(&jtj, cost, xs.len());

    // (a, σ) 同时取反模型不变，统一为正宽度
    if p[3] < 0.0 {
        p[1] = -p[1];
        p[3] = -p[3];
        let flip = Matrix4::from_diagonal(&Vector4::new(1.0, -1.0, 1.0, -1.0));
        covariance = flip * covariance * flip;
    }

    if !p.iter().all(|v| v.is_finite()) || p[3] <= f64::EPSILON {
        return Err(XrdScanError::FitConvergence {
            reason: format!("degenerate parameters (sigma = {})", p[3]),
            iterations,
        });
    }

    let peak = FittedPeak {
        shape,
        y_offset: p[0],
        amplitude: p[1],
        center: p[2],
        sigma: p[3],
    };
    check_plausible(&peak, xs, ys).map_err(|reason| XrdScanError::FitConvergence {
        reason,
        iterations,
    })?;

    Ok(PeakFit {
        peak,
        covariance,
        residual_sum_sq: cost,
        iterations,
    })
}

/// 收敛的解必须描述窗口内的数据
///
/// 中心落在窗口外或峰高远超数据跨度的解通常来自峰尾或噪声，
/// 数值上可能是极小值，但不是这个窗口里的峰。
fn check_plausible(peak: &FittedPeak, xs: &[f64], ys: &[f64]) -> std::result::Result<(), String> {
    let x_min = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let x_max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    // 峰顶恰好在窗口边缘时中心可略出界，但半高以上部分必须与窗口相交
    let half = peak.fwhm_deg() / 2.0;
    if peak.center + half < x_min || peak.center - half > x_max {
        return Err(format!(
            "fitted center {:.4} lies outside the window [{:.4}, {:.4}]",
            peak.center, x_min, x_max
        ));
    }

    let y_min = ys.iter().copied().fold(f64::INFINITY, f64::min);
    let y_max = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = y_max - y_min;
    let height = peak.evaluate(peak.center) - peak.y_offset;
    let in_scale = height > 0.0 && span > 0.0 && height <= MAX_HEIGHT_RATIO * span;
    if !in_scale {
        return Err(format!(
            "fitted height {:.4e} is out of scale with the window span {:.4e}",
            height, span
        ));
    }

    Ok(())
}

/// 梯度在数值上为零，或残差已到舍入误差量级
fn is_stationary(jtj: &Matrix4<f64>, jtr: &Vector4<f64>, cost: f64, ys: &[f64]) -> bool {
    let total: f64 = ys.iter().map(|y| y * y).sum();
    if cost <= f64::EPSILON * total {
        return true;
    }
    (0..4).all(|k| jtr[k].abs() <= STATIONARY_GTOL * (jtj[(k, k)] * cost).sqrt())
}

/// 计算 JᵀJ、Jᵀr 与残差平方和（r = y - f）
fn normal_equations(
    shape: PeakShape,
    xs: &[f64],
    ys: &[f64],
    p: &Vector4<f64>,
) -> (Matrix4<f64>, Vector4<f64>, f64) {
    let params = [p[0], p[1], p[2], p[3]];
    let mut jtj = Matrix4::zeros();
    let mut jtr = Vector4::zeros();
    let mut cost = 0.0;

    for (&x, &y) in xs.iter().zip(ys) {
        let (f, grad) = shape.evaluate_with_gradient(x, &params);
        let g = Vector4::from(grad);
        let r = y - f;
        jtj += g * g.transpose();
        jtr += g * r;
        cost += r * r;
    }

    (jtj, jtr, cost)
}

/// 参数协方差：(JᵀJ)⁻¹ · SSR / (n - 4)
fn covariance(jtj: &Matrix4<f64>, cost: f64, n: usize) -> Matrix4<f64> {
    let dof = n.saturating_sub(4);
    match jtj.try_inverse() {
        Some(inv) if dof > 0 => inv * (cost / dof as f64),
        _ => Matrix4::from_element(f64::INFINITY),
    }
}
