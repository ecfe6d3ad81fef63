//! # 递归寻峰
//!
//! 在整个 2θ 区间上深度优先地查找衍射峰，对每个峰做拟合和 Scherrer 分析，
//! 然后以该峰的排除窗口为界把区间一分为二继续搜索。
//!
//! ## 状态转移
//! 1. 在 [left, right] 内找最大样本；区间为空则该分支终止
//! 2. 最大值 ≤ 全局阈值则终止（阈值只在搜索开始前由全局最大值计算一次）
//! 3. 在 [max_x - d, max_x + d]（截断到当前区间）内拟合峰形并计算峰宽
//! 4. 记录 Scherrer 结果；拟合失败或排除窗口不含最大样本则跳过该峰并写入诊断
//! 5. 以排除窗口 [l, r] 为界递归 [left, l] 与 [r, right]
//!
//! 排除窗口截断到当前区间，并且保证子区间不含本次的最大样本，
//! 因此每次调用至少排除一个样本，子区间也不会与兄弟分支重叠。
//! 每个分支返回自己的结果，由上层合并；最后按峰位升序排序。
//!
//! ## 依赖关系
//! - 被 `commands/peaks.rs` 调用
//! - 使用 `xrd/maximum.rs`, `xrd/fit.rs`, `xrd/width.rs`

use crate::error::{Result, XrdScanError};
use crate::models::{ModelParameters, ScherrerRecord, Signal};
use crate::xrd::fit::{self, FitOptions};
use crate::xrd::maximum::{self, LocalMaximum};
use crate::xrd::shape::PeakShape;
use crate::xrd::width;

/// 默认最小峰高（全局最大值的比例）
pub const DEFAULT_HEIGHT_FRACTION: f64 = 0.2;
/// 默认峰顶到峰谷距离（度）
pub const DEFAULT_TROUGH_DISTANCE: f64 = 0.8;

/// 递归安全上限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// 最大递归深度
    pub max_depth: usize,
    /// 最大峰数
    pub max_peaks: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_depth: 512,
            max_peaks: 1000,
        }
    }
}

/// 阈值与拟合窗口之外的搜索选项
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SearchOptions {
    pub shape: PeakShape,
    pub model: ModelParameters,
    pub fit: FitOptions,
    pub limits: SearchLimits,
}

/// 搜索配置，整个递归过程中不变
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    /// 绝对峰高阈值
    pub height_threshold: f64,
    /// 峰顶到峰谷距离，拟合窗口半宽（度）
    pub trough_distance: f64,
    /// 峰形模型
    pub shape: PeakShape,
    /// 仪器/物理常数
    pub model: ModelParameters,
    /// 拟合参数
    pub fit: FitOptions,
    /// 递归上限
    pub limits: SearchLimits,
}

impl SearchConfig {
    /// 由全局最大值的比例计算阈值
    pub fn from_fraction(signal: &Signal, height_fraction: f64, trough_distance: f64) -> Result<Self> {
        if !height_fraction.is_finite() || height_fraction < 0.0 {
            return Err(XrdScanError::InvalidArgument(format!(
                "height fraction must be a non-negative number, got {}",
                height_fraction
            )));
        }
        if !trough_distance.is_finite() || trough_distance <= 0.0 {
            return Err(XrdScanError::InvalidArgument(format!(
                "trough distance must be positive, got {}",
                trough_distance
            )));
        }

        let global_max = signal.y().iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let global_max = if global_max.is_finite() { global_max } else { 0.0 };

        Ok(Self {
            height_threshold: height_fraction * global_max,
            trough_distance,
            shape: PeakShape::default(),
            model: ModelParameters::default(),
            fit: FitOptions::default(),
            limits: SearchLimits::default(),
        })
    }

    pub fn with_shape(mut self, shape: PeakShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_model(mut self, model: ModelParameters) -> Self {
        self.model = model;
        self
    }

    pub fn with_fit_options(mut self, fit: FitOptions) -> Self {
        self.fit = fit;
        self
    }

    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// 诊断类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// 拟合未收敛，峰被跳过
    FitSkipped,
    /// 峰宽计算数值不稳定，记录被跳过
    UnstableWidth,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticKind::FitSkipped => write!(f, "fit skipped"),
            DiagnosticKind::UnstableWidth => write!(f, "unstable width"),
        }
    }
}

/// 被跳过的峰
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// 候选峰位（度）
    pub peak_x: f64,
    /// 拟合窗口
    pub window: (f64, f64),
    pub message: String,
}

/// 搜索统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// 访问的区间数
    pub branches: usize,
    /// 因区间为空终止的分支数
    pub empty_terminations: usize,
    /// 因低于阈值终止的分支数
    pub threshold_terminations: usize,
    /// 达到的最大深度
    pub max_depth_reached: usize,
}

impl SearchStats {
    fn merge(&mut self, other: &SearchStats) {
        self.branches += other.branches;
        self.empty_terminations += other.empty_terminations;
        self.threshold_terminations += other.threshold_terminations;
        self.max_depth_reached = self.max_depth_reached.max(other.max_depth_reached);
    }
}

/// 寻峰结果
#[derive(Debug, Clone, PartialEq)]
pub struct PeakReport {
    /// 按峰位升序排列的 Scherrer 记录
    pub records: Vec<ScherrerRecord>,
    /// 被跳过的峰
    pub diagnostics: Vec<Diagnostic>,
    pub stats: SearchStats,
    /// 使用的绝对峰高阈值
    pub threshold: f64,
}

/// 单个分支的结果
#[derive(Debug, Default)]
struct Branch {
    records: Vec<ScherrerRecord>,
    diagnostics: Vec<Diagnostic>,
    stats: SearchStats,
    abort: Option<String>,
}

impl Branch {
    fn absorb(&mut self, child: Branch) {
        self.records.extend(child.records);
        self.diagnostics.extend(child.diagnostics);
        self.stats.merge(&child.stats);
        if self.abort.is_none() {
            self.abort = child.abort;
        }
    }
}

/// 单个候选峰的检查结果
struct Examination {
    record: Option<ScherrerRecord>,
    exclusion: Option<(f64, f64)>,
    diagnostic: Option<Diagnostic>,
}

/// 递归寻峰器
pub struct PeakSearch<'a> {
    signal: &'a Signal,
    config: SearchConfig,
}

impl<'a> PeakSearch<'a> {
    pub fn new(signal: &'a Signal, config: SearchConfig) -> Self {
        Self { signal, config }
    }

    /// 在整个信号上寻峰
    ///
    /// 超出递归上限时返回 `RecursionLimitExceeded`，其中携带已找到的部分结果。
    pub fn run(&self) -> Result<PeakReport> {
        let mut branch = match self.signal.x_bounds() {
            Some(bounds) if self.signal.len() >= 2 => self.search(Some(bounds), 0, 0),
            _ => Branch::default(),
        };

        branch
            .records
            .sort_by(|a, b| a.center_x.total_cmp(&b.center_x));

        let report = PeakReport {
            records: branch.records,
            diagnostics: branch.diagnostics,
            stats: branch.stats,
            threshold: self.config.height_threshold,
        };

        match branch.abort {
            Some(limit) => Err(XrdScanError::RecursionLimitExceeded {
                limit,
                partial: Box::new(report),
            }),
            None => Ok(report),
        }
    }

    /// `found` 为进入本分支前已记录的峰数
    fn search(&self, bounds: Option<(f64, f64)>, depth: usize, found: usize) -> Branch {
        let mut branch = Branch::default();
        branch.stats.branches = 1;
        branch.stats.max_depth_reached = depth;

        let (left, right) = match bounds {
            Some((l, r)) if l <= r => (l, r),
            _ => {
                branch.stats.empty_terminations = 1;
                return branch;
            }
        };

        let apex = match maximum::find_peak_in_range(self.signal, left, right) {
            Ok(m) => m,
            Err(_) => {
                branch.stats.empty_terminations = 1;
                return branch;
            }
        };

        if apex.y <= self.config.height_threshold {
            branch.stats.threshold_terminations = 1;
            return branch;
        }

        // 上限只约束真正要处理的峰，正常终止的分支不受影响
        let limits = self.config.limits;
        if depth > limits.max_depth {
            branch.abort = Some(format!("recursion depth limit ({})", limits.max_depth));
            return branch;
        }
        if found >= limits.max_peaks {
            branch.abort = Some(format!("peak count limit ({})", limits.max_peaks));
            return branch;
        }

        let exam = self.examine(&apex, left, right);
        branch.records.extend(exam.record);
        branch.diagnostics.extend(exam.diagnostic);

        let (left_child, right_child) = self.split(&apex, left, right, exam.exclusion);

        let child = self.search(left_child, depth + 1, found + branch.records.len());
        branch.absorb(child);
        if branch.abort.is_some() {
            return branch;
        }

        let child = self.search(right_child, depth + 1, found + branch.records.len());
        branch.absorb(child);
        branch
    }

    /// 拟合候选峰并计算峰宽
    fn examine(&self, apex: &LocalMaximum, left: f64, right: f64) -> Examination {
        let d = self.config.trough_distance;
        let window = ((apex.x - d).max(left), (apex.x + d).min(right));
        let (xs, ys) = self.signal.segment(self.signal.span(window.0, window.1));

        let skipped = |message: String| Examination {
            record: None,
            exclusion: None,
            diagnostic: Some(Diagnostic {
                kind: DiagnosticKind::FitSkipped,
                peak_x: apex.x,
                window,
                message,
            }),
        };

        let fitted = match fit::fit_peak(xs, ys, self.config.shape, &self.config.fit) {
            Ok(f) => f,
            Err(e) => return skipped(e.to_string()),
        };

        // 排除窗口不含最大样本，说明拟合到的是别的峰
        let (l, r) = width::exclusion_window(&fitted.peak);
        if apex.x < l || apex.x > r {
            let err = XrdScanError::FitConvergence {
                reason: format!(
                    "exclusion window [{:.4}, {:.4}] does not contain the maximum at {:.4}",
                    l, r, apex.x
                ),
                iterations: fitted.iterations,
            };
            return skipped(err.to_string());
        }

        match width::compute_width(&fitted.peak, apex, &self.config.model) {
            Ok(analysis) => Examination {
                record: Some(analysis.record),
                exclusion: Some(analysis.exclusion),
                diagnostic: None,
            },
            Err(e) => Examination {
                record: None,
                exclusion: Some((l, r)),
                diagnostic: Some(Diagnostic {
                    kind: DiagnosticKind::UnstableWidth,
                    peak_x: apex.x,
                    window,
                    message: e.to_string(),
                }),
            },
        }
    }

    /// 计算左右子区间
    ///
    /// 没有排除窗口（拟合失败）时直接在最大样本两侧切分。
    fn split(
        &self,
        apex: &LocalMaximum,
        left: f64,
        right: f64,
        exclusion: Option<(f64, f64)>,
    ) -> (Option<(f64, f64)>, Option<(f64, f64)>) {
        let x = self.signal.x();
        let (l, r) = exclusion.unwrap_or((apex.x, apex.x));
        let l = l.max(left).min(right);
        let r = r.max(left).min(right);

        let prev = apex.index.checked_sub(1).map(|i| x[i]);
        let next = x.get(apex.index + 1).copied();

        (
            prev.map(|p| (left, l.min(p))),
            next.map(|n| (r.max(n), right)),
        )
    }
}

/// 在整个信号上寻峰
///
/// `height_fraction` 为全局最大值的比例，`trough_distance` 为拟合窗口半宽（度），
/// 其余设置取自 `options`。
pub fn find_all_peaks(
    signal: &Signal,
    height_fraction: f64,
    trough_distance: f64,
    options: &SearchOptions,
) -> Result<PeakReport> {
    let config = SearchConfig::from_fraction(signal, height_fraction, trough_distance)?
        .with_shape(options.shape)
        .with_model(options.model)
        .with_fit_options(options.fit)
        .with_limits(options.limits);
    PeakSearch::new(signal, config).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xrd::synthetic::PatternBuilder;
    use approx::assert_abs_diff_eq;

    fn search_defaults(signal: &Signal, height_fraction: f64, trough_distance: f64) -> Result<PeakReport> {
        find_all_peaks(signal, height_fraction, trough_distance, &SearchOptions::default())
    }

    fn two_peaks() -> Signal {
        PatternBuilder::new(10.0, 80.0, 1000)
            .gaussian(15.0, 0.3, 500.0)
            .gaussian(40.0, 0.8, 2000.0)
            .noise(5.0, 42)
            .build()
    }

    fn five_peaks() -> Signal {
        PatternBuilder::new(10.0, 80.0, 3500)
            .gaussian(18.0, 0.25, 900.0)
            .gaussian(26.0, 0.3, 2500.0)
            .gaussian(33.5, 0.2, 600.0)
            .gaussian(47.0, 0.35, 1500.0)
            .gaussian(61.0, 0.4, 350.0)
            .baseline(20.0)
            .noise(8.0, 3)
            .build()
    }

    #[test]
    fn test_single_gaussian_round_trip() {
        let signal = PatternBuilder::new(10.0, 30.0, 1001)
            .gaussian(20.0, 0.5, 1000.0)
            .noise(0.5, 1)
            .build();
        let report = search_defaults(&signal, 0.1, DEFAULT_TROUGH_DISTANCE).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_abs_diff_eq!(report.records[0].center_x, 20.0, epsilon = 0.05);
        assert!(report.records[0].scherrer_width > 0.0);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn test_two_peak_scenario() {
        let report = search_defaults(&two_peaks(), 0.2, 2.0).unwrap();
        assert_eq!(report.records.len(), 2);
        assert_abs_diff_eq!(report.records[0].center_x, 15.0, epsilon = 0.1);
        assert_abs_diff_eq!(report.records[1].center_x, 40.0, epsilon = 0.1);
        assert!(report.records[1].peak_intensity > report.records[0].peak_intensity);
    }

    #[test]
    fn test_idempotent() {
        let signal = five_peaks();
        let a = search_defaults(&signal, 0.1, 1.0).unwrap();
        let b = search_defaults(&signal, 0.1, 1.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sorted_by_center() {
        let report = search_defaults(&five_peaks(), 0.1, 1.0).unwrap();
        assert_eq!(report.records.len(), 5);
        assert!(report
            .records
            .windows(2)
            .all(|w| w[0].center_x <= w[1].center_x));
    }

    #[test]
    fn test_threshold_monotonicity() {
        let signal = five_peaks();
        let counts: Vec<usize> = [0.05, 0.1, 0.2, 0.3, 0.5, 0.7, 0.95]
            .iter()
            .map(|&f| search_defaults(&signal, f, 1.0).unwrap().records.len())
            .collect();
        assert!(counts.windows(2).all(|w| w[1] <= w[0]), "{:?}", counts);
        assert_eq!(*counts.last().unwrap(), 1);
    }

    #[test]
    fn test_widths_positive() {
        let report = search_defaults(&five_peaks(), 0.1, 1.0).unwrap();
        assert!(report.records.iter().all(|r| r.scherrer_width > 0.0));
    }

    #[test]
    fn test_empty_and_single_sample() {
        let empty = Signal::new("empty", vec![], vec![]).unwrap();
        assert!(search_defaults(&empty, 0.2, 0.8).unwrap().records.is_empty());

        let one = Signal::new("one", vec![20.0], vec![100.0]).unwrap();
        let report = search_defaults(&one, 0.2, 0.8).unwrap();
        assert!(report.records.is_empty());
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn test_fit_failure_is_skipped_and_search_continues() {
        let signal = PatternBuilder::new(10.0, 50.0, 801)
            .gaussian(20.0, 0.4, 800.0)
            .gaussian(40.0, 0.4, 700.0)
            .build();
        // 单次迭代无法收敛，每个候选峰都被跳过
        let config = SearchConfig::from_fraction(&signal, 0.1, 1.0)
            .unwrap()
            .with_fit_options(FitOptions {
                max_iterations: 1,
                ..FitOptions::default()
            });
        let report = PeakSearch::new(&signal, config).run().unwrap();

        assert!(report.records.is_empty());
        assert!(report
            .diagnostics
            .iter()
            .all(|d| d.kind == DiagnosticKind::FitSkipped));
        assert!(report.diagnostics.iter().any(|d| (d.peak_x - 20.0).abs() < 0.1));
        assert!(report.diagnostics.iter().any(|d| (d.peak_x - 40.0).abs() < 0.1));
    }

    #[test]
    fn test_peak_limit_returns_partial() {
        let signal = five_peaks();
        let config = SearchConfig::from_fraction(&signal, 0.1, 1.0)
            .unwrap()
            .with_limits(SearchLimits {
                max_depth: 512,
                max_peaks: 2,
            });
        match PeakSearch::new(&signal, config).run() {
            Err(XrdScanError::RecursionLimitExceeded { partial, .. }) => {
                assert_eq!(partial.records.len(), 2);
                assert!(partial.records[0].center_x <= partial.records[1].center_x);
            }
            other => panic!("expected limit error, got {:?}", other),
        }
    }

    #[test]
    fn test_depth_limit() {
        let signal = five_peaks();
        let config = SearchConfig::from_fraction(&signal, 0.1, 1.0)
            .unwrap()
            .with_limits(SearchLimits {
                max_depth: 0,
                max_peaks: 1000,
            });
        let err = PeakSearch::new(&signal, config).run().unwrap_err();
        assert!(matches!(err, XrdScanError::RecursionLimitExceeded { .. }));
    }

    #[test]
    fn test_depth_limit_ignores_branches_that_end_normally() {
        let signal = PatternBuilder::new(10.0, 30.0, 1001)
            .gaussian(20.0, 0.5, 1000.0)
            .build();
        let options = SearchOptions {
            limits: SearchLimits {
                max_depth: 0,
                max_peaks: 1000,
            },
            ..SearchOptions::default()
        };
        let report = find_all_peaks(&signal, 0.1, DEFAULT_TROUGH_DISTANCE, &options).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.stats.max_depth_reached, 1);
    }

    #[test]
    fn test_tail_next_to_exclusion_window_is_not_a_peak() {
        let signal = PatternBuilder::new(10.0, 80.0, 3000)
            .gaussian(27.70, 0.5, 2823.0)
            .baseline(30.0)
            .build();
        let config = SearchConfig::from_fraction(&signal, 0.1, 0.8).unwrap();
        let search = PeakSearch::new(&signal, config);

        // 区间起点紧贴上一个峰的排除窗口，最大值是峰尾样本
        let apex = maximum::find_peak_in_range(&signal, 28.74, 40.0).unwrap();
        assert!(apex.x < 28.77);
        assert!(apex.y > config.height_threshold);

        let exam = search.examine(&apex, 28.74, 40.0);
        assert!(exam.record.is_none());
        assert!(exam.exclusion.is_none());
        assert_eq!(exam.diagnostic.map(|d| d.kind), Some(DiagnosticKind::FitSkipped));
    }

    #[test]
    fn test_adjacent_peaks_yield_no_duplicates() {
        let truth = [26.604, 27.70, 41.87, 74.10];
        let signal = PatternBuilder::new(10.0, 80.0, 3000)
            .gaussian(26.604, 0.255, 1868.0)
            .gaussian(27.70, 0.50, 2823.0)
            .gaussian(41.87, 0.30, 1500.0)
            .gaussian(74.10, 0.35, 1000.0)
            .baseline(30.0)
            .noise(20.0, 7)
            .build();

        let report = search_defaults(&signal, 0.1, 0.8).unwrap();
        let centers: Vec<f64> = report.records.iter().map(|r| r.center_x).collect();
        assert_eq!(centers.len(), truth.len(), "{:?}", centers);
        for (c, t) in centers.iter().zip(truth) {
            assert_abs_diff_eq!(*c, t, epsilon = 0.1);
        }
        assert!(centers.windows(2).all(|w| w[1] - w[0] > 0.5), "{:?}", centers);
        assert!(report
            .diagnostics
            .iter()
            .all(|d| d.kind == DiagnosticKind::FitSkipped));
    }

    #[test]
    fn test_children_stay_inside_parent() {
        let signal = two_peaks();
        let config = SearchConfig::from_fraction(&signal, 0.2, 2.0).unwrap();
        let search = PeakSearch::new(&signal, config);
        let apex = maximum::find_peak_in_range(&signal, 30.0, 50.0).unwrap();

        // 排除窗口远超当前区间时被截断
        let (l, r) = search.split(&apex, 38.0, 42.0, Some((20.0, 60.0)));
        assert_eq!(l, Some((38.0, 38.0)));
        assert_eq!(r, Some((42.0, 42.0)));

        // 排除窗口不覆盖最大样本时，子区间仍然不含该样本
        let (l, r) = search.split(&apex, 30.0, 50.0, Some((45.0, 47.0)));
        let x = signal.x();
        assert_eq!(l, Some((30.0, x[apex.index - 1])));
        assert_eq!(r, Some((47.0, 50.0)));
    }

    #[test]
    fn test_trough_distance_validation() {
        let signal = two_peaks();
        assert!(search_defaults(&signal, 0.2, 0.0).is_err());
        assert!(search_defaults(&signal, -0.1, 1.0).is_err());
    }
}
