//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑，以及子命令共用的参数解析与预处理。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `parsers/`, `xrd/`, `utils/`
//! - 子模块: peaks, inspect, preprocess

pub mod inspect;
pub mod peaks;
pub mod preprocess;

use crate::cli::options::PreprocessOptions;
use crate::cli::Commands;
use crate::error::{Result, XrdScanError};
use crate::models::Signal;
use crate::xrd::{moving_average, BackgroundSubtractor, ForwardDifference, InterpolatedBackground};

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Peaks(args) => peaks::execute(args),
        Commands::Peak(args) => inspect::execute_peak(args),
        Commands::Lines(args) => inspect::execute_lines(args),
        Commands::Ratio(args) => inspect::execute_ratio(args),
        Commands::Preprocess(args) => preprocess::execute(args),
    }
}

/// 解析 2θ 范围 "a-b"
pub fn parse_range(range: &str) -> Result<(f64, f64)> {
    let parts: Vec<&str> = range.split('-').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(XrdScanError::InvalidRange(range.to_string()));
    }

    let min: f64 = parts[0]
        .parse()
        .map_err(|_| XrdScanError::InvalidRange(range.to_string()))?;
    let max: f64 = parts[1]
        .parse()
        .map_err(|_| XrdScanError::InvalidRange(range.to_string()))?;

    if min < 0.0 || max <= min || max > 180.0 {
        return Err(XrdScanError::InvalidRange(format!(
            "{} (must be 0 <= min < max <= 180)",
            range
        )));
    }

    Ok((min, max))
}

/// 解析背景锚点 "x:y,x:y,..."
pub fn parse_background_points(input: &str) -> Result<Vec<(f64, f64)>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|pair| -> Result<(f64, f64)> {
            let (x, y) = pair.split_once(':').ok_or_else(|| {
                XrdScanError::InvalidArgument(format!("background point '{}' is not 'x:y'", pair))
            })?;
            let parse = |v: &str| {
                v.trim().parse::<f64>().map_err(|_| {
                    XrdScanError::InvalidArgument(format!("invalid number in background point '{}'", pair))
                })
            };
            Ok((parse(x)?, parse(y)?))
        })
        .collect()
}

/// 按参数依次扣背景、平滑
///
/// 返回处理后的信号和每一步的说明（用于导出文件的注释头）。
pub fn apply_preprocessing(signal: Signal, options: &PreprocessOptions) -> Result<(Signal, Vec<String>)> {
    let mut steps = Vec::new();
    let mut signal = signal;

    if let Some(tol) = options.backsub {
        signal = ForwardDifference::new(tol).subtract(&signal)?;
        steps.push(format!("background subtracted (window difference, tol = {})", tol));
    }

    if let Some(ref points) = options.background_points {
        let background = InterpolatedBackground::new(parse_background_points(points)?)?;
        signal = background.subtract(&signal)?;
        steps.push(format!("background subtracted (anchors {})", points));
    }

    if let Some(n) = options.smooth {
        signal = moving_average(&signal, n)?;
        steps.push(format!("smoothed ({}-point moving average)", n));
    }

    Ok((signal, steps))
}
