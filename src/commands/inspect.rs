//! # 单峰与谱线子命令实现
//!
//! - `peak`: 在指定窗口内拟合单个峰，打印参数、标准差、协方差与峰宽
//! - `lines`: 由 Kα 峰推算 Kβ 位置
//! - `ratio`: 两区间最大强度之比
//!
//! ## 依赖关系
//! - 使用 `cli/inspect.rs` 定义的参数
//! - 使用 `xrd/fit.rs`, `xrd/width.rs`, `xrd/lines.rs`, `xrd/export.rs`
//! - 使用 `parsers/` 读取数据

use super::{apply_preprocessing, parse_range};
use crate::cli::inspect::{LinesArgs, PeakArgs, RatioArgs};
use crate::error::{Result, XrdScanError};
use crate::parsers;
use crate::utils::output;
use crate::xrd::lines::{self, bragg_d_spacing};
use crate::xrd::{self, maximum, width, FitOptions, PeakFit};

/// 执行单峰拟合
pub fn execute_peak(args: PeakArgs) -> Result<()> {
    output::print_header("Single Peak Fit");

    let model = args.model.to_params().map_err(XrdScanError::InvalidArgument)?;
    let (left, right) = parse_range(&args.range)?;

    let signal = parsers::load_pattern(&args.input)?;
    let (signal, steps) = apply_preprocessing(signal, &args.preprocess)?;
    for step in &steps {
        output::print_info(step);
    }

    let apex = maximum::find_peak_in_range(&signal, left, right)?;
    let (xs, ys) = signal.segment(signal.span(left, right));
    output::print_info(&format!(
        "Window {:.3}-{:.3}°: {} samples, maximum {:.1} at {:.3}°",
        left,
        right,
        xs.len(),
        apex.y,
        apex.x
    ));

    let options = FitOptions {
        max_iterations: args.fit.max_iterations,
        ..FitOptions::default()
    };
    let fit = xrd::fit_peak(xs, ys, args.fit.shape.into(), &options)?;
    output::print_success(&format!(
        "{} fit converged in {} iterations (SSR = {:.4e})",
        fit.peak.shape, fit.iterations, fit.residual_sum_sq
    ));

    print_fit_table(&fit);
    print_covariance(&fit);

    let analysis = width::compute_width(&fit.peak, &apex, &model)?;
    output::print_separator();
    output::print_stat(
        "FWHM",
        &format!("{:.4}° ({:.6} rad)", analysis.fwhm_deg, analysis.fwhm_rad),
    );
    output::print_stat("HWMIN", &format!("{:.4}°", analysis.half_width_minimum));
    output::print_stat(
        "d-spacing",
        &format!("{:.5} nm", bragg_d_spacing(apex.x, model.wavelength_ka)),
    );
    output::print_stat(
        "Scherrer τ",
        &format!(
            "{:.3} nm (K = {}, λ = {:.5} nm)",
            analysis.record.scherrer_width, model.shape_factor, model.wavelength_ka
        ),
    );

    if let Some(ref path) = args.curve {
        xrd::export::curve_to_csv(xs, ys, &fit.peak.curve(xs), path)?;
        output::print_success(&format!("Fitted curve saved to '{}'", path.display()));
    }

    Ok(())
}

/// 执行发射线计算
pub fn execute_lines(args: LinesArgs) -> Result<()> {
    output::print_header("Kα / Kβ Emission Lines");

    let model = args.model.to_params().map_err(XrdScanError::InvalidArgument)?;
    let ka_range = parse_range(&args.ka_range)?;
    let signal = parsers::load_pattern(&args.input)?;

    let result = lines::emission_line(&signal, ka_range, &model)?;

    output::print_stat(
        "Kα",
        &format!(
            "2θ = {:.3}°, intensity = {:.1}, d = {:.5} nm",
            result.ka.x,
            result.ka.y,
            bragg_d_spacing(result.ka.x, model.wavelength_ka)
        ),
    );
    output::print_stat(
        "Kβ",
        &format!("2θ = {:.3}° (λKβ = {:.5} nm)", result.kb_two_theta, model.wavelength_kb),
    );
    output::print_stat("Midpoint", &format!("2θ = {:.3}°", result.midpoint()));

    Ok(())
}

/// 执行强度比计算
pub fn execute_ratio(args: RatioArgs) -> Result<()> {
    output::print_header("Intensity Ratio");

    let first = parse_range(&args.first)?;
    let second = parse_range(&args.second)?;
    let signal = parsers::load_pattern(&args.input)?;

    let ratio = lines::intensity_ratio(&signal, first, second)?;
    output::print_success(&format!(
        "I({:.1}-{:.1}°) / I({:.1}-{:.1}°) = {:.4}",
        second.0, second.1, first.0, first.1, ratio
    ));

    Ok(())
}

/// 打印拟合参数表
fn print_fit_table(fit: &PeakFit) {
    use tabled::{Table, Tabled};

    #[derive(Tabled)]
    struct ParamRow {
        #[tabled(rename = "Parameter")]
        name: &'static str,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Std. error")]
        error: String,
    }

    let names = ["y-shift", "amplitude", "center (°)", "width (°)"];
    let rows: Vec<ParamRow> = names
        .iter()
        .zip(fit.peak.params())
        .zip(fit.std_errors())
        .map(|((&name, value), error)| ParamRow {
            name,
            value: format!("{:.6}", value),
            error: format!("{:.3e}", error),
        })
        .collect();

    println!("{}", Table::new(&rows));
}

/// 打印协方差矩阵
fn print_covariance(fit: &PeakFit) {
    output::print_info("Covariance matrix:");
    for i in 0..4 {
        let row: Vec<String> = (0..4)
            .map(|j| format!("{:>12.4e}", fit.covariance[(i, j)]))
            .collect();
        println!("    {}", row.join(" "));
    }
}
