//! # peaks 子命令实现
//!
//! 读取实测衍射数据，递归寻峰并计算每个峰的 Scherrer 宽度。
//!
//! ## 功能
//! - 支持单文件和批量目录处理（文件间并行，带进度条）
//! - 可选预处理（背景扣除 / 平滑）
//! - 终端打印峰表与被跳过峰的诊断
//! - 导出峰表 CSV
//!
//! ## 依赖关系
//! - 使用 `cli/peaks.rs` 定义的 PeaksArgs
//! - 使用 `batch/` 模块进行批量处理
//! - 使用 `xrd/search.rs` 寻峰，`xrd/export.rs` 导出
//! - 使用 `parsers/` 读取数据

use super::apply_preprocessing;
use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::options::PreprocessOptions;
use crate::cli::peaks::PeaksArgs;
use crate::error::{Result, XrdScanError};
use crate::models::ScherrerRecord;
use crate::parsers;
use crate::utils::output;
use crate::xrd::lines::bragg_d_spacing;
use crate::xrd::search::{self, PeakReport};
use crate::xrd::{self, FitOptions, SearchLimits, SearchOptions};

use std::fs;
use std::path::{Path, PathBuf};

/// 批量模式默认输出目录
const DEFAULT_BATCH_OUTPUT: &str = "xrdscan_peaks";

/// 一次运行中所有文件共用的分析配置
struct PeakSettings {
    height_fraction: f64,
    trough_distance: f64,
    search: SearchOptions,
    preprocess: PreprocessOptions,
}

impl PeakSettings {
    fn from_args(args: &PeaksArgs) -> Result<Self> {
        let model = args.model.to_params().map_err(XrdScanError::InvalidArgument)?;
        Ok(Self {
            height_fraction: args.height_fraction,
            trough_distance: args.trough_distance,
            search: SearchOptions {
                shape: args.fit.shape.into(),
                model,
                fit: FitOptions {
                    max_iterations: args.fit.max_iterations,
                    ..FitOptions::default()
                },
                limits: SearchLimits {
                    max_depth: args.max_depth,
                    max_peaks: args.max_peaks,
                },
            },
            preprocess: args.preprocess.clone(),
        })
    }
}

/// 执行寻峰
pub fn execute(args: PeaksArgs) -> Result<()> {
    output::print_header("XRD Peak Search & Scherrer Analysis");

    let settings = PeakSettings::from_args(&args)?;

    if args.input.is_file() {
        execute_single_file(&args, &settings)
    } else if args.input.is_dir() {
        execute_batch(&args, &settings)
    } else {
        Err(XrdScanError::FileNotFound {
            path: args.input.display().to_string(),
        })
    }
}

/// 读取、预处理并寻峰
fn analyze(input: &Path, settings: &PeakSettings) -> Result<(usize, PeakReport)> {
    let signal = parsers::load_pattern(input)?;
    let (signal, _) = apply_preprocessing(signal, &settings.preprocess)?;

    let report = search::find_all_peaks(
        &signal,
        settings.height_fraction,
        settings.trough_distance,
        &settings.search,
    )?;
    Ok((signal.len(), report))
}

/// 单文件模式
fn execute_single_file(args: &PeaksArgs, settings: &PeakSettings) -> Result<()> {
    output::print_info(&format!("Single file mode: '{}'", args.input.display()));
    output::print_info(&format!(
        "Shape: {}, K = {}, λ = {:.5} nm",
        settings.search.shape, settings.search.model.shape_factor, settings.search.model.wavelength_ka
    ));

    let (samples, report) = match analyze(&args.input, settings) {
        Ok(r) => r,
        Err(XrdScanError::RecursionLimitExceeded { limit, partial }) => {
            output::print_warning("Search aborted, showing peaks found so far");
            print_peak_table(&partial.records, settings.search.model.wavelength_ka);
            return Err(XrdScanError::RecursionLimitExceeded { limit, partial });
        }
        Err(e) => return Err(e),
    };

    output::print_success(&format!(
        "Analyzed {} samples, threshold = {:.2}",
        samples, report.threshold
    ));

    print_peak_table(&report.records, settings.search.model.wavelength_ka);
    print_diagnostics(&report, args.verbose);

    if let Some(ref out) = args.output {
        if out.exists() && !args.overwrite {
            output::print_skip(&format!(
                "Output exists, not overwriting: {} (use --overwrite)",
                out.display()
            ));
        } else {
            xrd::export::peaks_to_csv(&report.records, settings.search.model.wavelength_ka, out)?;
            output::print_success(&format!("Peak table saved to '{}'", out.display()));
        }
    }

    output::print_done(&format!("{} peaks found", report.records.len()));
    Ok(())
}

/// 批量处理模式
fn execute_batch(args: &PeaksArgs, settings: &PeakSettings) -> Result<()> {
    output::print_info(&format!("Batch mode: directory '{}'", args.input.display()));

    let files = FileCollector::new(args.input.clone())
        .with_pattern(&args.pattern)
        .recursive(args.recursive)
        .collect();

    if files.is_empty() {
        output::print_warning(&format!(
            "No matching files found with pattern '{}'",
            args.pattern
        ));
        return Ok(());
    }

    output::print_info(&format!("Found {} pattern files", files.len()));

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BATCH_OUTPUT));
    fs::create_dir_all(&output_dir).map_err(|e| XrdScanError::FileWriteError {
        path: output_dir.display().to_string(),
        source: e,
    })?;

    let runner = BatchRunner::new(args.jobs);
    output::print_info(&format!("Using {} parallel jobs", runner.jobs()));

    let result = runner.run(files, |file| {
        process_batch_file(file, &output_dir, settings, args.overwrite)
    });

    output::print_separator();
    output::print_success(&format!(
        "Batch complete: {} success, {} skipped, {} failed",
        result.success, result.skipped, result.failed
    ));

    if !result.failures.is_empty() {
        output::print_warning("Failed files:");
        for (path, err) in result.failures.iter().take(10) {
            output::print_error(&format!("  {}: {}", path, err));
        }
        if result.failures.len() > 10 {
            output::print_warning(&format!("  ... and {} more", result.failures.len() - 10));
        }
    }

    Ok(())
}

/// 处理批量模式中的单个文件
fn process_batch_file(
    input: &Path,
    output_dir: &Path,
    settings: &PeakSettings,
    overwrite: bool,
) -> ProcessResult {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let output_file = output_dir.join(format!("{}_peaks.csv", stem));

    if output_file.exists() && !overwrite {
        return ProcessResult::Skipped(format!(
            "Output exists, skipping: {}",
            output_file.display()
        ));
    }

    let report = match analyze(input, settings) {
        Ok((_, report)) => report,
        Err(e) => return ProcessResult::Failed(input.display().to_string(), e.to_string()),
    };

    match xrd::export::peaks_to_csv(&report.records, settings.search.model.wavelength_ka, &output_file) {
        Ok(()) => ProcessResult::Success(format!(
            "{} -> {} ({} peaks, {} skipped)",
            input.display(),
            output_file.display(),
            report.records.len(),
            report.diagnostics.len()
        )),
        Err(e) => ProcessResult::Failed(input.display().to_string(), e.to_string()),
    }
}

/// 打印峰表
fn print_peak_table(records: &[ScherrerRecord], wavelength: f64) {
    use tabled::{Table, Tabled};

    #[derive(Tabled)]
    struct PeakRow {
        #[tabled(rename = "#")]
        index: usize,
        #[tabled(rename = "2θ (°)")]
        two_theta: String,
        #[tabled(rename = "d (nm)")]
        d_spacing: String,
        #[tabled(rename = "Intensity")]
        intensity: String,
        #[tabled(rename = "Scherrer τ (nm)")]
        width: String,
    }

    let rows: Vec<PeakRow> = records
        .iter()
        .enumerate()
        .map(|(i, r)| PeakRow {
            index: i + 1,
            two_theta: format!("{:.3}", r.center_x),
            d_spacing: format!("{:.5}", bragg_d_spacing(r.center_x, wavelength)),
            intensity: format!("{:.1}", r.peak_intensity),
            width: format!("{:.2}", r.scherrer_width),
        })
        .collect();

    if rows.is_empty() {
        output::print_warning("No peaks above threshold");
        return;
    }

    output::print_header(&format!("{} Peaks", rows.len()));
    println!("{}", Table::new(&rows));
}

/// 打印被跳过的峰与搜索统计
fn print_diagnostics(report: &PeakReport, verbose: bool) {
    if !report.diagnostics.is_empty() {
        output::print_warning(&format!(
            "{} candidate peak(s) skipped{}",
            report.diagnostics.len(),
            if verbose { "" } else { " (use --verbose for details)" }
        ));
    }

    if !verbose {
        return;
    }

    for d in &report.diagnostics {
        output::print_skip(&format!(
            "{} at 2θ = {:.3}° (window {:.3}-{:.3}): {}",
            d.kind, d.peak_x, d.window.0, d.window.1, d.message
        ));
    }

    let stats = &report.stats;
    output::print_separator();
    output::print_info("Search statistics:");
    output::print_stat("Threshold", &format!("{:.2}", report.threshold));
    output::print_stat("Branches", &stats.branches.to_string());
    output::print_stat("Empty ranges", &stats.empty_terminations.to_string());
    output::print_stat("Below threshold", &stats.threshold_terminations.to_string());
    output::print_stat("Max depth", &stats.max_depth_reached.to_string());
}
