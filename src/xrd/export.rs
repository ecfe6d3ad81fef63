//! # 结果导出
//!
//! 将寻峰结果、拟合曲线与预处理后的信号写出为 CSV / XY 文本。
//!
//! ## 支持格式
//! - 峰表 CSV: 2theta, d_spacing, intensity, scherrer_width（按 2θ 升序）
//! - 拟合曲线 CSV: 2theta, intensity, fit
//! - 信号 XY: `#` 注释头 + 制表符分隔两列
//! - 信号 CSV: 无表头两列，可被 `parsers::load_pattern` 重新读入
//!
//! ## 依赖关系
//! - 被 `commands/peaks.rs`, `commands/inspect.rs`, `commands/preprocess.rs` 调用
//! - 使用 `xrd/lines.rs` 计算 d 值
//! - 使用 `csv` 库写入 CSV 文件

use crate::error::{Result, XrdScanError};
use crate::models::{ScherrerRecord, Signal};
use crate::xrd::lines::bragg_d_spacing;

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

fn write_error(path: &Path) -> impl Fn(io::Error) -> XrdScanError + '_ {
    move |e| XrdScanError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    }
}

fn create(path: &Path) -> Result<File> {
    File::create(path).map_err(write_error(path))
}

/// 导出峰表为 CSV
pub fn peaks_to_csv(records: &[ScherrerRecord], wavelength: f64, output_path: &Path) -> Result<()> {
    let file = create(output_path)?;
    write_peaks(file, records, wavelength)
}

/// 写出峰表，记录应已按 2θ 升序排列
pub fn write_peaks<W: Write>(writer: W, records: &[ScherrerRecord], wavelength: f64) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(["2theta", "d_spacing", "intensity", "scherrer_width"])?;

    for r in records {
        wtr.write_record(&[
            format!("{:.4}", r.center_x),
            format!("{:.6}", bragg_d_spacing(r.center_x, wavelength)),
            format!("{:.2}", r.peak_intensity),
            format!("{:.6}", r.scherrer_width),
        ])?;
    }

    wtr.flush().map_err(|e| XrdScanError::Other(e.to_string()))?;
    Ok(())
}

/// 导出拟合窗口内的实测值与拟合曲线
pub fn curve_to_csv(xs: &[f64], observed: &[f64], fitted: &[f64], output_path: &Path) -> Result<()> {
    let file = create(output_path)?;
    write_curve(file, xs, observed, fitted)
}

pub fn write_curve<W: Write>(writer: W, xs: &[f64], observed: &[f64], fitted: &[f64]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["2theta", "intensity", "fit"])?;

    for ((x, y), f) in xs.iter().zip(observed).zip(fitted) {
        wtr.write_record(&[format!("{:.4}", x), format!("{:.4}", y), format!("{:.4}", f)])?;
    }

    wtr.flush().map_err(|e| XrdScanError::Other(e.to_string()))?;
    Ok(())
}

/// 按扩展名导出信号：`.csv` 写 CSV，其余写 XY
pub fn signal_to_file(signal: &Signal, comments: &[String], output_path: &Path) -> Result<()> {
    let is_csv = output_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    let file = create(output_path)?;
    if is_csv {
        write_signal_csv(file, signal)
    } else {
        write_signal_xy(file, signal, comments).map_err(write_error(output_path))
    }
}

/// 写出 XY 格式（注释头 + 两列）
pub fn write_signal_xy<W: Write>(mut writer: W, signal: &Signal, comments: &[String]) -> io::Result<()> {
    writeln!(writer, "# Pattern: {}", signal.name)?;
    for line in comments {
        writeln!(writer, "# {}", line)?;
    }
    writeln!(writer, "# Columns: 2theta (degrees), Intensity")?;

    for (x, y) in signal.x().iter().zip(signal.y()) {
        writeln!(writer, "{:.6}\t{:.6}", x, y)?;
    }
    writer.flush()
}

/// 写出无表头 CSV
pub fn write_signal_csv<W: Write>(writer: W, signal: &Signal) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    for (x, y) in signal.x().iter().zip(signal.y()) {
        wtr.write_record(&[format!("{:.6}", x), format!("{:.6}", y)])?;
    }
    wtr.flush().map_err(|e| XrdScanError::Other(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_peaks() {
        let records = vec![
            ScherrerRecord {
                center_x: 28.44,
                peak_intensity: 1200.0,
                scherrer_width: 25.5,
            },
            ScherrerRecord {
                center_x: 47.3,
                peak_intensity: 800.25,
                scherrer_width: 18.125,
            },
        ];
        let mut buf = Vec::new();
        write_peaks(&mut buf, &records, 0.15406).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "2theta,d_spacing,intensity,scherrer_width");
        assert!(lines[1].starts_with("28.4400,0.31"));
        assert!(lines[2].ends_with(",800.25,18.125000"));
    }

    #[test]
    fn test_write_signal_xy() {
        let s = Signal::new("demo", vec![10.0, 10.5], vec![3.0, 4.5]).unwrap();
        let mut buf = Vec::new();
        write_signal_xy(&mut buf, &s, &["smoothed: 5-point".to_string()]).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("# Pattern: demo\n# smoothed: 5-point\n"));
        assert!(text.ends_with("10.000000\t3.000000\n10.500000\t4.500000\n"));
    }

    #[test]
    fn test_write_signal_csv_has_no_header() {
        let s = Signal::new("demo", vec![1.0, 2.0], vec![5.0, 6.0]).unwrap();
        let mut buf = Vec::new();
        write_signal_csv(&mut buf, &s).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "1.000000,5.000000\n2.000000,6.000000\n");
    }

    #[test]
    fn test_write_curve() {
        let mut buf = Vec::new();
        write_curve(&mut buf, &[1.0, 2.0], &[3.0, 4.0], &[3.5, 3.75]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "2theta,intensity,fit\n1.0000,3.0000,3.5000\n2.0000,4.0000,3.7500\n");
    }
}
