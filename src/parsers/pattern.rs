//! # 衍射图样文本解析器
//!
//! 解析两列（或多列）数值文本形式的粉末衍射数据。
//!
//! ## 格式说明
//! ```text
//! # 注释行（仅 XY）
//! 10.00   152.0
//! 10.02   149.5   ...   (第三列起忽略)
//! ```
//! - XY / DAT / TXT: 空白或制表符分隔
//! - CSV: 逗号分隔，无表头
//!
//! 2θ 降序的数据会被翻转为升序；非单调的 2θ 视为解析错误。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/signal.rs`
//! - 使用 `csv` 库读取 CSV

use crate::error::{Result, XrdScanError};
use crate::models::Signal;

fn parse_error(format: &str, source_name: &str, reason: String) -> XrdScanError {
    XrdScanError::ParseError {
        format: format.to_string(),
        source_name: source_name.to_string(),
        reason,
    }
}

fn parse_number(token: &str, format: &str, source_name: &str, line_no: usize) -> Result<f64> {
    token.trim().parse::<f64>().map_err(|_| {
        parse_error(
            format,
            source_name,
            format!("line {}: '{}' is not a number", line_no, token.trim()),
        )
    })
}

/// 解析空白分隔的 XY 文本
pub fn parse_xy_content(content: &str, name: &str) -> Result<Signal> {
    let mut x = Vec::new();
    let mut y = Vec::new();

    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            return Err(parse_error(
                "XY",
                name,
                format!("line {}: expected two columns, found {}", i + 1, parts.len()),
            ));
        }

        x.push(parse_number(parts[0], "XY", name, i + 1)?);
        y.push(parse_number(parts[1], "XY", name, i + 1)?);
    }

    into_signal(x, y, "XY", name)
}

/// 解析无表头 CSV 文本
pub fn parse_csv_content(content: &str, name: &str) -> Result<Signal> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(content.as_bytes());

    let mut x = Vec::new();
    let mut y = Vec::new();

    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let line_no = record.position().map(|p| p.line() as usize).unwrap_or(i + 1);
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        if record.len() < 2 {
            return Err(parse_error(
                "CSV",
                name,
                format!("line {}: expected two columns, found {}", line_no, record.len()),
            ));
        }

        x.push(parse_number(&record[0], "CSV", name, line_no)?);
        y.push(parse_number(&record[1], "CSV", name, line_no)?);
    }

    into_signal(x, y, "CSV", name)
}

/// 统一为升序并构造 Signal
fn into_signal(mut x: Vec<f64>, mut y: Vec<f64>, format: &str, name: &str) -> Result<Signal> {
    if x.len() >= 2 && x[0] > x[x.len() - 1] {
        x.reverse();
        y.reverse();
    }

    Signal::new(name, x, y).map_err(|e| parse_error(format, name, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_xy() {
        let content = "# header\n# Columns: 2theta, I\n\n10.0 1.5\n10.5\t2.5  99\n11.0   3.5\n";
        let s = parse_xy_content(content, "demo").unwrap();
        assert_eq!(s.name, "demo");
        assert_eq!(s.x(), &[10.0, 10.5, 11.0]);
        assert_eq!(s.y(), &[1.5, 2.5, 3.5]);
    }

    #[test]
    fn test_parse_csv() {
        let content = "10.0,1.5\n10.5, 2.5,extra\n11.0,3.5\n";
        let s = parse_csv_content(content, "demo").unwrap();
        assert_eq!(s.x(), &[10.0, 10.5, 11.0]);
        assert_eq!(s.y(), &[1.5, 2.5, 3.5]);
    }

    #[test]
    fn test_descending_is_reversed() {
        let s = parse_xy_content("12 3\n11 2\n10 1\n", "desc").unwrap();
        assert_eq!(s.x(), &[10.0, 11.0, 12.0]);
        assert_eq!(s.y(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_rejects_bad_rows() {
        assert!(matches!(
            parse_xy_content("10 1\n11\n", "bad"),
            Err(XrdScanError::ParseError { .. })
        ));
        assert!(matches!(
            parse_xy_content("10 1\nabc 2\n", "bad"),
            Err(XrdScanError::ParseError { .. })
        ));
        assert!(matches!(
            parse_csv_content("10,1\n12,2\n11,3\n", "bad"),
            Err(XrdScanError::ParseError { .. })
        ));
    }
}
