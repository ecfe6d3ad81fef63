//! # preprocess 子命令实现
//!
//! 对衍射数据做背景扣除 / 平滑后导出为 XY 或 CSV。
//!
//! ## 依赖关系
//! - 使用 `cli/preprocess.rs` 定义的 PreprocessArgs
//! - 使用 `xrd/background.rs`（经 `apply_preprocessing`）与 `xrd/export.rs`

use super::apply_preprocessing;
use crate::cli::preprocess::PreprocessArgs;
use crate::error::{Result, XrdScanError};
use crate::parsers;
use crate::utils::output;
use crate::xrd;

/// 执行预处理
pub fn execute(args: PreprocessArgs) -> Result<()> {
    output::print_header("Pattern Pre-processing");

    if args.options.is_empty() {
        return Err(XrdScanError::InvalidArgument(
            "nothing to do: pass --smooth, --backsub or --background-points".to_string(),
        ));
    }

    if args.output.exists() && !args.overwrite {
        output::print_skip(&format!(
            "Output exists, not overwriting: {} (use --overwrite)",
            args.output.display()
        ));
        return Ok(());
    }

    let signal = parsers::load_pattern(&args.input)?;
    output::print_success(&format!(
        "Loaded '{}' ({} samples)",
        signal.name,
        signal.len()
    ));

    let (signal, steps) = apply_preprocessing(signal, &args.options)?;
    for step in &steps {
        output::print_info(step);
    }

    xrd::export::signal_to_file(&signal, &steps, &args.output)?;
    output::print_success(&format!(
        "{} samples saved to '{}'",
        signal.len(),
        args.output.display()
    ));

    Ok(())
}
