//! # 批量执行器
//!
//! 并行执行批量寻峰任务。每个文件的寻峰本身是单线程的，并行只发生在文件之间。
//!
//! ## 功能
//! - 基于 rayon 的并行迭代
//! - 进度条显示
//! - 错误收集与汇总报告（顺序与输入文件列表一致）
//!
//! ## 依赖关系
//! - 被 `commands/peaks.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::utils::progress;

use rayon::prelude::*;
use std::path::PathBuf;

/// 单个文件处理结果
#[derive(Debug, Clone)]
pub enum ProcessResult {
    /// 处理成功
    Success(String),
    /// 跳过（如文件已存在）
    Skipped(String),
    /// 处理失败
    Failed(String, String), // (文件路径, 错误信息)
}

/// 批量处理结果统计
#[derive(Debug, Default)]
pub struct BatchResult {
    /// 成功数量
    pub success: usize,
    /// 跳过数量
    pub skipped: usize,
    /// 失败数量
    pub failed: usize,
    /// 失败详情
    pub failures: Vec<(String, String)>,
}

impl BatchResult {
    /// 合并处理结果
    pub fn merge(&mut self, result: ProcessResult) {
        match result {
            ProcessResult::Success(_) => self.success += 1,
            ProcessResult::Skipped(_) => self.skipped += 1,
            ProcessResult::Failed(path, err) => {
                self.failed += 1;
                self.failures.push((path, err));
            }
        }
    }

    /// 总处理数量
    pub fn total(&self) -> usize {
        self.success + self.skipped + self.failed
    }
}

/// 批量执行器
#[derive(Debug)]
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
}

impl BatchRunner {
    /// 创建新的批量执行器，`jobs` 为 0 时使用全部 CPU
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self { jobs }
    }

    /// 作业数
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// 并行处理文件列表
    pub fn run<F>(&self, files: Vec<PathBuf>, processor: F) -> BatchResult
    where
        F: Fn(&PathBuf) -> ProcessResult + Sync + Send,
    {
        let pb = progress::create_progress_bar(files.len() as u64, "Processing");

        let work = || -> Vec<ProcessResult> {
            files
                .par_iter()
                .map(|file| {
                    if let Some(name) = file.file_name().and_then(|n| n.to_str()) {
                        pb.set_message(name.to_string());
                    }
                    let result = processor(file);
                    pb.inc(1);
                    result
                })
                .collect()
        };

        // 线程池创建失败时退回全局线程池
        let results = match rayon::ThreadPoolBuilder::new().num_threads(self.jobs).build() {
            Ok(pool) => pool.install(work),
            Err(_) => work(),
        };

        pb.finish_and_clear();

        let mut batch_result = BatchResult::default();
        for result in results {
            batch_result.merge(result);
        }
        batch_result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_run_collects_results() {
        let files = vec![
            PathBuf::from("a.xy"),
            PathBuf::from("b.xy"),
            PathBuf::from("c.xy"),
        ];
        let seen = AtomicUsize::new(0);
        let result = BatchRunner::new(2).run(files, |f| {
            seen.fetch_add(1, Ordering::Relaxed);
            match f.to_str() {
                Some("a.xy") => ProcessResult::Success("ok".to_string()),
                Some("b.xy") => ProcessResult::Skipped("exists".to_string()),
                _ => ProcessResult::Failed("c.xy".to_string(), "bad".to_string()),
            }
        });

        assert_eq!(seen.load(Ordering::Relaxed), 3);
        assert_eq!((result.success, result.skipped, result.failed), (1, 1, 1));
        assert_eq!(result.total(), 3);
        assert_eq!(result.failures[0].0, "c.xy");
    }

    #[test]
    fn test_failures_keep_input_order() {
        let files: Vec<PathBuf> = (0..40).map(|i| PathBuf::from(format!("{:02}.xy", i))).collect();
        let result = BatchRunner::new(4).run(files, |f| {
            let name = f.display().to_string();
            ProcessResult::Failed(name, "bad".to_string())
        });

        assert_eq!(result.failed, 40);
        let names: Vec<&str> = result.failures.iter().map(|(p, _)| p.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_zero_jobs_uses_all_cpus() {
        assert_eq!(BatchRunner::new(0).jobs(), num_cpus::get());
        assert_eq!(BatchRunner::new(3).jobs(), 3);
    }
}
