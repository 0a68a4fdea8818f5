// ==========================================
// Excel 批量入库引擎 - 运行级聚合结果
// ==========================================
// 职责: 运行汇总指标（SUMMARY 输出数据源）
// ==========================================

use crate::domain::file_report::FileStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// 单文件批次耗时摘要
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total_batches: usize,
    pub avg_batch_seconds: f64,
    pub p95_batch_seconds: f64,
}

/// 单文件统计
#[derive(Debug, Clone, Serialize)]
pub struct FileStat {
    pub file_name: String,
    pub status: FileStatus,
    pub inserted_rows: usize,
    pub elapsed_seconds: f64,
    /// 批次耗时摘要（无批次时为 None）
    pub batch_summary: Option<BatchSummary>,
}

/// 运行级聚合结果
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingResult {
    pub success_files: usize,
    pub failed_files: usize,
    pub total_inserted_rows: usize,
    pub skipped_sheets: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub elapsed_seconds: f64,
    /// 吞吐量 rows/sec（耗时为 0 时恒为 0，避免除零）
    pub throughput_rows_per_sec: f64,
    pub file_stats: Vec<FileStat>,
}

impl ProcessingResult {
    /// 空目录场景的全零结果
    pub fn empty(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            success_files: 0,
            failed_files: 0,
            total_inserted_rows: 0,
            skipped_sheets: 0,
            start_time,
            end_time,
            elapsed_seconds: 0.0,
            throughput_rows_per_sec: 0.0,
            file_stats: Vec::new(),
        }
    }

    /// 处理的文件总数
    pub fn total_files(&self) -> usize {
        self.success_files + self.failed_files
    }
}
