// ==========================================
// Excel 批量入库引擎 - 文件/工作表处理记录
// ==========================================
// 职责: 单文件与单工作表的处理结果（终态一次性构造，不再变更）
// 状态机: pending -> processing -> success | failed
// ==========================================

use crate::domain::mapping::SheetMapping;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// 文件处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Pending => "pending",
            FileStatus::Processing => "processing",
            FileStatus::Success => "success",
            FileStatus::Failed => "failed",
        }
    }
}

/// 单工作表处理记录
#[derive(Debug, Clone)]
pub struct SheetProcess {
    pub sheet_name: String,
    pub table_name: String,
    /// 映射配置引用（排查问题时保留上下文）
    pub mapping: SheetMapping,
    /// 被排除的库端自增列
    pub ignored_columns: BTreeSet<String>,
    /// 成功插入行数
    pub inserted_rows: usize,
    /// 工作表级错误信息
    pub error: Option<String>,
}

/// 单文件处理记录
///
/// 在文件处理结束时按终态一次性构造，之后不可变。
#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub name: String,
    pub sheets: Vec<SheetProcess>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: FileStatus,
    /// 总插入行数（不含自增列）
    pub total_rows: usize,
    /// 配置了映射但文件中不存在的工作表数
    pub skipped_sheets: usize,
    /// 文件级失败原因
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_as_str() {
        assert_eq!(FileStatus::Success.as_str(), "success");
        assert_eq!(FileStatus::Failed.as_str(), "failed");
    }
}
