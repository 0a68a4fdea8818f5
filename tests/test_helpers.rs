// ==========================================
// Excel 批量入库引擎 - 集成测试共享辅助
// ==========================================
// 用法: 各集成测试文件通过 `mod test_helpers;` 引入
// ==========================================

#![allow(dead_code)]

use excel_bulk_import::domain::{CellValue, RawGrid};
use excel_bulk_import::importer::{ImportError, ImportResult, WorkbookReader};
use excel_bulk_import::repository::{ReturnedRows, StoreHandle};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::path::Path;

// ==========================================
// 单元格构造
// ==========================================

pub fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

pub fn int(i: i64) -> CellValue {
    CellValue::Integer(i)
}

pub fn null() -> CellValue {
    CellValue::Null
}

/// 文本矩阵 -> 原始矩阵（标题行 + 表头行 + 数据行）
pub fn grid(rows: &[&[&str]]) -> RawGrid {
    rows.iter()
        .map(|row| row.iter().map(|s| text(s)).collect())
        .collect()
}

// ==========================================
// MockWorkbookReader - 内存工作簿
// ==========================================

/// 文件名 -> 工作表矩阵 的内存读取器
#[derive(Default)]
pub struct MockWorkbookReader {
    workbooks: HashMap<String, IndexMap<String, RawGrid>>,
    /// 解析失败注入（文件名 -> 错误消息）
    parse_failures: HashMap<String, String>,
}

impl MockWorkbookReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workbook(mut self, file_name: &str, sheets: Vec<(&str, RawGrid)>) -> Self {
        let mut map = IndexMap::new();
        for (name, grid) in sheets {
            map.insert(name.to_string(), grid);
        }
        self.workbooks.insert(file_name.to_string(), map);
        self
    }

    pub fn with_parse_failure(mut self, file_name: &str, message: &str) -> Self {
        self.parse_failures
            .insert(file_name.to_string(), message.to_string());
        self
    }
}

impl WorkbookReader for MockWorkbookReader {
    fn read_workbook(
        &self,
        path: &Path,
        target_sheets: Option<&HashSet<String>>,
    ) -> ImportResult<IndexMap<String, RawGrid>> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if let Some(message) = self.parse_failures.get(&file_name) {
            return Err(ImportError::ExcelParseError(message.clone()));
        }

        let Some(sheets) = self.workbooks.get(&file_name) else {
            return Err(ImportError::FileNotFound(file_name));
        };

        let mut out = IndexMap::new();
        for (name, grid) in sheets {
            if let Some(targets) = target_sheets {
                if !targets.contains(name) {
                    continue;
                }
            }
            out.insert(name.clone(), grid.clone());
        }
        Ok(out)
    }
}

// ==========================================
// RecordingStore - 记录调用的存储桩
// ==========================================

/// 一次插入调用的完整记录
#[derive(Debug, Clone)]
pub struct InsertCall {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    pub returning: bool,
}

/// 记录事务指令与插入调用，支持脚本化 RETURNING 与失败注入
#[derive(Default)]
pub struct RecordingStore {
    pub tx_log: Vec<&'static str>,
    pub inserts: Vec<InsertCall>,
    /// 表名 -> RETURNING 行集脚本
    pub returning_script: HashMap<String, ReturnedRows>,
    /// 插入失败注入（表名 -> 错误消息）
    pub insert_failures: HashMap<String, String>,
    pub fail_commit: bool,
    pub fail_begin: bool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_returning(mut self, table: &str, columns: &[&str], rows: Vec<Vec<CellValue>>) -> Self {
        self.returning_script.insert(
            table.to_string(),
            ReturnedRows {
                columns: columns.iter().map(|s| s.to_string()).collect(),
                rows,
            },
        );
        self
    }

    pub fn with_insert_failure(mut self, table: &str, message: &str) -> Self {
        self.insert_failures
            .insert(table.to_string(), message.to_string());
        self
    }
}

impl StoreHandle for RecordingStore {
    fn begin(&mut self) -> excel_bulk_import::repository::RepositoryResult<()> {
        if self.fail_begin {
            return Err(
                excel_bulk_import::repository::RepositoryError::DatabaseTransactionError(
                    "begin 注入失败".to_string(),
                ),
            );
        }
        self.tx_log.push("begin");
        Ok(())
    }

    fn commit(&mut self) -> excel_bulk_import::repository::RepositoryResult<()> {
        if self.fail_commit {
            return Err(
                excel_bulk_import::repository::RepositoryError::DatabaseTransactionError(
                    "commit 注入失败".to_string(),
                ),
            );
        }
        self.tx_log.push("commit");
        Ok(())
    }

    fn rollback(&mut self) -> excel_bulk_import::repository::RepositoryResult<()> {
        self.tx_log.push("rollback");
        Ok(())
    }

    fn execute_batch_insert(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<CellValue>],
        returning: bool,
        _page_size: usize,
    ) -> excel_bulk_import::repository::RepositoryResult<(usize, Option<ReturnedRows>)> {
        if let Some(message) = self.insert_failures.get(table) {
            return Err(
                excel_bulk_import::repository::RepositoryError::DatabaseQueryError(
                    message.clone(),
                ),
            );
        }

        self.inserts.push(InsertCall {
            table: table.to_string(),
            columns: columns.to_vec(),
            rows: rows.to_vec(),
            returning,
        });

        let returned = if returning {
            Some(
                self.returning_script
                    .get(table)
                    .cloned()
                    .unwrap_or(ReturnedRows {
                        columns: Vec::new(),
                        rows: Vec::new(),
                    }),
            )
        } else {
            None
        };
        Ok((rows.len(), returned))
    }
}

// ==========================================
// 目录与配置构造
// ==========================================

/// 在目录下创建空的占位 .xlsx 文件（目录扫描用，读取经 MockWorkbookReader）
pub fn touch_xlsx(dir: &Path, names: &[&str]) {
    for name in names {
        std::fs::write(dir.join(name), b"placeholder").expect("创建占位文件失败");
    }
}

/// 读取目录下唯一一个错误日志文件的全部行
pub fn read_error_log_lines(dir: &Path) -> Vec<serde_json::Value> {
    let mut log_files: Vec<_> = std::fs::read_dir(dir)
        .expect("读取日志目录失败")
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with("errors-"))
                .unwrap_or(false)
        })
        .collect();
    assert_eq!(log_files.len(), 1, "期望恰好一个错误日志文件");
    let content = std::fs::read_to_string(log_files.remove(0)).expect("读取错误日志失败");
    content
        .lines()
        .map(|line| serde_json::from_str(line).expect("错误日志行不是合法 JSON"))
        .collect()
}
