// ==========================================
// Excel 批量入库引擎 - 工作簿读取器
// ==========================================
// 职责: 打开 .xlsx 工作簿，按映射过滤工作表，产出原始单元格矩阵
// 支持: Excel (.xlsx)
// ==========================================

use crate::domain::cell::CellValue;
use crate::domain::sheet::RawGrid;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook, Reader, Xlsx};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// 工作簿读取接口
///
/// 编排器通过该接口消费工作簿内容，测试可注入内存构造的矩阵。
/// 单元格的字符串在此处不做 NA 类推断，字面量一律原样保留。
pub trait WorkbookReader {
    /// 读取工作簿，返回 工作表名 -> 原始矩阵（保持工作簿内顺序）
    ///
    /// # 参数
    /// - path: 工作簿文件路径
    /// - target_sheets: 限定读取的工作表名集合（None 为全部）
    fn read_workbook(
        &self,
        path: &Path,
        target_sheets: Option<&HashSet<String>>,
    ) -> ImportResult<IndexMap<String, RawGrid>>;
}

// ==========================================
// ExcelWorkbookReader - calamine 实现
// ==========================================
pub struct ExcelWorkbookReader;

impl WorkbookReader for ExcelWorkbookReader {
    fn read_workbook(
        &self,
        path: &Path,
        target_sheets: Option<&HashSet<String>>,
    ) -> ImportResult<IndexMap<String, RawGrid>> {
        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        // 检查扩展名
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if ext != "xlsx" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        // 打开 Excel 文件
        let mut workbook: Xlsx<_> = open_workbook(path)?;

        let mut grids: IndexMap<String, RawGrid> = IndexMap::new();
        let sheet_names = workbook.sheet_names().to_vec();

        for sheet_name in sheet_names {
            if let Some(targets) = target_sheets {
                if !targets.contains(&sheet_name) {
                    continue;
                }
            }

            let range = workbook
                .worksheet_range(&sheet_name)
                .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

            let grid: RawGrid = range
                .rows()
                .map(|row| row.iter().map(CellValue::from).collect())
                .collect();

            debug!(sheet = %sheet_name, rows = grid.len(), "工作表读取完成");
            grids.insert(sheet_name, grid);
        }

        Ok(grids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_workbook_file_not_found() {
        let reader = ExcelWorkbookReader;
        let result = reader.read_workbook(Path::new("non_existent.xlsx"), None);
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_read_workbook_unsupported_extension() {
        let f = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
        let reader = ExcelWorkbookReader;
        let result = reader.read_workbook(f.path(), None);
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_read_workbook_corrupt_file() {
        // 非 zip 内容的 .xlsx 应报解析失败
        let f = tempfile::NamedTempFile::with_suffix(".xlsx").unwrap();
        std::fs::write(f.path(), b"not a real workbook").unwrap();
        let reader = ExcelWorkbookReader;
        let result = reader.read_workbook(f.path(), None);
        assert!(matches!(result, Err(ImportError::ExcelParseError(_))));
    }
}
