// ==========================================
// Excel 批量入库引擎 - 工作表数据模型
// ==========================================
// 职责: 正规化输出的表头 + 行数据（按位置对齐）
// ==========================================

use crate::domain::cell::CellValue;

/// 未经正规化的单元格矩阵（第 1 行标题、第 2 行表头、第 3 行起数据）
pub type RawGrid = Vec<Vec<CellValue>>;

/// 正规化后的工作表数据
///
/// 不变式:
/// - `columns` 的顺序与表头行完全一致
/// - `rows` 中每行按 `columns` 位置对齐
/// - 行数 <= 物理行数 - 2（全空白行已丢弃）
#[derive(Debug, Clone, PartialEq)]
pub struct SheetData {
    pub sheet_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetData {
    /// 行数
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
