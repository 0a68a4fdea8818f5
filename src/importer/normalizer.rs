// ==========================================
// Excel 批量入库引擎 - 工作表正规化
// ==========================================
// 职责: 原始矩阵 -> 表头 + 有序行数据
// 约定: 第 1 物理行为标题行（忽略），第 2 行为表头，第 3 行起为数据
// ==========================================

use crate::domain::cell::CellValue;
use crate::domain::sheet::{RawGrid, SheetData};
use crate::importer::error::{ImportError, ImportResult};
use std::collections::{BTreeSet, HashMap, HashSet};

/// 正规化单个工作表
///
/// 步骤:
/// 1. 校验至少 2 物理行（1: 标题, 2: 表头）
/// 2. 从第 2 行提取表头（TRIM 后的列名），重复列名直接报错
/// 3. 第 3 行起为数据行，全空白行整行丢弃
/// 4. 逐单元应用默认值替换与 NULL 哨兵消毒
/// 5. 校验 expected_columns 均出现在表头中
///
/// 单元格取值优先级:
/// - 空单元 -> 默认值，无默认值则 NULL
/// - 纯空白字符串 -> 默认值优先于哨兵匹配，无默认值时仍参与哨兵比较
/// - TRIM + 大写后命中哨兵 -> NULL
/// - 其余保留原值（不强制 TRIM，仅比较时 TRIM）
pub fn normalize_sheet(
    grid: &RawGrid,
    sheet_name: &str,
    expected_columns: Option<&BTreeSet<String>>,
    default_values: Option<&HashMap<String, CellValue>>,
    null_sentinels: Option<&HashSet<String>>,
) -> ImportResult<SheetData> {
    if grid.len() < 2 {
        return Err(ImportError::SheetHeaderError {
            sheet: sheet_name.to_string(),
        });
    }

    // 表头: 第 2 物理行
    let columns: Vec<String> = grid[1].iter().map(|c| c.as_header()).collect();

    // 重复列名直接失败（工作表级校验错误）
    let mut seen: HashSet<&str> = HashSet::new();
    let mut duplicates: BTreeSet<String> = BTreeSet::new();
    for col in &columns {
        if !seen.insert(col.as_str()) {
            duplicates.insert(col.clone());
        }
    }
    if !duplicates.is_empty() {
        return Err(ImportError::DuplicateColumns {
            sheet: sheet_name.to_string(),
            columns: duplicates.into_iter().collect(),
        });
    }

    // expected_columns 校验（排序后输出，保证报错内容确定）
    if let Some(expected) = expected_columns {
        let present: HashSet<&str> = columns.iter().map(|c| c.as_str()).collect();
        let missing: Vec<String> = expected
            .iter()
            .filter(|c| !present.contains(c.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::MissingColumns {
                sheet: sheet_name.to_string(),
                columns: missing,
            });
        }
    }

    // 数据行: 第 3 物理行起
    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    for raw in grid.iter().skip(2) {
        // 全空白行整行丢弃（不计数、不输出）
        if raw.iter().all(CellValue::is_blank) {
            continue;
        }

        let mut row: Vec<CellValue> = Vec::with_capacity(columns.len());
        for (idx, col) in columns.iter().enumerate() {
            let cell = raw.get(idx).unwrap_or(&CellValue::Null);
            row.push(normalize_cell(cell, col, default_values, null_sentinels));
        }
        rows.push(row);
    }

    Ok(SheetData {
        sheet_name: sheet_name.to_string(),
        columns,
        rows,
    })
}

/// 单元格级正规化
fn normalize_cell(
    cell: &CellValue,
    column: &str,
    default_values: Option<&HashMap<String, CellValue>>,
    null_sentinels: Option<&HashSet<String>>,
) -> CellValue {
    let default_for = |col: &str| default_values.and_then(|d| d.get(col)).cloned();

    match cell {
        CellValue::Null => default_for(column).unwrap_or(CellValue::Null),
        CellValue::Text(s) => {
            let trimmed = s.trim();
            // 纯空白: 默认值优先于哨兵匹配
            if trimmed.is_empty() {
                if let Some(default) = default_for(column) {
                    return default;
                }
            }
            let upper = trimmed.to_uppercase();
            if null_sentinels.map(|s| s.contains(&upper)).unwrap_or(false) {
                return CellValue::Null;
            }
            cell.clone()
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn grid(rows: Vec<Vec<CellValue>>) -> RawGrid {
        rows
    }

    fn sample_grid() -> RawGrid {
        grid(vec![
            vec![text("用户清单"), CellValue::Null],
            vec![text(" name "), text("age")],
            vec![text("Alice"), CellValue::Integer(30)],
            vec![CellValue::Null, CellValue::Null],
            vec![text("Bob"), CellValue::Integer(25)],
        ])
    }

    #[test]
    fn test_header_from_second_row_trimmed() {
        let data = normalize_sheet(&sample_grid(), "Users", None, None, None).unwrap();
        assert_eq!(data.columns, vec!["name".to_string(), "age".to_string()]);
    }

    #[test]
    fn test_blank_rows_dropped() {
        let data = normalize_sheet(&sample_grid(), "Users", None, None, None).unwrap();
        // 5 物理行 - 2 - 1 空白行 = 2
        assert_eq!(data.row_count(), 2);
        assert_eq!(data.rows[0][0], text("Alice"));
        assert_eq!(data.rows[1][0], text("Bob"));
    }

    #[test]
    fn test_fewer_than_two_rows_is_header_error() {
        let g = grid(vec![vec![text("只有标题")]]);
        let result = normalize_sheet(&g, "Users", None, None, None);
        assert!(matches!(
            result,
            Err(ImportError::SheetHeaderError { .. })
        ));
    }

    #[test]
    fn test_null_sentinel_normalizes_to_null() {
        let g = grid(vec![
            vec![text("t")],
            vec![text("name")],
            vec![text(" null ")],
            vec![text("NULL")],
            vec![text("keep")],
        ]);
        let sentinels: HashSet<String> = HashSet::from(["NULL".to_string()]);
        let data = normalize_sheet(&g, "S", None, None, Some(&sentinels)).unwrap();
        assert_eq!(data.rows[0][0], CellValue::Null);
        assert_eq!(data.rows[1][0], CellValue::Null);
        assert_eq!(data.rows[2][0], text("keep"));
    }

    #[test]
    fn test_na_like_literals_preserved_without_sentinels() {
        // 未配置哨兵时 NA 类字面量原样保留，不做类型推断
        let g = grid(vec![
            vec![text("t"), text("t2"), text("t3")],
            vec![text("a"), text("b"), text("c")],
            vec![text("NA"), text("N/A"), text("null")],
        ]);
        let data = normalize_sheet(&g, "S", None, None, None).unwrap();
        assert_eq!(data.rows[0][0], text("NA"));
        assert_eq!(data.rows[0][1], text("N/A"));
        assert_eq!(data.rows[0][2], text("null"));
    }

    #[test]
    fn test_sentinel_beats_default_for_non_blank_values() {
        let g = grid(vec![
            vec![text("t")],
            vec![text("status")],
            vec![text("N/A")],
        ]);
        let mut defaults = HashMap::new();
        defaults.insert("status".to_string(), text("NEW"));
        let sentinels: HashSet<String> = HashSet::from(["N/A".to_string()]);
        let data = normalize_sheet(&g, "S", None, Some(&defaults), Some(&sentinels)).unwrap();
        assert_eq!(data.rows[0][0], CellValue::Null);
    }

    #[test]
    fn test_whitespace_only_without_default_hits_empty_sentinel() {
        // 无默认值的纯空白单元仍参与哨兵比较（TRIM 后为空串）
        let g = grid(vec![
            vec![text("t")],
            vec![text("status")],
            vec![text("   ")],
        ]);
        let sentinels: HashSet<String> = HashSet::from(["".to_string()]);
        let data = normalize_sheet(&g, "S", None, None, Some(&sentinels)).unwrap();
        assert_eq!(data.rows[0][0], CellValue::Null);
    }

    #[test]
    fn test_whitespace_only_without_default_or_sentinel_kept_raw() {
        let g = grid(vec![
            vec![text("t")],
            vec![text("status")],
            vec![text("   ")],
        ]);
        let data = normalize_sheet(&g, "S", None, None, None).unwrap();
        assert_eq!(data.rows[0][0], text("   "));
    }

    #[test]
    fn test_default_beats_sentinel_for_whitespace_only() {
        // 哨兵集合包含空串也不例外: 纯空白且有默认值时默认值获胜
        let g = grid(vec![
            vec![text("t"), text("t2")],
            vec![text("status"), text("other")],
            vec![text("   "), text("x")],
        ]);
        let mut defaults = HashMap::new();
        defaults.insert("status".to_string(), text("NEW"));
        let sentinels: HashSet<String> = HashSet::from(["".to_string()]);
        let data = normalize_sheet(&g, "S", None, Some(&defaults), Some(&sentinels)).unwrap();
        assert_eq!(data.rows[0][0], text("NEW"));
    }

    #[test]
    fn test_empty_cell_default_substitution() {
        let g = grid(vec![
            vec![text("t"), CellValue::Null],
            vec![text("name"), text("status")],
            vec![text("Alice"), CellValue::Null],
        ]);
        let mut defaults = HashMap::new();
        defaults.insert("status".to_string(), text("NEW"));
        let data = normalize_sheet(&g, "S", None, Some(&defaults), None).unwrap();
        assert_eq!(data.rows[0][1], text("NEW"));
    }

    #[test]
    fn test_empty_cell_without_default_is_null() {
        let g = grid(vec![
            vec![text("t"), CellValue::Null],
            vec![text("name"), text("status")],
            vec![text("Alice"), CellValue::Null],
        ]);
        let data = normalize_sheet(&g, "S", None, None, None).unwrap();
        assert_eq!(data.rows[0][1], CellValue::Null);
    }

    #[test]
    fn test_missing_expected_columns_sorted() {
        let g = sample_grid();
        let expected: BTreeSet<String> = BTreeSet::from([
            "zeta".to_string(),
            "age".to_string(),
            "alpha".to_string(),
        ]);
        match normalize_sheet(&g, "Users", Some(&expected), None, None) {
            Err(ImportError::MissingColumns { sheet, columns }) => {
                assert_eq!(sheet, "Users");
                assert_eq!(columns, vec!["alpha".to_string(), "zeta".to_string()]);
            }
            other => panic!("期望 MissingColumns, 实际 {:?}", other.map(|d| d.columns)),
        }
    }

    #[test]
    fn test_duplicate_header_fails_fast() {
        let g = grid(vec![
            vec![text("t"), CellValue::Null],
            vec![text("name"), text("name")],
            vec![text("a"), text("b")],
        ]);
        match normalize_sheet(&g, "Users", None, None, None) {
            Err(ImportError::DuplicateColumns { columns, .. }) => {
                assert_eq!(columns, vec!["name".to_string()]);
            }
            other => panic!("期望 DuplicateColumns, 实际 {:?}", other.map(|d| d.columns)),
        }
    }

    #[test]
    fn test_short_row_padded_with_nulls() {
        let g = grid(vec![
            vec![text("t"), CellValue::Null],
            vec![text("name"), text("age")],
            vec![text("Alice")],
        ]);
        let data = normalize_sheet(&g, "S", None, None, None).unwrap();
        assert_eq!(data.rows[0].len(), 2);
        assert_eq!(data.rows[0][1], CellValue::Null);
    }

    #[test]
    fn test_stored_value_not_trimmed() {
        let g = grid(vec![
            vec![text("t")],
            vec![text("name")],
            vec![text("  Alice  ")],
        ]);
        let data = normalize_sheet(&g, "S", None, None, None).unwrap();
        assert_eq!(data.rows[0][0], text("  Alice  "));
    }
}
