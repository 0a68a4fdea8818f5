// ==========================================
// Excel 批量入库引擎 - 外键传播解析器
// ==========================================
// 职责: 条件 RETURNING 判定 + 父主键查找表构建 + 子行外键改写
// 决策: 仅当存在未处理的子表时才对父表插入启用 RETURNING
// ==========================================

use crate::config::loader::{FkPair, ImportConfig, SequenceRef};
use crate::domain::cell::CellValue;
use crate::engine::error::FkPropagationError;
use std::collections::{HashMap, HashSet};

/// 约定的父表主键列名回退
pub const DEFAULT_PK_COLUMN: &str = "id";

/// 已解析的单条父子传播关系
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FkPropagationMap {
    pub parent_table: String,
    /// 父表中用于匹配行的标识列（非主键，如名称列）
    pub parent_identifier_column: String,
    pub child_table: String,
    /// 子表中待覆盖的外键列
    pub child_fk_column: String,
    /// 父表生成主键列（由 sequences 推断，缺省回退 DEFAULT_PK_COLUMN）
    pub parent_pk_column: String,
}

/// 判定对该表的插入是否需要 RETURNING（生成主键捕获）
///
/// 当且仅当存在某条 parent -> child 配置满足:
/// parent_table == table 且对应 child_table 尚未处理。
/// 同一父表的多个子表各自独立判定。
pub fn needs_returning(
    table_name: &str,
    fk_pairs: &[FkPair],
    processed_tables: &HashSet<String>,
) -> bool {
    for pair in fk_pairs {
        let Some((parent_table, _)) = pair.parent.split_once('.') else {
            continue;
        };
        if parent_table != table_name {
            continue;
        }
        let Some((child_table, _)) = pair.child.split_once('.') else {
            continue;
        };
        if !processed_tables.contains(child_table) {
            return true;
        }
    }
    false
}

/// 从运行配置构建全部传播关系（每次运行一次）
///
/// "table.column" 任一侧缺少点号的条目静默跳过（容忍畸形配置，不致命）。
pub fn build_fk_propagation_maps(config: &ImportConfig) -> Vec<FkPropagationMap> {
    let mut maps = Vec::new();

    for pair in config.fk_pairs() {
        let Some((parent_table, parent_identifier)) = pair.parent.split_once('.') else {
            continue;
        };
        let Some((child_table, child_fk_column)) = pair.child.split_once('.') else {
            continue;
        };

        maps.push(FkPropagationMap {
            parent_table: parent_table.to_string(),
            parent_identifier_column: parent_identifier.to_string(),
            child_table: child_table.to_string(),
            child_fk_column: child_fk_column.to_string(),
            parent_pk_column: infer_parent_pk_column(config, parent_table),
        });
    }

    maps
}

/// 由 sequences 参照表推断父表的生成主键列名
///
/// 优先级: sequences 中存在 "<parent_table>.<column>" 键 -> 取该 column；
/// 若对应值为带 column 字段的映射 -> 取该字段；否则回退约定列名。
fn infer_parent_pk_column(config: &ImportConfig, parent_table: &str) -> String {
    for (key, value) in &config.sequences {
        let Some((table, column)) = key.split_once('.') else {
            continue;
        };
        if table != parent_table {
            continue;
        }
        if let SequenceRef::Detailed {
            column: Some(explicit),
            ..
        } = value
        {
            return explicit.clone();
        }
        return column.to_string();
    }
    DEFAULT_PK_COLUMN.to_string()
}

/// 由父表插入的返回行集构建 标识值 -> 生成主键 查找表
///
/// 列数不足以同时读出主键列与标识列的返回行被静默丢弃
/// （畸形返回行不中止运行，只是不进入映射）。
pub fn build_parent_pk_map(
    returned_rows: &[Vec<CellValue>],
    pk_column_index: usize,
    identifier_column_index: usize,
) -> HashMap<String, CellValue> {
    let required = pk_column_index.max(identifier_column_index);
    let mut pk_map = HashMap::new();

    for row in returned_rows {
        if row.len() <= required {
            continue;
        }
        pk_map.insert(
            row[identifier_column_index].lookup_key(),
            row[pk_column_index].clone(),
        );
    }

    pk_map
}

/// 将父主键传播到子行（外键单元改写）
///
/// 要么返回与输入等长、且外键单元全部被父主键覆盖的行集，
/// 要么报错 —— 未解析的引用绝不静默放行。
pub fn propagate_foreign_keys(
    child_rows: Vec<Vec<CellValue>>,
    mapping: &FkPropagationMap,
    parent_pk_map: &HashMap<String, CellValue>,
    child_fk_column_index: usize,
    child_identifier_column_index: usize,
) -> Result<Vec<Vec<CellValue>>, FkPropagationError> {
    let required = child_fk_column_index.max(child_identifier_column_index);
    let mut propagated = Vec::with_capacity(child_rows.len());

    for mut row in child_rows {
        if row.len() <= required {
            return Err(FkPropagationError::RowTooShort {
                actual: row.len(),
                required: required + 1,
            });
        }

        let identifier = row[child_identifier_column_index].lookup_key();
        let Some(parent_pk) = parent_pk_map.get(&identifier) else {
            return Err(FkPropagationError::UnresolvedReference {
                identifier,
                parent_table: mapping.parent_table.clone(),
            });
        };

        row[child_fk_column_index] = parent_pk.clone();
        propagated.push(row);
    }

    Ok(propagated)
}

/// 按名称查找列下标
pub fn get_column_index(
    column_name: &str,
    columns: &[String],
) -> Result<usize, FkPropagationError> {
    columns
        .iter()
        .position(|c| c == column_name)
        .ok_or_else(|| FkPropagationError::ColumnNotFound {
            column: column_name.to_string(),
            columns: columns.to_vec(),
        })
}
