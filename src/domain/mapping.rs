// ==========================================
// Excel 批量入库引擎 - 工作表映射（领域模型）
// ==========================================
// 职责: 单个工作表 -> 目标表的已解析导入配置
// 来源: config::loader 的原始配置经 resolve 后生成
// ==========================================

use crate::domain::cell::CellValue;
use std::collections::{BTreeSet, HashMap, HashSet};

/// 已解析的工作表映射配置
///
/// 不变式: `sequence_columns` 与 `fk_propagation_columns` 语义上互斥，
/// 一个列要么库端自增、要么由父表主键传播填充。
#[derive(Debug, Clone)]
pub struct SheetMapping {
    /// Excel 工作表名
    pub sheet_name: String,
    /// 目标数据库表名
    pub table_name: String,
    /// 库端自增列（Excel 中的值直接丢弃）
    pub sequence_columns: BTreeSet<String>,
    /// 外键传播列（值由父表生成主键覆盖）
    pub fk_propagation_columns: BTreeSet<String>,
    /// 空单元默认值（列 -> 替代值）
    pub default_values: HashMap<String, CellValue>,
    /// NULL 哨兵字符串（已统一大写；None 表示沿用全局配置）
    pub null_sentinels: Option<HashSet<String>>,
    /// BLOB 列（值为文件路径，插入时读为二进制）
    pub blob_columns: BTreeSet<String>,
}

impl SheetMapping {
    /// 表头必须出现的列集合
    ///
    /// 派生规则: default_values 的键 ∪ fk_propagation_columns ∪ blob_columns，
    /// 在正规化阶段强制校验。
    pub fn expected_columns(&self) -> BTreeSet<String> {
        let mut cols: BTreeSet<String> = self.default_values.keys().cloned().collect();
        cols.extend(self.fk_propagation_columns.iter().cloned());
        cols.extend(self.blob_columns.iter().cloned());
        cols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_columns_union() {
        let mut defaults = HashMap::new();
        defaults.insert("status".to_string(), CellValue::Text("NEW".to_string()));

        let mapping = SheetMapping {
            sheet_name: "Orders".to_string(),
            table_name: "orders".to_string(),
            sequence_columns: BTreeSet::from(["order_id".to_string()]),
            fk_propagation_columns: BTreeSet::from(["customer_id".to_string()]),
            default_values: defaults,
            null_sentinels: None,
            blob_columns: BTreeSet::from(["attachment".to_string()]),
        };

        let expected = mapping.expected_columns();
        assert_eq!(
            expected,
            BTreeSet::from([
                "attachment".to_string(),
                "customer_id".to_string(),
                "status".to_string(),
            ])
        );
        // sequence 列不参与 expected_columns
        assert!(!expected.contains("order_id"));
    }
}
