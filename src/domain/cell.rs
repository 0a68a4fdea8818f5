// ==========================================
// Excel 批量入库引擎 - 单元格值类型
// ==========================================
// 职责: Excel 单元格与数据库参数之间的统一值表示
// 转换: calamine::Data -> CellValue -> rusqlite 参数
// ==========================================

use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};

/// 规范化后的单元格值
///
/// 正规化管线、外键传播与批量插入都以该类型为媒介，
/// 避免 calamine / rusqlite 的具体类型跨层泄漏。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl CellValue {
    /// 空值判定（空单元或纯空白字符串）
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 以字符串形式取出（表头解析用，TRIM 后返回）
    pub fn as_header(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Blob(_) => String::new(),
        }
    }

    /// 父主键查找表使用的规范化键
    ///
    /// 标识列可能是文本也可能是数值，统一折叠为字符串键，
    /// 保证 `1` 与 `1.0` 这类 Excel 数值歧义落到同一键上。
    pub fn lookup_key(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => (*b as i64).to_string(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Blob(_) => String::new(),
        }
    }
}

// 实现 From<&calamine::Data>
impl From<&calamine::Data> for CellValue {
    fn from(cell: &calamine::Data) -> Self {
        use calamine::Data;
        match cell {
            Data::Empty => CellValue::Null,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Int(i) => CellValue::Integer(*i),
            Data::Float(f) => CellValue::Float(*f),
            Data::Bool(b) => CellValue::Bool(*b),
            // 日期/时长以显示文本落库（不做时区/类型强转，见 Non-goals）
            Data::DateTime(_) | Data::DateTimeIso(_) | Data::DurationIso(_) => {
                CellValue::Text(cell.to_string())
            }
            Data::Error(_) => CellValue::Null,
        }
    }
}

// 实现 ToSql（批量插入参数绑定）
impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Null => ToSqlOutput::Owned(Value::Null),
            CellValue::Bool(b) => ToSqlOutput::Owned(Value::Integer(*b as i64)),
            CellValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            CellValue::Float(f) => ToSqlOutput::Owned(Value::Real(*f)),
            CellValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            CellValue::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

// 实现 From<ValueRef>（RETURNING 行读取）
impl From<ValueRef<'_>> for CellValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => CellValue::Null,
            ValueRef::Integer(i) => CellValue::Integer(i),
            ValueRef::Real(f) => CellValue::Float(f),
            ValueRef::Text(t) => CellValue::Text(String::from_utf8_lossy(t).to_string()),
            ValueRef::Blob(b) => CellValue::Blob(b.to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_blank() {
        assert!(CellValue::Null.is_blank());
        assert!(CellValue::Text("   ".to_string()).is_blank());
        assert!(!CellValue::Text("x".to_string()).is_blank());
        assert!(!CellValue::Integer(0).is_blank());
    }

    #[test]
    fn test_lookup_key_folds_numeric_forms() {
        assert_eq!(CellValue::Integer(101).lookup_key(), "101");
        assert_eq!(CellValue::Float(101.0).lookup_key(), "101");
        assert_eq!(CellValue::Text(" Alice ".to_string()).lookup_key(), "Alice");
    }

    #[test]
    fn test_from_calamine_data() {
        use calamine::Data;
        assert_eq!(CellValue::from(&Data::Empty), CellValue::Null);
        assert_eq!(
            CellValue::from(&Data::String("A".to_string())),
            CellValue::Text("A".to_string())
        );
        assert_eq!(CellValue::from(&Data::Float(2.5)), CellValue::Float(2.5));
    }

    #[test]
    fn test_untagged_serde_scalars() {
        let v: CellValue = serde_json::from_str("null").unwrap();
        assert_eq!(v, CellValue::Null);
        let v: CellValue = serde_json::from_str("\"NULL\"").unwrap();
        assert_eq!(v, CellValue::Text("NULL".to_string()));
        let v: CellValue = serde_json::from_str("42").unwrap();
        assert_eq!(v, CellValue::Integer(42));
    }
}
