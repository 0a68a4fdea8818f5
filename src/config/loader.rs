// ==========================================
// Excel 批量入库引擎 - 运行配置加载
// ==========================================
// 职责: 读取 YAML 运行配置，校验必需键并应用默认值
// 格式: config/import.yml（source_directory / sheet_mappings / sequences / fk_propagations）
// ==========================================

use crate::domain::cell::CellValue;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// 配置层错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {0}")]
    NotFound(String),

    #[error("配置读取失败 ({path}): {message}")]
    ReadError { path: String, message: String },

    #[error("配置解析失败: {0}")]
    ParseError(String),

    #[error("配置无效: {0}")]
    Invalid(String),
}

/// 单个父子外键传播对（"table.column" 点式引用）
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FkPair {
    pub parent: String,
    pub child: String,
}

/// 外键传播配置的两种历史形态
///
/// - 旧: 扁平字典 `{"parent.col": "child.col"}`（每个父表一条）
/// - 新: 列表 `[{parent, child}]`（同一父表可有多个子表）
///
/// 加载后立即经 `normalized()` 折叠为统一的 pair 列表，
/// 核心组件只消费规范形态。
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FkPropagations {
    Pairs(Vec<FkPair>),
    Legacy(IndexMap<String, String>),
}

impl Default for FkPropagations {
    fn default() -> Self {
        FkPropagations::Pairs(Vec::new())
    }
}

impl FkPropagations {
    /// 折叠为规范的 pair 列表（保持配置出现顺序）
    pub fn normalized(&self) -> Vec<FkPair> {
        match self {
            FkPropagations::Pairs(pairs) => pairs.clone(),
            FkPropagations::Legacy(map) => map
                .iter()
                .map(|(parent, child)| FkPair {
                    parent: parent.clone(),
                    child: child.clone(),
                })
                .collect(),
        }
    }
}

/// sequence 引用的两种形态: 裸序列名，或带 `column` 字段的映射
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SequenceRef {
    Name(String),
    Detailed {
        #[serde(default)]
        column: Option<String>,
        #[serde(default)]
        sequence: Option<String>,
    },
}

/// 数据库连接回退配置（环境变量优先于此处的值）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite 数据库文件路径
    pub path: Option<String>,
}

/// 单工作表原始映射配置（未解析形态）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSheetMapping {
    /// 目标表名（缺省为工作表名小写）
    pub table: Option<String>,
    #[serde(default)]
    pub sequence_columns: Vec<String>,
    #[serde(default)]
    pub fk_propagation_columns: Vec<String>,
    #[serde(default)]
    pub default_values: IndexMap<String, CellValue>,
    /// 工作表级 NULL 哨兵（None 时沿用全局）
    #[serde(default)]
    pub null_sentinels: Option<Vec<String>>,
    #[serde(default)]
    pub blob_columns: Vec<String>,
}

/// 运行根配置（加载一次，之后不可变）
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    pub source_directory: String,
    pub sheet_mappings: IndexMap<String, RawSheetMapping>,
    #[serde(default)]
    pub sequences: IndexMap<String, SequenceRef>,
    #[serde(default)]
    pub fk_propagations: FkPropagations,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    /// 全局 NULL 哨兵
    #[serde(default)]
    pub null_sentinels: Vec<String>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl ImportConfig {
    /// 规范形态的外键传播对
    pub fn fk_pairs(&self) -> Vec<FkPair> {
        self.fk_propagations.normalized()
    }
}

/// 从 YAML 文件加载运行配置
pub fn load_config(path: &Path) -> Result<ImportConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }

    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let config: ImportConfig =
        serde_yaml::from_str(&text).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    if config.source_directory.trim().is_empty() {
        return Err(ConfigError::Invalid("source_directory 不能为空".to_string()));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(yaml: &str) -> ImportConfig {
        serde_yaml::from_str(yaml).expect("解析配置失败")
    }

    #[test]
    fn test_fk_propagations_list_shape() {
        let cfg = parse(
            r#"
source_directory: ./data
sheet_mappings:
  Users:
    table: users
fk_propagations:
  - parent: users.name
    child: orders.user_id
  - parent: users.name
    child: payments.user_id
"#,
        );
        let pairs = cfg.fk_pairs();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].parent, "users.name");
        assert_eq!(pairs[1].child, "payments.user_id");
    }

    #[test]
    fn test_fk_propagations_legacy_dict_shape() {
        let cfg = parse(
            r#"
source_directory: ./data
sheet_mappings:
  Users:
    table: users
fk_propagations:
  users.name: orders.user_id
"#,
        );
        let pairs = cfg.fk_pairs();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].parent, "users.name");
        assert_eq!(pairs[0].child, "orders.user_id");
    }

    #[test]
    fn test_defaults_applied() {
        let cfg = parse(
            r#"
source_directory: ./data
sheet_mappings:
  Users: {}
"#,
        );
        assert_eq!(cfg.timezone, "UTC");
        assert!(cfg.fk_pairs().is_empty());
        assert!(cfg.sequences.is_empty());
        assert!(cfg.null_sentinels.is_empty());
    }

    #[test]
    fn test_sequence_ref_shapes() {
        let cfg = parse(
            r#"
source_directory: ./data
sheet_mappings:
  Users: {}
sequences:
  users.user_id: users_user_id_seq
  orders.order_id:
    column: order_id
    sequence: orders_order_id_seq
"#,
        );
        assert!(matches!(
            cfg.sequences.get("users.user_id"),
            Some(SequenceRef::Name(_))
        ));
        match cfg.sequences.get("orders.order_id") {
            Some(SequenceRef::Detailed { column, .. }) => {
                assert_eq!(column.as_deref(), Some("order_id"));
            }
            other => panic!("期望 Detailed 形态, 实际 {:?}", other),
        }
    }

    #[test]
    fn test_default_values_scalar_types() {
        let cfg = parse(
            r#"
source_directory: ./data
sheet_mappings:
  Users:
    default_values:
      status: NEW
      retry_count: 0
      ratio: 0.5
"#,
        );
        let mapping = &cfg.sheet_mappings["Users"];
        assert_eq!(
            mapping.default_values.get("status"),
            Some(&CellValue::Text("NEW".to_string()))
        );
        assert_eq!(
            mapping.default_values.get("retry_count"),
            Some(&CellValue::Integer(0))
        );
        assert_eq!(
            mapping.default_values.get("ratio"),
            Some(&CellValue::Float(0.5))
        );
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config(Path::new("/nonexistent/import.yml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "source_directory: ./data").unwrap();
        writeln!(f, "sheet_mappings:").unwrap();
        writeln!(f, "  Users:").unwrap();
        writeln!(f, "    table: users").unwrap();

        let cfg = load_config(f.path()).expect("加载配置失败");
        assert_eq!(cfg.source_directory, "./data");
        assert_eq!(
            cfg.sheet_mappings["Users"].table.as_deref(),
            Some("users")
        );
    }

    #[test]
    fn test_invalid_yaml_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "source_directory: [unclosed").unwrap();
        assert!(matches!(
            load_config(f.path()),
            Err(ConfigError::ParseError(_))
        ));
    }
}
