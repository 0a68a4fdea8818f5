// ==========================================
// Excel 批量入库引擎 - 配置层
// ==========================================
// 职责: 运行配置的加载与规范化
// 存储: YAML 文件（默认 config/import.yml）
// ==========================================

pub mod loader;

// 重导出核心配置类型
pub use loader::{
    load_config, ConfigError, DatabaseConfig, FkPair, FkPropagations, ImportConfig,
    RawSheetMapping, SequenceRef,
};
