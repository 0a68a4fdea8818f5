// ==========================================
// Excel 批量入库引擎 - 核心库
// ==========================================
// 定位: Excel 工作簿 -> 关系库的批量导入编排
// 技术栈: Rust + calamine + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    BatchSummary, CellValue, FileReport, FileStatus, FileStat, ProcessingResult, RawGrid,
    SheetData, SheetMapping, SheetProcess,
};

// 配置
pub use config::{load_config, ConfigError, FkPair, ImportConfig};

// 导入层
pub use importer::{normalize_sheet, ExcelWorkbookReader, ImportError, WorkbookReader};

// 仓储层
pub use repository::{
    batch_insert, BatchInsertError, BatchMetrics, InsertOutcome, ReturnedRows, SqliteStore,
    StoreHandle, DEFAULT_PAGE_SIZE,
};

// 引擎
pub use engine::{
    process_all, render_summary_line, BatchStatsAccumulator, FkPropagationError, ProcessingError,
};

// 错误日志
pub use logging::{ErrorLogBuffer, ErrorRecord, FILE_LEVEL_SHEET, NO_ROW};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "Excel 批量入库引擎";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(!APP_NAME.is_empty());
    }
}
