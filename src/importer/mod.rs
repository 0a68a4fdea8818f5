// ==========================================
// Excel 批量入库引擎 - 导入层
// ==========================================
// 职责: 工作簿读取与工作表正规化
// 支持: Excel (.xlsx)
// ==========================================

// 模块声明
pub mod error;
pub mod normalizer;
pub mod reader;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use normalizer::normalize_sheet;
pub use reader::{ExcelWorkbookReader, WorkbookReader};
