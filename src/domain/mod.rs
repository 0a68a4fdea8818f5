// ==========================================
// Excel 批量入库引擎 - 领域层
// ==========================================
// 职责: 核心值类型与处理记录，不含 I/O
// ==========================================

pub mod cell;
pub mod file_report;
pub mod mapping;
pub mod result;
pub mod sheet;

// 重导出核心类型
pub use cell::CellValue;
pub use file_report::{FileReport, FileStatus, SheetProcess};
pub use mapping::SheetMapping;
pub use result::{BatchSummary, FileStat, ProcessingResult};
pub use sheet::{RawGrid, SheetData};
