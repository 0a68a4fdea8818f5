// ==========================================
// Excel 批量入库引擎 - 仓储层
// ==========================================
// 职责: 存储句柄接口与 SQLite 实现、批量插入执行
// 红线: 仓储层不含业务规则，只做数据写入
// ==========================================

// 模块声明
pub mod batch_insert;
pub mod error;
pub mod sqlite_store;
pub mod store_handle;

// 重导出核心类型
pub use batch_insert::{batch_insert, BatchMetrics, InsertOutcome, DEFAULT_PAGE_SIZE};
pub use error::{BatchInsertError, RepositoryError, RepositoryResult};
pub use sqlite_store::SqliteStore;
pub use store_handle::{ReturnedRows, StoreHandle};
