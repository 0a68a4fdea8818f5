// ==========================================
// Excel 批量入库引擎 - 引擎层
// ==========================================
// 职责: 运行级编排与外键传播规则
// 红线: Engine 不拼 SQL, 数据库访问一律经 StoreHandle
// ==========================================

pub mod error;
pub mod fk_propagation;
pub mod metrics;
pub mod orchestrator;
pub mod summary;

// 重导出核心类型
pub use error::{FkPropagationError, ProcessingError};
pub use fk_propagation::{
    build_fk_propagation_maps, build_parent_pk_map, get_column_index, needs_returning,
    propagate_foreign_keys, FkPropagationMap, DEFAULT_PK_COLUMN,
};
pub use metrics::BatchStatsAccumulator;
pub use orchestrator::{error_types, process_all, resolve_sheet_mappings, scan_excel_files};
pub use summary::render_summary_line;
