// ==========================================
// Excel 批量入库引擎 - 批量插入执行器
// ==========================================
// 职责: 单次逻辑插入的编排（BLOB 解析 / 计时回调 / 错误包装）
// 前提: columns 已排除库端自增列
// ==========================================

use crate::domain::cell::CellValue;
use crate::repository::error::BatchInsertError;
use crate::repository::store_handle::{ReturnedRows, StoreHandle};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::debug;

/// 默认物理分批大小
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// 单次逻辑插入的计时数据
#[derive(Debug, Clone, Copy)]
pub struct BatchMetrics {
    /// 本次插入的行数
    pub batch_size: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub elapsed: Duration,
}

/// 批量插入结果
#[derive(Debug, Clone)]
pub struct InsertOutcome {
    pub inserted_rows: usize,
    /// returning=true 时的返回行集
    pub returned: Option<ReturnedRows>,
}

/// 执行一次逻辑批量插入
///
/// - 行集为空时立即返回 0 行，不触达存储也不触发计时回调
/// - BLOB 列的值视为文件路径引用，相对路径按 source_dir 解析后读为二进制；
///   未提供 source_dir 时保留字面值（不尝试路径解析）
/// - 计时回调在每次非空调用时恰好触发一次（包含失败的执行）
/// - 存储层失败一律包装为 BatchInsertError，不泄漏驱动错误类型
#[allow(clippy::too_many_arguments)]
pub fn batch_insert(
    store: &mut dyn StoreHandle,
    table: &str,
    columns: &[String],
    rows: Vec<Vec<CellValue>>,
    returning: bool,
    page_size: usize,
    metrics_callback: Option<&mut dyn FnMut(&BatchMetrics)>,
    blob_columns: Option<&BTreeSet<String>>,
    source_dir: Option<&Path>,
) -> Result<InsertOutcome, BatchInsertError> {
    if rows.is_empty() {
        return Ok(InsertOutcome {
            inserted_rows: 0,
            returned: if returning {
                Some(ReturnedRows {
                    columns: Vec::new(),
                    rows: Vec::new(),
                })
            } else {
                None
            },
        });
    }

    // BLOB 列解析（仅在提供 source_dir 时进行路径读取）
    let rows = match (blob_columns, source_dir) {
        (Some(blob_cols), Some(dir)) if !blob_cols.is_empty() => {
            resolve_blob_columns(rows, columns, blob_cols, dir)?
        }
        _ => rows,
    };

    let batch_size = rows.len();
    let start_time = Utc::now();
    let t0 = Instant::now();

    let result = store.execute_batch_insert(table, columns, &rows, returning, page_size);

    let elapsed = t0.elapsed();
    let end_time = Utc::now();
    if let Some(cb) = metrics_callback {
        cb(&BatchMetrics {
            batch_size,
            start_time,
            end_time,
            elapsed,
        });
    }

    let (inserted_rows, returned) = result.map_err(|e| BatchInsertError::Execute {
        table: table.to_string(),
        message: e.to_string(),
    })?;

    debug!(
        table = %table,
        rows = inserted_rows,
        returning = returning,
        elapsed_ms = elapsed.as_millis() as u64,
        "批量插入完成"
    );

    Ok(InsertOutcome {
        inserted_rows,
        returned,
    })
}

/// 将 BLOB 列的路径引用替换为文件二进制内容
fn resolve_blob_columns(
    mut rows: Vec<Vec<CellValue>>,
    columns: &[String],
    blob_columns: &BTreeSet<String>,
    source_dir: &Path,
) -> Result<Vec<Vec<CellValue>>, BatchInsertError> {
    let blob_indices: Vec<(usize, &String)> = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| blob_columns.contains(*c))
        .map(|(i, c)| (i, c))
        .collect();

    for row in rows.iter_mut() {
        for &(idx, column) in &blob_indices {
            let Some(cell) = row.get_mut(idx) else {
                continue;
            };
            let CellValue::Text(path_str) = cell else {
                continue;
            };
            let raw = Path::new(path_str.trim());
            let resolved = if raw.is_absolute() {
                raw.to_path_buf()
            } else {
                source_dir.join(raw)
            };
            let bytes =
                std::fs::read(&resolved).map_err(|e| BatchInsertError::BlobRead {
                    column: column.clone(),
                    path: resolved.display().to_string(),
                    message: e.to_string(),
                })?;
            *cell = CellValue::Blob(bytes);
        }
    }

    Ok(rows)
}
