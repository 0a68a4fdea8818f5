// ==========================================
// Excel 批量入库引擎 - 文件/工作表编排器
// ==========================================
// 职责: 运行级主流程（扫描 -> 逐文件事务 -> 逐工作表插入 -> 汇总）
// 纪律: 每文件一个事务；工作表按配置顺序处理；单文件失败不影响其余文件
// ==========================================

use crate::config::loader::{FkPair, ImportConfig};
use crate::domain::cell::CellValue;
use crate::domain::file_report::{FileReport, FileStatus, SheetProcess};
use crate::domain::mapping::SheetMapping;
use crate::domain::result::{FileStat, ProcessingResult};
use crate::engine::error::ProcessingError;
use crate::engine::fk_propagation::{
    build_fk_propagation_maps, build_parent_pk_map, get_column_index, needs_returning,
    propagate_foreign_keys, FkPropagationMap,
};
use crate::engine::metrics::BatchStatsAccumulator;
use crate::importer::normalizer::normalize_sheet;
use crate::importer::reader::WorkbookReader;
use crate::logging::error_log::{ErrorLogBuffer, ErrorRecord, FILE_LEVEL_SHEET, NO_ROW};
use crate::repository::batch_insert::{batch_insert, BatchMetrics, DEFAULT_PAGE_SIZE};
use crate::repository::store_handle::StoreHandle;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 错误日志的 error_type 分类常量
pub mod error_types {
    pub const SHEET_VALIDATION_ERROR: &str = "SHEET_VALIDATION_ERROR";
    pub const DATABASE_INSERT_ERROR: &str = "DATABASE_INSERT_ERROR";
    pub const TRANSACTION_BEGIN_ERROR: &str = "TRANSACTION_BEGIN_ERROR";
    pub const TRANSACTION_COMMIT_ERROR: &str = "TRANSACTION_COMMIT_ERROR";
    pub const TRANSACTION_ROLLBACK_ERROR: &str = "TRANSACTION_ROLLBACK_ERROR";
    pub const PROCESSING_ERROR: &str = "PROCESSING_ERROR";
    pub const UNEXPECTED_ERROR: &str = "UNEXPECTED_ERROR";
}

/// 运行域可变状态（跨文件共享，串行访问）
#[derive(Default)]
struct RunContext {
    /// 表名 -> (父标识 -> 生成主键)
    parent_pk_lookup: HashMap<String, HashMap<String, CellValue>>,
    /// 已完成插入且主键已捕获的表
    processed_tables: HashSet<String>,
}

/// 工作表阶段失败（文件级失败的载体）
struct SheetFailure {
    sheet: String,
    error_type: &'static str,
    message: String,
}

/// 执行一次完整导入运行
///
/// # 参数
/// - config: 已加载校验的运行配置
/// - reader: 工作簿读取器
/// - store: 存储句柄（None 即 mock 模式，插入按输入行数模拟成功）
/// - error_log: 错误记录缓冲（运行结束统一 flush 一次）
///
/// # 错误
/// 仅致命条件（映射配置结构无效 / 源目录缺失不可读）返回 Err；
/// 文件级失败记入错误日志并继续处理后续文件。
pub fn process_all(
    config: &ImportConfig,
    reader: &dyn WorkbookReader,
    mut store: Option<&mut (dyn StoreHandle + '_)>,
    error_log: &mut ErrorLogBuffer,
) -> Result<ProcessingResult, ProcessingError> {
    let run_id = Uuid::new_v4();
    let run_start = chrono::Utc::now();
    let run_t0 = Instant::now();

    // 1. 解析工作表映射（致命校验）
    let mappings = resolve_sheet_mappings(config)?;

    // 2. 枚举源目录下的工作簿文件（非递归）
    let source_dir = PathBuf::from(&config.source_directory);
    let files = scan_excel_files(&source_dir)?;

    info!(
        run_id = %run_id,
        source_dir = %source_dir.display(),
        files = files.len(),
        sheets = mappings.len(),
        "开始导入运行"
    );

    if files.is_empty() {
        // 空目录是合法的空结果
        info!(run_id = %run_id, "源目录无工作簿文件");
        return Ok(ProcessingResult::empty(run_start, chrono::Utc::now()));
    }

    // 3. 构建外键传播关系（每次运行一次）
    let fk_maps = build_fk_propagation_maps(config);
    let fk_pairs = config.fk_pairs();
    let global_sentinels = uppercase_set(&config.null_sentinels);
    let mut ctx = RunContext::default();

    let mut file_stats: Vec<FileStat> = Vec::with_capacity(files.len());
    let mut success_files = 0usize;
    let mut failed_files = 0usize;
    let mut total_inserted_rows = 0usize;
    let mut total_skipped_sheets = 0usize;

    // 4. 逐文件独立处理
    for path in &files {
        let outcome = process_file(
            path,
            &mappings,
            &fk_maps,
            &fk_pairs,
            global_sentinels.as_ref(),
            reader,
            store.as_deref_mut(),
            &source_dir,
            &mut ctx,
            error_log,
        );

        let report = &outcome.report;
        match report.status {
            FileStatus::Success => success_files += 1,
            _ => failed_files += 1,
        }
        total_inserted_rows += report.total_rows;
        total_skipped_sheets += report.skipped_sheets;

        let elapsed = (report.end_time - report.start_time).num_milliseconds() as f64 / 1000.0;
        info!(
            run_id = %run_id,
            file = %report.name,
            status = report.status.as_str(),
            rows = report.total_rows,
            elapsed_sec = elapsed,
            "文件处理完成"
        );
        file_stats.push(FileStat {
            file_name: report.name.clone(),
            status: report.status,
            inserted_rows: report.total_rows,
            elapsed_seconds: elapsed,
            batch_summary: outcome.batch_summary,
        });
    }

    // 5. 错误日志统一落盘（尽力而为，失败不改变运行结果）
    if let Err(e) = error_log.flush() {
        warn!(run_id = %run_id, error = %e, "错误日志落盘失败");
    }

    // 6. 聚合运行结果
    let elapsed_seconds = run_t0.elapsed().as_secs_f64();
    let throughput = if elapsed_seconds > 0.0 {
        total_inserted_rows as f64 / elapsed_seconds
    } else {
        0.0
    };

    info!(
        run_id = %run_id,
        success = success_files,
        failed = failed_files,
        rows = total_inserted_rows,
        elapsed_sec = elapsed_seconds,
        "导入运行结束"
    );

    Ok(ProcessingResult {
        success_files,
        failed_files,
        total_inserted_rows,
        skipped_sheets: total_skipped_sheets,
        start_time: run_start,
        end_time: chrono::Utc::now(),
        elapsed_seconds,
        throughput_rows_per_sec: throughput,
        file_stats,
    })
}

/// 将原始配置映射解析为领域对象（结构无效即致命）
pub fn resolve_sheet_mappings(config: &ImportConfig) -> Result<Vec<SheetMapping>, ProcessingError> {
    let mut mappings = Vec::with_capacity(config.sheet_mappings.len());

    for (sheet_name, raw) in &config.sheet_mappings {
        let table_name = raw
            .table
            .clone()
            .unwrap_or_else(|| sheet_name.to_lowercase());
        if table_name.trim().is_empty() {
            return Err(ProcessingError::InvalidMapping {
                sheet: sheet_name.clone(),
                message: "目标表名为空".to_string(),
            });
        }

        let sequence_columns: std::collections::BTreeSet<String> =
            raw.sequence_columns.iter().cloned().collect();
        let fk_propagation_columns: std::collections::BTreeSet<String> =
            raw.fk_propagation_columns.iter().cloned().collect();

        // 自增列与外键传播列互斥
        let overlap: Vec<&String> = sequence_columns
            .intersection(&fk_propagation_columns)
            .collect();
        if !overlap.is_empty() {
            return Err(ProcessingError::InvalidMapping {
                sheet: sheet_name.clone(),
                message: format!("列同时声明为自增列与外键传播列: {:?}", overlap),
            });
        }

        mappings.push(SheetMapping {
            sheet_name: sheet_name.clone(),
            table_name,
            sequence_columns,
            fk_propagation_columns,
            default_values: raw.default_values.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            null_sentinels: raw
                .null_sentinels
                .as_ref()
                .map(|list| uppercase_set(list).unwrap_or_default()),
            blob_columns: raw.blob_columns.iter().cloned().collect(),
        });
    }

    Ok(mappings)
}

/// 枚举目录直属的 .xlsx 文件（不递归，按文件名排序）
///
/// Excel 的临时锁文件（`~$` 前缀）跳过。
pub fn scan_excel_files(dir: &Path) -> Result<Vec<PathBuf>, ProcessingError> {
    if !dir.exists() {
        return Err(ProcessingError::DirectoryNotFound(
            dir.display().to_string(),
        ));
    }
    if !dir.is_dir() {
        return Err(ProcessingError::NotADirectory(dir.display().to_string()));
    }

    let entries = std::fs::read_dir(dir).map_err(|e| ProcessingError::DirectoryReadError {
        path: dir.display().to_string(),
        message: e.to_string(),
    })?;

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ProcessingError::DirectoryReadError {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with("~$") {
            continue;
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if ext == "xlsx" {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// 处理单个工作簿文件（一个事务，独立失败域）
#[allow(clippy::too_many_arguments)]
fn process_file(
    path: &Path,
    mappings: &[SheetMapping],
    fk_maps: &[FkPropagationMap],
    fk_pairs: &[FkPair],
    global_sentinels: Option<&HashSet<String>>,
    reader: &dyn WorkbookReader,
    mut store: Option<&mut (dyn StoreHandle + '_)>,
    source_dir: &Path,
    ctx: &mut RunContext,
    error_log: &mut ErrorLogBuffer,
) -> FileOutcome {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let start_time = chrono::Utc::now();
    let mut batch_stats = BatchStatsAccumulator::new();

    debug!(file = %file_name, "开始处理文件");

    // a. 开启事务（失败即文件失败，无需回滚）
    if let Some(s) = store.as_deref_mut() {
        if let Err(e) = s.begin() {
            error_log.append(ErrorRecord::create(
                &file_name,
                FILE_LEVEL_SHEET,
                NO_ROW,
                error_types::TRANSACTION_BEGIN_ERROR,
                &e.to_string(),
            ));
            return FileOutcome::failed(path, &file_name, start_time, e.to_string());
        }
    }

    // b. 解析工作簿（解析级失败 -> 文件失败并回滚）
    let target_sheets: HashSet<String> = mappings.iter().map(|m| m.sheet_name.clone()).collect();
    let grids = match reader.read_workbook(path, Some(&target_sheets)) {
        Ok(grids) => grids,
        Err(e) => {
            error_log.append(ErrorRecord::create(
                &file_name,
                FILE_LEVEL_SHEET,
                NO_ROW,
                error_types::PROCESSING_ERROR,
                &e.to_string(),
            ));
            rollback_quietly(store.as_deref_mut(), &file_name, error_log);
            return FileOutcome::failed(path, &file_name, start_time, e.to_string());
        }
    };

    // c-f. 按配置顺序处理工作表（首个失败中止剩余工作表并回滚）
    let mut sheets: Vec<SheetProcess> = Vec::new();
    let mut skipped_sheets = 0usize;
    let mut total_rows = 0usize;

    for mapping in mappings {
        // d. 配置了映射但工作簿中不存在的工作表计为跳过
        let Some(grid) = grids.get(&mapping.sheet_name) else {
            debug!(file = %file_name, sheet = %mapping.sheet_name, "工作表不存在，跳过");
            skipped_sheets += 1;
            continue;
        };

        match process_sheet(
            grid,
            mapping,
            fk_maps,
            fk_pairs,
            global_sentinels,
            store.as_deref_mut(),
            source_dir,
            ctx,
            &mut batch_stats,
        ) {
            Ok(record) => {
                total_rows += record.inserted_rows;
                sheets.push(record);
            }
            Err(failure) => {
                error_log.append(ErrorRecord::create(
                    &file_name,
                    &failure.sheet,
                    NO_ROW,
                    failure.error_type,
                    &failure.message,
                ));
                rollback_quietly(store.as_deref_mut(), &file_name, error_log);
                let mut outcome =
                    FileOutcome::failed(path, &file_name, start_time, failure.message);
                outcome.report.sheets = sheets;
                outcome.report.skipped_sheets = skipped_sheets;
                outcome.batch_summary = batch_stats.summary();
                return outcome;
            }
        }
    }

    // g. 全部工作表成功后提交（提交失败同样视为文件失败）
    if let Some(s) = store.as_deref_mut() {
        if let Err(e) = s.commit() {
            error_log.append(ErrorRecord::create(
                &file_name,
                FILE_LEVEL_SHEET,
                NO_ROW,
                error_types::TRANSACTION_COMMIT_ERROR,
                &e.to_string(),
            ));
            rollback_quietly(store.as_deref_mut(), &file_name, error_log);
            let mut outcome = FileOutcome::failed(path, &file_name, start_time, e.to_string());
            outcome.report.sheets = sheets;
            outcome.report.skipped_sheets = skipped_sheets;
            outcome.batch_summary = batch_stats.summary();
            return outcome;
        }
    }

    FileOutcome {
        report: FileReport {
            path: path.to_path_buf(),
            name: file_name,
            sheets,
            start_time,
            end_time: chrono::Utc::now(),
            status: FileStatus::Success,
            total_rows,
            skipped_sheets,
            error: None,
        },
        batch_summary: batch_stats.summary(),
    }
}

/// 文件处理产出（报告 + 批次耗时摘要）
struct FileOutcome {
    report: FileReport,
    batch_summary: Option<crate::domain::result::BatchSummary>,
}

impl FileOutcome {
    fn failed(
        path: &Path,
        file_name: &str,
        start_time: chrono::DateTime<chrono::Utc>,
        error: String,
    ) -> Self {
        Self {
            report: FileReport {
                path: path.to_path_buf(),
                name: file_name.to_string(),
                sheets: Vec::new(),
                start_time,
                end_time: chrono::Utc::now(),
                status: FileStatus::Failed,
                total_rows: 0,
                skipped_sheets: 0,
                error: Some(error),
            },
            batch_summary: None,
        }
    }
}

/// 处理单个映射内工作表: 正规化 -> 外键填充 -> 批量插入 -> 主键捕获
#[allow(clippy::too_many_arguments)]
fn process_sheet(
    grid: &crate::domain::sheet::RawGrid,
    mapping: &SheetMapping,
    fk_maps: &[FkPropagationMap],
    fk_pairs: &[FkPair],
    global_sentinels: Option<&HashSet<String>>,
    mut store: Option<&mut (dyn StoreHandle + '_)>,
    source_dir: &Path,
    ctx: &mut RunContext,
    batch_stats: &mut BatchStatsAccumulator,
) -> Result<SheetProcess, SheetFailure> {
    let sheet_name = &mapping.sheet_name;
    let table = &mapping.table_name;

    // 正规化（表头/缺列错误 -> 工作表校验失败）
    let expected = mapping.expected_columns();
    let effective_sentinels = mapping.null_sentinels.as_ref().or(global_sentinels);
    let sheet_data = normalize_sheet(
        grid,
        sheet_name,
        if expected.is_empty() {
            None
        } else {
            Some(&expected)
        },
        if mapping.default_values.is_empty() {
            None
        } else {
            Some(&mapping.default_values)
        },
        effective_sentinels,
    )
    .map_err(|e| SheetFailure {
        sheet: sheet_name.clone(),
        error_type: if e.is_sheet_validation() {
            error_types::SHEET_VALIDATION_ERROR
        } else {
            error_types::UNEXPECTED_ERROR
        },
        message: e.to_string(),
    })?;

    // 插入列: 仅排除库端自增列（外键列保留，由传播填充）
    let mut insert_columns: Vec<String> = Vec::new();
    let mut keep_indices: Vec<usize> = Vec::new();
    for (idx, col) in sheet_data.columns.iter().enumerate() {
        if mapping.sequence_columns.contains(col) {
            continue;
        }
        insert_columns.push(col.clone());
        keep_indices.push(idx);
    }

    let mut rows: Vec<Vec<CellValue>> = sheet_data
        .rows
        .iter()
        .map(|row| keep_indices.iter().map(|&i| row[i].clone()).collect())
        .collect();

    // 外键传播（有配置映射且父主键已捕获时为硬性契约）
    for fk_column in &mapping.fk_propagation_columns {
        let Some(fk_map) = fk_maps
            .iter()
            .find(|m| &m.child_table == table && &m.child_fk_column == fk_column)
        else {
            warn!(
                sheet = %sheet_name,
                column = %fk_column,
                "外键传播列未配置父子关系，保留原值"
            );
            continue;
        };

        let Some(parent_lookup) = ctx.parent_pk_lookup.get(&fk_map.parent_table) else {
            // mock 模式或父表主键未捕获时不改写
            warn!(
                sheet = %sheet_name,
                column = %fk_column,
                parent = %fk_map.parent_table,
                "父表主键映射不可用，跳过外键传播"
            );
            continue;
        };

        let fk_idx =
            get_column_index(fk_column, &insert_columns).map_err(|e| SheetFailure {
                sheet: sheet_name.clone(),
                error_type: error_types::DATABASE_INSERT_ERROR,
                message: e.to_string(),
            })?;
        // 子行标识列: 优先同名标识列，缺省时外键列自身承载父标识
        let identifier_idx =
            get_column_index(&fk_map.parent_identifier_column, &insert_columns).unwrap_or(fk_idx);

        rows = propagate_foreign_keys(rows, fk_map, parent_lookup, fk_idx, identifier_idx)
            .map_err(|e| SheetFailure {
                sheet: sheet_name.clone(),
                error_type: error_types::DATABASE_INSERT_ERROR,
                message: e.to_string(),
            })?;
    }

    // 条件 RETURNING 判定
    let returning = needs_returning(table, fk_pairs, &ctx.processed_tables);
    let row_count = rows.len();

    // 插入（store 缺省即 mock 模式: 按输入行数模拟成功）
    let (inserted_rows, returned) = match store.as_deref_mut() {
        Some(s) => {
            let mut record = |m: &BatchMetrics| batch_stats.add_sample(m.elapsed.as_secs_f64());
            let outcome = batch_insert(
                s,
                table,
                &insert_columns,
                rows,
                returning,
                DEFAULT_PAGE_SIZE,
                Some(&mut record),
                if mapping.blob_columns.is_empty() {
                    None
                } else {
                    Some(&mapping.blob_columns)
                },
                Some(source_dir),
            )
            .map_err(|e| SheetFailure {
                sheet: sheet_name.clone(),
                error_type: error_types::DATABASE_INSERT_ERROR,
                message: e.to_string(),
            })?;
            (outcome.inserted_rows, outcome.returned)
        }
        None => {
            debug!(sheet = %sheet_name, table = %table, rows = row_count, "mock 模式插入");
            (row_count, None)
        }
    };

    // RETURNING 行集 -> 父主键查找表
    if returning {
        if let Some(returned) = returned.filter(|r| !r.rows.is_empty()) {
            if let Some(fk_map) = fk_maps.iter().find(|m| &m.parent_table == table) {
                let pk_pos = returned
                    .columns
                    .iter()
                    .position(|c| c == &fk_map.parent_pk_column);
                let id_pos = returned
                    .columns
                    .iter()
                    .position(|c| c == &fk_map.parent_identifier_column);
                match (pk_pos, id_pos) {
                    (Some(pk_idx), Some(id_idx)) => {
                        let lookup = build_parent_pk_map(&returned.rows, pk_idx, id_idx);
                        debug!(
                            table = %table,
                            captured = lookup.len(),
                            "父表生成主键已捕获"
                        );
                        ctx.parent_pk_lookup.insert(table.clone(), lookup);
                        ctx.processed_tables.insert(table.clone());
                    }
                    _ => {
                        warn!(
                            table = %table,
                            pk_column = %fk_map.parent_pk_column,
                            identifier = %fk_map.parent_identifier_column,
                            "RETURNING 行集缺少主键或标识列，放弃捕获"
                        );
                    }
                }
            }
        }
    }

    Ok(SheetProcess {
        sheet_name: sheet_name.clone(),
        table_name: table.clone(),
        mapping: mapping.clone(),
        ignored_columns: mapping.sequence_columns.clone(),
        inserted_rows,
        error: None,
    })
}

/// 回滚并把回滚自身的失败记为独立错误（不掩盖原始错误）
fn rollback_quietly(
    store: Option<&mut (dyn StoreHandle + '_)>,
    file_name: &str,
    error_log: &mut ErrorLogBuffer,
) {
    if let Some(s) = store {
        if let Err(e) = s.rollback() {
            warn!(file = %file_name, error = %e, "事务回滚失败");
            error_log.append(ErrorRecord::create(
                file_name,
                FILE_LEVEL_SHEET,
                NO_ROW,
                error_types::TRANSACTION_ROLLBACK_ERROR,
                &e.to_string(),
            ));
        }
    }
}

/// 哨兵列表统一大写（空列表视为未配置）
fn uppercase_set(list: &[String]) -> Option<HashSet<String>> {
    if list.is_empty() {
        return None;
    }
    Some(list.iter().map(|s| s.trim().to_uppercase()).collect())
}
