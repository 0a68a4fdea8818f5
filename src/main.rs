// ==========================================
// Excel 批量入库引擎 - CLI 主入口
// ==========================================
// 用法: excel-bulk-import [配置路径] [--inspect-data]
// 退出码: 0 全部成功 / 2 存在失败文件 / 1 致命启动错误
// ==========================================

use excel_bulk_import::config::load_config;
use excel_bulk_import::domain::CellValue;
use excel_bulk_import::engine::{
    process_all, render_summary_line, resolve_sheet_mappings, scan_excel_files,
};
use excel_bulk_import::importer::{normalize_sheet, ExcelWorkbookReader, WorkbookReader};
use excel_bulk_import::logging;
use excel_bulk_import::logging::ErrorLogBuffer;
use excel_bulk_import::repository::{SqliteStore, StoreHandle};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// 默认配置文件路径
const DEFAULT_CONFIG_PATH: &str = "config/import.yml";

/// 命令行参数
struct CliArgs {
    config_path: PathBuf,
    inspect_data: bool,
}

fn parse_args() -> CliArgs {
    let mut config_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    let mut inspect_data = false;

    for arg in std::env::args().skip(1) {
        if arg == "--inspect-data" {
            inspect_data = true;
        } else if !arg.starts_with('-') {
            config_path = PathBuf::from(arg);
        }
    }

    CliArgs {
        config_path,
        inspect_data,
    }
}

fn main() -> ExitCode {
    // 初始化日志系统
    logging::init();

    let args = parse_args();

    tracing::info!("==================================================");
    tracing::info!("{}", excel_bulk_import::APP_NAME);
    tracing::info!("系统版本: {}", excel_bulk_import::VERSION);
    tracing::info!("==================================================");

    // 加载运行配置
    let config = match load_config(&args.config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = %args.config_path.display(), error = %e, "配置加载失败");
            return ExitCode::from(1);
        }
    };

    let reader = ExcelWorkbookReader;

    // 检视模式: 只读不写
    if args.inspect_data {
        return match inspect_data(&config, &reader) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "数据检视失败");
                ExitCode::from(1)
            }
        };
    }

    // 数据库路径解析: 环境变量 IMPORT_DB_PATH > 配置 database.path > mock 模式
    // DISABLE_DB_CONNECT=1 强制 mock 模式
    let mut store = open_store(&config);
    let store_ref: Option<&mut dyn StoreHandle> =
        store.as_mut().map(|s| s as &mut dyn StoreHandle);

    let mut error_log = ErrorLogBuffer::new();
    let result = match process_all(&config, &reader, store_ref, &mut error_log) {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "导入运行启动失败");
            return ExitCode::from(1);
        }
    };

    // 运行摘要（固定格式，机器可解析）
    println!("{}", render_summary_line(result.total_files(), &result));

    if result.failed_files > 0 {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}

/// 按优先级解析数据库连接（无可用路径或禁用连接时为 mock 模式）
fn open_store(config: &excel_bulk_import::ImportConfig) -> Option<SqliteStore> {
    if std::env::var("DISABLE_DB_CONNECT").as_deref() == Ok("1") {
        tracing::info!("DISABLE_DB_CONNECT=1, 使用 mock 模式（不连接数据库）");
        return None;
    }

    let db_path = std::env::var("IMPORT_DB_PATH").ok().or_else(|| {
        config
            .database
            .as_ref()
            .and_then(|db| db.path.clone())
    });

    let Some(db_path) = db_path else {
        tracing::info!("未配置数据库路径, 使用 mock 模式");
        return None;
    };

    match SqliteStore::open(&db_path) {
        Ok(store) => {
            tracing::info!(db_path = %db_path, "数据库连接成功");
            Some(store)
        }
        Err(e) => {
            tracing::info!(db_path = %db_path, error = %e, "数据库连接失败, 回退 mock 模式");
            None
        }
    }
}

/// 检视模式: 打印各文件的表头与前 3 条正规化行
fn inspect_data(
    config: &excel_bulk_import::ImportConfig,
    reader: &dyn WorkbookReader,
) -> anyhow::Result<()> {
    let mappings = resolve_sheet_mappings(config)?;
    let source_dir = Path::new(&config.source_directory);
    let files = scan_excel_files(source_dir)?;
    let target_sheets: HashSet<String> = mappings.iter().map(|m| m.sheet_name.clone()).collect();

    for path in &files {
        println!("== {}", path.display());
        let grids = match reader.read_workbook(path, Some(&target_sheets)) {
            Ok(grids) => grids,
            Err(e) => {
                println!("   解析失败: {}", e);
                continue;
            }
        };

        for mapping in &mappings {
            let Some(grid) = grids.get(&mapping.sheet_name) else {
                continue;
            };
            match normalize_sheet(grid, &mapping.sheet_name, None, None, None) {
                Ok(sheet) => {
                    println!("-- {} -> {}", sheet.sheet_name, mapping.table_name);
                    println!("   columns: {}", sheet.columns.join(", "));
                    for row in sheet.rows.iter().take(3) {
                        let rendered: Vec<String> = row.iter().map(render_cell).collect();
                        println!("   [{}]", rendered.join(", "));
                    }
                    println!("   rows: {}", sheet.rows.len());
                }
                Err(e) => {
                    println!("-- {}: 正规化失败: {}", mapping.sheet_name, e);
                }
            }
        }
    }

    Ok(())
}

fn render_cell(cell: &CellValue) -> String {
    serde_json::to_string(cell).unwrap_or_else(|_| "null".to_string())
}
