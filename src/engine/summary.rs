// ==========================================
// Excel 批量入库引擎 - SUMMARY 行渲染
// ==========================================
// 职责: 机器可解析的运行摘要行（字段顺序固定）
// 格式: SUMMARY files=<t>/<t> success=<n> failed=<n> rows=<n>
//       skipped_sheets=<n> elapsed_sec=<num> throughput_rps=<num>
// ==========================================

use crate::domain::result::ProcessingResult;

/// 渲染 SUMMARY 行
pub fn render_summary_line(total_files: usize, result: &ProcessingResult) -> String {
    format!(
        "SUMMARY files={total}/{total} success={success} failed={failed} rows={rows} skipped_sheets={skipped} elapsed_sec={elapsed} throughput_rps={throughput}",
        total = total_files,
        success = result.success_files,
        failed = result.failed_files,
        rows = result.total_inserted_rows,
        skipped = result.skipped_sheets,
        elapsed = format_number(result.elapsed_seconds),
        throughput = format_number(result.throughput_rows_per_sec),
    )
}

/// 数值渲染: 整数值不带小数部分，其余为不含科学计数法的十进制
fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 9e15 {
        return format!("{}", value as i64);
    }
    if value.abs() < 0.01 {
        // 极小值按 6 位小数渲染后去尾零，避免进入科学计数法习惯的表示
        let s = format!("{:.6}", value);
        let s = s.trim_end_matches('0').trim_end_matches('.');
        return s.to_string();
    }
    format!("{}", value)
}
