// ==========================================
// Excel 批量入库引擎 - 批次耗时统计
// ==========================================
// 职责: 批次耗时样本的累积与摘要（count / mean / p95）
// 方法: p95 采用含端线性插值（inclusive-linear）分位数
// ==========================================

use crate::domain::result::BatchSummary;

/// 批次耗时累积器（每文件一个实例）
#[derive(Debug, Default)]
pub struct BatchStatsAccumulator {
    samples: Vec<f64>,
}

impl BatchStatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条批次耗时样本（秒）
    pub fn add_sample(&mut self, elapsed_seconds: f64) {
        self.samples.push(elapsed_seconds);
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }

    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// 95 分位（含端线性插值；单样本即其自身；空集为 0）
    pub fn p95(&self) -> f64 {
        percentile(&self.samples, 0.95)
    }

    /// 生成摘要（无样本时为 None）
    pub fn summary(&self) -> Option<BatchSummary> {
        if self.samples.is_empty() {
            return None;
        }
        Some(BatchSummary {
            total_batches: self.count(),
            avg_batch_seconds: self.mean(),
            p95_batch_seconds: self.p95(),
        })
    }
}

/// 含端线性插值分位数
fn percentile(samples: &[f64], q: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let weight = rank - lo as f64;
    sorted[lo] * (1.0 - weight) + sorted[hi] * weight
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_accumulator_all_zero() {
        let acc = BatchStatsAccumulator::new();
        assert_eq!(acc.count(), 0);
        assert_eq!(acc.mean(), 0.0);
        assert_eq!(acc.p95(), 0.0);
        assert!(acc.summary().is_none());
    }

    #[test]
    fn test_single_sample_p95_is_itself() {
        let mut acc = BatchStatsAccumulator::new();
        acc.add_sample(0.42);
        assert_eq!(acc.p95(), 0.42);
        assert_eq!(acc.mean(), 0.42);
        assert_eq!(acc.count(), 1);
    }

    #[test]
    fn test_mean() {
        let mut acc = BatchStatsAccumulator::new();
        acc.add_sample(1.0);
        acc.add_sample(3.0);
        assert_eq!(acc.mean(), 2.0);
    }

    #[test]
    fn test_p95_interpolated() {
        let mut acc = BatchStatsAccumulator::new();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            acc.add_sample(v);
        }
        // rank = 0.95 * 4 = 3.8 -> 4.0 + 0.8 * (5.0 - 4.0)
        assert!((acc.p95() - 4.8).abs() < 1e-9);
    }

    #[test]
    fn test_summary_fields() {
        let mut acc = BatchStatsAccumulator::new();
        acc.add_sample(0.1);
        acc.add_sample(0.3);
        let s = acc.summary().unwrap();
        assert_eq!(s.total_batches, 2);
        assert!((s.avg_batch_seconds - 0.2).abs() < 1e-9);
    }
}
