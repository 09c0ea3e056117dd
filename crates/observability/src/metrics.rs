//! 发布器指标记录模块
//!
//! 指标名统一使用 `publisher_` 前缀；未安装 recorder 时所有调用均为空操作。

use contracts::{Diagnostic, DropCause};
use metrics::{counter, gauge, histogram};

/// 记录一次发布调用的结果
///
/// `cause` 为 `None` 表示已入队。
pub fn record_publish_outcome(adapter: &str, cause: Option<DropCause>) {
    match cause {
        None => counter!(
            "publisher_messages_enqueued_total",
            "adapter" => adapter.to_string()
        )
        .increment(1),
        Some(cause) => counter!(
            "publisher_messages_dropped_total",
            "adapter" => adapter.to_string(),
            "cause" => cause.as_str()
        )
        .increment(1),
    }
}

/// 按诊断记录类型计数
pub fn record_diagnostic(diagnostic: &Diagnostic) {
    let adapter = diagnostic.adapter().to_string();
    match diagnostic {
        Diagnostic::Dropped(record) => {
            counter!(
                "publisher_drops_reported_total",
                "adapter" => adapter,
                "cause" => record.cause.as_str()
            )
            .increment(1);
        }
        Diagnostic::DeliveryFailed(_) => {
            counter!("publisher_delivery_failures_total", "adapter" => adapter).increment(1);
        }
        Diagnostic::MalformedProperty(_) => {
            counter!("publisher_malformed_properties_total", "adapter" => adapter).increment(1);
        }
    }
}

/// 记录积压队列深度
pub fn record_backlog_depth(pool: &str, depth: usize) {
    gauge!("publisher_backlog_depth", "pool" => pool.to_string()).set(depth as f64);
}

/// 记录存活 worker 数
pub fn record_pool_workers(pool: &str, live: usize) {
    gauge!("publisher_pool_workers", "pool" => pool.to_string()).set(live as f64);
}

/// 记录提交耗时 (微秒)
pub fn record_submit_latency_us(adapter: &str, latency_us: f64) {
    histogram!(
        "publisher_submit_latency_us",
        "adapter" => adapter.to_string()
    )
    .record(latency_us);
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
