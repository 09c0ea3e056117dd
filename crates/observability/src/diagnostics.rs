//! 诊断记录接收器
//!
//! - `TracingDiagnostics`: 写日志并递增 Prometheus 计数器 (生产用)
//! - `RecordingDiagnostics`: 在内存中保存记录 (测试与统计用)

use std::sync::{Mutex, PoisonError};

use contracts::{DeliveryFailure, Diagnostic, DiagnosticsSink, DropRecord, MalformedProperty};
use tracing::{error, warn};

use crate::metrics::record_diagnostic;

/// 基于 tracing 的诊断接收器
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl TracingDiagnostics {
    pub fn new() -> Self {
        Self
    }
}

impl DiagnosticsSink for TracingDiagnostics {
    fn record(&self, diagnostic: Diagnostic) {
        record_diagnostic(&diagnostic);

        match &diagnostic {
            Diagnostic::Dropped(record) => warn!(
                target: "publisher::diagnostics",
                adapter = %record.adapter,
                tenant = %record.tenant,
                destination = %record.destination,
                bytes = record.payload_len,
                preview = %record.payload_preview,
                cause = %record.cause,
                "Message dropped"
            ),
            Diagnostic::DeliveryFailed(failure) => error!(
                target: "publisher::diagnostics",
                adapter = %failure.adapter,
                tenant = %failure.tenant,
                destination = %failure.destination,
                error = %failure.error,
                "Delivery failed"
            ),
            Diagnostic::MalformedProperty(property) => warn!(
                target: "publisher::diagnostics",
                adapter = %property.adapter,
                entry = %property.entry,
                "Malformed optional property skipped"
            ),
        }
    }
}

/// 内存诊断接收器
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    records: Mutex<Vec<Diagnostic>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 全部记录的快照
    pub fn records(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// 丢弃记录
    pub fn drops(&self) -> Vec<DropRecord> {
        self.lock()
            .iter()
            .filter_map(|diagnostic| match diagnostic {
                Diagnostic::Dropped(record) => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    /// 投递失败记录
    pub fn failures(&self) -> Vec<DeliveryFailure> {
        self.lock()
            .iter()
            .filter_map(|diagnostic| match diagnostic {
                Diagnostic::DeliveryFailed(failure) => Some(failure.clone()),
                _ => None,
            })
            .collect()
    }

    /// 非法可选属性记录
    pub fn malformed(&self) -> Vec<MalformedProperty> {
        self.lock()
            .iter()
            .filter_map(|diagnostic| match diagnostic {
                Diagnostic::MalformedProperty(property) => Some(property.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Diagnostic>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DiagnosticsSink for RecordingDiagnostics {
    fn record(&self, diagnostic: Diagnostic) {
        self.lock().push(diagnostic);
    }
}

/// 同时转发给两个接收器
pub struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A, B> Tee<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: DiagnosticsSink, B: DiagnosticsSink> DiagnosticsSink for Tee<A, B> {
    fn record(&self, diagnostic: Diagnostic) {
        self.first.record(diagnostic.clone());
        self.second.record(diagnostic);
    }
}
