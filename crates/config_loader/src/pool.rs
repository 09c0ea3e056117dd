//! 线程池配置解析
//!
//! 每个字段的解析顺序：全局覆盖项 (必须能解析为无符号整数) → 编译期默认值。
//! 存在但无法解析的覆盖项视为配置错误，初始化直接失败。

use std::collections::HashMap;
use std::str::FromStr;

use contracts::{
    ContractError, PoolConfig, DEFAULT_BACKLOG_CAPACITY, DEFAULT_KEEP_ALIVE_MS,
    DEFAULT_MAX_WORKERS, DEFAULT_MIN_WORKERS,
};
use tracing::debug;

/// 最小 worker 数覆盖项
pub const MIN_WORKERS_KEY: &str = "min_workers";

/// 最大 worker 数覆盖项
pub const MAX_WORKERS_KEY: &str = "max_workers";

/// 空闲回收时间覆盖项 (毫秒)
pub const KEEP_ALIVE_MS_KEY: &str = "keep_alive_ms";

/// 积压队列容量覆盖项
pub const BACKLOG_CAPACITY_KEY: &str = "backlog_capacity";

/// 从全局属性解析线程池配置
///
/// 未知键被忽略。
///
/// # Errors
/// - 覆盖项无法解析为对应的数值类型
/// - 解析结果违反 `PoolConfig` 的不变量
pub fn resolve_pool_config(global: &HashMap<String, String>) -> Result<PoolConfig, ContractError> {
    let config = PoolConfig {
        min_workers: resolve_field(global, MIN_WORKERS_KEY, DEFAULT_MIN_WORKERS)?,
        max_workers: resolve_field(global, MAX_WORKERS_KEY, DEFAULT_MAX_WORKERS)?,
        keep_alive_ms: resolve_field(global, KEEP_ALIVE_MS_KEY, DEFAULT_KEEP_ALIVE_MS)?,
        backlog_capacity: resolve_field(global, BACKLOG_CAPACITY_KEY, DEFAULT_BACKLOG_CAPACITY)?,
    };

    debug!(?config, "Pool configuration resolved");
    config.validated()
}

fn resolve_field<T>(
    global: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ContractError>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match global.get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ContractError::ConfigParse {
            message: format!("global property '{key}' has invalid value '{raw}'"),
            source: Some(Box::new(e)),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_no_overrides() {
        let config = resolve_pool_config(&HashMap::new()).unwrap();
        assert_eq!(config, PoolConfig::default());
    }

    #[test]
    fn test_overrides_applied() {
        let config = resolve_pool_config(&global(&[
            ("min_workers", "2"),
            ("max_workers", " 4 "),
            ("keep_alive_ms", "500"),
            ("backlog_capacity", "16"),
        ]))
        .unwrap();

        assert_eq!(config.min_workers, 2);
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.keep_alive_ms, 500);
        assert_eq!(config.backlog_capacity, 16);
    }

    #[test]
    fn test_partial_overrides_fall_back_to_defaults() {
        let config = resolve_pool_config(&global(&[("backlog_capacity", "1")])).unwrap();
        assert_eq!(config.backlog_capacity, 1);
        assert_eq!(config.min_workers, DEFAULT_MIN_WORKERS);
        assert_eq!(config.keep_alive_ms, DEFAULT_KEEP_ALIVE_MS);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let config = resolve_pool_config(&global(&[("queue.flavor", "lifo")])).unwrap();
        assert_eq!(config, PoolConfig::default());
    }

    #[test]
    fn test_unparseable_override_fails() {
        let err = resolve_pool_config(&global(&[("max_workers", "lots")])).unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
        assert!(err.to_string().contains("max_workers"), "got: {err}");
    }

    #[test]
    fn test_negative_override_fails() {
        let err = resolve_pool_config(&global(&[("min_workers", "-1")])).unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_invariant_violation_fails() {
        let err = resolve_pool_config(&global(&[("min_workers", "10"), ("max_workers", "2")]))
            .unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }));
    }
}
