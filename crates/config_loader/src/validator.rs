//! 配置校验模块
//!
//! 校验规则：
//! - 字段级约束 (validator derive)
//! - 适配器名称唯一
//! - 全局线程池覆盖项可解析且满足不变量

use std::collections::HashSet;

use contracts::{ContractError, PublisherBlueprint};
use validator::Validate;

use crate::pool::resolve_pool_config;

/// 校验 PublisherBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &PublisherBlueprint) -> Result<(), ContractError> {
    blueprint.validate()?;
    validate_adapter_names(blueprint)?;
    resolve_pool_config(&blueprint.global)?;
    Ok(())
}

/// 校验适配器名称唯一性
fn validate_adapter_names(blueprint: &PublisherBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for adapter in &blueprint.adapters {
        if !seen.insert(adapter.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("adapters[name={}]", adapter.name),
                "duplicate adapter name",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{AdapterConfig, ClientKind, ConfigVersion};
    use std::collections::HashMap;

    fn minimal_blueprint() -> PublisherBlueprint {
        PublisherBlueprint {
            version: ConfigVersion::V1,
            global: HashMap::new(),
            adapters: vec![AdapterConfig::new("orders", ClientKind::Log, "stdout")],
        }
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_duplicate_adapter_name() {
        let mut bp = minimal_blueprint();
        bp.adapters.push(bp.adapters[0].clone());
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate adapter name"), "got: {err}");
    }

    #[test]
    fn test_empty_broker_address() {
        let mut bp = minimal_blueprint();
        bp.adapters[0].broker_address.clear();
        let err = validate(&bp).unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }));
    }

    #[test]
    fn test_bad_pool_override() {
        let mut bp = minimal_blueprint();
        bp.global.insert("keep_alive_ms".into(), "soon".into());
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("keep_alive_ms"), "got: {err}");
    }

    #[test]
    fn test_pool_invariant_checked() {
        let mut bp = minimal_blueprint();
        bp.global.insert("backlog_capacity".into(), "0".into());
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("backlog_capacity"), "got: {err}");
    }
}
