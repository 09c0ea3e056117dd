//! PublisherBlueprint - Config Loader output
//!
//! 描述完整的发布器配置：全局线程池覆盖项与各输出适配器。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的发布器配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PublisherBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 全局属性覆盖项 (线程池大小等，值均为字符串)
    #[serde(default)]
    pub global: HashMap<String, String>,

    /// 输出适配器列表
    #[validate(length(min = 1, message = "at least one adapter is required"), nested)]
    pub adapters: Vec<AdapterConfig>,
}

/// 输出适配器描述
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AdapterConfig {
    /// 适配器名称 (唯一)
    #[validate(length(min = 1, message = "adapter name cannot be empty"))]
    pub name: String,

    /// 所属租户
    #[serde(default = "default_tenant")]
    pub tenant: String,

    /// Broker 客户端类型
    pub client: ClientKind,

    /// Broker 地址
    #[validate(length(min = 1, message = "broker_address cannot be empty"))]
    pub broker_address: String,

    /// 可选客户端属性 ("k1=v1;k2=v2")
    #[serde(default)]
    pub optional_properties: Option<String>,
}

fn default_tenant() -> String {
    "default".to_string()
}

impl AdapterConfig {
    /// Create a descriptor with the default tenant and no optional properties
    pub fn new(
        name: impl Into<String>,
        client: ClientKind,
        broker_address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            tenant: default_tenant(),
            client,
            broker_address: broker_address.into(),
            optional_properties: None,
        }
    }
}

/// Broker 客户端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientKind {
    /// 日志输出
    Log,
    /// UDP 数据报
    Udp,
    /// 追加写文件
    File,
}

impl PublisherBlueprint {
    /// Find an adapter by name
    pub fn adapter(&self, name: &str) -> Option<&AdapterConfig> {
        self.adapters.iter().find(|adapter| adapter.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_blueprint() -> PublisherBlueprint {
        PublisherBlueprint {
            version: ConfigVersion::V1,
            global: HashMap::new(),
            adapters: vec![
                AdapterConfig::new("orders", ClientKind::Udp, "127.0.0.1:9092"),
                AdapterConfig::new("audit", ClientKind::Log, "stdout"),
            ],
        }
    }

    #[test]
    fn adapter_lookup() {
        let blueprint = sample_blueprint();
        assert_eq!(
            blueprint.adapter("audit").map(|a| a.client),
            Some(ClientKind::Log)
        );
        assert!(blueprint.adapter("missing").is_none());
    }

    #[test]
    fn adapter_defaults() {
        let adapter = AdapterConfig::new("orders", ClientKind::File, "/tmp/out");
        assert_eq!(adapter.tenant, "default");
        assert!(adapter.optional_properties.is_none());
    }

    #[test]
    fn empty_adapter_list_fails_validation() {
        let mut blueprint = sample_blueprint();
        blueprint.adapters.clear();
        assert!(blueprint.validate().is_err());
    }

    #[test]
    fn empty_name_fails_nested_validation() {
        let mut blueprint = sample_blueprint();
        blueprint.adapters[0].name.clear();
        assert!(blueprint.validate().is_err());
    }
}
