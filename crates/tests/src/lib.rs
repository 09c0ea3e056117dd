//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置 → 适配器 → 线程池 的完整链路
//! - 过载丢弃与诊断上报
//! - 断开连接后排队任务的失败路径

#[cfg(test)]
mod contract_tests {
    use config_loader::{resolve_pool_config, ConfigFormat, ConfigLoader};
    use contracts::{ClientKind, PoolConfig};

    #[test]
    fn test_loaded_config_resolves_pool() {
        let blueprint = ConfigLoader::load_from_str(
            r#"
[global]
max_workers = "16"

[[adapters]]
name = "orders"
client = "udp"
broker_address = "127.0.0.1:9092"
optional_properties = "max.packet.size=1200"
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let pool = resolve_pool_config(&blueprint.global).unwrap();
        assert_eq!(
            pool,
            PoolConfig {
                max_workers: 16,
                ..PoolConfig::default()
            }
        );
        assert_eq!(blueprint.adapters[0].client, ClientKind::Udp);
        assert_eq!(blueprint.adapters[0].tenant, "default");
    }

    #[test]
    fn test_sample_config_is_valid() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../publisher.toml");
        let blueprint = ConfigLoader::load_from_path(&path).unwrap();

        assert_eq!(blueprint.adapters.len(), 3);
        assert_eq!(blueprint.adapter("archive").unwrap().client, ClientKind::File);
        assert_eq!(resolve_pool_config(&blueprint.global).unwrap().max_workers, 8);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{
        AdapterConfig, BrokerClient, ClientKind, DiagnosticsSink, DropCause, PublishRequest,
    };
    use dispatcher::{EventAdapter, MemoryClient, PoolManager, PublishOutcome};
    use observability::RecordingDiagnostics;

    const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

    fn pool_overrides(min: usize, max: usize, backlog: usize) -> HashMap<String, String> {
        HashMap::from([
            ("min_workers".to_string(), min.to_string()),
            ("max_workers".to_string(), max.to_string()),
            ("keep_alive_ms".to_string(), "1000".to_string()),
            ("backlog_capacity".to_string(), backlog.to_string()),
        ])
    }

    fn adapter_with<B: BrokerClient>(
        name: &str,
        global: HashMap<String, String>,
        client: B,
        manager: Arc<PoolManager<B::Connection>>,
        recording: &Arc<RecordingDiagnostics>,
    ) -> EventAdapter<B> {
        let diagnostics: Arc<dyn DiagnosticsSink> = recording.clone();
        EventAdapter::new(
            AdapterConfig::new(name, ClientKind::Log, "memory://local"),
            global,
            client,
            manager,
            diagnostics,
        )
    }

    fn request(payload: &'static str) -> PublishRequest {
        PublishRequest::new("orders.created", payload).unwrap()
    }

    async fn drain<B: BrokerClient>(adapter: &EventAdapter<B>) {
        let pool = adapter.pool().unwrap();
        tokio::time::timeout(SETTLE_TIMEOUT, pool.shutdown())
            .await
            .expect("pool did not drain in time");
    }

    /// One worker, one backlog slot: the third message in a burst is dropped
    /// and reported, while the first two are delivered in order.
    #[tokio::test]
    async fn test_overload_drops_and_reports() {
        let client = MemoryClient::new().gated();
        let recording = Arc::new(RecordingDiagnostics::new());
        let adapter = adapter_with(
            "orders",
            pool_overrides(1, 1, 1),
            client.clone(),
            Arc::new(PoolManager::new()),
            &recording,
        );
        adapter.init().unwrap();
        adapter.connect().await.unwrap();

        assert_eq!(adapter.publish(request("busy")), PublishOutcome::Enqueued);
        tokio::time::timeout(SETTLE_TIMEOUT, client.wait_started(1))
            .await
            .unwrap();

        assert_eq!(adapter.publish(request("A")), PublishOutcome::Enqueued);
        assert_eq!(
            adapter.publish(request("B")),
            PublishOutcome::Dropped(DropCause::BacklogFull)
        );

        let drops = recording.drops();
        assert_eq!(drops.len(), 1);
        assert_eq!(drops[0].cause, DropCause::BacklogFull);
        assert_eq!(drops[0].destination, "orders.created");
        assert_eq!(drops[0].payload_len, 1);
        assert_eq!(drops[0].payload_preview, "B");

        client.release(2);
        drain(&adapter).await;

        let payloads: Vec<_> = client.sent().into_iter().map(|m| m.payload).collect();
        assert_eq!(payloads, vec!["busy", "A"]);
        assert!(recording.failures().is_empty());

        let snapshot = adapter.pool().unwrap().metrics();
        assert_eq!(snapshot.dropped, 1);
        assert_eq!(snapshot.delivered, 2);
        assert_eq!(snapshot.peak_workers, 1);
    }

    /// Tasks queued before a disconnect fail at execution time and are
    /// reported; the publisher itself never sees an error.
    #[tokio::test]
    async fn test_disconnect_before_execution() {
        let client = MemoryClient::new().gated();
        let recording = Arc::new(RecordingDiagnostics::new());
        let adapter = adapter_with(
            "orders",
            pool_overrides(1, 1, 8),
            client.clone(),
            Arc::new(PoolManager::new()),
            &recording,
        );
        adapter.init().unwrap();
        adapter.connect().await.unwrap();

        assert!(adapter.publish(request("in-flight")).is_enqueued());
        tokio::time::timeout(SETTLE_TIMEOUT, client.wait_started(1))
            .await
            .unwrap();
        assert!(adapter.publish(request("queued")).is_enqueued());

        adapter.disconnect().await;
        assert!(!adapter.is_connected());
        client.release(1);
        drain(&adapter).await;

        assert_eq!(client.sent_count(), 0);
        assert_eq!(client.closed(), 1);

        let failures = recording.failures();
        assert_eq!(failures.len(), 2);
        assert!(failures
            .iter()
            .any(|f| f.error.contains("has no open broker connection")));
        assert!(failures.iter().all(|f| f.adapter == "orders"));
    }

    #[tokio::test]
    async fn test_send_failure_surfaces_only_in_diagnostics() {
        let client = MemoryClient::new().with_send_failure("broker unavailable");
        let recording = Arc::new(RecordingDiagnostics::new());
        let adapter = adapter_with(
            "orders",
            pool_overrides(1, 2, 4),
            client.clone(),
            Arc::new(PoolManager::new()),
            &recording,
        );
        adapter.init().unwrap();
        adapter.connect().await.unwrap();

        assert_eq!(adapter.publish(request("x")), PublishOutcome::Enqueued);
        drain(&adapter).await;

        let failures = recording.failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].error.contains("broker unavailable"));
        assert!(recording.drops().is_empty());
    }

    /// Every adapter sharing a manager runs on the same pool; only the first
    /// initializer's overrides are applied.
    #[tokio::test]
    async fn test_adapters_share_one_pool() {
        let manager = Arc::new(PoolManager::new());
        let recording = Arc::new(RecordingDiagnostics::new());
        let orders_client = MemoryClient::new();
        let audit_client = MemoryClient::new();

        let orders = adapter_with(
            "orders",
            pool_overrides(1, 3, 16),
            orders_client.clone(),
            Arc::clone(&manager),
            &recording,
        );
        let audit = adapter_with(
            "audit",
            pool_overrides(2, 50, 500),
            audit_client.clone(),
            Arc::clone(&manager),
            &recording,
        );

        orders.init().unwrap();
        audit.init().unwrap();
        assert!(Arc::ptr_eq(orders.pool().unwrap(), audit.pool().unwrap()));
        assert_eq!(audit.pool().unwrap().config().max_workers, 3);

        orders.connect().await.unwrap();
        audit.connect().await.unwrap();
        for _ in 0..5 {
            assert!(orders.publish(request("o")).is_enqueued());
            assert!(audit.publish(request("a")).is_enqueued());
        }
        drain(&orders).await;

        assert_eq!(orders_client.sent_count(), 5);
        assert_eq!(audit_client.sent_count(), 5);
        assert!(recording.is_empty());
    }

    #[tokio::test]
    async fn test_publish_before_init_is_dropped() {
        let recording = Arc::new(RecordingDiagnostics::new());
        let adapter = adapter_with(
            "orders",
            HashMap::new(),
            MemoryClient::new(),
            Arc::new(PoolManager::new()),
            &recording,
        );

        assert_eq!(
            adapter.publish(request("early")),
            PublishOutcome::Dropped(DropCause::PoolNotInitialized)
        );
        assert_eq!(recording.drops()[0].cause, DropCause::PoolNotInitialized);
    }

    #[tokio::test]
    async fn test_malformed_properties_reported_on_connect() {
        let client = MemoryClient::new();
        let recording = Arc::new(RecordingDiagnostics::new());
        let diagnostics: Arc<dyn DiagnosticsSink> = recording.clone();
        let mut config = AdapterConfig::new("orders", ClientKind::Log, "10.0.0.1:9092");
        config.optional_properties = Some("linger.ms=5;badentry".to_string());

        let adapter = EventAdapter::new(
            config,
            HashMap::new(),
            client.clone(),
            Arc::new(PoolManager::new()),
            diagnostics,
        );
        adapter.init().unwrap();
        adapter.connect().await.unwrap();

        let properties = client.last_properties().unwrap();
        assert_eq!(properties.address(), Some("10.0.0.1:9092"));
        assert_eq!(properties.get("linger.ms"), Some("5"));
        assert_eq!(properties.len(), 3);

        let malformed = recording.malformed();
        assert_eq!(malformed.len(), 1);
        assert_eq!(malformed[0].entry, "badentry");

        adapter.disconnect().await;
    }

    /// Config file to disk through the file client.
    #[tokio::test]
    async fn test_file_adapter_from_config() {
        use config_loader::{ConfigFormat, ConfigLoader};
        use dispatcher::FileClient;

        let dir = tempfile::tempdir().unwrap();
        let toml = format!(
            r#"
[global]
min_workers = "2"
max_workers = "4"

[[adapters]]
name = "archive"
tenant = "acme"
client = "file"
broker_address = "{}"
"#,
            dir.path().display()
        );
        let blueprint = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        let config = blueprint.adapter("archive").unwrap().clone();

        let recording = Arc::new(RecordingDiagnostics::new());
        let diagnostics: Arc<dyn DiagnosticsSink> = recording.clone();
        let adapter = EventAdapter::new(
            config,
            blueprint.global.clone(),
            FileClient::new(),
            Arc::new(PoolManager::new()),
            diagnostics,
        );
        adapter.init().unwrap();
        adapter.connect().await.unwrap();

        for payload in ["one", "two", "three"] {
            assert!(adapter.publish(request(payload)).is_enqueued());
        }
        drain(&adapter).await;
        adapter.disconnect().await;

        let written = std::fs::read_to_string(dir.path().join("orders.created.jsonl")).unwrap();
        let lines: Vec<serde_json::Value> = written
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l["destination"] == "orders.created"));
        assert!(recording.is_empty());
    }
}
