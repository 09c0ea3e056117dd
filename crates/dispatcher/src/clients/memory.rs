//! 内存 Broker 客户端
//!
//! 用于测试的内存实现，支持闸门阻塞、延迟、失败与 panic 注入。

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use contracts::{BrokerClient, BrokerConnection, ClientProperties, ContractError};
use tokio::sync::{Notify, Semaphore};
use tracing::instrument;

/// 内存客户端配置 (可注入各种场景)
#[derive(Debug, Default, Clone)]
pub struct MemoryConfig {
    /// 每次发送前必须获取一个许可 (由 `release` 发放)
    pub gated: bool,
    /// 每次发送的人为延迟
    pub delay: Option<Duration>,
    /// 发送失败时返回的错误信息
    pub send_failure: Option<String>,
    /// 打开连接失败时返回的错误信息
    pub open_failure: Option<String>,
    /// 发送到该目标时 panic
    pub panic_destination: Option<String>,
}

/// 已送达的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub destination: String,
    pub payload: Bytes,
}

/// 所有克隆共享的状态
struct MemoryState {
    sent: Mutex<Vec<SentMessage>>,
    /// 进入 send 的次数 (含被闸门阻塞的)
    started: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
    last_properties: Mutex<Option<ClientProperties>>,
    gate: Semaphore,
    progress: Notify,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            started: AtomicUsize::new(0),
            opened: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            last_properties: Mutex::new(None),
            gate: Semaphore::new(0),
            progress: Notify::new(),
        }
    }
}

/// 内存 Broker 客户端
///
/// 克隆共享同一份状态，测试可以保留一个克隆用于断言。
#[derive(Clone, Default)]
pub struct MemoryClient {
    config: MemoryConfig,
    state: Arc<MemoryState>,
}

impl MemoryClient {
    /// 创建默认客户端
    pub fn new() -> Self {
        Self::with_config(MemoryConfig::default())
    }

    /// 使用配置创建客户端
    pub fn with_config(config: MemoryConfig) -> Self {
        Self {
            config,
            state: Arc::new(MemoryState::default()),
        }
    }

    /// 发送阻塞直到 `release`
    pub fn gated(mut self) -> Self {
        self.config.gated = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.config.delay = Some(delay);
        self
    }

    pub fn with_send_failure(mut self, message: impl Into<String>) -> Self {
        self.config.send_failure = Some(message.into());
        self
    }

    pub fn with_open_failure(mut self, message: impl Into<String>) -> Self {
        self.config.open_failure = Some(message.into());
        self
    }

    pub fn panic_on(mut self, destination: impl Into<String>) -> Self {
        self.config.panic_destination = Some(destination.into());
        self
    }

    /// 放行 `n` 次被闸门阻塞的发送
    pub fn release(&self, n: usize) {
        self.state.gate.add_permits(n);
    }

    /// 等待至少 `n` 次发送已开始
    pub async fn wait_started(&self, n: usize) {
        loop {
            let progressed = self.state.progress.notified();
            if self.started() >= n {
                return;
            }
            progressed.await;
        }
    }

    /// 已送达消息的快照
    pub fn sent(&self) -> Vec<SentMessage> {
        self.state
            .sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn sent_count(&self) -> usize {
        self.state
            .sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn started(&self) -> usize {
        self.state.started.load(Ordering::Acquire)
    }

    /// 打开连接的次数
    pub fn opened(&self) -> usize {
        self.state.opened.load(Ordering::Acquire)
    }

    /// 关闭连接的次数
    pub fn closed(&self) -> usize {
        self.state.closed.load(Ordering::Acquire)
    }

    /// 最近一次打开连接时使用的属性
    pub fn last_properties(&self) -> Option<ClientProperties> {
        self.state
            .last_properties
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl BrokerClient for MemoryClient {
    type Connection = MemoryConnection;

    fn kind(&self) -> &'static str {
        "memory"
    }

    #[instrument(name = "memory_client_open", skip(self, properties))]
    async fn open(&self, properties: &ClientProperties) -> Result<MemoryConnection, ContractError> {
        if let Some(message) = &self.config.open_failure {
            return Err(ContractError::broker_connection(
                properties.address().unwrap_or_default(),
                message.clone(),
            ));
        }

        *self
            .state
            .last_properties
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(properties.clone());
        self.state.opened.fetch_add(1, Ordering::AcqRel);

        Ok(MemoryConnection {
            config: self.config.clone(),
            state: Arc::clone(&self.state),
            closed: AtomicBool::new(false),
        })
    }
}

/// 内存连接
pub struct MemoryConnection {
    config: MemoryConfig,
    state: Arc<MemoryState>,
    closed: AtomicBool,
}

impl std::fmt::Debug for MemoryConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConnection")
            .field("config", &self.config)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl MemoryConnection {
    fn ensure_open(&self, destination: &str) -> Result<(), ContractError> {
        if self.closed.load(Ordering::Acquire) {
            Err(ContractError::broker_send(destination, "connection closed"))
        } else {
            Ok(())
        }
    }
}

impl BrokerConnection for MemoryConnection {
    #[instrument(name = "memory_connection_send", skip(self, payload))]
    async fn send(&self, destination: &str, payload: &Bytes) -> Result<(), ContractError> {
        self.ensure_open(destination)?;

        self.state.started.fetch_add(1, Ordering::AcqRel);
        self.state.progress.notify_waiters();

        if self.config.gated {
            let permit = self
                .state
                .gate
                .acquire()
                .await
                .map_err(|e| ContractError::broker_send(destination, e.to_string()))?;
            permit.forget();
        }
        if let Some(delay) = self.config.delay {
            tokio::time::sleep(delay).await;
        }

        if self.config.panic_destination.as_deref() == Some(destination) {
            panic!("injected panic while sending to '{destination}'");
        }
        if let Some(message) = &self.config.send_failure {
            return Err(ContractError::broker_send(destination, message.clone()));
        }
        // 闸门期间可能已被关闭
        self.ensure_open(destination)?;

        self.state
            .sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentMessage {
                destination: destination.to_string(),
                payload: payload.clone(),
            });
        Ok(())
    }

    #[instrument(name = "memory_connection_close", skip(self))]
    async fn close(&self) -> Result<(), ContractError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.state.closed.fetch_add(1, Ordering::AcqRel);
        }
        Ok(())
    }
}
