//! # Dispatcher
//!
//! 事件发布核心模块。
//!
//! 负责：
//! - 有界 worker 池 (按需扩容、空闲回收、积压队列有界)
//! - 每条消息一个 `PublishTask`，由 worker 交给共享的 broker 连接
//! - 积压满时丢弃并上报诊断，绝不阻塞调用方
//! - Broker 客户端实现 (log / udp / file / memory)

pub mod adapter;
pub mod clients;
pub mod connection;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod pool;
pub mod task;

pub use adapter::{EventAdapter, PublishOutcome};
pub use clients::{
    Envelope, FileClient, FileConnection, LogClient, LogConnection, MemoryClient,
    MemoryConnection, SentMessage, UdpClient, UdpConnection, WireFormat,
};
pub use connection::ConnectionSlot;
pub use contracts::{BrokerClient, BrokerConnection, PublishRequest};
pub use error::DispatcherError;
pub use manager::PoolManager;
pub use metrics::{MetricsSnapshot, PoolMetrics};
pub use pool::{DispatchPool, Rejection};
pub use task::{AdapterContext, Delivery, PublishTask};
